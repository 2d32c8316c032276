//! Test doubles shared by the unit tests

use core::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::vec::Vec;

use embassy_time::{Duration, Instant};
use embedded_graphics::mock_display::MockDisplay;
use embedded_graphics::pixelcolor::Rgb565;

use crate::fetch::{FetchError, SampleSource, Transport};
use crate::night::Hibernate;
use crate::sample::{MessageText, TimeSample};
use crate::timebase::Timebase;

/// Time base whose sleeps advance the clock and complete on the next poll
pub struct FakeTimebase {
    now_ms: Cell<u64>,
    slept: RefCell<Vec<Duration>>,
}

impl FakeTimebase {
    pub fn new() -> Self {
        Self {
            now_ms: Cell::new(0),
            slept: RefCell::new(Vec::new()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now_ms.set(self.now_ms.get() + duration.as_millis());
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }
}

impl Timebase for FakeTimebase {
    fn now(&self) -> Instant {
        Instant::from_millis(self.now_ms.get())
    }

    async fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
        self.advance(duration);
        // Let other workers run, as a real timer would
        embassy_futures::yield_now().await;
    }
}

/// Transport answering from a per-URL script
pub struct CannedTransport {
    script: VecDeque<(&'static str, Result<&'static str, FetchError>)>,
    requested: Vec<&'static str>,
}

impl CannedTransport {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            requested: Vec::new(),
        }
    }

    pub fn push(&mut self, url: &'static str, reply: Result<&'static str, FetchError>) {
        self.script.push_back((url, reply));
    }

    pub fn requested(&self) -> &[&'static str] {
        &self.requested
    }
}

impl Transport for CannedTransport {
    async fn get<'b>(&mut self, url: &str, buf: &'b mut [u8]) -> Result<&'b [u8], FetchError> {
        let (expected, reply) = self.script.pop_front().expect("unexpected fetch");
        assert_eq!(expected, url);
        self.requested.push(expected);
        let body = reply?;
        let len = body.len();
        if len > buf.len() {
            return Err(FetchError::BufferTooSmall);
        }
        buf[..len].copy_from_slice(body.as_bytes());
        Ok(&buf[..len])
    }
}

/// Sample source answering from scripts, without a broker
pub struct ScriptedSource {
    times: RefCell<VecDeque<Result<TimeSample, FetchError>>>,
    messages: RefCell<VecDeque<Result<MessageText, FetchError>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            times: RefCell::new(VecDeque::new()),
            messages: RefCell::new(VecDeque::new()),
        }
    }

    pub fn push_time(&self, reply: Result<TimeSample, FetchError>) {
        self.times.borrow_mut().push_back(reply);
    }

    pub fn push_message(&self, reply: Result<&str, FetchError>) {
        let reply = reply.map(|text| MessageText::try_from(text).expect("message too long"));
        self.messages.borrow_mut().push_back(reply);
    }
}

impl SampleSource for ScriptedSource {
    async fn fetch_time(&self) -> Result<TimeSample, FetchError> {
        self.times.borrow_mut().pop_front().unwrap_or(Err(FetchError::Transport))
    }

    async fn fetch_message(&self) -> Result<MessageText, FetchError> {
        self.messages.borrow_mut().pop_front().unwrap_or(Err(FetchError::Transport))
    }
}

/// Records the requested wake delay instead of suspending
#[derive(Default)]
pub struct RecordingHibernator {
    pub requested: Option<Duration>,
}

impl Hibernate for RecordingHibernator {
    fn hibernate(&mut self, wake_after: Duration) {
        self.requested = Some(wake_after);
    }
}

/// Build a sample without going through JSON
pub fn sample(day: u8, month: u8, hour: u8, minute: u8, second: u8, weekday: &str) -> TimeSample {
    TimeSample {
        day,
        month,
        hour,
        minute,
        second,
        day_of_week: heapless::String::try_from(weekday).expect("weekday too long"),
    }
}

/// Mock display that tolerates the clears and off-screen text real drawing does
pub fn surface() -> MockDisplay<Rgb565> {
    let mut display = MockDisplay::new();
    display.set_allow_overdraw(true);
    display.set_allow_out_of_bounds_drawing(true);
    display
}
