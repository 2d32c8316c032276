//! Night detection and hibernation
//!
//! ```text
//!   Day --(check due, past sleep time)--> NightAnnounce --(hold)--> Sleeping
//! ```
//!
//! `Sleeping` is terminal: the platform powers down and the next run is a
//! cold boot with every piece of state reinitialized.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant};
use log::{debug, info};

use crate::arbiter::DisplayArbiter;
use crate::config::{ClockConfig, MILLIS_PER_DAY, NightWindow};
use crate::render::{self, Surface};
use crate::sample::TimeSample;
use crate::timebase::Timebase;

/// Platform capability to power down until a timer wakes the device
///
/// Real implementations do not return.
pub trait Hibernate {
    fn hibernate(&mut self, wake_after: Duration);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightState {
    Day,
    NightAnnounce,
    Sleeping,
}

/// Whether a time of day falls outside the night window's awake span
pub fn is_night(window: &NightWindow, time_of_day_ms: u32) -> bool {
    window.sleep_boundary.is_past(time_of_day_ms, window.sleep_ms)
        || (window.sleep_before_wake && time_of_day_ms < window.wake_ms)
}

/// Time left until the sleep threshold, at least `padding`
pub fn until_sleep(window: &NightWindow, time_of_day_ms: u32, padding: Duration) -> Duration {
    if window.sleep_boundary.is_past(time_of_day_ms, window.sleep_ms) {
        return padding;
    }
    Duration::from_millis(u64::from(window.sleep_ms - time_of_day_ms)) + padding
}

/// Time left until the next wake threshold, at least `padding`
///
/// Once today's wake time has passed the target is tomorrow's.
pub fn until_wake(window: &NightWindow, time_of_day_ms: u32, padding: Duration) -> Duration {
    let mut current = i64::from(time_of_day_ms);
    if window.wake_rollover.is_past(time_of_day_ms, window.wake_ms) {
        current -= i64::from(MILLIS_PER_DAY);
    }
    let remaining = i64::from(window.wake_ms) - current;
    if remaining <= 0 {
        return padding;
    }
    Duration::from_millis(remaining as u64)
}

/// Outcome of one night check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Still day; check again after this long
    Recheck(Duration),
    /// Night; announce, then hibernate for this long
    Hibernate(Duration),
}

pub struct NightCycle {
    state: NightState,
    next_check_at: Instant,
}

impl NightCycle {
    /// Arm the first check from the first time sync's outcome
    ///
    /// With a sample the check lands on the sleep threshold, or right away
    /// if it is already night. Without one the regular period applies.
    pub fn new(now: Instant, config: &ClockConfig, latest: Option<&TimeSample>) -> Self {
        let delay = match latest {
            Some(sample) if is_night(&config.night, sample.time_of_day_ms()) => config.api_padding,
            Some(sample) => until_sleep(&config.night, sample.time_of_day_ms(), config.api_padding),
            None => config.night_check_period,
        };
        debug!("First night check in {} s", delay.as_secs());
        Self {
            state: NightState::Day,
            next_check_at: now + delay,
        }
    }

    pub fn state(&self) -> NightState {
        self.state
    }

    pub fn next_check_at(&self) -> Instant {
        self.next_check_at
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.state == NightState::Day && now >= self.next_check_at
    }

    /// Decide from the freshest sample, without side effects
    pub fn verdict(&self, config: &ClockConfig, latest: Option<&TimeSample>) -> Verdict {
        let Some(sample) = latest else {
            return Verdict::Recheck(config.night_check_period);
        };
        let time_of_day = sample.time_of_day_ms();
        if is_night(&config.night, time_of_day) {
            Verdict::Hibernate(until_wake(&config.night, time_of_day, config.api_padding))
        } else {
            let next = until_sleep(&config.night, time_of_day, config.api_padding);
            Verdict::Recheck(next.min(config.night_check_period))
        }
    }

    /// Run one due check, announcing and hibernating if it is night
    ///
    /// The surface stays acquired from the announcement until hibernation,
    /// so nothing can draw over the message.
    pub async fn check<M, D, T, H>(
        &mut self,
        config: &ClockConfig,
        timebase: &T,
        arbiter: &DisplayArbiter<M, D>,
        latest: Option<&TimeSample>,
        hibernator: &mut H,
    ) -> NightState
    where
        M: RawMutex,
        D: Surface,
        T: Timebase,
        H: Hibernate,
    {
        if self.state != NightState::Day {
            return self.state;
        }

        match self.verdict(config, latest) {
            Verdict::Recheck(delay) => {
                self.next_check_at = timebase.now() + delay;
                debug!("Still day, next night check in {} s", delay.as_secs());
            }
            Verdict::Hibernate(wake_after) => {
                self.state = NightState::NightAnnounce;
                info!("Good night");
                let mut surface = arbiter.acquire().await;
                render::draw_good_night(&mut *surface);
                timebase.sleep(config.night_announce_hold).await;

                self.state = NightState::Sleeping;
                info!("Hibernating for {} s", wake_after.as_secs());
                hibernator.hibernate(wake_after);
            }
        }
        self.state
    }
}
