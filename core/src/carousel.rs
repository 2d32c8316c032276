//! Scrolling text on the bottom row
//!
//! Each cycle fetches one message and scrolls it right to left, one pixel
//! column per frame, from just past the right edge until its last glyph has
//! left the panel. The next fetch follows immediately.

use embassy_sync::blocking_mutex::raw::RawMutex;
use log::{debug, warn};

use crate::arbiter::DisplayArbiter;
use crate::config::ClockConfig;
use crate::fetch::SampleSource;
use crate::render::{self, CAROUSEL_START_X, Surface, TEXT_WIDTH};
use crate::sample::MessageText;
use crate::timebase::Timebase;

/// Width in pixels of `text` in the carousel font
pub fn pixel_len(text: &str) -> i32 {
    text.chars().count() as i32 * TEXT_WIDTH as i32
}

/// Left-edge columns of every frame, start column down to `-pixel_len` inclusive
pub fn scroll_positions(pixel_len: i32) -> impl Iterator<Item = i32> {
    (-pixel_len..=CAROUSEL_START_X).rev()
}

#[derive(Default)]
pub struct MessageCarousel {
    /// Last message fetched successfully, scrolled again when a fetch fails
    last: Option<MessageText>,
}

impl MessageCarousel {
    pub const fn new() -> Self {
        Self { last: None }
    }

    pub fn last(&self) -> Option<&MessageText> {
        self.last.as_ref()
    }

    /// Fetch one message and scroll it across the panel
    ///
    /// Returns the number of frames drawn.
    pub async fn run_cycle<M, D, S, T>(
        &mut self,
        config: &ClockConfig,
        timebase: &T,
        arbiter: &DisplayArbiter<M, D>,
        source: &S,
    ) -> usize
    where
        M: RawMutex,
        D: Surface,
        S: SampleSource,
        T: Timebase,
    {
        match source.fetch_message().await {
            Ok(text) => self.last = Some(text),
            Err(e) if self.last.is_some() => warn!("Repeating last message after fetch failure: {}", e),
            Err(e) => warn!("No message to scroll yet: {}", e),
        }

        let Some(text) = self.last.as_ref() else {
            timebase.sleep(config.carousel_retry_delay).await;
            return 0;
        };
        debug!("Scrolling {:?}", text.as_str());

        let mut frames = 0;
        for x in scroll_positions(pixel_len(text)) {
            arbiter
                .with_exclusive_access(render::carousel_region(), |surface| {
                    render::draw_carousel_frame(surface, text, x)
                })
                .await;
            frames += 1;
            timebase.sleep(config.carousel_frame_delay).await;
        }
        frames
    }

    /// Scroll messages forever
    pub async fn run<M, D, S, T>(
        &mut self,
        config: &ClockConfig,
        timebase: &T,
        arbiter: &DisplayArbiter<M, D>,
        source: &S,
    ) -> !
    where
        M: RawMutex,
        D: Surface,
        S: SampleSource,
        T: Timebase,
    {
        loop {
            self.run_cycle(config, timebase, arbiter, source).await;
        }
    }
}
