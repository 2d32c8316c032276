//! Drift-corrected date/time display
//!
//! The scheduler fires once per minute, just after the minute boundary. Each
//! firing fetches the authoritative time and re-arms from the observed
//! second, so local timer jitter never accumulates: a firing that lands at
//! hh:mm:03 re-arms 57.1 s later, one at hh:mm:00 re-arms 60.1 s later.
//!
//! Only fields whose text changed are redrawn. At 13:00, and at 17:30 on
//! weekdays, the regular redraw is replaced by a full-panel celebration.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant};
use heapless::Vec;
use log::{debug, info, warn};

use crate::arbiter::DisplayArbiter;
use crate::config::{ClockConfig, MILLIS_PER_MINUTE, MILLIS_PER_SECOND};
use crate::fetch::SampleSource;
use crate::render::{self, Field, Surface};
use crate::sample::{FieldText, TimeSample, two_digits};
use crate::timebase::Timebase;

/// Delay from an observation at `second` until just after the next minute
pub fn next_fire_delay(second: u8, padding: Duration) -> Duration {
    let to_boundary = MILLIS_PER_MINUTE.saturating_sub(MILLIS_PER_SECOND * u32::from(second));
    Duration::from_millis(u64::from(to_boundary)) + padding
}

/// Full-panel animation replacing a regular redraw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Celebration {
    /// 17:30, Monday to Friday
    WorkDone,
    /// 13:00, every day
    Lunch,
}

impl Celebration {
    pub fn for_sample(sample: &TimeSample) -> Option<Self> {
        match (sample.hour, sample.minute) {
            (17, 30) if !sample.is_weekend() => Some(Celebration::WorkDone),
            (13, 0) => Some(Celebration::Lunch),
            _ => None,
        }
    }

    pub fn banner(self) -> [&'static str; 2] {
        match self {
            Celebration::WorkDone => ["You're", "Done!"],
            Celebration::Lunch => ["Lunch", "Time!"],
        }
    }
}

/// What one firing drew
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redraw {
    /// The fetch failed; nothing was drawn and nothing recorded
    Stale,
    /// Changed fields only, one arbiter acquisition each
    Fields(Vec<(Field, FieldText), 4>),
    Celebrate(Celebration),
}

/// The last text drawn per field; empty until first drawn
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PreviousFields {
    text: [FieldText; 4],
}

impl PreviousFields {
    pub fn get(&self, field: Field) -> &str {
        &self.text[field as usize]
    }

    fn set(&mut self, field: Field, text: FieldText) {
        self.text[field as usize] = text;
    }
}

pub struct TimeSyncScheduler {
    next_fire_at: Instant,
    latest: Option<TimeSample>,
    previous: PreviousFields,
    /// (day, hour, minute) of the last celebration, so a second firing in
    /// the same minute does not replay it
    celebrated: Option<(u8, u8, u8)>,
}

impl TimeSyncScheduler {
    pub fn new(now: Instant, config: &ClockConfig) -> Self {
        Self {
            next_fire_at: now + config.first_sync_delay,
            latest: None,
            previous: PreviousFields::default(),
            celebrated: None,
        }
    }

    pub fn next_fire_at(&self) -> Instant {
        self.next_fire_at
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_fire_at
    }

    /// Most recent successful observation
    pub fn latest(&self) -> Option<&TimeSample> {
        self.latest.as_ref()
    }

    pub fn previous(&self) -> &PreviousFields {
        &self.previous
    }

    /// Re-arm from an observed second
    fn rearm(&mut self, now: Instant, second: u8, padding: Duration) {
        let delay = next_fire_delay(second, padding);
        self.next_fire_at = now + delay;
        debug!("Next time sync in {} ms", delay.as_millis());
    }

    /// Decide what `sample` requires on screen, without drawing
    pub fn plan(&self, sample: &TimeSample) -> Redraw {
        if let Some(celebration) = Celebration::for_sample(sample) {
            let key = (sample.day, sample.hour, sample.minute);
            if self.celebrated != Some(key) {
                return Redraw::Celebrate(celebration);
            }
        }

        let mut changed = Vec::new();
        for field in Field::ALL {
            let text = two_digits(field.value(sample));
            if self.previous.get(field) != text.as_str() {
                // Capacity is exactly the number of fields
                let _ = changed.push((field, text));
            }
        }
        Redraw::Fields(changed)
    }

    /// Record that `redraw` for `sample` is now on screen
    pub fn commit(&mut self, sample: TimeSample, redraw: &Redraw) {
        match redraw {
            Redraw::Stale => return,
            Redraw::Fields(fields) => {
                for (field, text) in fields {
                    self.previous.set(*field, text.clone());
                }
            }
            Redraw::Celebrate(_) => {
                for field in Field::ALL {
                    self.previous.set(field, two_digits(field.value(&sample)));
                }
                self.celebrated = Some((sample.day, sample.hour, sample.minute));
            }
        }
        self.latest = Some(sample);
    }

    /// Fetch, re-arm and redraw
    pub async fn fire<M, D, S, T>(
        &mut self,
        config: &ClockConfig,
        timebase: &T,
        arbiter: &DisplayArbiter<M, D>,
        source: &S,
    ) -> Redraw
    where
        M: RawMutex,
        D: Surface,
        S: SampleSource,
        T: Timebase,
    {
        let result = source.fetch_time().await;
        let now = timebase.now();

        let sample = match result {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Keeping stale time after fetch failure: {}", e);
                // Without any observation yet the minute is assumed to have just begun
                let stale_second = self.latest.as_ref().map_or(0, |s| s.second);
                self.rearm(now, stale_second, config.api_padding);
                return Redraw::Stale;
            }
        };

        self.rearm(now, sample.second, config.api_padding);
        let redraw = self.plan(&sample);

        match &redraw {
            Redraw::Stale => {}
            Redraw::Fields(fields) => {
                for (field, text) in fields {
                    arbiter
                        .with_exclusive_access(field.region(), |surface| render::draw_field(surface, *field, text))
                        .await;
                }
            }
            Redraw::Celebrate(celebration) => {
                info!("Celebrating {:?} at {:02}:{:02}", celebration, sample.hour, sample.minute);
                celebrate(config, timebase, arbiter, *celebration, &sample).await;
            }
        }

        self.commit(sample, &redraw);
        redraw
    }
}

/// Colour-cycle the banner over the whole panel, then redraw the full time
///
/// The surface stays acquired for the whole animation.
async fn celebrate<M, D, T>(
    config: &ClockConfig,
    timebase: &T,
    arbiter: &DisplayArbiter<M, D>,
    celebration: Celebration,
    sample: &TimeSample,
) where
    M: RawMutex,
    D: Surface,
    T: Timebase,
{
    let mut surface = arbiter.acquire().await;
    render::clear_all(&mut *surface);
    for frame in 0..config.celebration_frames {
        render::draw_banner(&mut *surface, celebration.banner(), render::hue_color(frame));
        timebase.sleep(config.celebration_frame_delay).await;
    }
    render::draw_full_time(&mut *surface, sample);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::render::{BLACK, CYAN};
    use crate::testing::{FakeTimebase, ScriptedSource, sample, surface};
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embedded_graphics::mock_display::MockDisplay;
    use embedded_graphics::pixelcolor::Rgb565;
    use embedded_graphics::prelude::*;
    use proptest::prelude::*;

    type Arbiter = DisplayArbiter<NoopRawMutex, MockDisplay<Rgb565>>;

    fn fields(redraw: &Redraw) -> std::vec::Vec<Field> {
        match redraw {
            Redraw::Fields(fields) => fields.iter().map(|(f, _)| *f).collect(),
            other => panic!("expected field redraw, got {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn prop_next_delay_lands_after_minute_boundary(second in 0u8..60) {
            let delay = next_fire_delay(second, Duration::from_millis(100)).as_millis();
            prop_assert_eq!(delay, 60_000 - 1_000 * u64::from(second) + 100);
            prop_assert!((100..=60_100).contains(&delay));
        }
    }

    #[test]
    fn test_first_plan_draws_every_field() {
        let config = ClockConfig::default();
        let scheduler = TimeSyncScheduler::new(Instant::from_millis(0), &config);
        let redraw = scheduler.plan(&sample(9, 3, 8, 5, 20, "Monday"));
        assert_eq!(fields(&redraw), [Field::Day, Field::Month, Field::Hour, Field::Minute]);
        if let Redraw::Fields(f) = &redraw {
            assert_eq!(f[0].1.as_str(), "09");
            assert_eq!(f[3].1.as_str(), "05");
        }
    }

    #[test]
    fn test_identical_sample_draws_nothing_second_time() {
        let config = ClockConfig::default();
        let mut scheduler = TimeSyncScheduler::new(Instant::from_millis(0), &config);
        let now = sample(9, 3, 8, 5, 20, "Monday");

        let first = scheduler.plan(&now);
        scheduler.commit(now.clone(), &first);
        let second = scheduler.plan(&now);

        assert_eq!(second, Redraw::Fields(Vec::new()));
    }

    #[test]
    fn test_minute_change_redraws_only_minute() {
        let config = ClockConfig::default();
        let mut scheduler = TimeSyncScheduler::new(Instant::from_millis(0), &config);
        let before = sample(9, 3, 8, 5, 59, "Monday");
        let first = scheduler.plan(&before);
        scheduler.commit(before, &first);

        let redraw = scheduler.plan(&sample(9, 3, 8, 6, 0, "Monday"));
        assert_eq!(fields(&redraw), [Field::Minute]);
    }

    #[test]
    fn test_celebration_guard() {
        let config = ClockConfig::default();
        let scheduler = TimeSyncScheduler::new(Instant::from_millis(0), &config);

        let plan = |h, m, weekday| scheduler.plan(&sample(14, 6, h, m, 0, weekday));
        assert_eq!(plan(17, 30, "Friday"), Redraw::Celebrate(Celebration::WorkDone));
        assert!(matches!(plan(17, 29, "Friday"), Redraw::Fields(_)));
        assert!(matches!(plan(17, 31, "Friday"), Redraw::Fields(_)));
        assert!(matches!(plan(17, 30, "Saturday"), Redraw::Fields(_)));
        assert!(matches!(plan(17, 30, "Sunday"), Redraw::Fields(_)));
        assert_eq!(plan(13, 0, "Sunday"), Redraw::Celebrate(Celebration::Lunch));
        assert!(matches!(plan(13, 1, "Tuesday"), Redraw::Fields(_)));
    }

    #[test]
    fn test_celebration_runs_once_per_minute_and_records_all_fields() {
        let config = ClockConfig {
            celebration_frames: 3,
            ..ClockConfig::default()
        };
        let timebase = FakeTimebase::new();
        let arbiter: Arbiter = DisplayArbiter::new(surface());
        let source = ScriptedSource::new();
        source.push_time(Ok(sample(14, 6, 17, 30, 0, "Friday")));
        source.push_time(Ok(sample(14, 6, 17, 30, 40, "Friday")));

        let mut scheduler = TimeSyncScheduler::new(timebase.now(), &config);
        let first = block_on(scheduler.fire(&config, &timebase, &arbiter, &source));
        let second = block_on(scheduler.fire(&config, &timebase, &arbiter, &source));

        assert_eq!(first, Redraw::Celebrate(Celebration::WorkDone));
        assert_eq!(second, Redraw::Fields(Vec::new()));
        assert_eq!(scheduler.previous().get(Field::Hour), "17");
        assert_eq!(scheduler.previous().get(Field::Minute), "30");
        assert_eq!(scheduler.previous().get(Field::Day), "14");
        assert_eq!(scheduler.previous().get(Field::Month), "06");
        // Three animation frames, then the time is back on a blank panel
        assert_eq!(timebase.slept().len(), 3);
        let display = arbiter.into_inner();
        assert_eq!(display.get_pixel(Point::new(5, 28)), Some(BLACK));
    }

    #[test]
    fn test_fire_rearms_from_observed_second() {
        let config = ClockConfig::default();
        let timebase = FakeTimebase::new();
        let arbiter: Arbiter = DisplayArbiter::new(surface());
        let source = ScriptedSource::new();
        source.push_time(Ok(sample(9, 3, 8, 5, 42, "Monday")));

        let mut scheduler = TimeSyncScheduler::new(timebase.now(), &config);
        assert_eq!(scheduler.next_fire_at(), Instant::from_millis(1_000));
        timebase.advance(Duration::from_millis(1_000));
        block_on(scheduler.fire(&config, &timebase, &arbiter, &source));

        assert_eq!(scheduler.next_fire_at(), Instant::from_millis(1_000 + 18_100));
        let display = arbiter.into_inner();
        let minute_lit = (52..64).any(|x| (0..8).any(|y| display.get_pixel(Point::new(x, y)) == Some(CYAN)));
        assert!(minute_lit);
    }

    #[test]
    fn test_malformed_body_keeps_stale_state_and_rearms() {
        let config = ClockConfig::default();
        let timebase = FakeTimebase::new();
        let arbiter: Arbiter = DisplayArbiter::new(surface());
        let source = ScriptedSource::new();
        let good = sample(9, 3, 8, 5, 30, "Monday");
        source.push_time(Ok(good.clone()));
        source.push_time(Err(FetchError::Json));

        let mut scheduler = TimeSyncScheduler::new(timebase.now(), &config);
        block_on(scheduler.fire(&config, &timebase, &arbiter, &source));
        let previous = scheduler.previous().clone();

        timebase.advance(Duration::from_millis(30_100));
        let redraw = block_on(scheduler.fire(&config, &timebase, &arbiter, &source));

        assert_eq!(redraw, Redraw::Stale);
        assert_eq!(scheduler.latest(), Some(&good));
        assert_eq!(scheduler.previous(), &previous);
        // Re-armed from the stale second (30): 30.1 s after this firing
        assert_eq!(scheduler.next_fire_at(), Instant::from_millis(30_100 + 30_100));
    }

    #[test]
    fn test_failure_before_any_sample_rearms_a_minute_out() {
        let config = ClockConfig::default();
        let timebase = FakeTimebase::new();
        let arbiter: Arbiter = DisplayArbiter::new(surface());
        let source = ScriptedSource::new();
        source.push_time(Err(FetchError::Transport));

        let mut scheduler = TimeSyncScheduler::new(timebase.now(), &config);
        let redraw = block_on(scheduler.fire(&config, &timebase, &arbiter, &source));

        assert_eq!(redraw, Redraw::Stale);
        assert!(scheduler.latest().is_none());
        assert_eq!(scheduler.next_fire_at(), Instant::from_millis(60_100));
        assert_eq!(scheduler.previous(), &PreviousFields::default());
    }
}
