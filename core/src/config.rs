//! Compiled-in configuration
//!
//! The appliance has no runtime configuration surface. Everything tunable
//! lives in [`ClockConfig`], whose `Default` is the shipped behaviour.

use embassy_time::Duration;

/// One second in milliseconds
pub const MILLIS_PER_SECOND: u32 = 1_000;
/// One minute in milliseconds
pub const MILLIS_PER_MINUTE: u32 = 60 * MILLIS_PER_SECOND;
/// One hour in milliseconds
pub const MILLIS_PER_HOUR: u32 = 60 * MILLIS_PER_MINUTE;
/// One day in milliseconds
pub const MILLIS_PER_DAY: u32 = 24 * MILLIS_PER_HOUR;

/// Default time endpoint
pub const DEFAULT_TIME_URL: &str =
    "https://www.timeapi.io/api/Time/current/zone?timeZone=Europe/Dublin";
/// Default text endpoint
pub const DEFAULT_TEXT_URL: &str = "https://www.affirmations.dev/";

/// Millisecond time of day from wall-clock fields
pub const fn time_of_day_ms(hour: u8, minute: u8, second: u8) -> u32 {
    hour as u32 * MILLIS_PER_HOUR + minute as u32 * MILLIS_PER_MINUTE + second as u32 * MILLIS_PER_SECOND
}

/// Direction of a "has the clock passed this threshold" comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// `now >= threshold`
    Inclusive,
    /// `now > threshold`
    Exclusive,
}

impl Boundary {
    /// Whether `now` counts as past `threshold`
    pub fn is_past(self, now: u32, threshold: u32) -> bool {
        match self {
            Boundary::Inclusive => now >= threshold,
            Boundary::Exclusive => now > threshold,
        }
    }
}

/// Daily wake/sleep thresholds, in milliseconds since midnight
///
/// `wake_ms < sleep_ms` within one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightWindow {
    pub wake_ms: u32,
    pub sleep_ms: u32,
    /// Comparison used to decide the device is past `sleep_ms`
    pub sleep_boundary: Boundary,
    /// Comparison used to decide the wake time already passed today, in
    /// which case the wake target is tomorrow's
    pub wake_rollover: Boundary,
    /// Also treat the early morning (before `wake_ms`) as night
    pub sleep_before_wake: bool,
}

impl NightWindow {
    /// Build a window from `(hour, minute)` thresholds.
    ///
    /// Returns `None` unless wake precedes sleep within the day.
    pub const fn new(wake: (u8, u8), sleep: (u8, u8)) -> Option<Self> {
        let wake_ms = time_of_day_ms(wake.0, wake.1, 0);
        let sleep_ms = time_of_day_ms(sleep.0, sleep.1, 0);
        if wake_ms >= sleep_ms || sleep_ms >= MILLIS_PER_DAY {
            return None;
        }
        Some(Self {
            wake_ms,
            sleep_ms,
            sleep_boundary: Boundary::Inclusive,
            wake_rollover: Boundary::Exclusive,
            sleep_before_wake: true,
        })
    }
}

impl Default for NightWindow {
    fn default() -> Self {
        // 08:00 - 23:00
        Self {
            wake_ms: 8 * MILLIS_PER_HOUR,
            sleep_ms: 23 * MILLIS_PER_HOUR,
            sleep_boundary: Boundary::Inclusive,
            wake_rollover: Boundary::Exclusive,
            sleep_before_wake: true,
        }
    }
}

/// Everything the two workers need to know about timing and endpoints
#[derive(Debug, Clone, Copy)]
pub struct ClockConfig {
    pub time_url: &'static str,
    pub text_url: &'static str,
    pub night: NightWindow,
    /// Added to every computed delay so fetches land after the boundary
    pub api_padding: Duration,
    /// Delay before the first time sync after boot
    pub first_sync_delay: Duration,
    /// Night check period while the device is awake
    pub night_check_period: Duration,
    /// How long the good-night message stays up before hibernating
    pub night_announce_hold: Duration,
    /// Delay between carousel frames (one pixel column per frame)
    pub carousel_frame_delay: Duration,
    /// Wait before retrying the carousel when no text was ever fetched
    pub carousel_retry_delay: Duration,
    pub celebration_frames: u16,
    pub celebration_frame_delay: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            time_url: DEFAULT_TIME_URL,
            text_url: DEFAULT_TEXT_URL,
            night: NightWindow::default(),
            api_padding: Duration::from_millis(100),
            first_sync_delay: Duration::from_secs(1),
            night_check_period: Duration::from_secs(10 * 60),
            night_announce_hold: Duration::from_secs(5),
            carousel_frame_delay: Duration::from_millis(15),
            carousel_retry_delay: Duration::from_secs(5),
            celebration_frames: 300,
            celebration_frame_delay: Duration::from_millis(15),
        }
    }
}
