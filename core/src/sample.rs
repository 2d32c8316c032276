//! Sample types matching the remote endpoints
//!
//! Time endpoint (only the consumed fields are listed):
//! ```json
//! {"month": 6, "day": 14, "hour": 17, "minute": 30, "seconds": 12, "dayOfWeek": "Friday"}
//! ```
//!
//! Text endpoint:
//! ```json
//! {"affirmation": "You are doing great"}
//! ```

use core::fmt::{self, Write as FmtWrite};

use heapless::String;
use log::debug;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::config::time_of_day_ms;
use crate::fetch::FetchError;

/// Maximum day-of-week name length ("Wednesday")
pub const MAX_WEEKDAY_LEN: usize = 12;

/// Maximum message length we scroll
pub const MAX_MESSAGE_LEN: usize = 160;

/// Scratch space for unescaping one JSON string, before truncation
const UNESCAPE_BUF_SIZE: usize = 512;

/// Short text shown by the carousel
pub type MessageText = String<MAX_MESSAGE_LEN>;

/// Two-character, zero-padded field as shown on the panel
pub type FieldText = String<2>;

/// One wall-clock observation from the time endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeSample {
    pub day: u8,
    pub month: u8,
    pub hour: u8,
    pub minute: u8,
    #[serde(rename = "seconds")]
    pub second: u8,
    #[serde(rename = "dayOfWeek")]
    pub day_of_week: String<MAX_WEEKDAY_LEN>,
}

impl TimeSample {
    /// Milliseconds since local midnight
    pub fn time_of_day_ms(&self) -> u32 {
        time_of_day_ms(self.hour, self.minute, self.second)
    }

    /// Saturday and Sunday both start with 'S'
    pub fn is_weekend(&self) -> bool {
        self.day_of_week.starts_with('S')
    }

    fn validate(self) -> Result<Self, FetchError> {
        let in_range = (1..=31).contains(&self.day)
            && (1..=12).contains(&self.month)
            && self.hour < 24
            && self.minute < 60
            && self.second < 60;
        if in_range { Ok(self) } else { Err(FetchError::OutOfRange) }
    }
}

#[derive(Deserialize)]
struct Affirmation {
    #[serde(deserialize_with = "truncated_message")]
    affirmation: MessageText,
}

/// Keeps as many whole characters as fit in a [`MessageText`]
struct TruncatingVisitor;

impl Visitor<'_> for TruncatingVisitor {
    type Value = MessageText;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<MessageText, E> {
        let mut text = MessageText::new();
        for c in value.chars() {
            if text.push(c).is_err() {
                debug!("Message truncated to {} of {} bytes", text.len(), value.len());
                break;
            }
        }
        Ok(text)
    }
}

fn truncated_message<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MessageText, D::Error> {
    deserializer.deserialize_str(TruncatingVisitor)
}

fn json_error(e: serde_json_core::de::Error) -> FetchError {
    match e {
        serde_json_core::de::Error::EscapedStringIsTooLong => FetchError::BufferTooSmall,
        _ => FetchError::Json,
    }
}

/// Parse a time endpoint body
pub fn parse_time_sample(json: &str) -> Result<TimeSample, FetchError> {
    let mut unescaped = [0u8; UNESCAPE_BUF_SIZE];
    serde_json_core::from_str_escaped::<TimeSample>(json, &mut unescaped)
        .map(|(sample, _)| sample)
        .map_err(json_error)?
        .validate()
}

/// Parse a text endpoint body
///
/// Escapes are decoded. Text longer than [`MAX_MESSAGE_LEN`] bytes is cut at
/// the last whole character that fits.
pub fn parse_message(json: &str) -> Result<MessageText, FetchError> {
    let mut unescaped = [0u8; UNESCAPE_BUF_SIZE];
    serde_json_core::from_str_escaped::<Affirmation>(json, &mut unescaped)
        .map(|(body, _)| body.affirmation)
        .map_err(json_error)
}

/// Render a numeric field as shown on the panel ("7" -> "07")
pub fn two_digits(value: u8) -> FieldText {
    let mut text = FieldText::new();
    // Values are validated below 100, so two characters always fit
    let _ = write!(text, "{:02}", value % 100);
    text
}
