//! Matrix Clock core logic
//!
//! Everything that decides *when* and *what* the LED matrix shows, independent
//! of the ESP32: the display arbiter, the drift-corrected time sync, the text
//! carousel, the night cycle and the two worker loops that drive them.
//!
//! Hardware enters through four seams: [`Timebase`], [`fetch::Transport`],
//! [`night::Hibernate`] and any `embedded_graphics` draw target.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod arbiter;
pub mod carousel;
pub mod config;
pub mod fetch;
pub mod night;
pub mod render;
pub mod sample;
pub mod time_sync;
pub mod timebase;
pub mod workers;

#[cfg(test)]
mod testing;

pub use arbiter::DisplayArbiter;
pub use config::ClockConfig;
pub use fetch::{FetchBroker, FetchError, SampleSource};
pub use sample::{MessageText, TimeSample};
pub use timebase::Timebase;
