//! The two long-running workers
//!
//! Each is a single cooperative loop that only suspends on a fetch, an
//! arbiter acquisition or a sleep. The firmware spawns one task per worker.

use embassy_sync::blocking_mutex::raw::RawMutex;
use log::info;

use crate::arbiter::DisplayArbiter;
use crate::carousel::MessageCarousel;
use crate::config::ClockConfig;
use crate::fetch::SampleSource;
use crate::night::{Hibernate, NightCycle, NightState};
use crate::render::{self, Surface};
use crate::time_sync::TimeSyncScheduler;
use crate::timebase::Timebase;

/// Keep the date/time current until it is night, then hibernate
///
/// Returns only after `hibernator` was asked to power down.
pub async fn clock_worker<M, D, S, T, H>(
    config: &ClockConfig,
    timebase: &T,
    arbiter: &DisplayArbiter<M, D>,
    source: &S,
    hibernator: &mut H,
) where
    M: RawMutex,
    D: Surface,
    S: SampleSource,
    T: Timebase,
    H: Hibernate,
{
    {
        let mut surface = arbiter.acquire().await;
        render::draw_separators(&mut *surface);
    }

    let mut scheduler = TimeSyncScheduler::new(timebase.now(), config);
    // Armed once the first sync has run
    let mut night: Option<NightCycle> = None;

    loop {
        if scheduler.is_due(timebase.now()) {
            scheduler.fire(config, timebase, arbiter, source).await;
            if night.is_none() {
                night = Some(NightCycle::new(timebase.now(), config, scheduler.latest()));
            }
        }

        if let Some(cycle) = night.as_mut()
            && cycle.is_due(timebase.now())
        {
            let state = cycle
                .check(config, timebase, arbiter, scheduler.latest(), hibernator)
                .await;
            if state == NightState::Sleeping {
                return;
            }
        }

        let wake_at = match &night {
            Some(cycle) => scheduler.next_fire_at().min(cycle.next_check_at()),
            None => scheduler.next_fire_at(),
        };
        timebase.sleep_until(wake_at).await;
    }
}

/// Scroll remote messages on the bottom row forever
pub async fn carousel_worker<M, D, S, T>(
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
    info!("Carousel started");
    MessageCarousel::new().run(config, timebase, arbiter, source).await
}
