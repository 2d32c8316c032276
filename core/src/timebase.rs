//! Monotonic time and sleeping, as seen by the workers

use embassy_time::{Duration, Instant};

/// Source of "now" plus the ability to wait
///
/// On target this is `embassy_time`. The workers never read the clock any
/// other way, which keeps them deterministic under test.
#[allow(async_fn_in_trait)]
pub trait Timebase {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);

    async fn sleep_until(&self, deadline: Instant) {
        let now = self.now();
        if deadline > now {
            self.sleep(deadline - now).await;
        }
    }
}
