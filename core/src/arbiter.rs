//! Exclusive access to the shared LED surface
//!
//! Every "clear region, position, write" sequence runs under one lock that
//! covers the whole panel. Waiting is unbounded and unfair: the carousel
//! takes the lock once per animation frame, the clock once per changed field,
//! and either may go first.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embedded_graphics::primitives::Rectangle;

use crate::render::{self, Surface};

/// Scoped acquisition of the surface; dropping it releases the panel
pub type SurfaceGuard<'a, M, D> = MutexGuard<'a, M, D>;

pub struct DisplayArbiter<M: RawMutex, D> {
    surface: Mutex<M, D>,
}

impl<M: RawMutex, D> DisplayArbiter<M, D> {
    pub const fn new(surface: D) -> Self {
        Self {
            surface: Mutex::new(surface),
        }
    }

    /// Hold the whole surface until the guard is dropped
    pub async fn acquire(&self) -> SurfaceGuard<'_, M, D> {
        self.surface.lock().await
    }

    pub fn into_inner(self) -> D {
        self.surface.into_inner()
    }
}

impl<M: RawMutex, D: Surface> DisplayArbiter<M, D> {
    /// Clear `region`, run `draw` on the surface, release
    ///
    /// The lock is released on every exit path of `draw`, including early
    /// returns, because it lives in the guard.
    pub async fn with_exclusive_access<R>(&self, region: Rectangle, draw: impl FnOnce(&mut D) -> R) -> R {
        let mut surface = self.acquire().await;
        render::clear(&mut *surface, region);
        draw(&mut surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{BLACK, YELLOW};
    use crate::testing::surface;
    use embassy_futures::block_on;
    use embassy_futures::join::join;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embedded_graphics::mock_display::MockDisplay;
    use embedded_graphics::pixelcolor::Rgb565;
    use embedded_graphics::prelude::*;

    #[test]
    fn test_region_is_cleared_before_drawing() {
        let mut display = surface();
        // Leftover pixel inside the region, and one outside it
        Pixel(Point::new(2, 2), YELLOW).draw(&mut display).unwrap();
        Pixel(Point::new(20, 2), YELLOW).draw(&mut display).unwrap();

        let arbiter: DisplayArbiter<NoopRawMutex, _> = DisplayArbiter::new(display);
        let region = Rectangle::new(Point::zero(), Size::new(12, 8));
        let seen = block_on(arbiter.with_exclusive_access(region, |d| d.get_pixel(Point::new(2, 2))));

        assert_eq!(seen, Some(BLACK));
        let display = arbiter.into_inner();
        assert_eq!(display.get_pixel(Point::new(20, 2)), Some(YELLOW));
    }

    #[test]
    fn test_sequences_do_not_interleave() {
        let arbiter: DisplayArbiter<NoopRawMutex, MockDisplay<Rgb565>> = DisplayArbiter::new(surface());
        let log = core::cell::RefCell::new(heapless::Vec::<u8, 8>::new());

        let first = async {
            let _guard = arbiter.acquire().await;
            log.borrow_mut().push(1).unwrap();
            // Yield while holding the lock; the other sequence must not run
            embassy_futures::yield_now().await;
            log.borrow_mut().push(2).unwrap();
        };
        let second = arbiter.with_exclusive_access(Rectangle::zero(), |_| {
            log.borrow_mut().push(3).unwrap();
        });
        block_on(join(first, second));

        assert_eq!(log.borrow().as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_lock_released_after_early_return() {
        let arbiter: DisplayArbiter<NoopRawMutex, MockDisplay<Rgb565>> = DisplayArbiter::new(surface());
        let region = Rectangle::new(Point::zero(), Size::new(4, 4));
        let result: Result<(), ()> = block_on(arbiter.with_exclusive_access(region, |_| Err(())));
        assert!(result.is_err());
        // A second acquisition would hang if the first had leaked
        block_on(arbiter.with_exclusive_access(region, |_| ()));
    }
}
