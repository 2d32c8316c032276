//! Framebuffer shared between the drawing tasks and the panel scan-out
//!
//! The panel is 64x32 pixels stored as Rgb565, one atomic per pixel, so the
//! app core can scan it out while the executor core draws without a lock.
//! Tearing within one refresh is invisible at the panel's scan rate.

use core::convert::Infallible;
use core::sync::atomic::{AtomicU16, Ordering};

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use matrix_clock_core::render::{PANEL_HEIGHT, PANEL_WIDTH};

pub const WIDTH: usize = PANEL_WIDTH as usize;
pub const HEIGHT: usize = PANEL_HEIGHT as usize;
pub const PIXEL_COUNT: usize = WIDTH * HEIGHT;

/// Rgb565 pixels, row-major
pub struct Framebuffer {
    pixels: [AtomicU16; PIXEL_COUNT],
}

impl Framebuffer {
    /// Create a framebuffer initialized to black
    pub const fn new() -> Self {
        Self {
            pixels: [const { AtomicU16::new(0) }; PIXEL_COUNT],
        }
    }

    /// Raw Rgb565 value at (x, y), black when out of range
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u16 {
        if x >= WIDTH || y >= HEIGHT {
            return 0;
        }
        self.pixels[y * WIDTH + x].load(Ordering::Relaxed)
    }

    /// Write a single pixel at (x, y)
    #[inline]
    pub fn set_pixel(&self, x: i32, y: i32, color: Rgb565) {
        if x < 0 || y < 0 || x as usize >= WIDTH || y as usize >= HEIGHT {
            return;
        }
        let raw = RawU16::from(color).into_inner();
        self.pixels[y as usize * WIDTH + x as usize].store(raw, Ordering::Relaxed);
    }

    /// Fill a rectangular region with a color
    pub fn fill_rect(&self, area: &Rectangle, color: Rgb565) {
        let visible = area.intersection(&Rectangle::new(Point::zero(), Size::new(PANEL_WIDTH, PANEL_HEIGHT)));
        for point in visible.points() {
            self.set_pixel(point.x, point.y, color);
        }
    }

    /// Borrow as an `embedded_graphics` draw target
    pub const fn writer(&self) -> FramebufferWriter<'_> {
        FramebufferWriter { framebuffer: self }
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Drawing handle onto a [`Framebuffer`]
///
/// Exclusive use is the caller's business; the clock keeps the only writer
/// inside its display arbiter.
pub struct FramebufferWriter<'a> {
    framebuffer: &'a Framebuffer,
}

impl OriginDimensions for FramebufferWriter<'_> {
    fn size(&self) -> Size {
        Size::new(PANEL_WIDTH, PANEL_HEIGHT)
    }
}

impl DrawTarget for FramebufferWriter<'_> {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.framebuffer.set_pixel(point.x, point.y, color);
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.framebuffer.fill_rect(area, color);
        Ok(())
    }
}
