//! HUB75 scan-out for a 64x32, 1/16 scan RGB panel
//!
//! The panel has no memory: rows must be shifted in and lit continuously.
//! Each refresh walks four bit planes (4 bits per channel, binary code
//! modulation), and within a plane the 16 row pairs. Row `n` and row `n + 16`
//! are shifted in together on the upper and lower data lines.
//!
//! Scan-out runs forever on the app core; see `main`.

use esp_hal::delay::Delay;
use esp_hal::gpio::{Level, Output};

use crate::framebuffer::{Framebuffer, HEIGHT, WIDTH};

/// Bits per color channel
pub const COLOR_DEPTH: u8 = 4;

/// Rows lit at once share an address
const SCAN_ROWS: usize = HEIGHT / 2;

/// On-time of the least significant bit plane
const BASE_ON_TIME_US: u32 = 3;

/// 4-bit channels from a raw Rgb565 value
#[inline]
pub fn channels(raw: u16) -> (u8, u8, u8) {
    let r = ((raw >> 11) & 0x1f) as u8;
    let g = ((raw >> 5) & 0x3f) as u8;
    let b = (raw & 0x1f) as u8;
    (r >> 1, g >> 2, b >> 1)
}

/// Every line of the HUB75 connector
pub struct Hub75Pins<'d> {
    pub r1: Output<'d>,
    pub g1: Output<'d>,
    pub b1: Output<'d>,
    pub r2: Output<'d>,
    pub g2: Output<'d>,
    pub b2: Output<'d>,
    pub a: Output<'d>,
    pub b: Output<'d>,
    pub c: Output<'d>,
    pub d: Output<'d>,
    pub clk: Output<'d>,
    pub lat: Output<'d>,
    /// Output enable, active low
    pub oe: Output<'d>,
}

pub struct Hub75<'d> {
    pins: Hub75Pins<'d>,
    delay: Delay,
}

impl<'d> Hub75<'d> {
    pub fn new(mut pins: Hub75Pins<'d>) -> Self {
        pins.oe.set_high();
        pins.lat.set_low();
        pins.clk.set_low();
        Self {
            pins,
            delay: Delay::new(),
        }
    }

    fn select_row(&mut self, row: usize) {
        self.pins.a.set_level(Level::from(row & 0b0001 != 0));
        self.pins.b.set_level(Level::from(row & 0b0010 != 0));
        self.pins.c.set_level(Level::from(row & 0b0100 != 0));
        self.pins.d.set_level(Level::from(row & 0b1000 != 0));
    }

    fn shift_row_pair(&mut self, framebuffer: &Framebuffer, row: usize, plane: u8) {
        let bit = |value: u8| Level::from((value >> plane) & 1 != 0);
        for x in 0..WIDTH {
            let (r1, g1, b1) = channels(framebuffer.get(x, row));
            let (r2, g2, b2) = channels(framebuffer.get(x, row + SCAN_ROWS));
            self.pins.r1.set_level(bit(r1));
            self.pins.g1.set_level(bit(g1));
            self.pins.b1.set_level(bit(b1));
            self.pins.r2.set_level(bit(r2));
            self.pins.g2.set_level(bit(g2));
            self.pins.b2.set_level(bit(b2));
            self.pins.clk.set_high();
            self.pins.clk.set_low();
        }
    }

    /// Show the framebuffer once, all bit planes
    pub fn refresh(&mut self, framebuffer: &Framebuffer) {
        for plane in 0..COLOR_DEPTH {
            for row in 0..SCAN_ROWS {
                self.shift_row_pair(framebuffer, row, plane);

                self.pins.oe.set_high();
                self.select_row(row);
                self.pins.lat.set_high();
                self.pins.lat.set_low();

                self.pins.oe.set_low();
                self.delay.delay_micros(BASE_ON_TIME_US << plane);
                self.pins.oe.set_high();
            }
        }
    }

    /// Scan out forever
    pub fn run(mut self, framebuffer: &Framebuffer) -> ! {
        loop {
            self.refresh(framebuffer);
        }
    }
}
