//! Panel layout and drawing helpers
//!
//! The panel is 64x32, addressed as four 8 px text rows with 6 px glyph cells:
//!
//! ```text
//! row 0   DD|MM    HH:MM
//! row 1
//! row 2
//! row 3   <- scrolling message <-
//! ```
//!
//! Nothing here locks; callers draw through the [`DisplayArbiter`](crate::DisplayArbiter).

use core::convert::Infallible;

use embedded_graphics::mono_font::ascii::{FONT_5X8, FONT_7X13_BOLD, FONT_9X15_BOLD};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};

use crate::sample::{TimeSample, two_digits};

/// Panel width in pixels
pub const PANEL_WIDTH: u32 = 64;
/// Panel height in pixels
pub const PANEL_HEIGHT: u32 = 32;
/// Horizontal advance of one glyph
pub const TEXT_WIDTH: u32 = 6;
/// Height of one text row
pub const TEXT_HEIGHT: u32 = 8;
/// Glyph cells cleared by the carousel (one more than fits on screen)
pub const MAX_CHAR_WIDTH: u32 = 11;
/// Steps in one full hue cycle
pub const HUE_STEPS: u16 = 64;

/// 5x8 glyphs on a 6 px pitch
pub const TEXT_FONT: MonoFont<'static> = MonoFont {
    character_spacing: 1,
    ..FONT_5X8
};

/// Anything the clock can draw on
pub trait Surface: DrawTarget<Color = Rgb565, Error = Infallible> {}

impl<T: DrawTarget<Color = Rgb565, Error = Infallible>> Surface for T {}

/// Colour from 4-bit channels, the panel's native depth
pub const fn color444(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new((r << 1) | (r >> 3), (g << 2) | (g >> 2), (b << 1) | (b >> 3))
}

pub const BLACK: Rgb565 = color444(0, 0, 0);
pub const RED: Rgb565 = color444(15, 0, 0);
pub const YELLOW: Rgb565 = color444(15, 15, 0);
pub const CYAN: Rgb565 = color444(0, 15, 15);
pub const PURPLE: Rgb565 = color444(15, 0, 15);

fn done(result: Result<(), Infallible>) {
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// Text row origin in pixels
pub const fn row_y(row: u32) -> i32 {
    (row * TEXT_HEIGHT) as i32
}

/// Date/time sub-fields on row 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Day,
    Month,
    Hour,
    Minute,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Day, Field::Month, Field::Hour, Field::Minute];

    pub const fn column(self) -> i32 {
        match self {
            Field::Day => 0,
            Field::Month => (TEXT_WIDTH * 3 - 4) as i32,
            Field::Hour => (PANEL_WIDTH - TEXT_WIDTH * 5 + 4) as i32,
            Field::Minute => (PANEL_WIDTH - TEXT_WIDTH * 2) as i32,
        }
    }

    pub const fn color(self) -> Rgb565 {
        match self {
            Field::Day | Field::Month => YELLOW,
            Field::Hour | Field::Minute => CYAN,
        }
    }

    /// Two glyph cells at the field's column
    pub fn region(self) -> Rectangle {
        Rectangle::new(Point::new(self.column(), row_y(0)), Size::new(TEXT_WIDTH * 2, TEXT_HEIGHT))
    }

    pub fn value(self, sample: &TimeSample) -> u8 {
        match self {
            Field::Day => sample.day,
            Field::Month => sample.month,
            Field::Hour => sample.hour,
            Field::Minute => sample.minute,
        }
    }
}

/// Fill `region` with black
pub fn clear<D: Surface>(surface: &mut D, region: Rectangle) {
    done(surface.fill_solid(&region, BLACK));
}

/// Fill the whole panel with black
pub fn clear_all<D: Surface>(surface: &mut D) {
    done(surface.clear(BLACK));
}

/// Draw `text` with its top-left corner at `origin`
pub fn draw_text<D: Surface>(surface: &mut D, text: &str, origin: Point, color: Rgb565) {
    let style = MonoTextStyle::new(&TEXT_FONT, color);
    done(Text::with_baseline(text, origin, style, Baseline::Top).draw(surface).map(|_| ()));
}

/// Draw the static `|` and `:` between the date and time fields
pub fn draw_separators<D: Surface>(surface: &mut D) {
    let x = (TEXT_WIDTH * 2) as i32;
    done(
        Line::new(Point::new(x, 0), Point::new(x, TEXT_HEIGHT as i32 - 1))
            .into_styled(PrimitiveStyle::with_stroke(YELLOW, 1))
            .draw(surface),
    );
    let colon = Point::new((PANEL_WIDTH - TEXT_WIDTH * 3 + 2) as i32, row_y(0));
    draw_text(surface, ":", colon, CYAN);
}

/// Draw one two-digit field; the caller has cleared its region
pub fn draw_field<D: Surface>(surface: &mut D, field: Field, text: &str) {
    draw_text(surface, text, Point::new(field.column(), row_y(0)), field.color());
}

/// Blank the panel and draw the full date/time
pub fn draw_full_time<D: Surface>(surface: &mut D, sample: &TimeSample) {
    clear_all(surface);
    draw_separators(surface);
    for field in Field::ALL {
        draw_field(surface, field, &two_digits(field.value(sample)));
    }
}

/// Column where a scroll starts, just past the right edge
pub const CAROUSEL_START_X: i32 = (TEXT_WIDTH * MAX_CHAR_WIDTH) as i32;

/// Rectangle cleared before each carousel frame
pub fn carousel_region() -> Rectangle {
    Rectangle::new(Point::new(0, row_y(3)), Size::new(TEXT_WIDTH * MAX_CHAR_WIDTH, TEXT_HEIGHT))
}

/// Draw one scroll frame of `text` with its left edge at column `x`
pub fn draw_carousel_frame<D: Surface>(surface: &mut D, text: &str, x: i32) {
    draw_text(surface, text, Point::new(x, row_y(3)), PURPLE);
}

/// Fully saturated colour for position `step` of the hue cycle
pub fn hue_color(step: u16) -> Rgb565 {
    let hue = u32::from(step % HUE_STEPS) * 360 / u32::from(HUE_STEPS);
    let rising = ((hue % 60) * 15 / 60) as u8;
    let falling = 15 - rising;
    let (r, g, b) = match hue / 60 {
        0 => (15, rising, 0),
        1 => (falling, 15, 0),
        2 => (0, 15, rising),
        3 => (0, falling, 15),
        4 => (rising, 0, 15),
        _ => (15, 0, falling),
    };
    color444(r, g, b)
}

/// Draw two centred lines filling the panel, used by celebrations
pub fn draw_banner<D: Surface>(surface: &mut D, lines: [&str; 2], color: Rgb565) {
    let style = MonoTextStyle::new(&FONT_7X13_BOLD, color);
    let layout = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Top)
        .build();
    let centre = (PANEL_WIDTH / 2) as i32;
    for (line, y) in lines.iter().zip([2, 17]) {
        done(
            Text::with_text_style(line, Point::new(centre, y), style, layout)
                .draw(surface)
                .map(|_| ()),
        );
    }
}

/// Blank the panel and show the good-night message with a drop shadow
pub fn draw_good_night<D: Surface>(surface: &mut D) {
    clear_all(surface);
    let lines = [("Night", row_y(0)), (" :)", row_y(2))];
    for (color, dx, dy) in [(RED, 2, 1), (PURPLE, 3, 0)] {
        let style = MonoTextStyle::new(&FONT_9X15_BOLD, color);
        for (text, y) in lines {
            done(
                Text::with_baseline(text, Point::new(dx, y + dy), style, Baseline::Top)
                    .draw(surface)
                    .map(|_| ()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample, surface};

    #[test]
    fn test_field_columns_match_layout() {
        assert_eq!(Field::Day.column(), 0);
        assert_eq!(Field::Month.column(), 14);
        assert_eq!(Field::Hour.column(), 38);
        assert_eq!(Field::Minute.column(), 52);
        // Fields never overlap each other
        for pair in Field::ALL.windows(2) {
            let left = pair[0].region();
            assert!(left.top_left.x + left.size.width as i32 <= pair[1].column());
        }
    }

    #[test]
    fn test_text_font_pitch() {
        assert_eq!(TEXT_FONT.character_size.width + TEXT_FONT.character_spacing, TEXT_WIDTH);
        assert_eq!(TEXT_FONT.character_size.height, TEXT_HEIGHT);
    }

    #[test]
    fn test_full_time_draws_inside_row_zero() {
        let mut display = surface();
        draw_full_time(&mut display, &sample(9, 3, 8, 5, 0, "Monday"));
        for y in TEXT_HEIGHT as i32..PANEL_HEIGHT as i32 {
            for x in 0..PANEL_WIDTH as i32 {
                assert_eq!(display.get_pixel(Point::new(x, y)), Some(BLACK), "lit at {x},{y}");
            }
        }
        // Separator line is lit
        assert_eq!(display.get_pixel(Point::new(12, 3)), Some(YELLOW));
        let minute_lit = (52..64).any(|x| (0..8).any(|y| display.get_pixel(Point::new(x, y)) == Some(CYAN)));
        assert!(minute_lit);
    }

    #[test]
    fn test_hue_cycle_wraps() {
        assert_eq!(hue_color(0), RED);
        assert_eq!(hue_color(HUE_STEPS), hue_color(0));
        assert_ne!(hue_color(HUE_STEPS / 3), hue_color(0));
    }

    #[test]
    fn test_color444_extremes() {
        assert_eq!(color444(15, 15, 15), Rgb565::WHITE);
        assert_eq!(BLACK, Rgb565::BLACK);
    }
}
