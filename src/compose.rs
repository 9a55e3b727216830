//! Drawing frames and status screens onto a 1-bit target
//!
//! `BinaryColor::On` is ink. Panels with their own color type draw through
//! `DrawTargetExt::color_converted`.

use core::f32::consts::PI;

use embedded_graphics::image::Image;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};

use crate::layout::LayoutResult;
use crate::picture::Monochrome;

pub const TITLE: &str = "Poem/1";
pub const SUBTITLE: &str = "Stopped Clocks Mod";

/// Photograph with the laid out text on top
///
/// Text is drawn on a paper-colored background so it stays legible over a
/// dithered photograph.
pub fn draw_frame<D>(
    target: &mut D,
    picture: Option<&Monochrome>,
    layout: &LayoutResult,
    font: &MonoFont<'_>,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;

    if let Some(picture) = picture {
        Image::new(&picture.as_raw(), Point::zero()).draw(target)?;
    }

    let style = MonoTextStyleBuilder::new()
        .font(font)
        .text_color(BinaryColor::On)
        .background_color(BinaryColor::Off)
        .build();
    for (line, origin) in layout.placements() {
        Text::with_baseline(line, origin, style, Baseline::Alphabetic).draw(target)?;
    }

    Ok(())
}

/// Endpoints of the twelve hour ticks of a dial
pub fn hour_ticks(center: Point, radius: u32) -> [Line; 12] {
    let inner = radius as f32 * 11.0 / 12.0;
    let outer = radius as f32 * 35.0 / 36.0;
    core::array::from_fn(|hour| {
        let angle = (hour as f32 * 30.0).to_radians() - PI / 2.0;
        Line::new(polar(center, inner, angle), polar(center, outer, angle))
    })
}

/// Hour and minute hand of a clock stopped at 4:25
pub fn stopped_hands(center: Point, radius: u32) -> [Line; 2] {
    let hour_angle = ((4.0 + 25.0 / 60.0) * 30.0_f32).to_radians() - PI / 2.0;
    let minute_angle = (25.0 * 6.0_f32).to_radians() - PI / 2.0;
    [
        Line::new(center, polar(center, radius as f32 * 0.5, hour_angle)),
        Line::new(center, polar(center, radius as f32 * 0.7, minute_angle)),
    ]
}

fn polar(center: Point, length: f32, angle: f32) -> Point {
    center + Point::new((angle.cos() * length).round() as i32, (angle.sin() * length).round() as i32)
}

/// Branded screen shown while the device starts up or when it gives up
pub fn draw_status<D>(
    target: &mut D,
    message: &str,
    title_font: &MonoFont<'_>,
    body_font: &MonoFont<'_>,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let area = target.bounding_box();
    let size = area.size;
    target.clear(BinaryColor::Off)?;

    let center = area.center();
    let radius = size.height * 2 / 5;
    let stroke = PrimitiveStyle::with_stroke(BinaryColor::On, 1);
    Circle::with_center(center, radius * 2)
        .into_styled(stroke)
        .draw(target)?;
    Circle::with_center(center, radius * 2 - 4)
        .into_styled(stroke)
        .draw(target)?;
    for tick in hour_ticks(center, radius) {
        tick.into_styled(stroke).draw(target)?;
    }
    for hand in stopped_hands(center, radius) {
        hand.into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 2))
            .draw(target)?;
    }
    Circle::with_center(center, 5)
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(target)?;

    let centered = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    let rows = [
        (TITLE, title_font, size.height / 3),
        (SUBTITLE, body_font, size.height * 4 / 9),
        (message, body_font, size.height * 7 / 10),
    ];
    for (text, font, y) in rows {
        let style = MonoTextStyleBuilder::new()
            .font(font)
            .text_color(BinaryColor::On)
            .background_color(BinaryColor::Off)
            .build();
        let origin = Point::new(center.x, area.top_left.y + y as i32);
        Text::with_text_style(text, origin, style, centered).draw(target)?;
    }

    Ok(())
}
