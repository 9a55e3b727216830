//! Adaptive text layout
//!
//! Finds the largest font size at which a poem or note, greedily word-wrapped,
//! fits inside a shrunk copy of a photograph's text zone, then centers the
//! resulting block inside the zone.
//!
//! The search is a bounded descending scan over the sizes the measurement
//! strategy offers. Fit is not monotonic in size once wrapping rounds to whole
//! lines, so a binary search could skip the best size.

use embedded_graphics::prelude::{Point, Size};
use embedded_graphics::primitives::Rectangle;
use log::{debug, warn};

pub mod metrics;

pub use metrics::{FixedCellMetrics, MonoFontBook, SizeRange, TextMeasure};

/// Marker the poem service uses for an intentional verse break
pub const VERSE_BREAK: &str = " / ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Share of the zone, per axis, that text may occupy
    pub fill_percent: u32,
    pub max_lines: usize,
    /// Sizes that cannot hold this many average glyphs per line are skipped
    pub min_line_chars: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            fill_percent: 60,
            max_lines: 6,
            min_line_chars: 8,
        }
    }
}

impl LayoutConfig {
    /// Shrunk sub-rectangle size used for fit testing
    pub fn usable(&self, zone: Size) -> Size {
        let percent = self.fill_percent.min(100);
        Size::new(zone.width * percent / 100, zone.height * percent / 100)
    }

    fn line_limit(&self) -> usize {
        self.max_lines.max(1)
    }
}

/// Everything a renderer needs to draw one block of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutResult {
    pub font_size: u32,
    pub lines: Vec<String>,
    /// Measured width of each entry in `lines`
    pub line_widths: Vec<u32>,
    pub line_height: u32,
    /// Pixel height of one line of glyphs, ascent plus descent
    pub glyph_height: u32,
    /// Baseline of the first line
    pub start_y: i32,
    /// Horizontal midpoint every line is centered on
    pub center_x: i32,
    /// Set when no candidate size fit and the smallest size was used anyway
    pub overflowed: bool,
}

impl LayoutResult {
    /// Left end of each line's baseline
    pub fn placements(&self) -> impl Iterator<Item = (&str, Point)> + '_ {
        self.lines
            .iter()
            .zip(&self.line_widths)
            .enumerate()
            .map(move |(index, (line, width))| {
                let x = self.center_x - (*width as i32) / 2;
                let y = self.start_y + index as i32 * self.line_height as i32;
                (line.as_str(), Point::new(x, y))
            })
    }
}

/// Flatten verse breaks so the wrapper may re-flow the poem to the zone width
pub fn flatten_verse_breaks(poem: &str) -> String {
    poem.replace(VERSE_BREAK, " ")
}

/// Collapse every whitespace run to a single space and trim both ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lay `text` out inside `zone` with the largest size that fits
///
/// Never fails: when nothing fits the smallest size is used, keeping at most
/// `max_lines` lines and marking the result as overflowed.
pub fn fit<M>(text: &str, zone: Rectangle, measure: &M, config: &LayoutConfig) -> LayoutResult
where
    M: TextMeasure + ?Sized,
{
    let text = normalize_whitespace(text);
    let usable = config.usable(zone.size);
    let sizes = measure.sizes();

    for size in sizes.candidates() {
        let narrowest = measure.measure_width("n", size) * config.min_line_chars as u32;
        if usable.width < narrowest {
            debug!("Size {} too narrow for {}px", size, usable.width);
            continue;
        }

        let wrapped = wrap(&text, usable.width, size, measure, config.line_limit());
        if !wrapped.complete {
            continue;
        }

        if block_extent(wrapped.lines.len(), size, measure) <= usable.height {
            return place(wrapped.lines, size, zone, measure, false);
        }
    }

    let size = sizes.min.min(sizes.max);
    let wrapped = wrap(&text, usable.width, size, measure, config.line_limit());
    warn!(
        "Text does not fit {}x{} zone, using size {} ({} lines{})",
        zone.size.width,
        zone.size.height,
        size,
        wrapped.lines.len(),
        if wrapped.complete { "" } else { ", truncated" }
    );
    place(wrapped.lines, size, zone, measure, true)
}

/// Vertical extent of `line_count` lines including ascent and descent
pub fn block_extent<M>(line_count: usize, size: u32, measure: &M) -> u32
where
    M: TextMeasure + ?Sized,
{
    let gaps = line_count.saturating_sub(1) as u32;
    gaps * measure.line_height(size) + measure.ascent(size) + measure.descent(size)
}

/// Output of [`wrap`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapped {
    pub lines: Vec<String>,
    /// False when text was left over after `max_lines` lines
    pub complete: bool,
}

/// Greedy word wrap of whitespace-normalized text
///
/// Each line is the longest prefix that measures within `max_width`, cut at the
/// last space inside it. A prefix without spaces is cut mid-word. Always yields
/// at least one line and never more than `max_lines`.
pub fn wrap<M>(text: &str, max_width: u32, size: u32, measure: &M, max_lines: usize) -> Wrapped
where
    M: TextMeasure + ?Sized,
{
    let mut lines = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        if lines.len() == max_lines {
            return Wrapped {
                lines,
                complete: false,
            };
        }
        let (line, remainder) = take_line(rest, max_width, size, measure);
        lines.push(line.to_string());
        rest = remainder;
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    Wrapped {
        lines,
        complete: true,
    }
}

fn take_line<'t, M>(rest: &'t str, max_width: u32, size: u32, measure: &M) -> (&'t str, &'t str)
where
    M: TextMeasure + ?Sized,
{
    if measure.measure_width(rest, size) <= max_width {
        return (rest, "");
    }

    let mut fit_end = 0;
    for (index, ch) in rest.char_indices() {
        let end = index + ch.len_utf8();
        if measure.measure_width(&rest[..end], size) > max_width {
            break;
        }
        fit_end = end;
    }

    // Not even one glyph fits, take it anyway so wrapping always advances
    if fit_end == 0 {
        fit_end = rest.chars().next().map_or(rest.len(), char::len_utf8);
    }

    if rest[fit_end..].starts_with(' ') {
        return (&rest[..fit_end], &rest[fit_end + 1..]);
    }

    match rest[..fit_end].rfind(' ') {
        Some(space) if space > 0 => (&rest[..space], &rest[space + 1..]),
        _ => (&rest[..fit_end], &rest[fit_end..]),
    }
}

fn place<M>(lines: Vec<String>, size: u32, zone: Rectangle, measure: &M, overflowed: bool) -> LayoutResult
where
    M: TextMeasure + ?Sized,
{
    let line_widths = lines
        .iter()
        .map(|line| measure.measure_width(line, size))
        .collect();
    let line_height = measure.line_height(size);
    let extent = block_extent(lines.len(), size, measure) as i32;
    let ascent = measure.ascent(size) as i32;

    let center_x = zone.top_left.x + zone.size.width as i32 / 2;
    let start_y = zone.top_left.y + (zone.size.height as i32 - extent) / 2 + ascent;

    debug!(
        "Zone {}x{} -> {} lines, font size {}",
        zone.size.width,
        zone.size.height,
        lines.len(),
        size
    );

    LayoutResult {
        font_size: size,
        lines,
        line_widths,
        line_height,
        glyph_height: measure.ascent(size) + measure.descent(size),
        start_y,
        center_x,
        overflowed,
    }
}
