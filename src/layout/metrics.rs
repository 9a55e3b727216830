//! Text measurement strategies for the layout engine
//!
//! The engine never looks at glyphs itself. It asks a [`TextMeasure`] how wide a
//! run of text is at a size and how tall a line is, so bitmap fonts, vector
//! fonts and the fixed-cell fallback all go through the same search.

use embedded_graphics::mono_font::MonoFont;

/// Candidate font sizes, searched from `max` down to `min`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRange {
    pub max: u32,
    pub min: u32,
    pub step: u32,
}

impl SizeRange {
    pub const fn new(max: u32, min: u32, step: u32) -> Self {
        Self { max, min, step }
    }

    /// Largest first, ending with `min` even when the step skips over it
    pub fn candidates(&self) -> impl Iterator<Item = u32> {
        let min = self.min.min(self.max);
        let step = self.step.max(1);
        let tail = ((self.max - min) % step != 0).then_some(min);
        (min..=self.max).rev().step_by(step as usize).chain(tail)
    }
}

/// Width measurement and vertical metrics for one typeface
///
/// Implementations must be deterministic: the same text at the same size always
/// measures the same.
pub trait TextMeasure {
    /// Horizontal advance of `text` at `size`, in pixels
    fn measure_width(&self, text: &str, size: u32) -> u32;

    /// Sizes the layout search may try
    fn sizes(&self) -> SizeRange;

    /// Baseline to baseline distance
    fn line_height(&self, size: u32) -> u32 {
        size * 13 / 10
    }

    /// Space reserved below the baseline
    fn descent(&self, size: u32) -> u32 {
        size / 5
    }

    /// Space reserved above the baseline
    fn ascent(&self, size: u32) -> u32 {
        self.line_height(size).saturating_sub(self.descent(size))
    }
}

/// Constant cell per size unit, used when the renderer offers no font metrics
///
/// Sizes are integer scale factors: at size 3 a 6×8 cell becomes 18×24 pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCellMetrics {
    pub cell_width: u32,
    pub cell_height: u32,
    /// Gap between two lines, per size unit
    pub line_gap: u32,
    pub sizes: SizeRange,
}

impl Default for FixedCellMetrics {
    fn default() -> Self {
        Self {
            cell_width: 6,
            cell_height: 8,
            line_gap: 4,
            sizes: SizeRange::new(5, 2, 1),
        }
    }
}

impl TextMeasure for FixedCellMetrics {
    fn measure_width(&self, text: &str, size: u32) -> u32 {
        text.chars().count() as u32 * self.cell_width * size
    }

    fn sizes(&self) -> SizeRange {
        self.sizes
    }

    fn line_height(&self, size: u32) -> u32 {
        (self.cell_height + self.line_gap) * size
    }

    fn descent(&self, _size: u32) -> u32 {
        0
    }

    fn ascent(&self, size: u32) -> u32 {
        self.cell_height * size
    }
}

/// A set of monospaced bitmap fonts addressed by pixel height
///
/// A size picks the tallest font that is not taller than it, or the smallest
/// font when every font is taller.
#[derive(Clone)]
pub struct MonoFontBook {
    /// Tallest first
    fonts: Vec<&'static MonoFont<'static>>,
}

impl MonoFontBook {
    pub fn new(mut fonts: Vec<&'static MonoFont<'static>>) -> Option<Self> {
        if fonts.is_empty() {
            return None;
        }
        fonts.sort_by(|a, b| b.character_size.height.cmp(&a.character_size.height));
        Some(Self { fonts })
    }

    pub fn font_for(&self, size: u32) -> &'static MonoFont<'static> {
        self.fonts
            .iter()
            .copied()
            .find(|font| font.character_size.height <= size)
            .unwrap_or(self.fonts[self.fonts.len() - 1])
    }
}

impl TextMeasure for MonoFontBook {
    fn measure_width(&self, text: &str, size: u32) -> u32 {
        let font = self.font_for(size);
        let count = text.chars().count() as u32;
        if count == 0 {
            return 0;
        }
        count * (font.character_size.width + font.character_spacing) - font.character_spacing
    }

    fn sizes(&self) -> SizeRange {
        let max = self.fonts[0].character_size.height;
        let min = self.fonts[self.fonts.len() - 1].character_size.height;
        SizeRange::new(max, min, 1)
    }

    fn line_height(&self, size: u32) -> u32 {
        self.font_for(size).character_size.height * 13 / 10
    }

    fn descent(&self, size: u32) -> u32 {
        let font = self.font_for(size);
        font.character_size.height.saturating_sub(font.baseline)
    }

    fn ascent(&self, size: u32) -> u32 {
        self.font_for(size).baseline
    }
}

impl core::fmt::Debug for MonoFontBook {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sizes: Vec<_> = self.fonts.iter().map(|font| font.character_size).collect();
        f.debug_struct("MonoFontBook").field("fonts", &sizes).finish()
    }
}
