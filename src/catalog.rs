//! Time-indexed catalog of stopped clock photographs
//!
//! The catalog is loaded wholesale from the remote index and never patched: a
//! new document either validates completely and replaces the old catalog, or
//! it is rejected and the old catalog stays in use.

use std::collections::HashSet;

use anyhow::{bail, Result};
use embedded_graphics::prelude::{Point, Size};
use embedded_graphics::primitives::Rectangle;
use log::debug;
use rand::Rng;

use crate::clock::TimeCode;

/// Width of the photographs the zones are measured against
pub const SOURCE_WIDTH: u32 = 480;
/// Height of the photographs the zones are measured against
pub const SOURCE_HEIGHT: u32 = 270;

const STRIP_X: i32 = 20;
const STRIP_WIDTH: u32 = 440;
const STRIP_HEIGHT: u32 = 80;

/// Fallback horizontal band for photographs without an analysed text zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strip {
    Top,
    Middle,
    Bottom,
}

impl Strip {
    /// Unknown names fall back to the middle band
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "top" => Strip::Top,
            "bottom" => Strip::Bottom,
            _ => Strip::Middle,
        }
    }

    /// Band rectangle in source image space, spanning nearly the full width
    pub fn rect(&self) -> Rectangle {
        let y = match self {
            Strip::Top => 10,
            Strip::Middle => 95,
            Strip::Bottom => 180,
        };
        Rectangle::new(Point::new(STRIP_X, y), Size::new(STRIP_WIDTH, STRIP_HEIGHT))
    }
}

/// Where text may be placed on a photograph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageZone {
    Explicit(Rectangle),
    Strip(Strip),
}

impl ImageZone {
    pub fn rect(&self) -> Rectangle {
        match self {
            ImageZone::Explicit(rect) => *rect,
            ImageZone::Strip(strip) => strip.rect(),
        }
    }
}

/// One photograph of a stopped clock and the empty region to write on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockImage {
    url: String,
    zone: ImageZone,
    /// `zone` resolved once, so rendering never branches on the variant again
    rect: Rectangle,
}

impl ClockImage {
    pub fn new(url: impl Into<String>, zone: ImageZone) -> Self {
        Self {
            url: url.into(),
            zone,
            rect: zone.rect(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn zone(&self) -> ImageZone {
        self.zone
    }

    /// Text zone in source image space
    pub fn rect(&self) -> Rectangle {
        self.rect
    }
}

/// All photographs tagged with the same clock reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeEntry {
    time_code: TimeCode,
    images: Vec<ClockImage>,
}

impl TimeEntry {
    pub fn new(time_code: TimeCode, images: Vec<ClockImage>) -> Result<Self> {
        if images.is_empty() {
            bail!("time entry {} has no images", time_code);
        }
        Ok(Self { time_code, images })
    }

    pub fn time_code(&self) -> TimeCode {
        self.time_code
    }

    pub fn images(&self) -> &[ClockImage] {
        &self.images
    }
}

/// Upper bounds a catalog document must respect to be accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogLimits {
    pub max_entries: usize,
    pub max_images: usize,
}

impl Default for CatalogLimits {
    fn default() -> Self {
        Self {
            max_entries: 200,
            max_images: 5,
        }
    }
}

/// Result of a successful lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMatch<'a> {
    pub time_code: TimeCode,
    pub diff: u16,
    pub image: &'a ClockImage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<TimeEntry>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate a freshly fetched document
    ///
    /// Rejects empty documents, documents over `limits` and duplicate time codes
    /// instead of truncating, so a bad fetch can never half-replace a good catalog.
    pub fn from_entries(entries: Vec<TimeEntry>, limits: &CatalogLimits) -> Result<Self> {
        if entries.is_empty() {
            bail!("catalog has no time entries");
        }
        if entries.len() > limits.max_entries {
            bail!(
                "catalog has {} time entries, at most {} are supported",
                entries.len(),
                limits.max_entries
            );
        }

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.time_code) {
                bail!("catalog lists time {} more than once", entry.time_code);
            }
            if entry.images.len() > limits.max_images {
                bail!(
                    "time entry {} has {} images, at most {} are supported",
                    entry.time_code,
                    entry.images.len(),
                    limits.max_images
                );
            }
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TimeEntry] {
        &self.entries
    }

    /// Entry nearest to `target` on the 12-hour dial and its distance
    ///
    /// Ties keep the entry seen first, and an exact hit ends the scan.
    pub fn closest(&self, target: TimeCode) -> Option<(&TimeEntry, u16)> {
        let mut best: Option<(&TimeEntry, u16)> = None;

        for entry in &self.entries {
            let diff = entry.time_code.distance(target);
            if best.map_or(true, |(_, best_diff)| diff < best_diff) {
                best = Some((entry, diff));
            }
            if diff == 0 {
                break;
            }
        }

        best
    }

    /// Photograph to show for `target`, or `None` when the catalog is empty
    ///
    /// With several photographs for the nearest time one is picked at random;
    /// `rng` is not touched when there is only one.
    pub fn find_best_image<R: Rng + ?Sized>(
        &self,
        target: TimeCode,
        rng: &mut R,
    ) -> Option<ImageMatch<'_>> {
        let (entry, diff) = self.closest(target)?;

        let image = match entry.images.len() {
            1 => &entry.images[0],
            count => &entry.images[rng.gen_range(0..count)],
        };

        debug!(
            "Target: {}, found: {} (diff: {}) {}",
            target,
            entry.time_code,
            diff,
            image.url()
        );

        Some(ImageMatch {
            time_code: entry.time_code,
            diff,
            image,
        })
    }
}
