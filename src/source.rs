//! Collaborators the display cycle drives
//!
//! Everything that touches the network, the RTC or the panel sits behind one of
//! these traits. All calls are synchronous and may fail; the cycle decides what
//! a failure means.

use anyhow::Result;

use crate::catalog::{Catalog, ClockImage};
use crate::clock::WallTime;
use crate::layout::{LayoutResult, TextMeasure};

/// Shown when the poem service cannot be reached
pub const PLACEHOLDER_POEM: &str = "Time moves on / But clocks stand still";

/// Typeface the poem service asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontPreference {
    /// Sans-serif
    #[default]
    Inter,
    /// Serif
    Playfair,
}

impl FontPreference {
    /// Unknown names fall back to Inter
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("PLAYFAIR") {
            FontPreference::Playfair
        } else {
            FontPreference::Inter
        }
    }
}

/// Auxiliary text revealed with the button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub body: String,
    pub note_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poem {
    /// May contain verse breaks, see [`crate::layout::VERSE_BREAK`]
    pub text: String,
    pub font: FontPreference,
    pub poem_id: Option<String>,
    pub note: Option<Note>,
}

impl Poem {
    pub fn placeholder() -> Self {
        Self {
            text: PLACEHOLDER_POEM.to_string(),
            font: FontPreference::Inter,
            poem_id: None,
            note: None,
        }
    }
}

/// Which text a frame carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    Poem,
    Note,
}

/// One composed screen: background photograph plus laid out text
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub image: &'a ClockImage,
    pub layout: &'a LayoutResult,
    pub font: FontPreference,
    pub content: Content,
}

pub trait CatalogSource {
    /// Fetch and validate the whole index; only a complete catalog is returned
    fn fetch_catalog(&mut self) -> Result<Catalog>;
}

pub trait PoemSource {
    /// Poem for the `HH:MM` 24-hour time on the screen identified by `screen_id`
    fn compose(&mut self, time24: &str, screen_id: &str) -> Result<Poem>;

    fn like(&mut self, poem_id: &str, screen_id: &str) -> Result<()>;
}

pub trait ClockSource {
    /// `None` while the clock is not set
    fn now(&self) -> Option<WallTime>;
}

pub trait Renderer {
    /// Font metrics for `font`, or `None` to lay out with the fixed-cell model
    fn measurer(&self, font: FontPreference) -> Option<&dyn TextMeasure>;

    /// Compose the frame and refresh the panel; returns once it is visible
    fn render(&mut self, frame: &Frame<'_>) -> Result<()>;
}
