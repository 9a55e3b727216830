//! Living clock: an e-paper frame that shows a photograph of a stopped clock
//! close to the current time, with a poem written for that minute.
//!
//! Everything here is platform independent. The firmware in `main.rs` supplies
//! the network, clock and panel through the traits in [`source`] and drives a
//! [`cycle::DisplayCycle`] from its poll loop.

pub mod catalog;
pub mod clock;
pub mod compose;
pub mod config;
pub mod cycle;
pub mod input;
pub mod layout;
pub mod picture;
pub mod remote;
pub mod source;

pub use catalog::{Catalog, ClockImage, ImageZone, Strip, TimeEntry};
pub use clock::{TimeCode, WallTime};
pub use config::{Config, DisplayGeometry};
pub use cycle::DisplayCycle;
pub use input::{ButtonAction, ButtonMachine, ButtonState};
pub use layout::{LayoutConfig, LayoutResult, TextMeasure};
pub use source::{FontPreference, Frame, Poem};
