//! ESP-IDF implementations of the collaborators

pub mod button;
pub mod clock;
pub mod http;
pub mod panel;
pub mod pins;
pub mod wifi;
