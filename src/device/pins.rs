//! GPIO assignments of the 2.9" e-paper board

/// Pin numbers, for reference next to the typed pins taken in `main`
pub struct Pins;

#[allow(dead_code)]
impl Pins {
    // SPI display
    /// Chip select
    pub const CS: u8 = 45;
    /// Data/command select, high for data
    pub const DC: u8 = 46;
    pub const RST: u8 = 47;
    /// High while the panel is refreshing
    pub const BSY: u8 = 48;
    pub const SCK: u8 = 12;
    pub const MOSI: u8 = 11;
    /// Switches the panel supply
    pub const DISPLAY_POWER: u8 = 7;

    /// Front button, closes to ground
    pub const BTN_CONF: u8 = 5;
}
