//! 2.9" SSD1680 e-paper panel

use anyhow::{anyhow, Result};
use embedded_graphics::mono_font::iso_8859_15::{
    FONT_10X20, FONT_5X8, FONT_6X10, FONT_6X13_BOLD, FONT_7X13, FONT_7X13_BOLD, FONT_8X13, FONT_8X13_BOLD, FONT_9X15,
    FONT_9X15_BOLD, FONT_9X18_BOLD,
};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use epd_waveshare::epd2in9_v2::{Display2in9, Epd2in9};
use epd_waveshare::prelude::*;
use esp_idf_svc::hal::delay::Delay;
use esp_idf_svc::hal::gpio::{AnyInputPin, AnyOutputPin, Input, Output, PinDriver};
use esp_idf_svc::hal::spi::{SpiDeviceDriver, SpiDriver};
use log::info;

use stoppedclocks::compose;
use stoppedclocks::layout::{MonoFontBook, TextMeasure};
use stoppedclocks::picture::{self, Toning, MAX_PICTURE_BYTES};
use stoppedclocks::source::{Content, FontPreference, Frame, Renderer};

use super::http::HttpApi;

type Spi = SpiDeviceDriver<'static, SpiDriver<'static>>;
type Busy = PinDriver<'static, AnyInputPin, Input>;
type OutPin = PinDriver<'static, AnyOutputPin, Output>;
type Epd = Epd2in9<Spi, Busy, OutPin, OutPin, Delay>;

/// Landscape size after rotation
pub const PANEL_SIZE: Size = Size::new(296, 128);

pub struct Panel {
    spi: Spi,
    epd: Epd,
    delay: Delay,
    display: Display2in9,
    /// Panel supply, switched off when dropped
    _power: OutPin,
    api: HttpApi,
    sans: MonoFontBook,
    serif: MonoFontBook,
}

impl Panel {
    pub fn new(mut spi: Spi, busy: Busy, dc: OutPin, rst: OutPin, power: OutPin, api: HttpApi) -> Result<Self> {
        let mut delay = Delay::default();
        let epd = Epd2in9::new(&mut spi, busy, dc, rst, &mut delay, None)
            .map_err(|e| anyhow!("EPD init failed: {:?}", e))?;

        let mut display = Display2in9::default();
        display.set_rotation(DisplayRotation::Rotate90);

        let sans = MonoFontBook::new(vec![&FONT_10X20, &FONT_9X15, &FONT_8X13, &FONT_7X13, &FONT_6X10, &FONT_5X8])
            .ok_or_else(|| anyhow!("no sans fonts"))?;
        let serif = MonoFontBook::new(vec![
            &FONT_9X18_BOLD,
            &FONT_9X15_BOLD,
            &FONT_8X13_BOLD,
            &FONT_7X13_BOLD,
            &FONT_6X13_BOLD,
            &FONT_5X8,
        ])
        .ok_or_else(|| anyhow!("no serif fonts"))?;

        Ok(Self {
            spi,
            epd,
            delay,
            display,
            _power: power,
            api,
            sans,
            serif,
        })
    }

    fn book(&self, font: FontPreference) -> &MonoFontBook {
        match font {
            FontPreference::Inter => &self.sans,
            FontPreference::Playfair => &self.serif,
        }
    }

    /// Start-up and error screen
    pub fn show_status(&mut self, message: &str) -> Result<()> {
        info!("Status: {}", message);
        compose::draw_status(&mut self.display.color_converted::<BinaryColor>(), message, &FONT_10X20, &FONT_6X10)
            .map_err(|e| anyhow!("Drawing status failed: {:?}", e))?;
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        self.epd
            .wake_up(&mut self.spi, &mut self.delay)
            .map_err(|e| anyhow!("EPD wake up failed: {:?}", e))?;
        self.epd
            .update_and_display_frame(&mut self.spi, self.display.buffer(), &mut self.delay)
            .map_err(|e| anyhow!("Failed to write and update buffer: {:?}", e))?;
        self.epd
            .sleep(&mut self.spi, &mut self.delay)
            .map_err(|e| anyhow!("EPD sleep failed: {:?}", e))?;
        Ok(())
    }
}

impl Renderer for Panel {
    fn measurer(&self, font: FontPreference) -> Option<&dyn TextMeasure> {
        Some(self.book(font))
    }

    fn render(&mut self, frame: &Frame<'_>) -> Result<()> {
        let bytes = self.api.download(frame.image.url(), MAX_PICTURE_BYTES)?;
        let photo = picture::decode(&bytes, PANEL_SIZE, Toning::Dither)?;
        let font = self.book(frame.font).font_for(frame.layout.glyph_height);

        compose::draw_frame(&mut self.display.color_converted::<BinaryColor>(), Some(&photo), frame.layout, font)
            .map_err(|e| anyhow!("Drawing frame failed: {:?}", e))?;
        self.flush()?;

        info!("{} on screen", if frame.content == Content::Note { "Note" } else { "Poem" });
        Ok(())
    }
}
