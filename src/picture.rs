//! Photograph decoding for a 1-bit panel

use anyhow::{bail, Context, Result};
use embedded_graphics::image::ImageRaw;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::Size;
use image::imageops::{self, BiLevel, FilterType};
use log::debug;

/// Largest download accepted for one photograph
pub const MAX_PICTURE_BYTES: usize = 500_000;

/// Packed 1-bit picture, rows padded to whole bytes, most significant bit first
///
/// A set bit is a black pixel, which is what [`BinaryColor::On`] draws as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monochrome {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Monochrome {
    /// Wrap bits that are already packed, e.g. a prepared panel image
    pub fn from_packed(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = (width.div_ceil(8) * height) as usize;
        if data.len() != expected {
            bail!("{}x{} picture needs {} bytes, got {}", width, height, expected, data.len());
        }
        Ok(Self { width, height, data })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_black(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = (y * self.width.div_ceil(8) + x / 8) as usize;
        self.data[index] & (1 << (7 - x % 8)) != 0
    }

    pub fn as_raw(&self) -> ImageRaw<'_, BinaryColor> {
        ImageRaw::new(&self.data, self.width)
    }
}

/// How grey levels become black and white
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toning {
    /// Darker than the level is black
    Threshold(u8),
    /// Floyd-Steinberg error diffusion
    Dither,
}

/// Decode a PNG photograph and stretch it over `size`
///
/// Both axes scale independently so text zones mapped with
/// [`crate::config::DisplayGeometry`] land on the same pixels.
pub fn decode(bytes: &[u8], size: Size, toning: Toning) -> Result<Monochrome> {
    if bytes.len() > MAX_PICTURE_BYTES {
        bail!("picture is {} bytes, at most {} are accepted", bytes.len(), MAX_PICTURE_BYTES);
    }
    if size.width == 0 || size.height == 0 {
        bail!("cannot scale a picture to {}x{}", size.width, size.height);
    }

    let picture = image::load_from_memory(bytes).context("picture could not be decoded")?;
    debug!(
        "Picture {}x{} scaled to {}x{}",
        picture.width(),
        picture.height(),
        size.width,
        size.height
    );

    let mut gray = picture
        .resize_exact(size.width, size.height, FilterType::Triangle)
        .to_luma8();
    let threshold = match toning {
        Toning::Threshold(level) => level,
        Toning::Dither => {
            imageops::dither(&mut gray, &BiLevel);
            128
        }
    };

    let bytes_per_row = size.width.div_ceil(8);
    let mut data = vec![0u8; (bytes_per_row * size.height) as usize];
    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel[0] < threshold {
            let index = (y * bytes_per_row + x / 8) as usize;
            data[index] |= 1 << (7 - x % 8);
        }
    }

    Ok(Monochrome {
        width: size.width,
        height: size.height,
        data,
    })
}
