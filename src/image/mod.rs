//! Decoded images, palettes and the codec registry.
//!
//! ## Pixel formats
//! | Format | Bytes per pixel | Notes |
//! |--------|-----------------|-------|
//! | `Index8`   | 1 | palette index |
//! | `Rgb`      | 3 | |
//! | `Rgba`     | 4 | |
//! | `Rgba5551` | 2 | big-endian `RRRRRGGGGGBBBBBA`, the N64 colour format |
//!
//! Palettes use the same formats (never `Index8`). By convention entry 0
//! of a sprite palette is transparent.

use std::io::Read;

use crate::utils::bytesv;
use crate::{Error, Result};

pub mod codec;
pub mod n64gfx;
pub mod n64texture;
pub mod patch;
pub mod png;

pub use codec::{Capabilities, Codec, CodecRegistry, ImageDecoder, ImageEncoder, ImageFormat, PaletteResolution};

/// Entries in one palette slice.
pub const SUB_PALETTE_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Index8,
    Rgb,
    Rgba,
    Rgba5551,
}

impl PixelFormat {
    /// Size of one pixel in bytes.
    pub const fn pixel_width(self) -> usize {
        match self {
            PixelFormat::Index8 => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
            PixelFormat::Rgba5551 => 2,
        }
    }

    /// Expand one pixel to RGBA. `px` must be [`Self::pixel_width`] long.
    fn rgba(self, px: &[u8]) -> [u8; 4] {
        match self {
            PixelFormat::Index8 => [px[0], px[0], px[0], 255],
            PixelFormat::Rgb => [px[0], px[1], px[2], 255],
            PixelFormat::Rgba => [px[0], px[1], px[2], px[3]],
            PixelFormat::Rgba5551 => {
                let v = u16::from_be_bytes([px[0], px[1]]);
                let c5 = |x: u16| {
                    let x = (x & 0x1F) as u8;
                    (x << 3) | (x >> 2)
                };
                [c5(v >> 11), c5(v >> 6), c5(v >> 1), if v & 1 != 0 { 255 } else { 0 }]
            }
        }
    }
}

/// Pack an RGBA colour into big-endian RGBA5551.
pub fn rgba_to_5551(c: [u8; 4]) -> [u8; 2] {
    let v = (u16::from(c[0] >> 3) << 11) | (u16::from(c[1] >> 3) << 6) | (u16::from(c[2] >> 3) << 1) | u16::from(c[3] >= 128);
    v.to_be_bytes()
}

/// An ordered list of colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    format: PixelFormat,
    data: Vec<u8>,
}

impl Palette {
    /// Wrap raw colour data. The length must be a whole number of entries.
    pub fn new(format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        if format == PixelFormat::Index8 {
            return Err(Error::Parse("palette cannot be indexed"));
        }
        if data.len() % format.pixel_width() != 0 {
            return Err(Error::Parse("palette length is not a whole number of entries"));
        }
        Ok(Self { format, data })
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.data.len() / self.format.pixel_width()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entry `index` as RGBA.
    pub fn color(&self, index: usize) -> Option<[u8; 4]> {
        let w = self.format.pixel_width();
        let px = self.data.get(index * w..(index + 1) * w)?;
        Some(self.format.rgba(px))
    }

    /// Copy out the 16-entry slice number `index`.
    pub fn sub_palette(&self, index: usize) -> Result<Palette> {
        let span = SUB_PALETTE_LEN * self.format.pixel_width();
        let start = index.checked_mul(span).ok_or(Error::InvalidRange)?;
        let data = self.data.get(start..start + span).ok_or(Error::InvalidRange)?;
        Ok(Self {
            format: self.format,
            data: data.to_vec(),
        })
    }

    pub fn to_rgba(&self) -> Palette {
        let w = self.format.pixel_width();
        Self {
            format: PixelFormat::Rgba,
            data: self.data.chunks_exact(w).flat_map(|px| self.format.rgba(px)).collect(),
        }
    }

    pub fn to_rgba5551(&self) -> Palette {
        if self.format == PixelFormat::Rgba5551 {
            return self.clone();
        }
        let w = self.format.pixel_width();
        Self {
            format: PixelFormat::Rgba5551,
            data: self
                .data
                .chunks_exact(w)
                .flat_map(|px| rgba_to_5551(self.format.rgba(px)))
                .collect(),
        }
    }

    /// Read a 256-entry RGB palette lump. Entry 0 becomes transparent.
    pub fn read_rgb_lump<R: Read + ?Sized>(r: &mut R) -> Result<Palette> {
        let rgb = bytesv(r, 256 * 3)?;
        let mut data: Vec<u8> = rgb.chunks_exact(3).flat_map(|c| [c[0], c[1], c[2], 255]).collect();
        data[3] = 0;
        Ok(Self {
            format: PixelFormat::Rgba,
            data,
        })
    }

    /// Read `count` big-endian RGBA5551 entries.
    pub fn read_n64<R: Read + ?Sized>(r: &mut R, count: usize) -> Result<Palette> {
        Ok(Self {
            format: PixelFormat::Rgba5551,
            data: bytesv(r, count * 2)?,
        })
    }
}

/// A decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    format: PixelFormat,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    palette: Option<Palette>,
}

impl Image {
    /// Wrap a pixel buffer. Its length must match the dimensions exactly.
    pub fn new(format: PixelFormat, width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != width as usize * height as usize * format.pixel_width() {
            return Err(Error::Parse("pixel buffer does not match dimensions"));
        }
        Ok(Self {
            format,
            width,
            height,
            pixels,
            palette: None,
        })
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_indexed(&self) -> bool {
        self.format == PixelFormat::Index8
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = Some(palette);
    }

    /// Expand to an RGBA image. Indexed pixels beyond the palette come out
    /// fully transparent.
    pub fn to_rgba(&self) -> Result<Image> {
        let pixels = if self.is_indexed() {
            let palette = self
                .palette
                .as_ref()
                .ok_or(Error::Parse("indexed image has no palette"))?;
            let colors = palette.to_rgba();
            self.pixels
                .iter()
                .flat_map(|&i| colors.color(i as usize).unwrap_or([0; 4]))
                .collect()
        } else {
            let w = self.format.pixel_width();
            self.pixels.chunks_exact(w).flat_map(|px| self.format.rgba(px)).collect()
        };
        Ok(Image {
            format: PixelFormat::Rgba,
            width: self.width,
            height: self.height,
            pixels,
            palette: None,
        })
    }
}
