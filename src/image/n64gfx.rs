//! N64 graphic - 8-bit indexed pixels with a 256-colour palette.
//!
//! ```text
//! [0x00] Compressed               (u16 BE)   0 or 0xFFFF; anything else is packed
//! [0x02] Reserved                 (u16 BE)
//! [0x04] Width                    (u16 BE)
//! [0x06] Height                   (u16 BE)
//! [0x08] Pixels                   (width * height bytes)
//! [align 8] Palette               (256 RGBA5551 entries)
//! ```

use std::io::Read;

use super::{Image, ImageDecoder, Palette, PixelFormat};
use crate::utils::{be_u16, bytesv};
use crate::{Error, Result};

const HEADER_LEN: usize = 8;
const PALETTE_LEN: usize = 256;

pub struct N64GfxCodec;

impl ImageDecoder for N64GfxCodec {
    fn decode(&self, r: &mut dyn Read) -> Result<Image> {
        let compressed = be_u16(r)?;
        let _reserved = be_u16(r)?;
        let width = be_u16(r)? as u32;
        let height = be_u16(r)? as u32;
        if compressed != 0 && compressed != 0xFFFF {
            return Err(Error::Parse("compressed n64 graphics are not supported"));
        }

        let len = width as usize * height as usize;
        let pixels = bytesv(r, len)?;
        let pad = (HEADER_LEN + len).next_multiple_of(8) - (HEADER_LEN + len);
        bytesv(r, pad)?;

        let palette = Palette::read_n64(r, PALETTE_LEN)?;
        Ok(Image::new(PixelFormat::Index8, width, height, pixels)?.with_palette(palette))
    }
}
