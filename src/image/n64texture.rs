//! N64 wall texture - 4-bit indexed pixels with one or more 16-colour palettes.
//!
//! ```text
//! [0x00] Id                      (u16 BE)
//! [0x02] PaletteCount            (u16 BE)
//! [0x04] WidthShift              (u16 BE)   width  = 1 << shift
//! [0x06] HeightShift             (u16 BE)   height = 1 << shift
//! [0x08] Pixels                  (width * height / 2 bytes, high nibble first)
//! [....] Palettes                (PaletteCount * 16 RGBA5551 entries)
//! ```
//!
//! Odd rows are stored TMEM-interleaved: within every 8-byte group the two
//! 4-byte words are exchanged.

use std::io::{Read, Write};

use super::{Image, ImageDecoder, ImageEncoder, Palette, PixelFormat, SUB_PALETTE_LEN};
use crate::utils::{be_u16, bytesv};
use crate::{Error, Result};

const MAX_SHIFT: u16 = 12;

pub struct N64TextureCodec;

/// Exchange the 4-byte words of every 8-byte group in odd rows.
fn interleave(packed: &mut [u8], row_bytes: usize) {
    for row in packed.chunks_exact_mut(row_bytes).skip(1).step_by(2) {
        for group in row.chunks_exact_mut(8) {
            let (a, b) = group.split_at_mut(4);
            a.swap_with_slice(b);
        }
    }
}

fn dimension(shift: u16) -> Result<u32> {
    if shift > MAX_SHIFT {
        return Err(Error::Parse("texture dimension out of range"));
    }
    Ok(1 << shift)
}

impl ImageDecoder for N64TextureCodec {
    fn decode(&self, r: &mut dyn Read) -> Result<Image> {
        let _id = be_u16(r)?;
        let numpal = be_u16(r)? as usize;
        let width = dimension(be_u16(r)?)?;
        let height = dimension(be_u16(r)?)?;
        if numpal == 0 {
            return Err(Error::Parse("texture has no palette"));
        }

        let row_bytes = (width as usize).div_ceil(2);
        let mut packed = bytesv(r, row_bytes * height as usize)?;
        interleave(&mut packed, row_bytes);

        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for row in packed.chunks_exact(row_bytes) {
            for x in 0..width as usize {
                let b = row[x / 2];
                pixels.push(if x % 2 == 0 { b >> 4 } else { b & 0x0F });
            }
        }

        let palette = Palette::read_n64(r, numpal * SUB_PALETTE_LEN)?;
        Ok(Image::new(PixelFormat::Index8, width, height, pixels)?.with_palette(palette))
    }
}

impl ImageEncoder for N64TextureCodec {
    fn encode(&self, w: &mut dyn Write, image: &Image) -> Result<()> {
        w.write_all(&encode_texture(image)?)?;
        Ok(())
    }
}

/// Serialize an indexed, power-of-two image. Only the low nibble of each
/// index is stored; the palette is written as RGBA5551.
pub fn encode_texture(image: &Image) -> Result<Vec<u8>> {
    if !image.is_indexed() {
        return Err(Error::Parse("texture must be indexed"));
    }
    let (width, height) = (image.width(), image.height());
    if !width.is_power_of_two() || !height.is_power_of_two() {
        return Err(Error::Parse("texture dimensions must be powers of two"));
    }
    let palette = image
        .palette()
        .ok_or(Error::Parse("texture has no palette"))?
        .to_rgba5551();
    let numpal = palette.len().div_ceil(SUB_PALETTE_LEN).max(1);

    let mut out = Vec::new();
    for v in [0, numpal as u16, width.trailing_zeros() as u16, height.trailing_zeros() as u16] {
        out.extend_from_slice(&v.to_be_bytes());
    }

    let row_bytes = (width as usize).div_ceil(2);
    let mut packed = Vec::with_capacity(row_bytes * height as usize);
    for row in image.pixels().chunks_exact(width as usize) {
        for pair in row.chunks(2) {
            let hi = pair[0] & 0x0F;
            let lo = pair.get(1).map_or(0, |p| p & 0x0F);
            packed.push((hi << 4) | lo);
        }
    }
    interleave(&mut packed, row_bytes);
    out.extend_from_slice(&packed);

    out.extend_from_slice(palette.data());
    out.resize(out.len() + (numpal * SUB_PALETTE_LEN - palette.len()) * 2, 0);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ROW: [u8; 8] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];

    fn header(numpal: u16, wshift: u16, hshift: u16) -> Vec<u8> {
        [7u16, numpal, wshift, hshift]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect()
    }

    #[test]
    fn odd_rows_are_deinterleaved() {
        let mut data = header(1, 4, 1);
        data.extend_from_slice(&ROW);
        data.extend_from_slice(&[0x89, 0xAB, 0xCD, 0xEF, 0x01, 0x23, 0x45, 0x67]);
        data.extend_from_slice(&[0u8; 32]);

        let img = N64TextureCodec.decode(&mut Cursor::new(data)).unwrap();
        assert_eq!((img.width(), img.height()), (16, 2));
        let expected: Vec<u8> = (0..16).chain(0..16).collect();
        assert_eq!(img.pixels(), expected.as_slice());
        assert_eq!(img.palette().unwrap().len(), 16);
    }

    #[test]
    fn encode_inverts_decode() {
        let mut data = header(2, 4, 2);
        for row in 0..4 {
            if row % 2 == 0 {
                data.extend_from_slice(&ROW);
            } else {
                data.extend_from_slice(&[0x89, 0xAB, 0xCD, 0xEF, 0x01, 0x23, 0x45, 0x67]);
            }
        }
        data.extend((0..64).map(|i| i as u8));

        let img = N64TextureCodec.decode(&mut Cursor::new(data.clone())).unwrap();
        let mut out = Vec::new();
        N64TextureCodec.encode(&mut out, &img).unwrap();
        // The id field is not kept.
        assert_eq!(out[2..], data[2..]);
    }

    #[test]
    fn rejects_bad_headers() {
        let mut no_palette = header(0, 1, 1);
        no_palette.extend_from_slice(&[0; 2]);
        assert!(N64TextureCodec.decode(&mut Cursor::new(no_palette)).is_err());

        let huge = header(1, 30, 1);
        assert!(N64TextureCodec.decode(&mut Cursor::new(huge)).is_err());
    }

    #[test]
    fn encoder_wants_indexed_power_of_two() {
        let rgba = Image::new(PixelFormat::Rgba, 2, 2, vec![0; 16]).unwrap();
        assert!(encode_texture(&rgba).is_err());
        let pal = Palette::new(PixelFormat::Rgba, vec![0; 64]).unwrap();
        let odd = Image::new(PixelFormat::Index8, 3, 2, vec![0; 6]).unwrap().with_palette(pal);
        assert!(encode_texture(&odd).is_err());
    }
}
