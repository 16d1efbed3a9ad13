//! Column-based sprite patch.
//!
//! ```text
//! [0x00] Width                    (u16 LE)
//! [0x02] Height                   (u16 LE)
//! [0x04] LeftOffset               (i16 LE)
//! [0x06] TopOffset                (i16 LE)
//! [0x08] ColumnOffsets            (u32 LE x Width, absolute)
//! ```
//!
//! Each column is a run of posts `{top, length, pad, pixels[length], pad}`
//! ended by a `top` of 0xFF. Uncovered pixels decode as index 0, which the
//! sprite palette keeps transparent.

use std::io::{Cursor, Read};

use super::{Image, ImageDecoder, PixelFormat};
use crate::utils::{le_u16, le_u32};
use crate::{Error, Result};

const END_OF_COLUMN: u8 = 0xFF;

pub struct PatchCodec;

impl ImageDecoder for PatchCodec {
    fn decode(&self, r: &mut dyn Read) -> Result<Image> {
        let mut data = Vec::new();
        r.read_to_end(&mut data)?;
        let mut c = Cursor::new(data.as_slice());
        let width = le_u16(&mut c)? as usize;
        let height = le_u16(&mut c)? as usize;
        let _left = le_u16(&mut c)? as i16;
        let _top = le_u16(&mut c)? as i16;

        let mut pixels = vec![0u8; width * height];
        for x in 0..width {
            let mut pos = le_u32(&mut c)? as usize;
            loop {
                let top = *data.get(pos).ok_or(Error::InvalidRange)?;
                if top == END_OF_COLUMN {
                    break;
                }
                let len = *data.get(pos + 1).ok_or(Error::InvalidRange)? as usize;
                let post = data.get(pos + 3..pos + 3 + len).ok_or(Error::InvalidRange)?;
                for (dy, &px) in post.iter().enumerate() {
                    let y = top as usize + dy;
                    if y >= height {
                        return Err(Error::Parse("patch post runs past the bottom"));
                    }
                    pixels[y * width + x] = px;
                }
                pos += len + 4;
            }
        }

        Image::new(PixelFormat::Index8, width as u32, height as u32, pixels)
    }
}
