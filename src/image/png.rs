//! PNG through the `png` crate.
//!
//! 8-bit indexed PNGs stay indexed: `PLTE` and `tRNS` become an RGBA
//! palette. Everything else is normalized to 8-bit RGB or RGBA.

use std::io::{Read, Write};

use super::{Image, ImageDecoder, ImageEncoder, Palette, PixelFormat};
use crate::{Error, Result};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

pub struct PngCodec;

fn is_indexed8(data: &[u8]) -> Result<bool> {
    let decoder = png::Decoder::new(data);
    let reader = decoder.read_info()?;
    let info = reader.info();
    Ok(info.color_type == png::ColorType::Indexed && info.bit_depth == png::BitDepth::Eight)
}

fn decode_indexed(data: &[u8]) -> Result<Image> {
    let mut decoder = png::Decoder::new(data);
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf)?;
    buf.truncate(frame.buffer_size());

    let info = reader.info();
    let plte = info.palette.as_deref().ok_or(Error::Parse("indexed png without PLTE"))?;
    let trns = info.trns.as_deref().unwrap_or(&[]);
    let colors = plte
        .chunks_exact(3)
        .enumerate()
        .flat_map(|(i, c)| [c[0], c[1], c[2], trns.get(i).copied().unwrap_or(255)])
        .collect();

    Ok(Image::new(PixelFormat::Index8, frame.width, frame.height, buf)?
        .with_palette(Palette::new(PixelFormat::Rgba, colors)?))
}

fn decode_direct(data: &[u8]) -> Result<Image> {
    let mut decoder = png::Decoder::new(data);
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf)?;
    buf.truncate(frame.buffer_size());

    let (format, pixels) = match frame.color_type {
        png::ColorType::Rgb => (PixelFormat::Rgb, buf),
        png::ColorType::Rgba => (PixelFormat::Rgba, buf),
        png::ColorType::Grayscale => (PixelFormat::Rgb, buf.iter().flat_map(|&g| [g, g, g]).collect()),
        png::ColorType::GrayscaleAlpha => (
            PixelFormat::Rgba,
            buf.chunks_exact(2).flat_map(|p| [p[0], p[0], p[0], p[1]]).collect(),
        ),
        png::ColorType::Indexed => return Err(Error::Parse("png palette was not expanded")),
    };
    Image::new(format, frame.width, frame.height, pixels)
}

impl ImageDecoder for PngCodec {
    fn decode(&self, r: &mut dyn Read) -> Result<Image> {
        let mut data = Vec::new();
        r.read_to_end(&mut data)?;
        if is_indexed8(&data)? {
            decode_indexed(&data)
        } else {
            decode_direct(&data)
        }
    }
}

impl ImageEncoder for PngCodec {
    fn encode(&self, w: &mut dyn Write, image: &Image) -> Result<()> {
        let mut encoder = png::Encoder::new(w, image.width(), image.height());
        encoder.set_depth(png::BitDepth::Eight);

        let rgba;
        let pixels = match (image.format(), image.palette()) {
            (PixelFormat::Index8, Some(palette)) => {
                let palette = palette.to_rgba();
                let (plte, trns): (Vec<_>, Vec<_>) = palette
                    .data()
                    .chunks_exact(4)
                    .map(|c| ([c[0], c[1], c[2]], c[3]))
                    .unzip();
                encoder.set_color(png::ColorType::Indexed);
                encoder.set_palette(plte.concat());
                encoder.set_trns(trns);
                image.pixels()
            }
            (PixelFormat::Rgb, _) => {
                encoder.set_color(png::ColorType::Rgb);
                image.pixels()
            }
            (PixelFormat::Rgba, _) => {
                encoder.set_color(png::ColorType::Rgba);
                image.pixels()
            }
            _ => {
                rgba = image.to_rgba()?;
                encoder.set_color(png::ColorType::Rgba);
                rgba.pixels()
            }
        };

        let mut writer = encoder.write_header()?;
        writer.write_image_data(pixels)?;
        writer.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(image: &Image) -> Vec<u8> {
        let mut out = Vec::new();
        PngCodec.encode(&mut out, image).unwrap();
        out
    }

    #[test]
    fn rgba_survives() {
        let img = Image::new(PixelFormat::Rgba, 2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let bytes = encode(&img);
        assert!(bytes.starts_with(&PNG_SIGNATURE));
        assert_eq!(PngCodec.decode(&mut Cursor::new(bytes)).unwrap(), img);
    }

    #[test]
    fn indexed_keeps_palette_and_alpha() {
        let pal = Palette::new(PixelFormat::Rgba, vec![0, 0, 0, 0, 200, 100, 50, 255]).unwrap();
        let img = Image::new(PixelFormat::Index8, 3, 1, vec![1, 0, 1])
            .unwrap()
            .with_palette(pal.clone());
        let back = PngCodec.decode(&mut Cursor::new(encode(&img))).unwrap();
        assert!(back.is_indexed());
        assert_eq!(back.pixels(), &[1, 0, 1]);
        assert_eq!(back.palette(), Some(&pal));
    }

    #[test]
    fn n64_colours_are_expanded() {
        let img = Image::new(PixelFormat::Rgba5551, 1, 1, vec![0xF8, 0x01]).unwrap();
        let back = PngCodec.decode(&mut Cursor::new(encode(&img))).unwrap();
        assert_eq!(back.format(), PixelFormat::Rgba);
        assert_eq!(back.pixels(), &[255, 0, 0, 255]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = PngCodec.decode(&mut Cursor::new(b"not a png".to_vec())).unwrap_err();
        assert!(matches!(err, Error::PngDecode(_)));
    }
}
