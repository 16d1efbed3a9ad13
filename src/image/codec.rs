//! Codec registry and palette resolution.
//!
//! Each [`Codec`] carries an optional decoder and an optional encoder.
//! Callers check [`Codec::capabilities`] first; calling a missing direction
//! returns [`Error::UnsupportedCodecOperation`].

use std::fmt;
use std::io::{Cursor, Read, Write};

use log::{debug, warn};

use super::n64gfx::N64GfxCodec;
use super::n64texture::N64TextureCodec;
use super::patch::PatchCodec;
use super::png::{PNG_SIGNATURE, PngCodec};
use super::{Image, Palette};
use crate::name::Section;
use crate::namespace::Namespace;
use crate::{Error, Result};

/// Image encodings found in Doom 64 data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    N64Texture,
    N64Gfx,
    DoomPatch,
}

impl ImageFormat {
    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::N64Texture => "n64 texture",
            ImageFormat::N64Gfx => "n64 graphic",
            ImageFormat::DoomPatch => "doom patch",
        }
    }

    /// Guess the format of a lump from its leading bytes and section.
    pub fn sniff(data: &[u8], section: Section) -> Option<ImageFormat> {
        if data.starts_with(&PNG_SIGNATURE) {
            return Some(ImageFormat::Png);
        }
        match section {
            Section::Textures => Some(ImageFormat::N64Texture),
            Section::Graphics => Some(ImageFormat::N64Gfx),
            Section::Sprites => Some(ImageFormat::DoomPatch),
            Section::Normal | Section::Sounds => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub decode: bool,
    pub encode: bool,
}

pub trait ImageDecoder: Send + Sync {
    fn decode(&self, r: &mut dyn Read) -> Result<Image>;
}

pub trait ImageEncoder: Send + Sync {
    fn encode(&self, w: &mut dyn Write, image: &Image) -> Result<()>;
}

/// One registered format handler.
pub struct Codec {
    format: ImageFormat,
    decoder: Option<Box<dyn ImageDecoder>>,
    encoder: Option<Box<dyn ImageEncoder>>,
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("format", &self.format)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

impl Codec {
    pub fn new(format: ImageFormat) -> Self {
        Self {
            format,
            decoder: None,
            encoder: None,
        }
    }

    pub fn with_decoder(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    pub fn with_encoder(mut self, encoder: impl ImageEncoder + 'static) -> Self {
        self.encoder = Some(Box::new(encoder));
        self
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            decode: self.decoder.is_some(),
            encode: self.encoder.is_some(),
        }
    }

    pub fn decode(&self, r: &mut dyn Read) -> Result<Image> {
        let decoder = self.decoder.as_ref().ok_or(Error::UnsupportedCodecOperation {
            codec: self.format.name(),
            operation: "decode",
        })?;
        decoder.decode(r)
    }

    pub fn encode(&self, w: &mut dyn Write, image: &Image) -> Result<()> {
        let encoder = self.encoder.as_ref().ok_or(Error::UnsupportedCodecOperation {
            codec: self.format.name(),
            operation: "encode",
        })?;
        encoder.encode(w, image)
    }
}

/// Which palette a decoded lump ended up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteResolution {
    /// The image's own palette (or none).
    Embedded,
    /// A palette lump of this name replaced the embedded one.
    Override(String),
    /// No override lump existed; slice `index` of the embedded palette is used.
    Sliced { index: usize },
}

/// Registered codecs, at most one per format. Later registrations replace
/// earlier ones.
#[derive(Debug)]
pub struct CodecRegistry {
    codecs: Vec<Codec>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry
            .register(Codec::new(ImageFormat::Png).with_decoder(PngCodec).with_encoder(PngCodec))
            .register(
                Codec::new(ImageFormat::N64Texture)
                    .with_decoder(N64TextureCodec)
                    .with_encoder(N64TextureCodec),
            )
            .register(Codec::new(ImageFormat::N64Gfx).with_decoder(N64GfxCodec))
            .register(Codec::new(ImageFormat::DoomPatch).with_decoder(PatchCodec));
        registry
    }
}

impl CodecRegistry {
    /// An empty registry. See [`CodecRegistry::default`] for the built-ins.
    pub fn new() -> Self {
        Self { codecs: Vec::new() }
    }

    pub fn register(&mut self, codec: Codec) -> &mut Self {
        self.codecs.retain(|c| c.format != codec.format);
        self.codecs.push(codec);
        self
    }

    pub fn get(&self, format: ImageFormat) -> Result<&Codec> {
        self.codecs
            .iter()
            .find(|c| c.format == format)
            .ok_or(Error::UnknownCodec(format.name()))
    }

    /// Capabilities of `format`; all false if nothing is registered.
    pub fn capabilities(&self, format: ImageFormat) -> Capabilities {
        self.get(format).map(Codec::capabilities).unwrap_or_default()
    }

    pub fn decode(&self, format: ImageFormat, r: &mut dyn Read) -> Result<Image> {
        self.get(format)?.decode(r)
    }

    pub fn encode(&self, format: ImageFormat, w: &mut dyn Write, image: &Image) -> Result<()> {
        self.get(format)?.encode(w, image)
    }

    /// Decode the lump `name` from `namespace`, optionally re-paletted.
    ///
    /// With `palette_index`, a lump named `PAL` + the first four characters
    /// of `name` + the index replaces the image's palette when it exists.
    /// Otherwise slice `palette_index` of the embedded palette is used.
    pub fn decode_lump(
        &self,
        namespace: &Namespace,
        name: &str,
        palette_index: Option<usize>,
    ) -> Result<(Image, PaletteResolution)> {
        let lump = namespace
            .lookup(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let section = namespace.entry(lump).map(|e| e.section).unwrap_or_default();
        let data = namespace.read_ref(lump)?;
        let format = ImageFormat::sniff(&data, section).ok_or(Error::Parse("lump is not a known image format"))?;
        debug!("Decoding {name} as {format}");
        let mut image = self.decode(format, &mut Cursor::new(data))?;

        let Some(index) = palette_index else {
            return Ok((image, PaletteResolution::Embedded));
        };

        let prefix: String = name.chars().take(4).collect();
        let override_name = format!("PAL{prefix}{index}").to_ascii_uppercase();
        if namespace.contains(&override_name) {
            let palette = Palette::read_rgb_lump(&mut namespace.open(&override_name)?)?;
            image.set_palette(palette);
            return Ok((image, PaletteResolution::Override(override_name)));
        }

        let sliced = image
            .palette()
            .ok_or(Error::Parse("image has no palette to slice"))?
            .sub_palette(index)?;
        warn!("Palette {override_name} not found, using slice {index} of {name}'s palette");
        image.set_palette(sliced);
        Ok((image, PaletteResolution::Sliced { index }))
    }
}
