//! N64 cartridge image - a Doom 64 ROM dump with embedded data blobs.
//!
//! ## Header (0x40 bytes, big-endian)
//! ```text
//! [0x00] PI domain latch/page/pulse/release   (4 bytes)
//! [0x04] ClockRate                           (u32)
//! [0x08] BootAddress                         (u32)
//! [0x0C] Release                             (u32)
//! [0x10] CRC1                                (u32)
//! [0x14] CRC2                                (u32)
//! [0x18] Reserved                            (8 bytes)
//! [0x20] Name (space-padded)                 (20 bytes)
//! [0x34] Reserved                            (7 bytes)
//! [0x3B] Manufacturer                        (1 byte)
//! [0x3C] CartId                              (u16)
//! [0x3E] Country                             (1 byte)
//! [0x3F] Version                             (1 byte)
//! ```
//!
//! ## Byte order
//! Dumps circulate both in native order and with every 16-bit word swapped.
//! The name field tells them apart: `"Doom64"` reads as `"oDmo46"` in a
//! swapped dump. In a swapped dump the country and version bytes also trade
//! places. Every extracted window is swapped back before it is returned.
//!
//! ## Known layouts
//! | Region | Country | Version | IWAD | SN64 | SSEQ | PCM |
//! |--------|---------|---------|------|------|------|-----|
//! | EU     | `P` | 0 | 0x63F60 | 0x63AC40 | 0x646620 | 0x65A920 |
//! | JP     | `J` | 0 | 0x64580 | 0x63CA00 | 0x6483E0 | 0x65C6E0 |
//! | US v1  | `E` | 0 | 0x63D10 | 0x6355C0 | 0x640FA0 | 0x6552A0 |
//! | US v2  | `E` | 1 | 0x63DC0 | 0x63AC40 | 0x646620 | 0x65A920 |
//!
//! Region-free hacks zero the country byte; for those the IWAD magic is
//! probed at each layout's primary window instead.

use std::io::{Cursor, Read, Seek, SeekFrom};

use log::{info, warn};
use parking_lot::Mutex;

use crate::utils::{be_u16, be_u32, bytesa, exact, swap_pairs, u8};
use crate::{Error, Result};

/// Size of the cartridge header.
pub const HEADER_SIZE: usize = 0x40;

const NAME_LEN: usize = 20;
const REFERENCE_NAMES: [&[u8; NAME_LEN]; 2] = [b"Doom64              ", b"Doom 64             "];

/// One `(offset, size)` extraction window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomWindow {
    pub offset: u64,
    pub size: u64,
}

const fn window(offset: u64, size: u64) -> RomWindow {
    RomWindow { offset, size }
}

/// Names of the four extraction windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// The embedded IWAD.
    PrimaryData,
    /// Sound driver / instrument bank (`SN64`).
    SoundDriver,
    /// Music sequences (`SSEQ`).
    SequenceData,
    /// Raw PCM samples.
    PcmAudio,
}

impl Window {
    pub const ALL: [Window; 4] = [
        Window::PrimaryData,
        Window::SoundDriver,
        Window::SequenceData,
        Window::PcmAudio,
    ];
}

/// A known cartridge revision.
#[derive(Debug, PartialEq, Eq)]
pub struct RomLayout {
    pub region: &'static str,
    pub country: u8,
    pub version: u8,
    pub primary_data: RomWindow,
    pub sound_driver: RomWindow,
    pub sequence_data: RomWindow,
    pub pcm_audio: RomWindow,
}

impl RomLayout {
    pub fn window(&self, w: Window) -> RomWindow {
        match w {
            Window::PrimaryData => self.primary_data,
            Window::SoundDriver => self.sound_driver,
            Window::SequenceData => self.sequence_data,
            Window::PcmAudio => self.pcm_audio,
        }
    }
}

/// Compiled-in table of supported Doom 64 cartridges.
pub static LAYOUTS: [RomLayout; 4] = [
    RomLayout {
        region: "EU",
        country: b'P',
        version: 0,
        primary_data: window(0x63f60, 0x5e89a4),
        sound_driver: window(0x63ac40, 0xb9d8),
        sequence_data: window(0x646620, 0x142f8),
        pcm_audio: window(0x65a920, 0x1716c4),
    },
    RomLayout {
        region: "JP",
        country: b'J',
        version: 0,
        primary_data: window(0x64580, 0x5ea120),
        sound_driver: window(0x63ca00, 0xb9d8),
        sequence_data: window(0x6483e0, 0x142f8),
        pcm_audio: window(0x65c6e0, 0x1716c4),
    },
    RomLayout {
        region: "US v1",
        country: b'E',
        version: 0,
        primary_data: window(0x63d10, 0x5e38a8),
        sound_driver: window(0x6355c0, 0xb9d8),
        sequence_data: window(0x640fa0, 0x142f8),
        pcm_audio: window(0x6552a0, 0x1716c4),
    },
    RomLayout {
        region: "US v2",
        country: b'E',
        version: 1,
        primary_data: window(0x63dc0, 0x6d301c),
        sound_driver: window(0x63ac40, 0xb9d8),
        sequence_data: window(0x646620, 0x142f8),
        pcm_audio: window(0x65a920, 0x1716c4),
    },
];

/// Raw cartridge header fields, as stored (no byte-order correction).
#[derive(Debug, Clone)]
pub struct RomHeader {
    pub clock_rate: u32,
    pub boot_address: u32,
    pub release: u32,
    pub crc1: u32,
    pub crc2: u32,
    pub name: [u8; NAME_LEN],
    pub manufacturer: u8,
    pub cart_id: u16,
    pub country: u8,
    pub version: u8,
}

impl RomHeader {
    /// Parse the 64-byte header at the current position.
    pub fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let _pi = bytesa::<4>(r)?;
        let clock_rate = be_u32(r)?;
        let boot_address = be_u32(r)?;
        let release = be_u32(r)?;
        let crc1 = be_u32(r)?;
        let crc2 = be_u32(r)?;
        let _reserved = bytesa::<8>(r)?;
        let name = bytesa::<NAME_LEN>(r)?;
        let _reserved = bytesa::<7>(r)?;
        let manufacturer = u8(r)?;
        let cart_id = be_u16(r)?;
        let country = u8(r)?;
        let version = u8(r)?;
        Ok(Self {
            clock_rate,
            boot_address,
            release,
            crc1,
            crc2,
            name,
            manufacturer,
            cart_id,
            country,
            version,
        })
    }

    /// Detect the dump's byte order from the name field.
    ///
    /// Returns `Some(false)` for native order, `Some(true)` for a
    /// pair-swapped dump, [`None`] if the name is not a Doom 64 title.
    pub fn detect_swap(&self) -> Option<bool> {
        let matches = |name: &[u8; NAME_LEN]| REFERENCE_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name));
        if matches(&self.name) {
            return Some(false);
        }
        let mut swapped = self.name;
        swap_pairs(&mut swapped);
        matches(&swapped).then_some(true)
    }
}

/// Whether `magic` is `IWAD` in plain, pair-swapped or reversed order.
fn is_iwad_magic(magic: &[u8; 4]) -> bool {
    matches!(magic, b"IWAD" | b"WIDA" | b"DAWI")
}

/// An opened cartridge image with a resolved layout.
///
/// Byte order and layout are fixed at [`RomImage::open`]; the extraction
/// methods take `&self` and may be called from several threads.
pub struct RomImage<R> {
    inner: Mutex<R>,
    header: RomHeader,
    byte_swap: bool,
    layout: &'static RomLayout,
}

impl<R: Read + Seek> RomImage<R> {
    /// Open a cartridge image against the compiled-in [`LAYOUTS`].
    pub fn open(reader: R) -> Result<Self> {
        Self::open_with(reader, &LAYOUTS)
    }

    /// Open a cartridge image against a caller-supplied layout table.
    ///
    /// Returns [`Error::RomHeaderUnrecognized`] if the name field is not a
    /// Doom 64 title in either byte order, and [`Error::RomLayoutNotFound`]
    /// if no layout fits.
    pub fn open_with(mut reader: R, layouts: &'static [RomLayout]) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let header = match RomHeader::parse(&mut reader) {
            Ok(h) => h,
            Err(Error::UnexpectedEof) => return Err(Error::RomHeaderUnrecognized),
            Err(e) => return Err(e),
        };
        let byte_swap = header.detect_swap().ok_or(Error::RomHeaderUnrecognized)?;
        let (country, version) = if byte_swap {
            (header.version, header.country)
        } else {
            (header.country, header.version)
        };

        let mut layout = layouts
            .iter()
            .find(|l| l.country == country && l.version == version);

        if layout.is_none() && country == 0 {
            layout = scan_layouts(&mut reader, layouts)?;
        }

        let Some(layout) = layout else {
            warn!(
                "WAD not found in Doom 64 ROM. (Country: {:?}, Version: {version})",
                country as char
            );
            return Err(Error::RomLayoutNotFound { country, version });
        };
        info!("Detected {} rom (byte swap: {byte_swap})", layout.region);

        Ok(Self {
            inner: Mutex::new(reader),
            header,
            byte_swap,
            layout,
        })
    }
}

impl<R> RomImage<R> {
    pub fn header(&self) -> &RomHeader {
        &self.header
    }

    /// Whether the dump is pair-swapped relative to native order.
    pub fn byte_swap(&self) -> bool {
        self.byte_swap
    }

    pub fn layout(&self) -> &'static RomLayout {
        self.layout
    }

    /// Human-readable label, e.g. `"US v2 rom"`.
    pub fn label(&self) -> String {
        format!("{} rom", self.layout.region)
    }

    /// Consume the image, returning the inner reader.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read + Seek> RomImage<R> {
    /// Read one window into memory, normalized to native byte order.
    ///
    /// Each call re-reads the backing reader; nothing is cached.
    pub fn extract(&self, w: Window) -> Result<Cursor<Vec<u8>>> {
        let RomWindow { offset, size } = self.layout.window(w);
        let mut buf = vec![0u8; size as usize];
        {
            let mut inner = self.inner.lock();
            inner.seek(SeekFrom::Start(offset))?;
            exact(&mut *inner, &mut buf)?;
        }
        if self.byte_swap {
            swap_pairs(&mut buf);
        }
        Ok(Cursor::new(buf))
    }

    pub fn primary_data(&self) -> Result<Cursor<Vec<u8>>> {
        self.extract(Window::PrimaryData)
    }

    pub fn sound_driver(&self) -> Result<Cursor<Vec<u8>>> {
        self.extract(Window::SoundDriver)
    }

    pub fn sequence_data(&self) -> Result<Cursor<Vec<u8>>> {
        self.extract(Window::SequenceData)
    }

    pub fn pcm_audio(&self) -> Result<Cursor<Vec<u8>>> {
        self.extract(Window::PcmAudio)
    }
}

/// Probe each layout's primary window for an IWAD magic.
fn scan_layouts<R: Read + Seek>(r: &mut R, layouts: &'static [RomLayout]) -> Result<Option<&'static RomLayout>> {
    for layout in layouts {
        r.seek(SeekFrom::Start(layout.primary_data.offset))?;
        match bytesa::<4>(r) {
            Ok(magic) if is_iwad_magic(&magic) => return Ok(Some(layout)),
            Ok(_) | Err(Error::UnexpectedEof) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    static TINY: [RomLayout; 2] = [
        RomLayout {
            region: "T1",
            country: b'E',
            version: 0,
            primary_data: window(0x40, 8),
            sound_driver: window(0x48, 4),
            sequence_data: window(0x4C, 2),
            pcm_audio: window(0x4E, 2),
        },
        RomLayout {
            region: "T2",
            country: b'E',
            version: 1,
            primary_data: window(0x50, 4),
            sound_driver: window(0x54, 4),
            sequence_data: window(0x58, 4),
            pcm_audio: window(0x5C, 4),
        },
    ];

    fn header(name: &[u8; NAME_LEN], country: u8, version: u8) -> Vec<u8> {
        let mut h = vec![0u8; HEADER_SIZE];
        h[0..4].copy_from_slice(&[0x80, 0x37, 0x12, 0x40]);
        h[0x20..0x34].copy_from_slice(name);
        h[0x3E] = country;
        h[0x3F] = version;
        h
    }

    fn tiny_rom(country: u8, version: u8) -> Vec<u8> {
        let mut rom = header(REFERENCE_NAMES[0], country, version);
        rom.extend_from_slice(b"IWAD\x01\x00\x00\x00SN64SQPC");
        rom.extend_from_slice(b"IWADsn64sseqpcm!");
        rom
    }

    #[test]
    fn native_order() {
        let rom = RomImage::open_with(Cursor::new(tiny_rom(b'E', 0)), &TINY).unwrap();
        assert!(!rom.byte_swap());
        assert_eq!(rom.layout().region, "T1");
        assert_eq!(rom.primary_data().unwrap().into_inner(), b"IWAD\x01\x00\x00\x00");
        assert_eq!(rom.sound_driver().unwrap().into_inner(), b"SN64");
    }

    #[test]
    fn swapped_order_exchanges_country_and_version() {
        // A native T2 image, dumped pair-swapped.
        let mut bytes = tiny_rom(b'E', 1);
        swap_pairs(&mut bytes);
        let rom = RomImage::open_with(Cursor::new(bytes), &TINY).unwrap();
        assert!(rom.byte_swap());
        assert_eq!(rom.layout().region, "T2");
        assert_eq!(rom.primary_data().unwrap().into_inner(), b"IWAD");
        assert_eq!(rom.pcm_audio().unwrap().into_inner(), b"pcm!");
    }

    #[test]
    fn name_compare_ignores_case() {
        let mut rom = tiny_rom(b'E', 0);
        rom[0x20..0x34].copy_from_slice(b"DOOM 64             ");
        assert!(RomImage::open_with(Cursor::new(rom), &TINY).is_ok());
    }

    #[test]
    fn foreign_header_is_unrecognized() {
        let rom = header(b"SUPER MARIO 64      ", b'E', 0);
        let err = RomImage::open_with(Cursor::new(rom), &TINY).err().unwrap();
        assert!(matches!(err, Error::RomHeaderUnrecognized));
    }

    #[test]
    fn short_file_is_unrecognized() {
        let err = RomImage::open(Cursor::new(vec![0u8; 10])).err().unwrap();
        assert!(matches!(err, Error::RomHeaderUnrecognized));
    }

    #[test]
    fn unknown_region_is_fatal() {
        let err = RomImage::open_with(Cursor::new(tiny_rom(b'X', 0)), &TINY).err().unwrap();
        assert!(matches!(err, Error::RomLayoutNotFound { country: b'X', version: 0 }));
    }

    #[test]
    fn region_free_scans_for_magic() {
        let jp = &LAYOUTS[1];
        let mut rom = header(REFERENCE_NAMES[1], 0, 0);
        rom.resize(jp.primary_data.offset as usize + 4, 0);
        rom[jp.primary_data.offset as usize..].copy_from_slice(b"IWAD");
        let rom = RomImage::open(Cursor::new(rom)).unwrap();
        assert_eq!(rom.layout().region, "JP");
        assert_eq!(rom.label(), "JP rom");
    }

    #[test]
    fn region_free_accepts_swapped_magic() {
        let us1 = &LAYOUTS[2];
        let mut rom = header(REFERENCE_NAMES[0], 0, 0);
        rom.resize(0x70000, 0);
        let at = us1.primary_data.offset as usize;
        rom[at..at + 4].copy_from_slice(b"WIDA");
        assert_eq!(RomImage::open(Cursor::new(rom)).unwrap().layout().region, "US v1");
    }

    #[test]
    fn region_free_without_magic_is_fatal() {
        let mut rom = header(REFERENCE_NAMES[0], 0, 0);
        rom.resize(0x70000, 0);
        let err = RomImage::open(Cursor::new(rom)).err().unwrap();
        assert!(matches!(err, Error::RomLayoutNotFound { country: 0, .. }));
    }

    #[test]
    fn extraction_is_repeatable() {
        let mut bytes = tiny_rom(b'E', 0);
        swap_pairs(&mut bytes);
        bytes[0x3E] = 0;
        bytes[0x3F] = b'E';
        let rom = RomImage::open_with(Cursor::new(bytes), &TINY).unwrap();
        for w in Window::ALL {
            assert_eq!(rom.extract(w).unwrap().into_inner(), rom.extract(w).unwrap().into_inner());
        }
    }

    #[test]
    fn concurrent_extraction_matches_serial() {
        let mut bytes = tiny_rom(b'E', 1);
        swap_pairs(&mut bytes);
        let rom = RomImage::open_with(Cursor::new(bytes), &TINY).unwrap();
        assert!(rom.byte_swap());
        let serial: Vec<_> = Window::ALL.iter().map(|&w| rom.extract(w).unwrap().into_inner()).collect();

        std::thread::scope(|s| {
            for t in 0..8 {
                let (rom, serial) = (&rom, &serial);
                s.spawn(move || {
                    for i in 0..64 {
                        let k = (t + i) % Window::ALL.len();
                        assert_eq!(rom.extract(Window::ALL[k]).unwrap().into_inner(), serial[k]);
                    }
                });
            }
        });
    }
}
