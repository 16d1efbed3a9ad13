//! Opened data sources and the loader dispatch that recognises them.
//!
//! A [`Container`] is one opened file: a WAD package, a PK3 archive, or a
//! Doom 64 cartridge image. Whatever the format, it exposes the same thing -
//! a list of [`Entry`] values built eagerly at open time, and
//! [`Container::open_stream`] to fetch an entry's bytes on demand.
//!
//! Format-specific extras are reached through checked queries such as
//! [`Container::rom`], never through methods that fail for the wrong format.
//!
//! Loaders are plain functions `(path) -> Result<Option<Container>>`. They
//! return `Ok(None)` when the file is not theirs and `Err` only when the file
//! is theirs but broken. [`LoaderRegistry`] tries them in registration order.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use log::debug;
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::formats::n64rom::{LAYOUTS, RomImage, RomLayout};
use crate::formats::wad::{MapResource, WadDirectory, WadEntry, WadHeader, WadKind};
use crate::formats::zip::{self, LOCAL_MAGIC, ZipArchive, ZipMember};
use crate::name::{LumpName, Section};
use crate::utils::{bytesa, read_range};
use crate::{Error, Result};

/// Anything a container can read its data from.
pub trait ByteSource: Read + Seek + Send {}

impl<T: Read + Seek + Send> ByteSource for T {}

type Source = Mutex<Box<dyn ByteSource>>;

/// Where an entry's bytes live.
#[derive(Debug, Clone)]
pub enum EntryData {
    /// A plain byte range of the container's source.
    Range { offset: u64, size: u64 },
    /// A map aggregated from 13 directory records; streamed as a PWAD.
    Map(MapResource),
    /// A (possibly compressed) archive member.
    Member(ZipMember),
}

/// One named, addressable resource inside a container.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: LumpName,
    pub section: Section,
    pub data: EntryData,
}

impl Entry {
    /// Stored size in bytes, if known without reading.
    pub fn size(&self) -> Option<u64> {
        match &self.data {
            EntryData::Range { size, .. } => Some(*size),
            EntryData::Member(m) => Some(m.size),
            EntryData::Map(_) => None,
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self.data, EntryData::Map(_))
    }
}

/// Format-specific state of a container.
pub enum Format {
    Wad(WadKind),
    Archive,
    /// A cartridge image; entries come from the IWAD in its primary window.
    Rom(Box<RomImage<Box<dyn ByteSource>>>),
}

impl Format {
    pub fn name(&self) -> &'static str {
        match self {
            Format::Wad(WadKind::Iwad) => "iwad",
            Format::Wad(WadKind::Pwad) => "pwad",
            Format::Archive => "pk3",
            Format::Rom(_) => "rom",
        }
    }
}

/// One opened data source.
pub struct Container {
    path: PathBuf,
    format: Format,
    entries: Vec<Entry>,
    textures: Vec<LumpName>,
    source: Source,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("path", &self.path)
            .field("format", &self.format.name())
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Container {
    /// Open a WAD package from `source`.
    pub fn wad(path: impl Into<PathBuf>, mut source: impl ByteSource + 'static) -> Result<Self> {
        let dir = WadDirectory::parse(&mut source)?;
        Ok(Self::from_directory(path.into(), Format::Wad(dir.header.kind), dir, Box::new(source)))
    }

    /// Open a PK3 archive from `source`.
    pub fn archive(path: impl Into<PathBuf>, mut source: impl ByteSource + 'static) -> Result<Self> {
        let zip = ZipArchive::parse(&mut source)?;
        let mut entries = Vec::new();
        let mut textures = Vec::new();
        for member in zip.members.into_iter().filter(|m| !m.is_dir()) {
            let section = member.folder().map(Section::from_folder).unwrap_or_default();
            let name = LumpName::truncate(member.stem());
            if name.as_bytes().len() < member.stem().len() {
                debug!("Archive member '{}' clipped to '{name}'", member.path);
            }
            if section == Section::Textures {
                textures.push(name);
            }
            entries.push(Entry {
                name,
                section,
                data: EntryData::Member(member),
            });
        }
        Ok(Self {
            path: path.into(),
            format: Format::Archive,
            entries,
            textures,
            source: Mutex::new(Box::new(source)),
        })
    }

    /// Open a cartridge image from `source` and index the IWAD it carries.
    pub fn rom(path: impl Into<PathBuf>, source: impl ByteSource + 'static) -> Result<Self> {
        Self::rom_with(path, source, &LAYOUTS)
    }

    /// Like [`Container::rom`], against a caller-supplied layout table.
    pub fn rom_with(
        path: impl Into<PathBuf>,
        source: impl ByteSource + 'static,
        layouts: &'static [RomLayout],
    ) -> Result<Self> {
        let image = RomImage::open_with(Box::new(source) as Box<dyn ByteSource>, layouts)?;
        let mut iwad = image.primary_data()?;
        let dir = WadDirectory::parse(&mut iwad)?;
        Ok(Self::from_directory(
            path.into(),
            Format::Rom(Box::new(image)),
            dir,
            Box::new(iwad),
        ))
    }

    fn from_directory(path: PathBuf, format: Format, dir: WadDirectory, source: Box<dyn ByteSource>) -> Self {
        let entries = dir
            .entries
            .into_iter()
            .map(|e| match e {
                WadEntry::Lump(l) => Entry {
                    name: l.name,
                    section: l.section,
                    data: EntryData::Range {
                        offset: l.offset,
                        size: l.size,
                    },
                },
                WadEntry::Map(m) => Entry {
                    name: m.name(),
                    section: Section::Normal,
                    data: EntryData::Map(m),
                },
            })
            .collect();
        Self {
            path,
            format,
            entries,
            textures: dir.textures,
            source: Mutex::new(source),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    /// The cartridge image behind this container, if it is one.
    pub fn as_rom(&self) -> Option<&RomImage<Box<dyn ByteSource>>> {
        match &self.format {
            Format::Rom(image) => Some(&**image),
            _ => None,
        }
    }

    /// All entries, in directory order.
    pub fn read_all(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Names recorded inside the textures section.
    pub fn texture_names(&self) -> &[LumpName] {
        &self.textures
    }

    /// Read an entry's bytes into an owned stream.
    ///
    /// Every call seeks the shared source itself, so concurrent callers never
    /// observe each other's cursor.
    pub fn open_stream(&self, entry: &Entry) -> Result<Cursor<Vec<u8>>> {
        self.read_bytes(entry).map(Cursor::new)
    }

    /// Read an entry's bytes.
    pub fn read_bytes(&self, entry: &Entry) -> Result<Vec<u8>> {
        match &entry.data {
            EntryData::Map(map) => Ok(map.build()),
            EntryData::Range { offset, size } => read_range(&mut **self.source.lock(), *offset, *size),
            EntryData::Member(member) => zip::read_member(&mut **self.source.lock(), member),
        }
    }
}

/// A loader inspects a file and either claims it or declines.
pub type Loader = fn(&Path) -> Result<Option<Container>>;

/// Read the first four bytes of a file, or [`None`] if it is shorter.
fn sniff(file: &mut File) -> Result<Option<[u8; 4]>> {
    match bytesa::<4>(file) {
        Ok(magic) => Ok(Some(magic)),
        Err(Error::UnexpectedEof) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Claims files that start with a WAD signature.
pub fn wad_loader(path: &Path) -> Result<Option<Container>> {
    let mut file = File::open(path)?;
    match sniff(&mut file)? {
        Some(magic) if WadHeader::sniff(&magic).is_some() => {
            Container::wad(path, BufReader::new(file)).map(Some)
        }
        _ => Ok(None),
    }
}

/// Claims files that start with a ZIP local header.
pub fn archive_loader(path: &Path) -> Result<Option<Container>> {
    let mut file = File::open(path)?;
    match sniff(&mut file)? {
        Some(magic) if magic == LOCAL_MAGIC => Container::archive(path, BufReader::new(file)).map(Some),
        _ => Ok(None),
    }
}

/// Claims Doom 64 cartridge images. Most permissive; register it last.
pub fn rom_loader(path: &Path) -> Result<Option<Container>> {
    let file = File::open(path)?;
    match Container::rom(path, BufReader::new(file)) {
        Ok(c) => Ok(Some(c)),
        Err(Error::RomHeaderUnrecognized) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Ordered list of loaders.
#[derive(Clone)]
pub struct LoaderRegistry {
    loaders: Vec<(&'static str, Loader)>,
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry
            .register("pk3", archive_loader)
            .register("wad", wad_loader)
            .register("rom", rom_loader);
        registry
    }
}

impl LoaderRegistry {
    /// An empty registry. See [`LoaderRegistry::default`] for the built-ins.
    pub fn new() -> Self {
        Self { loaders: Vec::new() }
    }

    /// Append a loader. Register specific formats before permissive ones.
    pub fn register(&mut self, name: &'static str, loader: Loader) -> &mut Self {
        self.loaders.push((name, loader));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.loaders.iter().map(|(name, _)| *name)
    }

    /// Open `path` with the first loader that claims it.
    ///
    /// Returns [`Error::ContainerUnrecognized`] if every loader declines.
    pub fn open(&self, path: &Path) -> Result<Container> {
        for (name, loader) in &self.loaders {
            match loader(path)? {
                Some(container) => {
                    debug!(
                        "{name} loader claimed {} ({} entries)",
                        path.display(),
                        container.read_all().len()
                    );
                    return Ok(container);
                }
                None => debug!("{name} loader declined {}", path.display()),
            }
        }
        Err(Error::ContainerUnrecognized(path.to_path_buf()))
    }

    /// Open several files in parallel. Results come back in input order.
    pub fn open_all<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Vec<Result<Container>> {
        paths.par_iter().map(|p| self.open(p.as_ref())).collect()
    }
}
