//! WAD - the legacy directory-based package.
//!
//! ## Layout
//! ```text
//! [0x00] Magic "IWAD" / "PWAD"     (4 bytes; reversed "DAWI" / "DAWP" = BE fields)
//! [0x04] RecordCount               (u32)
//! [0x08] TableOffset               (u32, absolute)
//! [...]  Lump data
//! [TableOffset]
//!        Directory                 (RecordCount × 0x10 bytes)
//! ```
//!
//! ## Directory Record (0x10 bytes)
//! ```text
//! [0x00] FileOffset                (u32)
//! [0x04] Length                    (u32)
//! [0x08] Name                      (8 bytes, NUL-padded)
//! ```
//!
//! ## Markers
//! A record with `Length == 0` never carries data. Its name drives the
//! section state of the scan:
//!
//! | Marker | Effect |
//! |--------|--------|
//! | `T_START`, `TT_START` | enter [`Section::Textures`] |
//! | `G_START` | enter [`Section::Graphics`] |
//! | `S_START` | enter [`Section::Sprites`] |
//! | `DS_START` | enter [`Section::Sounds`] |
//! | `T_END`, `TT_END`, `G_END`, `S_END`, `DS_END` | back to [`Section::Normal`] |
//! | `ENDOFWAD` | stop; later records are ignored |
//! | `MAP*` | start a [`MapResource`] swallowing the next 13 records |
//!
//! Any other empty record is logged and skipped.

use std::io::{Read, Seek, SeekFrom};

use log::{debug, warn};

use crate::name::{LumpName, NAME_LEN, Section};
use crate::utils::{bytesa, end_u32, read_range};
use crate::{Error, Result};

/// Number of records following a map marker that belong to the map.
pub const MAP_LUMP_COUNT: usize = 13;

/// Name prefix that turns an empty record into a map marker.
pub const MAP_PREFIX: &str = "MAP";

const HEADER_SIZE: u32 = 0x0C;
const RECORD_SIZE: u32 = 0x10;

/// Whether the package is a base (`IWAD`) or patch (`PWAD`) package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WadKind {
    Iwad,
    Pwad,
}

/// Parsed WAD header.
#[derive(Debug, Clone, Copy)]
pub struct WadHeader {
    pub kind: WadKind,
    /// `false` when the magic was stored reversed and the fields are BE.
    pub le: bool,
    pub record_count: u32,
    pub table_offset: u32,
}

impl WadHeader {
    /// Classify a 4-byte magic. Returns [`None`] for anything that is not a
    /// WAD signature in either order.
    pub fn sniff(magic: &[u8; 4]) -> Option<(WadKind, bool)> {
        match magic {
            b"IWAD" => Some((WadKind::Iwad, true)),
            b"PWAD" => Some((WadKind::Pwad, true)),
            b"DAWI" => Some((WadKind::Iwad, false)),
            b"DAWP" => Some((WadKind::Pwad, false)),
            _ => None,
        }
    }

    /// Parse the 12-byte header. Returns [`Error::BadMagic`] if the magic is
    /// not recognised.
    pub fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let magic = bytesa::<4>(r)?;
        let (kind, le) = Self::sniff(&magic).ok_or(Error::BadMagic)?;
        let record_count = end_u32(r, le)?;
        let table_offset = end_u32(r, le)?;
        Ok(Self {
            kind,
            le,
            record_count,
            table_offset,
        })
    }
}

/// One raw directory record.
#[derive(Debug, Clone, Copy)]
pub struct DirRecord {
    pub offset: u32,
    pub size: u32,
    pub name: LumpName,
}

impl DirRecord {
    fn parse<R: Read>(r: &mut R, le: bool) -> Result<Self> {
        let offset = end_u32(r, le)?;
        let size = end_u32(r, le)?;
        let name = LumpName::from_raw(bytesa::<NAME_LEN>(r)?);
        Ok(Self { offset, size, name })
    }
}

/// A plain data lump: a byte range of the package.
#[derive(Debug, Clone)]
pub struct WadLump {
    pub name: LumpName,
    pub section: Section,
    pub offset: u64,
    pub size: u64,
}

/// A map marker together with the 13 records that follow it.
///
/// Member contents are read eagerly while the directory is scanned, so a map
/// stays usable without the package it came from.
#[derive(Debug, Clone)]
pub struct MapResource {
    name: LumpName,
    members: Vec<(LumpName, Vec<u8>)>,
}

impl MapResource {
    /// The marker name, e.g. `MAP01`.
    pub fn name(&self) -> LumpName {
        self.name
    }

    /// The marker (always empty) followed by the 13 sub-records, in order.
    pub fn members(&self) -> &[(LumpName, Vec<u8>)] {
        &self.members
    }

    /// Look up one member by name.
    pub fn member(&self, name: &str) -> Option<&[u8]> {
        self.members
            .iter()
            .find(|(n, _)| n.is(name))
            .map(|(_, data)| data.as_slice())
    }

    /// Serialize the map into a standalone `PWAD` image.
    pub fn build(&self) -> Vec<u8> {
        let mut w = WadWriter::new(WadKind::Pwad);
        for (name, data) in &self.members {
            w.push(*name, data.clone());
        }
        w.finish()
    }
}

/// Accumulates the records of a map until [`MAP_LUMP_COUNT`] are in.
#[derive(Debug)]
struct MapBuilder {
    map: MapResource,
}

impl MapBuilder {
    fn new(name: LumpName) -> Self {
        Self {
            map: MapResource {
                name,
                members: vec![(name, Vec::new())],
            },
        }
    }

    /// Records consumed so far, not counting the marker.
    fn consumed(&self) -> usize {
        self.map.members.len() - 1
    }

    fn push(&mut self, name: LumpName, data: Vec<u8>) {
        self.map.members.push((name, data));
    }

    fn is_complete(&self) -> bool {
        self.consumed() == MAP_LUMP_COUNT
    }
}

/// A scanned directory item.
#[derive(Debug, Clone)]
pub enum WadEntry {
    Lump(WadLump),
    Map(MapResource),
}

impl WadEntry {
    pub fn name(&self) -> LumpName {
        match self {
            WadEntry::Lump(l) => l.name,
            WadEntry::Map(m) => m.name,
        }
    }

    pub fn section(&self) -> Section {
        match self {
            WadEntry::Lump(l) => l.section,
            WadEntry::Map(_) => Section::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Begin(Section),
    End,
    EndOfWad,
    Map,
    Unknown,
}

impl Marker {
    fn classify(name: &LumpName) -> Self {
        match name.as_bytes() {
            b"T_START" | b"TT_START" => Marker::Begin(Section::Textures),
            b"G_START" => Marker::Begin(Section::Graphics),
            b"S_START" => Marker::Begin(Section::Sprites),
            b"DS_START" => Marker::Begin(Section::Sounds),
            b"T_END" | b"TT_END" | b"G_END" | b"S_END" | b"DS_END" => Marker::End,
            b"ENDOFWAD" => Marker::EndOfWad,
            _ if name.starts_with(MAP_PREFIX) => Marker::Map,
            _ => Marker::Unknown,
        }
    }
}

/// Directory scanner state.
#[derive(Debug)]
enum ScanState {
    /// Ordinary records are tagged with the current section.
    Scan(Section),
    /// Records are swallowed into a map; `resume` is restored afterwards.
    Aggregate { resume: Section, map: MapBuilder },
    /// `ENDOFWAD` was seen.
    Done,
}

/// Parsed WAD directory (metadata plus eagerly-read map contents).
#[derive(Debug)]
pub struct WadDirectory {
    pub header: WadHeader,
    /// Lumps and maps in directory order. Markers are not included.
    pub entries: Vec<WadEntry>,
    /// Names of lumps found inside the textures section.
    pub textures: Vec<LumpName>,
}

impl WadDirectory {
    /// Parse a WAD from `r`.
    ///
    /// The package must start at offset 0 of `r`; all directory offsets are
    /// absolute.
    pub fn parse<R: Read + Seek>(r: &mut R) -> Result<Self> {
        r.seek(SeekFrom::Start(0))?;
        let header = WadHeader::parse(r)?;
        let file_len = r.seek(SeekFrom::End(0))?;

        let table_end = header.table_offset as u64 + header.record_count as u64 * RECORD_SIZE as u64;
        if (header.table_offset as u64) < HEADER_SIZE as u64 && header.record_count > 0 {
            return Err(Error::InvalidRange);
        }
        if table_end > file_len {
            let available = file_len.saturating_sub(header.table_offset as u64) / RECORD_SIZE as u64;
            return Err(Error::DirectoryTruncated {
                declared: header.record_count,
                read: available as u32,
            });
        }

        let mut entries = Vec::new();
        let mut textures = Vec::new();
        let mut state = ScanState::Scan(Section::Normal);

        for index in 0..header.record_count {
            if let ScanState::Done = state {
                break;
            }
            let pos = header.table_offset as u64 + index as u64 * RECORD_SIZE as u64;
            r.seek(SeekFrom::Start(pos))?;
            let record = DirRecord::parse(r, header.le).map_err(|e| match e {
                Error::UnexpectedEof => Error::DirectoryTruncated {
                    declared: header.record_count,
                    read: index,
                },
                e => e,
            })?;

            state = match state {
                ScanState::Done => ScanState::Done,
                ScanState::Aggregate { resume, mut map } => {
                    debug!("Adding {} to {}", record.name, map.map.name);
                    let data = if record.size == 0 {
                        Vec::new()
                    } else {
                        read_range(r, record.offset as u64, record.size as u64)?
                    };
                    map.push(record.name, data);
                    if map.is_complete() {
                        debug!("Building {}", map.map.name);
                        entries.push(WadEntry::Map(map.map));
                        ScanState::Scan(resume)
                    } else {
                        ScanState::Aggregate { resume, map }
                    }
                }
                ScanState::Scan(section) if record.size == 0 => match Marker::classify(&record.name) {
                    Marker::Begin(next) => ScanState::Scan(next),
                    Marker::End => ScanState::Scan(Section::Normal),
                    Marker::EndOfWad => ScanState::Done,
                    Marker::Map => ScanState::Aggregate {
                        resume: section,
                        map: MapBuilder::new(record.name),
                    },
                    Marker::Unknown => {
                        warn!("Unknown WAD directory '{}'", record.name);
                        ScanState::Scan(section)
                    }
                },
                ScanState::Scan(section) => {
                    let offset = record.offset as u64;
                    let size = record.size as u64;
                    if offset + size > file_len {
                        return Err(Error::InvalidRange);
                    }
                    if section == Section::Textures {
                        textures.push(record.name);
                    }
                    entries.push(WadEntry::Lump(WadLump {
                        name: record.name,
                        section,
                        offset,
                        size,
                    }));
                    ScanState::Scan(section)
                }
            };
        }

        if let ScanState::Aggregate { map, .. } = state {
            return Err(Error::MapAggregationIncomplete {
                map: map.map.name.to_string(),
                consumed: map.consumed(),
            });
        }

        Ok(Self {
            header,
            entries,
            textures,
        })
    }
}

/// Builds a little-endian WAD image in memory.
///
/// Lump data is laid out in push order directly after the header; the
/// directory follows the data.
#[derive(Debug)]
pub struct WadWriter {
    kind: WadKind,
    lumps: Vec<(LumpName, Vec<u8>)>,
}

impl WadWriter {
    pub fn new(kind: WadKind) -> Self {
        Self {
            kind,
            lumps: Vec::new(),
        }
    }

    /// Append a lump. An empty `data` produces a marker record.
    pub fn push(&mut self, name: LumpName, data: Vec<u8>) -> &mut Self {
        self.lumps.push((name, data));
        self
    }

    pub fn finish(&self) -> Vec<u8> {
        let data_len: usize = self.lumps.iter().map(|(_, d)| d.len()).sum();
        let table_offset = HEADER_SIZE as usize + data_len;
        let mut out = Vec::with_capacity(table_offset + self.lumps.len() * RECORD_SIZE as usize);

        out.extend_from_slice(match self.kind {
            WadKind::Iwad => b"IWAD",
            WadKind::Pwad => b"PWAD",
        });
        out.extend_from_slice(&(self.lumps.len() as u32).to_le_bytes());
        out.extend_from_slice(&(table_offset as u32).to_le_bytes());

        let mut offsets = Vec::with_capacity(self.lumps.len());
        for (_, data) in &self.lumps {
            offsets.push(if data.is_empty() { 0 } else { out.len() as u32 });
            out.extend_from_slice(data);
        }

        for ((name, data), offset) in self.lumps.iter().zip(offsets) {
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&name.raw());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::io::Cursor;

    fn name(s: &str) -> LumpName {
        LumpName::new(s).unwrap()
    }

    fn wad(lumps: &[(&str, &str)]) -> Cursor<Vec<u8>> {
        let mut w = WadWriter::new(WadKind::Iwad);
        for (n, d) in lumps {
            w.push(name(n), d.as_bytes().to_vec());
        }
        Cursor::new(w.finish())
    }

    fn map_run(marker: &'static str, count: usize) -> Vec<(&'static str, &'static str)> {
        const PARTS: [&str; MAP_LUMP_COUNT] = [
            "THINGS", "LINEDEFS", "SIDEDEFS", "VERTEXES", "SEGS", "SSECTORS", "NODES", "SECTORS",
            "REJECT", "BLOCKMAP", "LEAFS", "LIGHTS", "MACROS",
        ];
        let mut v = vec![(marker, "")];
        v.extend(PARTS.iter().take(count).map(|p| (*p, "data")));
        v
    }

    #[test]
    fn sections_follow_markers() {
        let mut c = wad(&[
            ("PLAYPAL", "pal"),
            ("T_START", ""),
            ("BRICK", "tex"),
            ("T_END", ""),
            ("S_START", ""),
            ("TROOA1", "spr"),
            ("S_END", ""),
            ("DEMO1", "demo"),
        ]);
        let dir = WadDirectory::parse(&mut c).unwrap();
        let got: Vec<_> = dir.entries.iter().map(|e| (e.name().to_string(), e.section())).collect();
        assert_eq!(
            got,
            vec![
                ("PLAYPAL".into(), Section::Normal),
                ("BRICK".into(), Section::Textures),
                ("TROOA1".into(), Section::Sprites),
                ("DEMO1".into(), Section::Normal),
            ]
        );
        assert_eq!(dir.textures, vec![name("BRICK")]);
    }

    #[test]
    fn endofwad_stops_scan() {
        let mut c = wad(&[("A", "1"), ("ENDOFWAD", ""), ("B", "2")]);
        let dir = WadDirectory::parse(&mut c).unwrap();
        assert_eq!(dir.entries.len(), 1);
        assert_eq!(dir.entries[0].name(), name("A"));
    }

    #[test]
    fn unknown_marker_is_skipped() {
        let mut c = wad(&[("F_START", ""), ("A", "1")]);
        let dir = WadDirectory::parse(&mut c).unwrap();
        assert_eq!(dir.entries.len(), 1);
        assert_eq!(dir.entries[0].section(), Section::Normal);
    }

    #[test]
    fn map_swallows_thirteen_records() {
        let mut lumps = vec![("PLAYPAL", "pal")];
        lumps.extend(map_run("MAP01", MAP_LUMP_COUNT));
        lumps.push(("AFTER", "x"));
        let dir = WadDirectory::parse(&mut wad(&lumps)).unwrap();

        let names: BTreeSet<_> = dir.entries.iter().map(|e| e.name().to_string()).collect();
        let expected: BTreeSet<_> = ["PLAYPAL", "MAP01", "AFTER"].into_iter().map(String::from).collect();
        assert_eq!(names, expected);

        let WadEntry::Map(map) = &dir.entries[1] else {
            panic!("expected map entry");
        };
        assert_eq!(map.members().len(), MAP_LUMP_COUNT + 1);
        assert_eq!(map.member("MACROS"), Some(b"data".as_slice()));
    }

    #[test]
    fn map_counts_empty_members() {
        let mut lumps = map_run("MAP02", MAP_LUMP_COUNT - 1);
        lumps.push(("ENDOFWAD", ""));
        lumps.push(("NEXT", "n"));
        let dir = WadDirectory::parse(&mut wad(&lumps)).unwrap();
        // ENDOFWAD is the 13th member, so NEXT is an ordinary lump.
        assert_eq!(dir.entries.len(), 2);
        assert_eq!(dir.entries[1].name(), name("NEXT"));
    }

    #[test]
    fn short_map_run_is_an_error() {
        let lumps = map_run("MAP01", MAP_LUMP_COUNT - 1);
        let err = WadDirectory::parse(&mut wad(&lumps)).unwrap_err();
        assert!(matches!(
            err,
            Error::MapAggregationIncomplete { ref map, consumed: 12 } if map == "MAP01"
        ));
    }

    #[test]
    fn map_resumes_previous_section() {
        let mut lumps = vec![("G_START", "")];
        lumps.extend(map_run("MAP03", MAP_LUMP_COUNT));
        lumps.push(("TITLE", "gfx"));
        let dir = WadDirectory::parse(&mut wad(&lumps)).unwrap();
        assert_eq!(dir.entries.last().unwrap().section(), Section::Graphics);
    }

    #[test]
    fn built_map_reparses_as_one_map() {
        let dir = WadDirectory::parse(&mut wad(&map_run("MAP04", MAP_LUMP_COUNT))).unwrap();
        let WadEntry::Map(map) = &dir.entries[0] else {
            panic!("expected map entry");
        };
        let rebuilt = WadDirectory::parse(&mut Cursor::new(map.build())).unwrap();
        assert_eq!(rebuilt.header.kind, WadKind::Pwad);
        assert_eq!(rebuilt.entries.len(), 1);
        assert_eq!(rebuilt.entries[0].name(), name("MAP04"));
    }

    #[test]
    fn truncated_table() {
        let mut bytes = wad(&[("A", "1"), ("B", "2")]).into_inner();
        bytes.truncate(bytes.len() - 8);
        let err = WadDirectory::parse(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::DirectoryTruncated { declared: 2, read: 1 }));
    }

    #[test]
    fn reversed_magic_reads_big_endian() {
        let mut bytes = b"DAWP".to_vec();
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.push(0xAB);
        bytes.extend_from_slice(&12u32.to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(b"ONE\0\0\0\0\0");
        let dir = WadDirectory::parse(&mut Cursor::new(bytes)).unwrap();
        assert!(!dir.header.le);
        let WadEntry::Lump(lump) = &dir.entries[0] else {
            panic!("expected lump");
        };
        assert_eq!((lump.offset, lump.size), (12, 1));
    }

    #[test]
    fn foreign_magic_is_rejected() {
        let mut c = Cursor::new(b"PK\x03\x04\0\0\0\0\0\0\0\0".to_vec());
        assert!(matches!(WadDirectory::parse(&mut c), Err(Error::BadMagic)));
    }
}
