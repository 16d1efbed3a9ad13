//! ZIP / PK3 - the generic archive.
//!
//! Only the subset needed for read-only asset access is parsed: the
//! end-of-central-directory record, the central directory, and each member's
//! local header (to find where its data starts). Multi-disk archives and
//! ZIP64 are rejected.
//!
//! ## End Of Central Directory (0x16 bytes + comment)
//! ```text
//! [0x00] Magic "PK\x05\x06"        (4 bytes)
//! [0x04] DiskNumber                (u16 LE)
//! [0x06] CentralDirDisk            (u16 LE)
//! [0x08] EntriesOnDisk             (u16 LE)
//! [0x0A] TotalEntries              (u16 LE)
//! [0x0C] CentralDirSize            (u32 LE)
//! [0x10] CentralDirOffset          (u32 LE)
//! [0x14] CommentLength             (u16 LE)
//! ```
//!
//! ## Central Directory Entry (0x2E bytes + name + extra + comment)
//! ```text
//! [0x00] Magic "PK\x01\x02"        (4 bytes)
//! [0x04] VersionMadeBy / Needed    (2 × u16 LE)
//! [0x08] Flags                     (u16 LE)
//! [0x0A] Method                    (u16 LE; 0 = stored, 8 = deflate, 93 = zstd)
//! [0x0C] ModTime / ModDate         (2 × u16 LE)
//! [0x10] CRC-32                    (u32 LE)
//! [0x14] CompressedSize            (u32 LE)
//! [0x18] UncompressedSize          (u32 LE)
//! [0x1C] NameLength                (u16 LE)
//! [0x1E] ExtraLength               (u16 LE)
//! [0x20] CommentLength             (u16 LE)
//! [0x22] DiskStart / Attributes    (u16 + u16 + u32)
//! [0x2A] LocalHeaderOffset         (u32 LE)
//! ```
//!
//! ## Local Header (0x1E bytes + name + extra)
//! The data of a member begins right after its local header's name and extra
//! field, whose lengths may differ from the central directory copy.

use std::io::{Read, Seek, SeekFrom, Write};

use flate2::Compression;
use flate2::write::DeflateEncoder;

use crate::compression::inflate::decompress_deflate;
use crate::utils::{bytesa, bytesv, le_u16, le_u32, magic, read_range};
use crate::{Error, Result};

/// Local file header signature; also the first four bytes of any archive.
pub const LOCAL_MAGIC: [u8; 4] = *b"PK\x03\x04";
const CENTRAL_MAGIC: [u8; 4] = *b"PK\x01\x02";
const EOCD_MAGIC: [u8; 4] = *b"PK\x05\x06";
const EOCD_SIZE: u64 = 0x16;
const MAX_COMMENT: u64 = 0xFFFF;

/// Storage method of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Stored,
    Deflate,
    Zstd,
    Other(u16),
}

impl From<u16> for Method {
    fn from(v: u16) -> Self {
        match v {
            0 => Method::Stored,
            8 => Method::Deflate,
            93 => Method::Zstd,
            other => Method::Other(other),
        }
    }
}

/// Metadata for one archive member.
#[derive(Debug, Clone)]
pub struct ZipMember {
    /// Full path inside the archive, `/`-separated.
    pub path: String,
    pub method: Method,
    pub crc32: u32,
    pub compressed_size: u64,
    pub size: u64,
    pub local_offset: u64,
}

impl ZipMember {
    pub fn is_dir(&self) -> bool {
        self.path.ends_with('/')
    }

    /// The first path component, if the member sits inside a folder.
    pub fn folder(&self) -> Option<&str> {
        self.path.split_once('/').map(|(top, _)| top)
    }

    /// The final path component without its extension.
    pub fn stem(&self) -> &str {
        let file = self.path.rsplit('/').next().unwrap_or(&self.path);
        match file.rfind('.') {
            Some(0) | None => file,
            Some(dot) => &file[..dot],
        }
    }
}

/// Parsed central directory (metadata only).
#[derive(Debug)]
pub struct ZipArchive {
    /// All members in central-directory order, directories included.
    pub members: Vec<ZipMember>,
}

impl ZipArchive {
    /// Parse the central directory of the archive in `r`.
    pub fn parse<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let eocd = find_eocd(r)?;
        r.seek(SeekFrom::Start(eocd + 4))?;
        let disk = le_u16(r)?;
        let cd_disk = le_u16(r)?;
        let _entries_on_disk = le_u16(r)?;
        let total = le_u16(r)?;
        let cd_size = le_u32(r)?;
        let cd_offset = le_u32(r)?;
        if disk != 0 || cd_disk != 0 {
            return Err(Error::Parse("multi-disk zip archives are not supported"));
        }
        if cd_offset == u32::MAX || cd_offset as u64 + cd_size as u64 > eocd {
            return Err(Error::InvalidRange);
        }

        r.seek(SeekFrom::Start(cd_offset as u64))?;
        let mut members = Vec::with_capacity(total as usize);
        for _ in 0..total {
            magic(r, &CENTRAL_MAGIC)?;
            let _versions = bytesa::<4>(r)?;
            let _flags = le_u16(r)?;
            let method = Method::from(le_u16(r)?);
            let _mtime = bytesa::<4>(r)?;
            let crc32 = le_u32(r)?;
            let compressed_size = le_u32(r)? as u64;
            let size = le_u32(r)? as u64;
            let name_len = le_u16(r)? as usize;
            let extra_len = le_u16(r)? as i64;
            let comment_len = le_u16(r)? as i64;
            let _disk_start = le_u16(r)?;
            let _attrs = bytesa::<6>(r)?;
            let local_offset = le_u32(r)? as u64;
            let name = bytesv(r, name_len)?;
            r.seek(SeekFrom::Current(extra_len + comment_len))?;

            members.push(ZipMember {
                path: String::from_utf8_lossy(&name).replace('\\', "/"),
                method,
                crc32,
                compressed_size,
                size,
                local_offset,
            });
        }

        Ok(Self { members })
    }

    /// Find a member by exact path.
    pub fn get(&self, path: &str) -> Option<&ZipMember> {
        self.members.iter().find(|m| m.path == path)
    }
}

/// Read and decompress one member, verifying its CRC-32.
pub fn read_member<R: Read + Seek + ?Sized>(r: &mut R, member: &ZipMember) -> Result<Vec<u8>> {
    r.seek(SeekFrom::Start(member.local_offset))?;
    magic(r, &LOCAL_MAGIC)?;
    r.seek(SeekFrom::Current(0x16))?;
    let name_len = le_u16(r)? as u64;
    let extra_len = le_u16(r)? as u64;
    let data_offset = member.local_offset + 0x1E + name_len + extra_len;

    let raw = read_range(r, data_offset, member.compressed_size)?;
    let data = match member.method {
        Method::Stored => raw,
        Method::Deflate => decompress_deflate(&raw, member.size as usize)?,
        #[cfg(feature = "compression")]
        Method::Zstd => crate::compression::zstd::decompress_zstd_with_size(&raw, member.size as usize)?,
        #[cfg(not(feature = "compression"))]
        Method::Zstd => return Err(Error::Parse("zstd members need the compression feature")),
        Method::Other(_) => return Err(Error::Parse("unsupported zip compression method")),
    };

    if crc32fast::hash(&data) != member.crc32 {
        return Err(Error::Parse("zip member crc mismatch"));
    }
    Ok(data)
}

/// Locate the end-of-central-directory record by scanning backwards over
/// any trailing comment.
fn find_eocd<R: Read + Seek>(r: &mut R) -> Result<u64> {
    let len = r.seek(SeekFrom::End(0))?;
    if len < EOCD_SIZE {
        return Err(Error::BadMagic);
    }
    let window = len.min(EOCD_SIZE + MAX_COMMENT);
    let start = len - window;
    let tail = read_range(r, start, window)?;
    tail.windows(4)
        .rposition(|w| w == EOCD_MAGIC)
        .filter(|&pos| pos as u64 + EOCD_SIZE <= window)
        .map(|pos| start + pos as u64)
        .ok_or(Error::BadMagic)
}

/// Builds a ZIP image in memory.
///
/// Only what the reader understands is produced: single disk, no ZIP64, no
/// data descriptors.
#[derive(Debug, Default)]
pub struct ZipWriter {
    out: Vec<u8>,
    central: Vec<u8>,
    count: u16,
}

impl ZipWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a member stored without compression.
    pub fn stored(&mut self, path: &str, data: &[u8]) -> &mut Self {
        self.push(path, data, 0, data.to_vec())
    }

    /// Append a deflate-compressed member.
    pub fn deflated(&mut self, path: &str, data: &[u8]) -> Result<&mut Self> {
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data)?;
        let packed = enc.finish()?;
        Ok(self.push(path, data, 8, packed))
    }

    fn push(&mut self, path: &str, data: &[u8], method: u16, packed: Vec<u8>) -> &mut Self {
        let crc = crc32fast::hash(data);
        let offset = self.out.len() as u32;

        // Fields shared by the local header and the central entry.
        let mut common = Vec::with_capacity(0x1A);
        common.extend_from_slice(&20u16.to_le_bytes());
        common.extend_from_slice(&0u16.to_le_bytes());
        common.extend_from_slice(&method.to_le_bytes());
        common.extend_from_slice(&[0; 4]);
        common.extend_from_slice(&crc.to_le_bytes());
        common.extend_from_slice(&(packed.len() as u32).to_le_bytes());
        common.extend_from_slice(&(data.len() as u32).to_le_bytes());
        common.extend_from_slice(&(path.len() as u16).to_le_bytes());

        self.out.extend_from_slice(&LOCAL_MAGIC);
        self.out.extend_from_slice(&common);
        self.out.extend_from_slice(&0u16.to_le_bytes());
        self.out.extend_from_slice(path.as_bytes());
        self.out.extend_from_slice(&packed);

        self.central.extend_from_slice(&CENTRAL_MAGIC);
        self.central.extend_from_slice(&20u16.to_le_bytes());
        self.central.extend_from_slice(&common);
        self.central.extend_from_slice(&[0; 12]);
        self.central.extend_from_slice(&offset.to_le_bytes());
        self.central.extend_from_slice(path.as_bytes());

        self.count += 1;
        self
    }

    pub fn finish(&self) -> Vec<u8> {
        let mut out = self.out.clone();
        let cd_offset = out.len() as u32;
        out.extend_from_slice(&self.central);
        out.extend_from_slice(&EOCD_MAGIC);
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&(self.central.len() as u32).to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }
}
