//! Library-wide error and result types.

use std::io;
use std::path::PathBuf;

/// Result alias used throughout wadkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Error messages are kept terse; callers that need richer context should
/// wrap `Error` in their own type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A magic/signature field did not match the expected value.
    #[error("bad magic value")]
    BadMagic,
    /// The stream ended before all expected bytes could be read.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// An offset or size field would read outside the valid region.
    #[error("invalid offset or size")]
    InvalidRange,
    /// A structural constraint was violated (message describes which one).
    #[error("parse error: {0}")]
    Parse(&'static str),
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No registered loader claimed the file.
    #[error("unrecognized container: {}", .0.display())]
    ContainerUnrecognized(PathBuf),
    /// The WAD directory holds fewer records than its header declares.
    #[error("directory truncated: {read} of {declared} records")]
    DirectoryTruncated { declared: u32, read: u32 },
    /// The directory ended in the middle of a map's record run.
    #[error("map {map} incomplete: {consumed} of 13 records")]
    MapAggregationIncomplete { map: String, consumed: usize },
    /// The cartridge header name matched none of the reference names.
    #[error("cartridge header not recognized")]
    RomHeaderUnrecognized,
    /// No compiled-in cartridge layout fits the image.
    #[error("no cartridge layout for country {country:#04x}, version {version}")]
    RomLayoutNotFound { country: u8, version: u8 },

    /// The codec exists but does not implement the requested direction.
    #[error("{codec} does not support {operation}")]
    UnsupportedCodecOperation {
        codec: &'static str,
        operation: &'static str,
    },
    /// No codec is registered for the requested format.
    #[error("no codec registered for {0}")]
    UnknownCodec(&'static str),
    /// PNG decoding failed.
    #[error("png decode error: {0}")]
    PngDecode(#[from] png::DecodingError),
    /// PNG encoding failed.
    #[error("png encode error: {0}")]
    PngEncode(#[from] png::EncodingError),
    /// Deflate decompression failed.
    #[error("deflate decompression failed")]
    Inflate,
    /// Zstandard decompression failed.
    #[cfg(feature = "compression")]
    #[error("zstd decompression failed")]
    Zstd,

    /// A lookup by name found nothing.
    #[error("resource not found: {0}")]
    NotFound(String),
    /// No usable base data source exists after discovery and fallback.
    #[error("couldn't find '{0}'")]
    BaseDataNotFound(String),
    /// A configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Whether the failure is local to one candidate source, so the caller
    /// may move on to the next candidate.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ContainerUnrecognized(_) | Error::RomHeaderUnrecognized | Error::NotFound(_)
        )
    }
}
