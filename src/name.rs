//! Resource names and section classification.

use std::fmt;

/// Maximum length of a resource name in bytes.
pub const NAME_LEN: usize = 8;

/// An up-to-8-byte resource name, compared case-insensitively.
///
/// Names are stored NUL-padded and ASCII upper-cased, so the derived
/// `Eq`/`Hash` implementations already ignore case.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LumpName([u8; NAME_LEN]);

impl LumpName {
    /// Build a name from a string. Returns [`None`] if it is longer than
    /// [`NAME_LEN`] bytes or contains a NUL.
    pub fn new(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.len() > NAME_LEN || bytes.contains(&0) {
            return None;
        }
        Some(Self::from_bytes(bytes))
    }

    /// Build a name from a string, clipping it to [`NAME_LEN`] bytes.
    pub fn truncate(name: &str) -> Self {
        let bytes = name.as_bytes();
        let end = bytes
            .iter()
            .take(NAME_LEN)
            .position(|&b| b == 0)
            .unwrap_or(bytes.len().min(NAME_LEN));
        Self::from_bytes(&bytes[..end])
    }

    /// Decode a raw NUL-padded directory field. Everything from the first
    /// NUL onwards is ignored.
    pub fn from_raw(raw: [u8; NAME_LEN]) -> Self {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        Self::from_bytes(&raw[..end])
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let mut out = [0u8; NAME_LEN];
        for (dst, src) in out.iter_mut().zip(bytes) {
            *dst = src.to_ascii_uppercase();
        }
        Self(out)
    }

    /// The raw NUL-padded bytes, as written to a directory record.
    pub fn raw(&self) -> [u8; NAME_LEN] {
        self.0
    }

    /// The significant bytes (without padding).
    pub fn as_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        &self.0[..end]
    }

    /// Whether the name begins with `prefix` (case-insensitive).
    pub fn starts_with(&self, prefix: &str) -> bool {
        let bytes = self.as_bytes();
        bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
    }

    /// Whether the name is exactly `other` (case-insensitive).
    pub fn is(&self, other: &str) -> bool {
        self.as_bytes().eq_ignore_ascii_case(other.as_bytes())
    }
}

impl fmt::Display for LumpName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for LumpName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LumpName({self})")
    }
}

/// Coarse resource kind, assigned by directory markers or archive folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Section {
    #[default]
    Normal,
    Textures,
    Graphics,
    Sprites,
    Sounds,
}

impl Section {
    /// Map a top-level archive folder name to its section.
    pub fn from_folder(folder: &str) -> Self {
        match folder.to_ascii_lowercase().as_str() {
            "textures" => Section::Textures,
            "graphics" => Section::Graphics,
            "sprites" => Section::Sprites,
            "sounds" => Section::Sounds,
            _ => Section::Normal,
        }
    }
}
