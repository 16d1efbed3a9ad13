//! **wadkit** - asset resolution for Doom 64 data files.
//!
//! Game data arrives as a mix of containers: the IWAD embedded in a
//! cartridge dump, loose PWADs, and PK3 archives. wadkit opens each of them,
//! merges their contents into one name-indexed [`namespace::Namespace`], and
//! decodes the image formats stored inside.
//!
//! # Supported formats
//! | Module | Format |
//! |--------|--------|
//! | [`formats::wad`]    | IWAD/PWAD - lump directory with sections and maps |
//! | [`formats::zip`]    | PK3 - ZIP archive, folders mapped to sections |
//! | [`formats::n64rom`] | N64 cartridge image, native or pair-swapped |
//! | [`image::png`]      | PNG (decode and encode) |
//! | [`image::n64texture`] | N64 4-bit wall texture |
//! | [`image::n64gfx`]   | N64 8-bit graphic |
//! | [`image::patch`]    | Column-based sprite patch |
//!
//! # Layout
//! ```text
//! SearchPaths ──► LoaderRegistry ──► Container ─┐
//!                                               ├─► NamespaceBuilder ──► Namespace ──► CodecRegistry
//! AssetConfig ────────────────────► Container ─┘
//! ```

pub mod assets;
pub mod compression;
pub mod config;
pub mod container;
pub mod discovery;
pub mod error;
pub mod formats;
pub mod image;
pub mod name;
pub mod namespace;
pub mod utils;

pub use error::{Error, Result};
