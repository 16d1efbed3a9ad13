//! Parsers for the container formats that carry Doom 64 data.
//!
//! Each submodule targets one format family. All parsers follow the same
//! conventions:
//!
//! * **Generic over** [`std::io::Read`] + [`std::io::Seek`] - pass a [`std::fs::File`], a
//!   [`std::io::Cursor`], or anything else that implements both traits.
//! * **Directory first** - `parse` reads headers and builds an in-memory
//!   description of the contents. Lump data is read on demand, except for
//!   map members, which are gathered while the directory is scanned.
//! * **Owned windows** - [`n64rom::RomImage`] hands out each data blob as a
//!   fresh [`std::io::Cursor`], already normalized to native byte order.
//! * **Compression is separate** - archive members are inflated through
//!   [`crate::compression`].
//!
//! ## Format overview
//!
//! | Module     | Format      | Description |
//! |------------|-------------|-------------|
//! | [`wad`]    | IWAD / PWAD | Lump directory with section markers and 13-record maps |
//! | [`zip`]    | PK3 / ZIP   | Folder-structured archive; stored, deflated or zstd members |
//! | [`n64rom`] | Z64 / V64   | Doom 64 cartridge dump; holds an IWAD plus audio blobs at fixed offsets |

pub mod n64rom;
pub mod wad;
pub mod zip;
