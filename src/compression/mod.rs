//! Decompression helpers for archive members.
//!
//! Deflate is always available since nearly every PK3 uses it. Zstandard is
//! gated behind the `compression` Cargo feature:
//!
//! ```toml
//! [dependencies]
//! wadkit = { version = "0.1", features = ["compression"] }
//! ```
//!
//! ## Submodules
//!
//! | Module | Algorithm | ZIP method |
//! |--------|-----------|------------|
//! | [`inflate`] | Raw deflate | 8 |
//! | [`zstd`]    | Zstandard   | 93 |

pub mod inflate;

#[cfg(feature = "compression")]
pub mod zstd;
