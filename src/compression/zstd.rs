//! Zstandard decompression (requires the `compression` feature).
//!
//! Some PK3 producers store members with ZIP method 93, where each member is
//! one complete Zstd frame.

#![cfg(feature = "compression")]

use std::io;

use super::inflate::MAX_RATIO;
use crate::{Error, Result};

/// Decompress a Zstandard frame when the decompressed size is known ahead of
/// time.
///
/// Returns [`Error::Zstd`] if the decoder cannot be initialised or the output
/// size does not match. Pre-allocation is capped like the deflate path.
pub fn decompress_zstd_with_size(data: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(decompressed_size.min(data.len().saturating_mul(MAX_RATIO)));
    let mut decoder = zstd::Decoder::new(data).map_err(|_| Error::Zstd)?;
    io::copy(&mut decoder, &mut out).map_err(|_| Error::Zstd)?;
    if out.len() != decompressed_size {
        return Err(Error::Zstd);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_must_match() {
        let packed = zstd::encode_all(&[7u8; 100][..], 0).unwrap();
        assert_eq!(decompress_zstd_with_size(&packed, 100).unwrap(), [7u8; 100]);
        assert!(matches!(decompress_zstd_with_size(&packed, 99), Err(Error::Zstd)));
        assert!(matches!(
            decompress_zstd_with_size(&packed, u32::MAX as usize),
            Err(Error::Zstd)
        ));
    }
}
