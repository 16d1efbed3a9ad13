//! Raw deflate decompression (ZIP method 8).

use std::io::Read;

use flate2::read::DeflateDecoder;

use crate::{Error, Result};

/// Pre-allocation cap, as a multiple of the compressed length.
pub const MAX_RATIO: usize = 8;

/// Inflate a raw deflate stream whose decompressed size is known.
///
/// Returns [`Error::Inflate`] if the stream is corrupt or does not produce
/// exactly `size` bytes. The declared size only bounds the up-front
/// allocation by [`MAX_RATIO`] times the input length.
pub fn decompress_deflate(data: &[u8], size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(size.min(data.len().saturating_mul(MAX_RATIO)));
    DeflateDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|_| Error::Inflate)?;
    if out.len() != size {
        return Err(Error::Inflate);
    }
    Ok(out)
}
