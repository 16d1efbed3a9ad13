//! Low-level I/O primitives shared by all parsers.
//!
//! Each function reads exactly the bytes it promises or returns an error -
//! a short read is always reported as [`Error::UnexpectedEof`].

use std::io::{self, Read, Seek, SeekFrom};

use crate::{Error, Result};

/// Fill `buf` completely, mapping a short read to [`Error::UnexpectedEof`].
#[inline]
pub(crate) fn exact<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
        _ => Error::Io(e),
    })
}

/// Read one byte.
#[inline]
pub(crate) fn u8<R: Read + ?Sized>(r: &mut R) -> Result<u8> {
    Ok(bytesa::<1>(r)?[0])
}

/// Read a little-endian `u16`.
#[inline]
pub(crate) fn le_u16<R: Read + ?Sized>(r: &mut R) -> Result<u16> {
    Ok(u16::from_le_bytes(bytesa(r)?))
}

/// Read a little-endian `u32`.
#[inline]
pub(crate) fn le_u32<R: Read + ?Sized>(r: &mut R) -> Result<u32> {
    Ok(u32::from_le_bytes(bytesa(r)?))
}

/// Read a big-endian `u16`.
#[inline]
pub(crate) fn be_u16<R: Read + ?Sized>(r: &mut R) -> Result<u16> {
    Ok(u16::from_be_bytes(bytesa(r)?))
}

/// Read a big-endian `u32`.
#[inline]
pub(crate) fn be_u32<R: Read + ?Sized>(r: &mut R) -> Result<u32> {
    Ok(u32::from_be_bytes(bytesa(r)?))
}

/// Read a `u32` with caller-supplied endianness.
#[inline]
pub(crate) fn end_u32<R: Read + ?Sized>(r: &mut R, le: bool) -> Result<u32> {
    if le { le_u32(r) } else { be_u32(r) }
}

/// Read exactly `N` bytes into a fixed-size array.
#[inline]
pub(crate) fn bytesa<const N: usize>(r: &mut (impl Read + ?Sized)) -> Result<[u8; N]> {
    let mut b = [0u8; N];
    exact(r, &mut b)?;
    Ok(b)
}

/// Read exactly `len` bytes into a `Vec`.
#[inline]
pub(crate) fn bytesv<R: Read + ?Sized>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut b = vec![0u8; len];
    exact(r, &mut b)?;
    Ok(b)
}

/// Verify that the next `N` bytes in the stream match `expected`.
///
/// Returns [`Error::BadMagic`] on mismatch.
#[inline]
pub(crate) fn magic<R: Read + ?Sized, const N: usize>(r: &mut R, expected: &[u8; N]) -> Result<()> {
    let got = bytesa::<N>(r)?;
    if &got != expected {
        return Err(Error::BadMagic);
    }
    Ok(())
}

/// Read `len` bytes starting at absolute offset `offset`.
///
/// Ranges that run past the end of the stream are reported as
/// [`Error::InvalidRange`] rather than a short read.
pub(crate) fn read_range<R: Read + Seek + ?Sized>(r: &mut R, offset: u64, len: u64) -> Result<Vec<u8>> {
    let end = r.seek(SeekFrom::End(0))?;
    if offset.checked_add(len).is_none_or(|stop| stop > end) {
        return Err(Error::InvalidRange);
    }
    r.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len as usize];
    exact(r, &mut buf)?;
    Ok(buf)
}

/// Exchange every adjacent byte pair in place. A trailing odd byte is left
/// untouched.
pub fn swap_pairs(buf: &mut [u8]) {
    for pair in buf.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}
