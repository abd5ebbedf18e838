//! Bounds-checked big-endian cursor over the mapped dump
//!
//! Every read either succeeds or fails with `HeapError::Malformed` carrying the
//! offset where the data ran out, so a truncated dump never panics.

use heapscope_common::SUPPORTED_VERSIONS;

use crate::domain::{HeapError, IdSize, ObjectId, Result};

/// Cursor over a byte slice with the dump's identifier size
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    id_size: IdSize,
}

impl<'a> ByteReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8], id_size: IdSize) -> Self {
        Self { data, pos: 0, id_size }
    }

    /// Start reading at `offset` (may equal the slice length)
    ///
    /// # Errors
    /// Returns `Malformed` if `offset` is past the end of the data
    pub fn at(data: &'a [u8], offset: usize, id_size: IdSize) -> Result<Self> {
        if offset > data.len() {
            return Err(HeapError::malformed(offset, "offset past end of dump"));
        }
        Ok(Self { data, pos: offset, id_size })
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn id_size(&self) -> IdSize {
        self.id_size
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `len` bytes and advance past them
    ///
    /// # Errors
    /// Returns `Malformed` if fewer than `len` bytes remain
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                HeapError::malformed(
                    self.pos,
                    format!("needed {len} bytes, {} remain", self.remaining()),
                )
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// # Errors
    /// Returns `Malformed` if fewer than `len` bytes remain
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.bytes(len).map(|_| ())
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.array().map(u16::from_be_bytes)
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.array().map(u32::from_be_bytes)
    }

    pub fn u64(&mut self) -> Result<u64> {
        self.array().map(u64::from_be_bytes)
    }

    pub fn i8(&mut self) -> Result<i8> {
        self.array().map(i8::from_be_bytes)
    }

    pub fn i16(&mut self) -> Result<i16> {
        self.array().map(i16::from_be_bytes)
    }

    pub fn i32(&mut self) -> Result<i32> {
        self.array().map(i32::from_be_bytes)
    }

    pub fn i64(&mut self) -> Result<i64> {
        self.array().map(i64::from_be_bytes)
    }

    pub fn f32(&mut self) -> Result<f32> {
        self.array().map(f32::from_be_bytes)
    }

    pub fn f64(&mut self) -> Result<f64> {
        self.array().map(f64::from_be_bytes)
    }

    /// Read one identifier, widening 4-byte identifiers
    pub fn id(&mut self) -> Result<ObjectId> {
        let raw = match self.id_size {
            IdSize::Four => u64::from(self.u32()?),
            IdSize::Eight => self.u64()?,
        };
        Ok(ObjectId(raw))
    }

    /// Length field read as `usize`
    pub fn len_u32(&mut self) -> Result<usize> {
        let len = self.u32()?;
        usize::try_from(len).map_err(|_| HeapError::malformed(self.pos - 4, "length overflows usize"))
    }
}

/// Parsed dump header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HprofHeader {
    pub version: String,
    pub id_size: IdSize,
    pub timestamp_ms: u64,
    /// Offset of the first record
    pub records_offset: usize,
}

/// Parse the header at the start of a dump
///
/// # Errors
/// Returns `Malformed` for an unknown version string, an identifier size
/// other than 4 or 8, or a header cut short
pub fn parse_header(data: &[u8]) -> Result<HprofHeader> {
    let nul = data
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| HeapError::malformed(0, "missing header version terminator"))?;
    let version = String::from_utf8_lossy(&data[..nul]).into_owned();
    if !SUPPORTED_VERSIONS.contains(&version.as_str()) {
        return Err(HeapError::malformed(0, format!("unsupported version {version:?}")));
    }

    // The identifier size is needed before the reader exists; read it with a
    // provisional width, identifiers are not read until the header is done.
    let mut reader = ByteReader::at(data, nul + 1, IdSize::Four)?;
    let raw_id_size = reader.u32()?;
    let id_size = IdSize::from_header(raw_id_size).ok_or_else(|| {
        HeapError::malformed(nul + 1, format!("unsupported identifier size {raw_id_size}"))
    })?;
    let timestamp_ms = reader.u64()?;

    Ok(HprofHeader { version, id_size, timestamp_ms, records_offset: reader.position() })
}
