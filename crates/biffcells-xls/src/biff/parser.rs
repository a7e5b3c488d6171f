//! Low-level binary parsing helpers for BIFF record bodies.
//!
//! All multi-byte integers in BIFF are little-endian.

use crate::error::{XlsError, XlsResult};

/// A forward-only cursor over one record body.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Ascending offsets where CONTINUE bodies start
    continues: &'a [usize],
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_continues(data, &[])
    }

    /// A cursor over a merged body whose CONTINUE bodies start at `continues`.
    pub fn with_continues(data: &'a [u8], continues: &'a [usize]) -> Self {
        Self {
            data,
            pos: 0,
            continues,
        }
    }

    /// True if the cursor sits exactly at the start of a CONTINUE body.
    pub fn at_continue(&self) -> bool {
        self.continues.binary_search(&self.pos).is_ok()
    }

    /// Bytes left before the next CONTINUE boundary (or the end of the body).
    pub fn remaining_in_fragment(&self) -> usize {
        let end = self
            .continues
            .iter()
            .copied()
            .find(|&c| c > self.pos)
            .unwrap_or(self.data.len());
        end.min(self.data.len()).saturating_sub(self.pos)
    }

    /// Current offset into the body.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the current offset.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    fn need(&self, n: usize) -> XlsResult<()> {
        if self.remaining() < n {
            return Err(XlsError::Parse(format!(
                "unexpected end of data at offset {}, need {} byte{}",
                self.pos,
                n,
                if n == 1 { "" } else { "s" }
            )));
        }
        Ok(())
    }

    /// Borrow the next `n` bytes, advancing past them.
    #[inline]
    pub fn bytes(&mut self, n: usize) -> XlsResult<&'a [u8]> {
        self.need(n)?;
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    #[inline]
    pub fn skip(&mut self, n: usize) -> XlsResult<()> {
        self.bytes(n).map(|_| ())
    }

    #[inline]
    pub fn u8(&mut self) -> XlsResult<u8> {
        self.need(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    #[inline]
    pub fn u16(&mut self) -> XlsResult<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    #[inline]
    pub fn u32(&mut self) -> XlsResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read an IEEE 754 double.
    #[inline]
    pub fn f64(&mut self) -> XlsResult<f64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.bytes(8)?);
        Ok(f64::from_le_bytes(buf))
    }

    /// Read a 4-byte RK value and decode it.
    #[inline]
    pub fn rk(&mut self) -> XlsResult<f64> {
        self.u32().map(decode_rk)
    }

    /// Read a fixed 8-byte block (e.g. a FORMULA cached result).
    #[inline]
    pub fn array8(&mut self) -> XlsResult<[u8; 8]> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.bytes(8)?);
        Ok(buf)
    }
}

/// Decode an RK-encoded number.
///
/// RK encoding (4 bytes):
/// - Bit 0: if 1, the decoded number should be divided by 100
/// - Bit 1: if 1, bits 2..31 are a signed 30-bit integer;
///          if 0, bits 2..31 are the upper 30 bits of an IEEE 754 double
///          whose lower 34 bits are zero
#[inline]
pub fn decode_rk(rk: u32) -> f64 {
    let value = if rk & 0x02 != 0 {
        ((rk as i32) >> 2) as f64
    } else {
        f64::from_bits(((rk & 0xFFFF_FFFC) as u64) << 32)
    };

    if rk & 0x01 != 0 {
        value / 100.0
    } else {
        value
    }
}
