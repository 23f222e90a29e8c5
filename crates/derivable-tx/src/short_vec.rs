//! Compact length encoding and a byte cursor for wire decoding.
//!
//! Lengths are written 7 bits at a time, least significant group first, with
//! the high bit of each byte set while more groups follow:
//!
//! ```text
//! 0x0000..=0x007f  -> 1 byte
//! 0x0080..=0x3fff  -> 2 bytes
//! 0x4000..=0xffff  -> 3 bytes
//! ```

use crate::error::TxError;

/// Encode a length in compact form.
pub fn encode_length(len: usize) -> Vec<u8> {
    let mut rem = len;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if rem == 0 {
            break;
        }
    }

    out
}

/// Decode a compact length from the front of `data`.
///
/// Returns `(value, bytes_consumed)`. At most three bytes are read and the
/// value must fit in a `u16`.
pub fn decode_length(data: &[u8]) -> Result<(usize, usize), TxError> {
    let mut value: u32 = 0;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            TxError::Deserialization("unexpected end of data while decoding compact-u16".into())
        })?;
        value |= ((byte & 0x7f) as u32) << (7 * consumed);
        consumed += 1;

        if byte & 0x80 == 0 {
            break;
        }
        if consumed >= 3 {
            return Err(TxError::Deserialization("compact-u16 too long".into()));
        }
    }

    if value > u16::MAX as u32 {
        return Err(TxError::Deserialization("compact-u16 value overflow".into()));
    }

    Ok((value as usize, consumed))
}

/// Forward-only reader over a wire buffer.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn peek_u8(&self) -> Result<u8, TxError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| TxError::Deserialization("unexpected end of data".into()))
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, TxError> {
        let byte = self.peek_u8()?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_length(&mut self) -> Result<usize, TxError> {
        let (value, consumed) = decode_length(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], TxError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                TxError::Deserialization(format!(
                    "need {len} bytes at offset {}, have {}",
                    self.pos,
                    self.data.len() - self.pos
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N], TxError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Compact length followed by that many raw bytes.
    pub(crate) fn read_vec(&mut self) -> Result<Vec<u8>, TxError> {
        let len = self.read_length()?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    pub(crate) fn finish(&self) -> Result<(), TxError> {
        if self.pos != self.data.len() {
            return Err(TxError::Deserialization(format!(
                "{} trailing bytes",
                self.data.len() - self.pos
            )));
        }
        Ok(())
    }
}
