// Bounds-checked reader over an in-memory byte buffer

use crate::error::{Error, Result};
use crate::utils::encoding::TextEncoding;
use crate::utils::io;

/// Tracks a read position over a byte slice. Every read past the end is a
/// [`Error::Truncated`] instead of a panic.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Self { src, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.src.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume `n` bytes and return them as a slice.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Truncated {
                needed: n - self.remaining(),
            });
        }
        let slice = &self.src[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Consume everything left.
    pub fn take_rest(&mut self) -> &'a [u8] {
        let rest = &self.src[self.pos..];
        self.pos = self.src.len();
        rest
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    pub fn peek(&self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Truncated {
                needed: n - self.remaining(),
            });
        }
        Ok(&self.src[self.pos..self.pos + n])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.take(N)?);
        Ok(arr)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_be_u16(&mut self) -> Result<u16> {
        Ok(io::be_u16(self.read_array()?))
    }

    pub fn read_be_u24(&mut self) -> Result<u32> {
        Ok(io::be_u24(self.read_array()?))
    }

    pub fn read_be_u32(&mut self) -> Result<u32> {
        Ok(io::be_u32(self.read_array()?))
    }

    pub fn read_le_u32(&mut self) -> Result<u32> {
        Ok(io::le_u32(self.read_array()?))
    }

    pub fn read_le_u64(&mut self) -> Result<u64> {
        Ok(io::le_u64(self.read_array()?))
    }

    pub fn read_synchsafe_u32(&mut self) -> Result<u32> {
        Ok(io::synchsafe_to_u32(self.read_array()?))
    }

    /// Read a length-prefixed (u32 little-endian) byte string.
    pub fn read_le_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_le_u32()? as usize;
        self.take(len)
    }

    /// Read a length-prefixed (u32 big-endian) byte string.
    pub fn read_be_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_be_u32()? as usize;
        self.take(len)
    }

    /// Read bytes up to the encoding's terminator, consuming the terminator.
    ///
    /// Two-byte encodings are scanned in aligned 2-byte units so a zero high or
    /// low byte inside a code unit is never taken for a terminator. A missing
    /// terminator yields the rest of the buffer.
    pub fn read_terminated(&mut self, encoding: TextEncoding) -> &'a [u8] {
        let rest = &self.src[self.pos..];
        let width = encoding.terminator_len();

        let end = if width == 1 {
            rest.iter().position(|&b| b == 0)
        } else {
            rest.chunks_exact(2)
                .position(|unit| unit == [0, 0])
                .map(|unit| unit * 2)
        };

        match end {
            Some(end) => {
                self.pos += end + width;
                &rest[..end]
            }
            None => self.take_rest(),
        }
    }
}
