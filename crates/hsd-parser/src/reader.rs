//! Length-prefixed block walking.
//!
//! Every header block starts with a 1-byte block number and a 2-byte
//! little-endian length that counts the whole block, prefix included.
//! [`BlockReader`] always advances by that declared length, whatever the
//! caller managed to decode from the body, so blocks that grow in later
//! format versions (or that we do not understand at all) are stepped over
//! intact.

use bytes::Buf;

use crate::error::{HsdError, HsdResult};

/// Size of the block number + block length prefix.
pub const BLOCK_PREFIX_LEN: usize = 3;

/// One header block, borrowed from the input.
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    /// Header block number (1-11 in current files).
    pub number: u8,
    /// Length declared in the block prefix, prefix included.
    pub declared_length: u16,
    /// Byte offset of the block within the input.
    pub offset: usize,
    body: &'a [u8],
}

impl<'a> Block<'a> {
    /// Reader over the body (everything after the 3-byte prefix).
    pub fn fields(&self) -> FieldReader<'a> {
        FieldReader {
            block: self.number,
            declared: self.declared_length,
            buf: self.body,
        }
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }
}

/// Sequential reader over the blocks of a header.
#[derive(Debug, Clone)]
pub struct BlockReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BlockReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes after the last block read.
    pub fn remainder(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Read the next block prefix and step past the whole declared block.
    pub fn next_block(&mut self) -> HsdResult<Block<'a>> {
        let rest = self.remainder();
        if rest.len() < BLOCK_PREFIX_LEN {
            return Err(HsdError::Truncated {
                offset: self.pos,
                needed: BLOCK_PREFIX_LEN,
                available: rest.len(),
            });
        }

        let mut prefix = &rest[..BLOCK_PREFIX_LEN];
        let number = prefix.get_u8();
        let declared_length = prefix.get_u16_le();
        let length = declared_length as usize;

        if length < BLOCK_PREFIX_LEN {
            return Err(HsdError::BlockLength {
                block: number,
                declared: declared_length,
                reason: "shorter than the block prefix".to_string(),
            });
        }
        if length > rest.len() {
            return Err(HsdError::Truncated {
                offset: self.pos,
                needed: length,
                available: rest.len(),
            });
        }

        let block = Block {
            number,
            declared_length,
            offset: self.pos,
            body: &rest[BLOCK_PREFIX_LEN..length],
        };
        self.pos += length;
        Ok(block)
    }
}

/// Little-endian fixed-width field reader bounded by one block body.
///
/// Reading past the declared block length is a [`HsdError::BlockLength`]
/// error rather than a read into the next block.
#[derive(Debug)]
pub struct FieldReader<'a> {
    block: u8,
    declared: u16,
    buf: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn ensure(&self, needed: usize) -> HsdResult<()> {
        if self.buf.remaining() < needed {
            return Err(HsdError::BlockLength {
                block: self.block,
                declared: self.declared,
                reason: format!(
                    "fixed layout needs {} more bytes than the block holds",
                    needed - self.buf.remaining()
                ),
            });
        }
        Ok(())
    }

    pub fn u8(&mut self) -> HsdResult<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self) -> HsdResult<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn u32(&mut self) -> HsdResult<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn f32(&mut self) -> HsdResult<f32> {
        self.ensure(4)?;
        Ok(self.buf.get_f32_le())
    }

    pub fn f64(&mut self) -> HsdResult<f64> {
        self.ensure(8)?;
        Ok(self.buf.get_f64_le())
    }

    /// Fixed-width ASCII field with trailing NULs and blanks removed.
    pub fn ascii(&mut self, width: usize) -> HsdResult<String> {
        self.ensure(width)?;
        let raw = &self.buf[..width];
        self.buf.advance(width);
        Ok(String::from_utf8_lossy(raw)
            .trim_end_matches('\0')
            .trim_end()
            .to_string())
    }

    pub fn skip(&mut self, width: usize) -> HsdResult<()> {
        self.ensure(width)?;
        self.buf.advance(width);
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }
}
