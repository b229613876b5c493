//! TAP tape image format.
//!
//! TAP is the simplest Spectrum tape format: a sequence of blocks, each
//! preceded by a 2-byte little-endian length word. A block is a flag byte,
//! the data bytes, and a checksum byte (XOR of flag and data).
//!
//! A typical program is two blocks:
//!   1. Header block (flag $00, 17 bytes of metadata)
//!   2. Data block (flag $FF, the program or bytes themselves)

mod header;

pub use header::{Header, HeaderKind};

use thiserror::Error;

/// Why a TAP image was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TapError {
    #[error("truncated TAP image: expected a 2-byte length at offset {offset}")]
    TruncatedLength { offset: usize },

    #[error("TAP block at offset {offset} has length {length}, minimum is 2 (flag + checksum)")]
    BlockTooShort { offset: usize, length: usize },

    #[error("truncated TAP block at offset {offset}: need {needed} bytes, only {available} remain")]
    TruncatedBlock {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("TAP block at offset {offset}: checksum mismatch (expected ${expected:02X}, got ${actual:02X})")]
    ChecksumMismatch {
        offset: usize,
        expected: u8,
        actual: u8,
    },

    #[error("TAP block {index} is {length} bytes, the length word holds at most 65535")]
    BlockTooLong { index: usize, length: usize },
}

/// XOR of the flag and every data byte.
#[must_use]
pub fn checksum(flag: u8, data: &[u8]) -> u8 {
    data.iter().fold(flag, |acc, &b| acc ^ b)
}

/// A single tape block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapBlock {
    /// $00 for headers, $FF for data. Other values are legal.
    pub flag: u8,
    /// Block data, excluding the flag and checksum bytes.
    pub data: Vec<u8>,
    pub checksum: u8,
}

impl TapBlock {
    /// Build a block, computing its checksum.
    #[must_use]
    pub fn new(flag: u8, data: Vec<u8>) -> Self {
        let checksum = checksum(flag, &data);
        Self { flag, data, checksum }
    }

    /// Flag byte below $80: the ROM loader plays a long header pilot for it.
    #[must_use]
    pub const fn is_header(&self) -> bool {
        self.flag < 0x80
    }

    /// Decode a standard 17-byte header, if this is one.
    #[must_use]
    pub fn header(&self) -> Option<Header> {
        if self.flag == 0x00 {
            Header::decode(&self.data)
        } else {
            None
        }
    }

    /// The bytes as they are recorded on tape: flag, data, checksum.
    pub fn payload(&self) -> impl Iterator<Item = u8> + '_ {
        std::iter::once(self.flag)
            .chain(self.data.iter().copied())
            .chain(std::iter::once(self.checksum))
    }

    /// Byte `index` of [`TapBlock::payload`].
    #[must_use]
    pub fn payload_byte(&self, index: usize) -> Option<u8> {
        match index {
            0 => Some(self.flag),
            i if i <= self.data.len() => Some(self.data[i - 1]),
            i if i == self.data.len() + 1 => Some(self.checksum),
            _ => None,
        }
    }

    /// Length of [`TapBlock::payload`].
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.data.len() + 2
    }
}

/// A parsed TAP image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TapFile {
    pub blocks: Vec<TapBlock>,
}

impl TapFile {
    /// Parse a TAP image. Either every block is valid or nothing is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error for a truncated length word, a block shorter than
    /// flag plus checksum, a length running past the end of the image, or a
    /// checksum mismatch.
    pub fn parse(data: &[u8]) -> Result<Self, TapError> {
        let mut blocks = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            let (Some(&lo), Some(&hi)) = (data.get(offset), data.get(offset + 1)) else {
                return Err(TapError::TruncatedLength { offset });
            };
            let length = usize::from(u16::from_le_bytes([lo, hi]));
            let start = offset + 2;

            if length < 2 {
                return Err(TapError::BlockTooShort { offset, length });
            }
            let Some(body) = data.get(start..start + length) else {
                return Err(TapError::TruncatedBlock {
                    offset,
                    needed: length,
                    available: data.len() - start,
                });
            };

            let flag = body[0];
            let actual = body[length - 1];
            let block_data = &body[1..length - 1];
            let expected = checksum(flag, block_data);
            if expected != actual {
                return Err(TapError::ChecksumMismatch {
                    offset,
                    expected,
                    actual,
                });
            }

            blocks.push(TapBlock {
                flag,
                data: block_data.to_vec(),
                checksum: actual,
            });
            offset = start + length;
        }

        Ok(Self { blocks })
    }

    /// Serialise back to the on-disk layout. Fails if a block's flag, data
    /// and checksum do not fit the 16-bit length word.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TapError> {
        let mut out = Vec::with_capacity(self.blocks.iter().map(|b| b.payload_len() + 2).sum());
        for (index, block) in self.blocks.iter().enumerate() {
            let length = u16::try_from(block.payload_len()).map_err(|_| TapError::BlockTooLong {
                index,
                length: block.payload_len(),
            })?;
            out.extend_from_slice(&length.to_le_bytes());
            out.extend(block.payload());
        }
        Ok(out)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
