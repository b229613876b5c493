//! Standard ROM header blocks.

use std::fmt;

/// What a header describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Program,
    NumberArray,
    CharacterArray,
    Code,
    Other(u8),
}

impl From<u8> for HeaderKind {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Program,
            1 => Self::NumberArray,
            2 => Self::CharacterArray,
            3 => Self::Code,
            other => Self::Other(other),
        }
    }
}

/// The 17 data bytes of a flag-$00 block.
///
/// `param1` is the autostart line for programs and the load address for
/// code. `param2` is the program length without variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub kind: HeaderKind,
    /// File name with trailing padding removed.
    pub name: String,
    pub length: u16,
    pub param1: u16,
    pub param2: u16,
}

impl Header {
    pub const LEN: usize = 17;

    /// Decode header data. Returns `None` unless exactly 17 bytes are given.
    #[must_use]
    pub fn decode(data: &[u8]) -> Option<Self> {
        let data: &[u8; Self::LEN] = data.try_into().ok()?;
        let word = |at: usize| u16::from_le_bytes([data[at], data[at + 1]]);
        let name = data[1..11]
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { char::from(b) } else { '?' })
            .collect::<String>()
            .trim_end()
            .to_owned();
        Some(Self {
            kind: HeaderKind::from(data[0]),
            name,
            length: word(11),
            param1: word(13),
            param2: word(15),
        })
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            HeaderKind::Program => write!(f, "Program: {} ({} bytes)", self.name, self.length),
            HeaderKind::NumberArray => write!(f, "Number array: {}", self.name),
            HeaderKind::CharacterArray => write!(f, "Character array: {}", self.name),
            HeaderKind::Code => write!(
                f,
                "Bytes: {} ({} bytes at {})",
                self.name, self.length, self.param1
            ),
            HeaderKind::Other(kind) => write!(f, "Type {kind}: {}", self.name),
        }
    }
}
