//! Read-only view of the displayed screen page.
//!
//! The first 6144 bytes are the bitmap, 32 bytes per pixel row, with rows
//! interleaved: the offset of row `y` is `Y7Y6 Y2Y1Y0 Y5Y4Y3 00000`. The
//! 768 attribute bytes follow, one per 8×8 cell, in plain row order.

/// Bytes of bitmap.
pub const BITMAP_SIZE: usize = 6144;
/// Bytes of attributes.
pub const ATTRIBUTES_SIZE: usize = 768;

const COLUMNS: usize = 32;
const ROWS: usize = 24;
const PIXEL_ROWS: usize = 192;

/// Borrowed screen memory, valid until the machine runs again.
#[derive(Debug, Clone, Copy)]
pub struct Screen<'a> {
    bytes: &'a [u8],
}

impl<'a> Screen<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Bitmap followed by attributes.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[must_use]
    pub fn bitmap(&self) -> &'a [u8] {
        &self.bytes[..BITMAP_SIZE.min(self.bytes.len())]
    }

    #[must_use]
    pub fn attributes(&self) -> &'a [u8] {
        self.bytes.get(BITMAP_SIZE..).unwrap_or_default()
    }

    /// Attribute of the cell at character `row` (0-23), `col` (0-31).
    #[must_use]
    pub fn attribute(&self, row: usize, col: usize) -> Option<u8> {
        if row >= ROWS || col >= COLUMNS {
            return None;
        }
        self.attributes().get(row * COLUMNS + col).copied()
    }

    /// The 32 bytes of pixel row `y` (0-191).
    #[must_use]
    pub fn bitmap_row(&self, y: usize) -> Option<&'a [u8]> {
        if y >= PIXEL_ROWS {
            return None;
        }
        let offset = ((y & 0xC0) << 5) | ((y & 0x07) << 8) | ((y & 0x38) << 2);
        self.bitmap().get(offset..offset + COLUMNS)
    }

    /// Whether the pixel at (`x`, `y`) is ink.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Option<bool> {
        let byte = self.bitmap_row(y)?.get(x / 8)?;
        Some(byte & (0x80 >> (x % 8)) != 0)
    }
}
