//! Z80 flag register bits.

/// Sign flag (bit 7).
pub const SF: u8 = 0b1000_0000;

/// Zero flag (bit 6).
pub const ZF: u8 = 0b0100_0000;

/// Undocumented flag (bit 5), usually a copy of bit 5 of the result.
pub const YF: u8 = 0b0010_0000;

/// Half-carry flag (bit 4).
pub const HF: u8 = 0b0001_0000;

/// Undocumented flag (bit 3), usually a copy of bit 3 of the result.
pub const XF: u8 = 0b0000_1000;

/// Parity/overflow flag (bit 2).
pub const PF: u8 = 0b0000_0100;

/// Add/subtract flag (bit 1).
pub const NF: u8 = 0b0000_0010;

/// Carry flag (bit 0).
pub const CF: u8 = 0b0000_0001;

/// Sign, zero and the two undocumented bits for `value`.
#[must_use]
pub const fn sz53(value: u8) -> u8 {
    let zero = if value == 0 { ZF } else { 0 };
    zero | (value & (SF | YF | XF))
}

/// As [`sz53`], plus even parity in `PF`.
#[must_use]
pub const fn sz53p(value: u8) -> u8 {
    let parity = if value.count_ones().is_multiple_of(2) { PF } else { 0 };
    sz53(value) | parity
}

/// `CF` when `set`, otherwise zero.
#[must_use]
pub const fn carry_if(set: bool) -> u8 {
    if set { CF } else { 0 }
}
