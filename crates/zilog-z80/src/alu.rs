//! Flag-producing arithmetic for the Z80.
//!
//! Every function is pure: callers decide which of the returned flags to
//! merge into F.

#![allow(clippy::cast_possible_truncation)] // Low-byte extraction.

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, carry_if, sz53, sz53p};

/// An 8-bit result and the flags it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

const fn half(set: bool) -> u8 {
    if set { HF } else { 0 }
}

const fn overflow(set: bool) -> u8 {
    if set { PF } else { 0 }
}

/// `ADD`/`ADC`.
#[must_use]
pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let wide = u16::from(a) + u16::from(b) + u16::from(c);
    let value = wide as u8;
    let flags = sz53(value)
        | half((a & 0x0F) + (b & 0x0F) + c > 0x0F)
        | overflow((a ^ b) & 0x80 == 0 && (a ^ value) & 0x80 != 0)
        | carry_if(wide > 0xFF);
    AluResult { value, flags }
}

/// `SUB`/`SBC`.
#[must_use]
pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let value = a.wrapping_sub(b).wrapping_sub(c);
    let flags = NF
        | sz53(value)
        | half((a & 0x0F) < (b & 0x0F) + c)
        | overflow((a ^ b) & 0x80 != 0 && (a ^ value) & 0x80 != 0)
        | carry_if(u16::from(a) < u16::from(b) + u16::from(c));
    AluResult { value, flags }
}

/// `CP`: a subtraction whose X/Y flags come from the operand.
#[must_use]
pub fn cp8(a: u8, b: u8) -> AluResult {
    let result = sub8(a, b, false);
    AluResult {
        value: a,
        flags: (result.flags & !(YF | XF)) | (b & (YF | XF)),
    }
}

#[must_use]
pub fn and8(a: u8, b: u8) -> AluResult {
    let value = a & b;
    AluResult { value, flags: sz53p(value) | HF }
}

#[must_use]
pub fn or8(a: u8, b: u8) -> AluResult {
    let value = a | b;
    AluResult { value, flags: sz53p(value) }
}

#[must_use]
pub fn xor8(a: u8, b: u8) -> AluResult {
    let value = a ^ b;
    AluResult { value, flags: sz53p(value) }
}

/// Dispatch on the 3-bit ALU field of `10 ooo rrr` and `11 ooo 110`.
///
/// Returns the new accumulator (unchanged for `CP`) and the full flag byte.
#[must_use]
pub fn arith(op: u8, a: u8, b: u8, carry: bool) -> AluResult {
    match op & 7 {
        0 => add8(a, b, false),
        1 => add8(a, b, carry),
        2 => sub8(a, b, false),
        3 => sub8(a, b, carry),
        4 => and8(a, b),
        5 => xor8(a, b),
        6 => or8(a, b),
        7 => cp8(a, b),
        _ => unreachable!(),
    }
}

/// `INC r`. Carry is not touched and is left out of `flags`.
#[must_use]
pub fn inc8(a: u8) -> AluResult {
    let value = a.wrapping_add(1);
    let flags = sz53(value) | half(a & 0x0F == 0x0F) | overflow(a == 0x7F);
    AluResult { value, flags }
}

/// `DEC r`. Carry is not touched and is left out of `flags`.
#[must_use]
pub fn dec8(a: u8) -> AluResult {
    let value = a.wrapping_sub(1);
    let flags = NF | sz53(value) | half(a & 0x0F == 0) | overflow(a == 0x80);
    AluResult { value, flags }
}

/// CB-prefix rotates and shifts, selected by the 3-bit field of `00 ooo rrr`:
/// `RLC RRC RL RR SLA SRA SLL SRL`.
#[must_use]
pub fn shift(op: u8, v: u8, carry: bool) -> AluResult {
    let (value, out) = match op & 7 {
        0 => (v.rotate_left(1), v & 0x80 != 0),
        1 => (v.rotate_right(1), v & 1 != 0),
        2 => ((v << 1) | u8::from(carry), v & 0x80 != 0),
        3 => ((v >> 1) | (u8::from(carry) << 7), v & 1 != 0),
        4 => (v << 1, v & 0x80 != 0),
        5 => ((v >> 1) | (v & 0x80), v & 1 != 0),
        6 => ((v << 1) | 1, v & 0x80 != 0),
        7 => (v >> 1, v & 1 != 0),
        _ => unreachable!(),
    };
    AluResult { value, flags: sz53p(value) | carry_if(out) }
}

/// `DAA`, given the accumulator and the current flags.
#[must_use]
pub fn daa(a: u8, f: u8) -> AluResult {
    let subtract = f & NF != 0;
    let mut correction = 0;
    let mut carry = f & CF != 0;
    if f & HF != 0 || a & 0x0F > 9 {
        correction |= 0x06;
    }
    if carry || a > 0x99 {
        correction |= 0x60;
        carry = true;
    }
    let value = if subtract {
        a.wrapping_sub(correction)
    } else {
        a.wrapping_add(correction)
    };
    let half_carry = if subtract {
        f & HF != 0 && a & 0x0F < 6
    } else {
        a & 0x0F > 9
    };
    let flags = sz53p(value) | (f & NF) | carry_if(carry) | half(half_carry);
    AluResult { value, flags }
}

/// `ADD HL,rr` (and the IX/IY forms). Only H, C and the X/Y bits are
/// produced; S, Z and P/V are the caller's to keep.
#[must_use]
pub fn add16(a: u16, b: u16) -> (u16, u8) {
    let wide = u32::from(a) + u32::from(b);
    let value = wide as u16;
    let flags = ((value >> 8) as u8 & (YF | XF))
        | half((a & 0x0FFF) + (b & 0x0FFF) > 0x0FFF)
        | carry_if(wide > 0xFFFF);
    (value, flags)
}

fn wide_flags(value: u16) -> u8 {
    let hi = (value >> 8) as u8;
    (hi & (SF | YF | XF)) | if value == 0 { ZF } else { 0 }
}

/// `ADC HL,rr`.
#[must_use]
pub fn adc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let c = u16::from(carry);
    let wide = u32::from(a) + u32::from(b) + u32::from(c);
    let value = wide as u16;
    let flags = wide_flags(value)
        | half((a & 0x0FFF) + (b & 0x0FFF) + c > 0x0FFF)
        | overflow((a ^ b) & 0x8000 == 0 && (a ^ value) & 0x8000 != 0)
        | carry_if(wide > 0xFFFF);
    (value, flags)
}

/// `SBC HL,rr`.
#[must_use]
pub fn sbc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let c = u16::from(carry);
    let value = a.wrapping_sub(b).wrapping_sub(c);
    let flags = NF
        | wide_flags(value)
        | half((a & 0x0FFF) < (b & 0x0FFF) + c)
        | overflow((a ^ b) & 0x8000 != 0 && (a ^ value) & 0x8000 != 0)
        | carry_if(u32::from(a) < u32::from(b) + u32::from(c));
    (value, flags)
}
