//! Z80 register file.

#![allow(clippy::cast_possible_truncation)] // Low-byte extraction.

/// Complete register state, also used as the inspection snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    pub a_alt: u8,
    pub f_alt: u8,
    pub b_alt: u8,
    pub c_alt: u8,
    pub d_alt: u8,
    pub e_alt: u8,
    pub h_alt: u8,
    pub l_alt: u8,

    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    pub r: u8,

    /// WZ (MEMPTR). Leaks into the X/Y flags of `BIT n,(HL)`.
    pub wz: u16,

    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    pub halted: bool,
}

impl Default for Registers {
    /// Power-on state: AF and SP all ones, everything else clear.
    fn default() -> Self {
        Self {
            a: 0xFF,
            f: 0xFF,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            a_alt: 0xFF,
            f_alt: 0xFF,
            b_alt: 0,
            c_alt: 0,
            d_alt: 0,
            e_alt: 0,
            h_alt: 0,
            l_alt: 0,
            ix: 0xFFFF,
            iy: 0xFFFF,
            sp: 0xFFFF,
            pc: 0,
            i: 0,
            r: 0,
            wz: 0,
            iff1: false,
            iff2: false,
            im: 0,
            halted: false,
        }
    }
}

const fn pair(hi: u8, lo: u8) -> u16 {
    (hi as u16) << 8 | lo as u16
}

impl Registers {
    #[must_use]
    pub const fn af(&self) -> u16 {
        pair(self.a, self.f)
    }

    #[must_use]
    pub const fn bc(&self) -> u16 {
        pair(self.b, self.c)
    }

    #[must_use]
    pub const fn de(&self) -> u16 {
        pair(self.d, self.e)
    }

    #[must_use]
    pub const fn hl(&self) -> u16 {
        pair(self.h, self.l)
    }

    pub fn set_af(&mut self, value: u16) {
        self.a = (value >> 8) as u8;
        self.f = value as u8;
    }

    pub fn set_bc(&mut self, value: u16) {
        self.b = (value >> 8) as u8;
        self.c = value as u8;
    }

    pub fn set_de(&mut self, value: u16) {
        self.d = (value >> 8) as u8;
        self.e = value as u8;
    }

    pub fn set_hl(&mut self, value: u16) {
        self.h = (value >> 8) as u8;
        self.l = value as u8;
    }

    /// `EX AF,AF'`.
    pub fn swap_af(&mut self) {
        std::mem::swap(&mut self.a, &mut self.a_alt);
        std::mem::swap(&mut self.f, &mut self.f_alt);
    }

    /// `EXX`: swap BC, DE and HL with their alternates.
    pub fn exx(&mut self) {
        std::mem::swap(&mut self.b, &mut self.b_alt);
        std::mem::swap(&mut self.c, &mut self.c_alt);
        std::mem::swap(&mut self.d, &mut self.d_alt);
        std::mem::swap(&mut self.e, &mut self.e_alt);
        std::mem::swap(&mut self.h, &mut self.h_alt);
        std::mem::swap(&mut self.l, &mut self.l_alt);
    }

    /// Bump the refresh counter. Bit 7 is only ever changed by `LD R,A`.
    pub fn bump_r(&mut self) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_split_high_and_low() {
        let mut regs = Registers::default();
        regs.set_hl(0x1234);
        assert_eq!((regs.h, regs.l), (0x12, 0x34));
        assert_eq!(regs.hl(), 0x1234);
    }

    #[test]
    fn refresh_counter_keeps_bit_seven() {
        let mut regs = Registers {
            r: 0xFF,
            ..Registers::default()
        };
        regs.bump_r();
        assert_eq!(regs.r, 0x80);
    }

    #[test]
    fn exx_leaves_af_alone() {
        let mut regs = Registers::default();
        regs.set_bc(0x0102);
        regs.set_af(0x3344);
        regs.exx();
        assert_eq!(regs.bc(), 0);
        assert_eq!(regs.b_alt, 0x01);
        assert_eq!(regs.af(), 0x3344);
    }
}
