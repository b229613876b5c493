//! CB-prefixed rotates, shifts and bit operations, plus the DDCB/FDCB forms.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use emu_core::Bus;

use super::Z80;
use super::dispatch::{BITS, INDEXED_BITS};
use crate::alu;
use crate::flags::{CF, HF, PF, SF, XF, YF, ZF};

pub(super) fn prefix_bits(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    let op = cpu.fetch_opcode(bus);
    let entry = &BITS[usize::from(op)];
    entry.cycles + (entry.exec)(cpu, bus, op)
}

/// DD CB d op / FD CB d op. The displacement precedes the opcode, and
/// neither byte is an M1 fetch, so R only counts the two prefixes.
pub(super) fn prefix_indexed_bits(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    let d = cpu.imm8(bus) as i8;
    let op = cpu.imm8(bus);
    cpu.regs.wz = cpu.index_reg().wrapping_add_signed(i16::from(d));
    let entry = &INDEXED_BITS[usize::from(op)];
    entry.cycles + (entry.exec)(cpu, bus, op)
}

fn bit_flags(f: u8, bit: u8, value: u8, xy: u8) -> u8 {
    let tested = value & (1 << bit);
    let zero = if tested == 0 { ZF | PF } else { 0 };
    (f & CF) | HF | zero | (tested & SF) | (xy & (XF | YF))
}

fn res_set_value(op: u8, value: u8) -> u8 {
    let mask = 1 << ((op >> 3) & 7);
    if op & 0x40 == 0 { value & !mask } else { value | mask }
}

pub(super) fn shift(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let r = op & 7;
    let carry = cpu.carry();
    let result = if r == 6 {
        let addr = cpu.regs.hl();
        let value = cpu.read_byte(bus, addr);
        let result = alu::shift(op >> 3, value, carry);
        cpu.write_byte(bus, addr, result.value);
        result
    } else {
        let result = alu::shift(op >> 3, cpu.plain_reg8(r), carry);
        cpu.set_plain_reg8(r, result.value);
        result
    };
    cpu.set_f(result.flags);
    0
}

/// BIT n,r takes X/Y from the operand; BIT n,(HL) takes them from WZ.
pub(super) fn bit(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let r = op & 7;
    let (value, xy) = if r == 6 {
        let value = cpu.read_byte(bus, cpu.regs.hl());
        (value, (cpu.regs.wz >> 8) as u8)
    } else {
        let value = cpu.plain_reg8(r);
        (value, value)
    };
    cpu.set_f(bit_flags(cpu.regs.f, (op >> 3) & 7, value, xy));
    0
}

pub(super) fn res_set(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let r = op & 7;
    if r == 6 {
        let addr = cpu.regs.hl();
        let value = cpu.read_byte(bus, addr);
        cpu.write_byte(bus, addr, res_set_value(op, value));
    } else {
        cpu.set_plain_reg8(r, res_set_value(op, cpu.plain_reg8(r)));
    }
    0
}

// The indexed forms always operate on (IX+d), whose address is already in
// WZ. Unless the register field is 6, the result is also copied into that
// register.

pub(super) fn indexed_shift(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let addr = cpu.regs.wz;
    let value = cpu.read_byte(bus, addr);
    let result = alu::shift(op >> 3, value, cpu.carry());
    cpu.write_byte(bus, addr, result.value);
    cpu.set_plain_reg8(op & 7, result.value);
    cpu.set_f(result.flags);
    0
}

pub(super) fn indexed_bit(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let addr = cpu.regs.wz;
    let value = cpu.read_byte(bus, addr);
    cpu.set_f(bit_flags(cpu.regs.f, (op >> 3) & 7, value, (addr >> 8) as u8));
    0
}

pub(super) fn indexed_res_set(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let addr = cpu.regs.wz;
    let value = res_set_value(op, cpu.read_byte(bus, addr));
    cpu.write_byte(bus, addr, value);
    cpu.set_plain_reg8(op & 7, value);
    0
}
