//! ED-prefixed instructions.

#![allow(clippy::cast_possible_truncation)]

use emu_core::Bus;

use super::Z80;
use super::dispatch::EXTENDED;
use crate::alu;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, carry_if, sz53, sz53p};

pub(super) fn prefix_extended(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    let op = cpu.fetch_opcode(bus);
    let entry = &EXTENDED[usize::from(op)];
    entry.cycles + (entry.exec)(cpu, bus, op)
}

/// Undefined ED opcodes do nothing.
pub(super) fn nop(_cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    0
}

/// IN r,(C). Code 6 only sets flags.
pub(super) fn in_r_c(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let port = cpu.regs.bc();
    let value = cpu.port_in(bus, port);
    cpu.regs.wz = port.wrapping_add(1);
    cpu.set_plain_reg8(op >> 3, value);
    cpu.set_f((cpu.regs.f & CF) | sz53p(value));
    0
}

/// OUT (C),r. Code 6 outputs zero on NMOS parts.
pub(super) fn out_c_r(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let port = cpu.regs.bc();
    let value = cpu.plain_reg8(op >> 3);
    cpu.port_out(bus, port, value);
    cpu.regs.wz = port.wrapping_add(1);
    0
}

pub(super) fn sbc_hl(cpu: &mut Z80, _bus: &mut dyn Bus, op: u8) -> u8 {
    let hl = cpu.regs.hl();
    cpu.regs.wz = hl.wrapping_add(1);
    let (value, flags) = alu::sbc16(hl, cpu.reg16(op >> 4), cpu.carry());
    cpu.regs.set_hl(value);
    cpu.set_f(flags);
    0
}

pub(super) fn adc_hl(cpu: &mut Z80, _bus: &mut dyn Bus, op: u8) -> u8 {
    let hl = cpu.regs.hl();
    cpu.regs.wz = hl.wrapping_add(1);
    let (value, flags) = alu::adc16(hl, cpu.reg16(op >> 4), cpu.carry());
    cpu.regs.set_hl(value);
    cpu.set_f(flags);
    0
}

/// LD (nn),rr
pub(super) fn ld_nn_rp(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let addr = cpu.imm16(bus);
    cpu.write_word(bus, addr, cpu.reg16(op >> 4));
    cpu.regs.wz = addr.wrapping_add(1);
    0
}

/// LD rr,(nn)
pub(super) fn ld_rp_nn(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let addr = cpu.imm16(bus);
    let value = cpu.read_word(bus, addr);
    cpu.set_reg16(op >> 4, value);
    cpu.regs.wz = addr.wrapping_add(1);
    0
}

pub(super) fn neg(cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    let result = alu::sub8(0, cpu.regs.a, false);
    cpu.regs.a = result.value;
    cpu.set_f(result.flags);
    0
}

/// RETN and RETI (and their mirrors): both restore IFF1 from IFF2.
pub(super) fn retn(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    cpu.regs.iff1 = cpu.regs.iff2;
    cpu.regs.pc = cpu.pop(bus);
    cpu.regs.wz = cpu.regs.pc;
    0
}

pub(super) fn im(cpu: &mut Z80, _bus: &mut dyn Bus, op: u8) -> u8 {
    cpu.regs.im = match (op >> 3) & 3 {
        2 => 1,
        3 => 2,
        _ => 0,
    };
    0
}

/// LD I,A / LD R,A / LD A,I / LD A,R
pub(super) fn ld_special(cpu: &mut Z80, _bus: &mut dyn Bus, op: u8) -> u8 {
    match op {
        0x47 => cpu.regs.i = cpu.regs.a,
        0x4F => cpu.regs.r = cpu.regs.a,
        _ => {
            let value = if op == 0x57 { cpu.regs.i } else { cpu.regs.r };
            cpu.regs.a = value;
            let parity = if cpu.regs.iff2 { PF } else { 0 };
            cpu.set_f((cpu.regs.f & CF) | sz53(value) | parity);
        }
    }
    0
}

/// RRD / RLD: rotate a BCD digit between A and (HL).
pub(super) fn rotate_digit(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let hl = cpu.regs.hl();
    let mem = cpu.read_byte(bus, hl);
    let a = cpu.regs.a;
    let (new_a, new_mem) = if op == 0x67 {
        ((a & 0xF0) | (mem & 0x0F), (a << 4) | (mem >> 4))
    } else {
        ((a & 0xF0) | (mem >> 4), (mem << 4) | (a & 0x0F))
    };
    cpu.write_byte(bus, hl, new_mem);
    cpu.regs.a = new_a;
    cpu.regs.wz = hl.wrapping_add(1);
    cpu.set_f((cpu.regs.f & CF) | sz53p(new_a));
    0
}

// Block instructions. Bit 3 of the opcode selects decrement, bit 4 repeat.
// A repeating instruction rewinds PC onto itself and costs 5 extra T-states;
// on that path X/Y come from the high byte of PC.

fn step_of(op: u8) -> u16 {
    if op & 0x08 == 0 { 1 } else { 0xFFFF }
}

fn repeats(op: u8) -> bool {
    op & 0x10 != 0
}

fn repeat(cpu: &mut Z80) -> u8 {
    cpu.regs.pc = cpu.regs.pc.wrapping_sub(2);
    cpu.regs.wz = cpu.regs.pc.wrapping_add(1);
    (cpu.regs.pc >> 8) as u8 & (XF | YF)
}

/// X/Y after a non-repeating LDI or CPI: bit 3 and bit 1 of `n`.
fn block_xy(n: u8) -> u8 {
    (n & XF) | if n & 0x02 != 0 { YF } else { 0 }
}

/// LDI LDD LDIR LDDR
pub(super) fn block_load(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let step = step_of(op);
    let hl = cpu.regs.hl();
    let de = cpu.regs.de();
    let value = cpu.read_byte(bus, hl);
    cpu.write_byte(bus, de, value);
    cpu.regs.set_hl(hl.wrapping_add(step));
    cpu.regs.set_de(de.wrapping_add(step));
    cpu.regs.set_bc(cpu.regs.bc().wrapping_sub(1));

    let more = cpu.regs.bc() != 0;
    let flags = (cpu.regs.f & (SF | ZF | CF)) | if more { PF } else { 0 };
    if repeats(op) && more {
        let xy = repeat(cpu);
        cpu.set_f(flags | xy);
        return 5;
    }
    cpu.set_f(flags | block_xy(value.wrapping_add(cpu.regs.a)));
    0
}

/// CPI CPD CPIR CPDR
pub(super) fn block_compare(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let step = step_of(op);
    let hl = cpu.regs.hl();
    let value = cpu.read_byte(bus, hl);
    let result = cpu.regs.a.wrapping_sub(value);
    let half = (cpu.regs.a & 0x0F) < (value & 0x0F);
    cpu.regs.set_hl(hl.wrapping_add(step));
    cpu.regs.set_bc(cpu.regs.bc().wrapping_sub(1));
    cpu.regs.wz = cpu.regs.wz.wrapping_add(step);

    let more = cpu.regs.bc() != 0;
    let flags = (cpu.regs.f & CF)
        | NF
        | (sz53(result) & !(XF | YF))
        | if half { HF } else { 0 }
        | if more { PF } else { 0 };
    if repeats(op) && more && result != 0 {
        let xy = repeat(cpu);
        cpu.set_f(flags | xy);
        return 5;
    }
    cpu.set_f(flags | block_xy(result.wrapping_sub(u8::from(half))));
    0
}

/// Flags shared by INI/OUTI and their variants, where `k` is the byte moved
/// plus C±1 (input) or L (output).
fn block_io_flags(cpu: &mut Z80, op: u8, value: u8, k: u16) -> u8 {
    let b = cpu.regs.b;
    let overflow = k > 0xFF;
    let nf = if value & 0x80 != 0 { NF } else { 0 };
    let p = (k as u8 & 7) ^ b;
    if repeats(op) && b != 0 {
        let xy = repeat(cpu);
        let (half, parity) = if overflow && nf != 0 {
            let half = if b & 0x0F == 0 { HF } else { 0 };
            (half, sz53p(p ^ (b.wrapping_sub(1) & 7)) & PF)
        } else if overflow {
            let half = if b & 0x0F == 0x0F { HF } else { 0 };
            (half, sz53p(p ^ (b.wrapping_add(1) & 7)) & PF)
        } else {
            (0, sz53p(p ^ (b & 7)) & PF)
        };
        cpu.set_f((b & SF) | xy | nf | carry_if(overflow) | half | parity);
        return 5;
    }
    let carries = if overflow { HF | CF } else { 0 };
    cpu.set_f(sz53(b) | nf | carries | (sz53p(p) & PF));
    0
}

/// INI IND INIR INDR
pub(super) fn block_in(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let step = step_of(op);
    let port = cpu.regs.bc();
    cpu.regs.wz = port.wrapping_add(step);
    let value = cpu.port_in(bus, port);
    let hl = cpu.regs.hl();
    cpu.write_byte(bus, hl, value);
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    cpu.regs.set_hl(hl.wrapping_add(step));
    let k = u16::from(value) + u16::from(cpu.regs.c.wrapping_add(step as u8));
    block_io_flags(cpu, op, value, k)
}

/// OUTI OUTD OTIR OTDR. B is decremented before it reaches the port.
pub(super) fn block_out(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let step = step_of(op);
    let hl = cpu.regs.hl();
    let value = cpu.read_byte(bus, hl);
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    let port = cpu.regs.bc();
    cpu.regs.wz = port.wrapping_add(step);
    cpu.port_out(bus, port, value);
    cpu.regs.set_hl(hl.wrapping_add(step));
    let k = u16::from(value) + u16::from(cpu.regs.l);
    block_io_flags(cpu, op, value, k)
}
