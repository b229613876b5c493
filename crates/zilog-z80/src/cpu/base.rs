//! Unprefixed instructions.
//!
//! Handlers that touch HL go through the index-aware helpers, so the DD/FD
//! table reuses them for the IX/IY forms.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use emu_core::Bus;

use super::dispatch::INDEXED;
use super::{Index, Z80};
use crate::alu;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, carry_if};

fn relative_jump(cpu: &mut Z80, d: u8) {
    cpu.regs.pc = cpu.regs.pc.wrapping_add_signed(i16::from(d as i8));
    cpu.regs.wz = cpu.regs.pc;
}

pub(super) fn nop(_cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    0
}

/// DD or FD: select IX or IY for the next opcode if it uses HL.
pub(super) fn prefix_index(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    cpu.index = if op == 0xDD { Index::Ix } else { Index::Iy };
    let next = cpu.peek_opcode(bus);
    match INDEXED[usize::from(next)] {
        Some(entry) => {
            cpu.fetch_opcode(bus);
            entry.cycles + (entry.exec)(cpu, bus, next)
        }
        None => {
            // The prefix is spent; the following opcode runs on its own.
            cpu.index = Index::Hl;
            cpu.int_blocked = true;
            4
        }
    }
}

pub(super) fn ld_rp_nn(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let value = cpu.imm16(bus);
    cpu.set_reg16(op >> 4, value);
    0
}

/// LD (BC),A / LD (DE),A
pub(super) fn ld_indirect_a(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let addr = if op == 0x02 { cpu.regs.bc() } else { cpu.regs.de() };
    cpu.write_byte(bus, addr, cpu.regs.a);
    cpu.regs.wz = (u16::from(cpu.regs.a) << 8) | (addr.wrapping_add(1) & 0x00FF);
    0
}

/// LD A,(BC) / LD A,(DE)
pub(super) fn ld_a_indirect(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let addr = if op == 0x0A { cpu.regs.bc() } else { cpu.regs.de() };
    cpu.regs.a = cpu.read_byte(bus, addr);
    cpu.regs.wz = addr.wrapping_add(1);
    0
}

pub(super) fn inc_rp(cpu: &mut Z80, _bus: &mut dyn Bus, op: u8) -> u8 {
    let rp = op >> 4;
    cpu.set_reg16(rp, cpu.reg16(rp).wrapping_add(1));
    0
}

pub(super) fn dec_rp(cpu: &mut Z80, _bus: &mut dyn Bus, op: u8) -> u8 {
    let rp = op >> 4;
    cpu.set_reg16(rp, cpu.reg16(rp).wrapping_sub(1));
    0
}

pub(super) fn add_hl_rp(cpu: &mut Z80, _bus: &mut dyn Bus, op: u8) -> u8 {
    let hl = cpu.index_reg();
    let rr = cpu.reg16(op >> 4);
    cpu.regs.wz = hl.wrapping_add(1);
    let (value, flags) = alu::add16(hl, rr);
    cpu.set_index_reg(value);
    cpu.set_f((cpu.regs.f & (SF | ZF | PF)) | flags);
    0
}

fn read_modify_write(cpu: &mut Z80, bus: &mut dyn Bus, r: u8, f: fn(u8) -> alu::AluResult) {
    let result = if r == 6 {
        let addr = cpu.operand_addr(bus);
        let value = cpu.read_byte(bus, addr);
        let result = f(value);
        cpu.write_byte(bus, addr, result.value);
        result
    } else {
        let result = f(cpu.reg8(r));
        cpu.set_reg8(r, result.value);
        result
    };
    cpu.set_f((cpu.regs.f & CF) | result.flags);
}

pub(super) fn inc_r(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    read_modify_write(cpu, bus, (op >> 3) & 7, alu::inc8);
    0
}

pub(super) fn dec_r(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    read_modify_write(cpu, bus, (op >> 3) & 7, alu::dec8);
    0
}

pub(super) fn ld_r_n(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let r = (op >> 3) & 7;
    if r == 6 {
        // The displacement comes before the immediate.
        let addr = cpu.operand_addr(bus);
        let n = cpu.imm8(bus);
        cpu.write_byte(bus, addr, n);
    } else {
        let n = cpu.imm8(bus);
        cpu.set_reg8(r, n);
    }
    0
}

/// RLCA, RRCA, RLA, RRA: S, Z and P/V survive.
pub(super) fn rotate_a(cpu: &mut Z80, _bus: &mut dyn Bus, op: u8) -> u8 {
    let result = alu::shift(op >> 3, cpu.regs.a, cpu.carry());
    cpu.regs.a = result.value;
    cpu.set_f(
        (cpu.regs.f & (SF | ZF | PF)) | (result.value & (YF | XF)) | (result.flags & CF),
    );
    0
}

pub(super) fn ex_af(cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    cpu.regs.swap_af();
    0
}

pub(super) fn exx(cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    cpu.regs.exx();
    0
}

pub(super) fn ex_de_hl(cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    let de = cpu.regs.de();
    cpu.regs.set_de(cpu.regs.hl());
    cpu.regs.set_hl(de);
    0
}

pub(super) fn ex_sp_hl(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    let sp = cpu.regs.sp;
    let value = cpu.read_word(bus, sp);
    cpu.write_word(bus, sp, cpu.index_reg());
    cpu.set_index_reg(value);
    cpu.regs.wz = value;
    0
}

pub(super) fn djnz(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    let d = cpu.imm8(bus);
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    if cpu.regs.b == 0 {
        return 0;
    }
    relative_jump(cpu, d);
    5
}

pub(super) fn jr(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    let d = cpu.imm8(bus);
    relative_jump(cpu, d);
    0
}

pub(super) fn jr_cc(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let d = cpu.imm8(bus);
    if !cpu.condition((op >> 3) & 3) {
        return 0;
    }
    relative_jump(cpu, d);
    5
}

pub(super) fn ld_nn_hl(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    let addr = cpu.imm16(bus);
    cpu.write_word(bus, addr, cpu.index_reg());
    cpu.regs.wz = addr.wrapping_add(1);
    0
}

pub(super) fn ld_hl_nn(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    let addr = cpu.imm16(bus);
    let value = cpu.read_word(bus, addr);
    cpu.set_index_reg(value);
    cpu.regs.wz = addr.wrapping_add(1);
    0
}

pub(super) fn ld_nn_a(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    let addr = cpu.imm16(bus);
    cpu.write_byte(bus, addr, cpu.regs.a);
    cpu.regs.wz = (u16::from(cpu.regs.a) << 8) | (addr.wrapping_add(1) & 0x00FF);
    0
}

pub(super) fn ld_a_nn(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    let addr = cpu.imm16(bus);
    cpu.regs.a = cpu.read_byte(bus, addr);
    cpu.regs.wz = addr.wrapping_add(1);
    0
}

pub(super) fn daa(cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    let result = alu::daa(cpu.regs.a, cpu.regs.f);
    cpu.regs.a = result.value;
    cpu.set_f(result.flags);
    0
}

pub(super) fn cpl(cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    cpu.regs.a = !cpu.regs.a;
    cpu.set_f((cpu.regs.f & (SF | ZF | PF | CF)) | HF | NF | (cpu.regs.a & (XF | YF)));
    0
}

/// X/Y for SCF and CCF: from A alone if the previous instruction wrote F,
/// otherwise A OR F.
fn scf_ccf_xy(cpu: &Z80) -> u8 {
    ((cpu.prev_q ^ cpu.regs.f) | cpu.regs.a) & (XF | YF)
}

pub(super) fn scf(cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    cpu.set_f((cpu.regs.f & (SF | ZF | PF)) | CF | scf_ccf_xy(cpu));
    0
}

pub(super) fn ccf(cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    let carry = cpu.carry();
    let half = if carry { HF } else { 0 };
    cpu.set_f((cpu.regs.f & (SF | ZF | PF)) | scf_ccf_xy(cpu) | half | carry_if(!carry));
    0
}

pub(super) fn halt(cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    cpu.regs.halted = true;
    0
}

/// LD r,r' including the (HL) forms. With an index prefix, a memory operand
/// becomes (IX+d) and the other side keeps plain H or L.
pub(super) fn ld_r_r(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let dst = (op >> 3) & 7;
    let src = op & 7;
    if src == 6 {
        let addr = cpu.operand_addr(bus);
        let value = cpu.read_byte(bus, addr);
        cpu.set_plain_reg8(dst, value);
    } else if dst == 6 {
        let addr = cpu.operand_addr(bus);
        cpu.write_byte(bus, addr, cpu.plain_reg8(src));
    } else {
        cpu.set_reg8(dst, cpu.reg8(src));
    }
    0
}

fn accumulate(cpu: &mut Z80, op: u8, operand: u8) {
    let result = alu::arith(op >> 3, cpu.regs.a, operand, cpu.carry());
    cpu.regs.a = result.value;
    cpu.set_f(result.flags);
}

/// ADD ADC SUB SBC AND XOR OR CP with a register or memory operand.
pub(super) fn alu_r(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let operand = cpu.load_operand(bus, op);
    accumulate(cpu, op, operand);
    0
}

pub(super) fn alu_n(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let operand = cpu.imm8(bus);
    accumulate(cpu, op, operand);
    0
}

pub(super) fn ret(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    cpu.regs.pc = cpu.pop(bus);
    cpu.regs.wz = cpu.regs.pc;
    0
}

pub(super) fn ret_cc(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    if !cpu.condition(op >> 3) {
        return 0;
    }
    ret(cpu, bus, op);
    6
}

pub(super) fn pop_rp(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let value = cpu.pop(bus);
    cpu.set_stack_reg16(op >> 4, value);
    0
}

pub(super) fn push_rp(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let value = cpu.stack_reg16(op >> 4);
    cpu.push(bus, value);
    0
}

pub(super) fn jp(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    cpu.regs.pc = cpu.imm16(bus);
    cpu.regs.wz = cpu.regs.pc;
    0
}

pub(super) fn jp_cc(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let addr = cpu.imm16(bus);
    cpu.regs.wz = addr;
    if cpu.condition(op >> 3) {
        cpu.regs.pc = addr;
    }
    0
}

/// JP (HL). No memory access despite the mnemonic.
pub(super) fn jp_hl(cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    cpu.regs.pc = cpu.index_reg();
    0
}

pub(super) fn call(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    let addr = cpu.imm16(bus);
    cpu.push(bus, cpu.regs.pc);
    cpu.regs.pc = addr;
    cpu.regs.wz = addr;
    0
}

pub(super) fn call_cc(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    let addr = cpu.imm16(bus);
    cpu.regs.wz = addr;
    if !cpu.condition(op >> 3) {
        return 0;
    }
    cpu.push(bus, cpu.regs.pc);
    cpu.regs.pc = addr;
    7
}

pub(super) fn rst(cpu: &mut Z80, bus: &mut dyn Bus, op: u8) -> u8 {
    cpu.push(bus, cpu.regs.pc);
    cpu.regs.pc = u16::from(op & 0x38);
    cpu.regs.wz = cpu.regs.pc;
    0
}

pub(super) fn out_n_a(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    let n = cpu.imm8(bus);
    let a = cpu.regs.a;
    let port = u16::from_be_bytes([a, n]);
    cpu.port_out(bus, port, a);
    cpu.regs.wz = u16::from_be_bytes([a, n.wrapping_add(1)]);
    0
}

pub(super) fn in_a_n(cpu: &mut Z80, bus: &mut dyn Bus, _op: u8) -> u8 {
    let n = cpu.imm8(bus);
    let port = u16::from_be_bytes([cpu.regs.a, n]);
    cpu.regs.wz = port.wrapping_add(1);
    cpu.regs.a = cpu.port_in(bus, port);
    0
}

pub(super) fn di(cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    cpu.regs.iff1 = false;
    cpu.regs.iff2 = false;
    0
}

pub(super) fn ei(cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    cpu.regs.iff1 = true;
    cpu.regs.iff2 = true;
    cpu.int_blocked = true;
    0
}

pub(super) fn ld_sp_hl(cpu: &mut Z80, _bus: &mut dyn Bus, _op: u8) -> u8 {
    cpu.regs.sp = cpu.index_reg();
    0
}
