//! Static opcode tables, one per prefix family.
//!
//! `cycles` is the documented cost of the whole instruction, prefixes
//! included. Handlers return the T-states they add on top: taken branches,
//! block repeats, or (for the prefix entries, whose `cycles` is zero) the
//! full cost of the prefixed instruction.

#![allow(clippy::cast_possible_truncation)]

use emu_core::Bus;

use super::{Z80, base, bits, extended};

pub(super) type Handler = fn(&mut Z80, &mut dyn Bus, u8) -> u8;

#[derive(Clone, Copy)]
pub(super) struct Op {
    pub exec: Handler,
    pub cycles: u8,
}

impl Op {
    const fn new(exec: Handler, cycles: u8) -> Self {
        Self { exec, cycles }
    }
}

/// Unprefixed opcodes. Conditional branches list their not-taken cost.
#[rustfmt::skip]
const BASE_CYCLES: [u8; 256] = [
//  0   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
    4, 10,  7,  6,  4,  4,  7,  4,  4, 11,  7,  6,  4,  4,  7,  4, // 0
    8, 10,  7,  6,  4,  4,  7,  4, 12, 11,  7,  6,  4,  4,  7,  4, // 1
    7, 10, 16,  6,  4,  4,  7,  4,  7, 11, 16,  6,  4,  4,  7,  4, // 2
    7, 10, 13,  6, 11, 11, 10,  4,  7, 11, 13,  6,  4,  4,  7,  4, // 3
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 4
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 5
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 6
    7,  7,  7,  7,  7,  7,  4,  7,  4,  4,  4,  4,  4,  4,  7,  4, // 7
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 8
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 9
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // A
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // B
    5, 10, 10, 10, 10, 11,  7, 11,  5, 10, 10,  0, 10, 17,  7, 11, // C
    5, 10, 10, 11, 10, 11,  7, 11,  5,  4, 10, 11, 10,  0,  7, 11, // D
    5, 10, 10, 19, 10, 11,  7, 11,  5,  4, 10,  4, 10,  0,  7, 11, // E
    5, 10, 10,  4, 10, 11,  7, 11,  5,  6, 10,  4, 10,  0,  7, 11, // F
];

const fn base_handler(op: u8) -> Handler {
    match op {
        0x00 => base::nop,
        0x02 | 0x12 => base::ld_indirect_a,
        0x0A | 0x1A => base::ld_a_indirect,
        0x07 | 0x0F | 0x17 | 0x1F => base::rotate_a,
        0x08 => base::ex_af,
        0x10 => base::djnz,
        0x18 => base::jr,
        0x20 | 0x28 | 0x30 | 0x38 => base::jr_cc,
        0x22 => base::ld_nn_hl,
        0x2A => base::ld_hl_nn,
        0x32 => base::ld_nn_a,
        0x3A => base::ld_a_nn,
        0x27 => base::daa,
        0x2F => base::cpl,
        0x37 => base::scf,
        0x3F => base::ccf,
        0x76 => base::halt,
        0xC3 => base::jp,
        0xC9 => base::ret,
        0xCB => bits::prefix_bits,
        0xCD => base::call,
        0xD3 => base::out_n_a,
        0xD9 => base::exx,
        0xDB => base::in_a_n,
        0xDD | 0xFD => base::prefix_index,
        0xE3 => base::ex_sp_hl,
        0xE9 => base::jp_hl,
        0xEB => base::ex_de_hl,
        0xED => extended::prefix_extended,
        0xF3 => base::di,
        0xF9 => base::ld_sp_hl,
        0xFB => base::ei,
        0x40..=0x7F => base::ld_r_r,
        0x80..=0xBF => base::alu_r,
        op if op & 0xCF == 0x01 => base::ld_rp_nn,
        op if op & 0xCF == 0x03 => base::inc_rp,
        op if op & 0xCF == 0x09 => base::add_hl_rp,
        op if op & 0xCF == 0x0B => base::dec_rp,
        op if op & 0xC7 == 0x04 => base::inc_r,
        op if op & 0xC7 == 0x05 => base::dec_r,
        op if op & 0xC7 == 0x06 => base::ld_r_n,
        op if op & 0xC7 == 0xC0 => base::ret_cc,
        op if op & 0xCF == 0xC1 => base::pop_rp,
        op if op & 0xC7 == 0xC2 => base::jp_cc,
        op if op & 0xC7 == 0xC4 => base::call_cc,
        op if op & 0xCF == 0xC5 => base::push_rp,
        op if op & 0xC7 == 0xC6 => base::alu_n,
        op if op & 0xC7 == 0xC7 => base::rst,
        _ => base::nop,
    }
}

const fn uses_h_or_l(r: u8) -> bool {
    r == 4 || r == 5
}

/// Opcodes that a DD/FD prefix modifies. `None` means the prefix is ignored
/// and acts as a 4 T-state no-op.
const fn indexed_entry(op: u8) -> Option<Op> {
    let src = op & 7;
    let dst = (op >> 3) & 7;
    let entry = match op {
        0x09 | 0x19 | 0x29 | 0x39 => Op::new(base::add_hl_rp, 15),
        0x21 => Op::new(base::ld_rp_nn, 14),
        0x22 => Op::new(base::ld_nn_hl, 20),
        0x23 => Op::new(base::inc_rp, 10),
        0x2A => Op::new(base::ld_hl_nn, 20),
        0x2B => Op::new(base::dec_rp, 10),
        0x24 | 0x2C => Op::new(base::inc_r, 8),
        0x25 | 0x2D => Op::new(base::dec_r, 8),
        0x26 | 0x2E => Op::new(base::ld_r_n, 11),
        0x34 => Op::new(base::inc_r, 23),
        0x35 => Op::new(base::dec_r, 23),
        0x36 => Op::new(base::ld_r_n, 19),
        0x76 => return None,
        0x40..=0x7F if src == 6 || dst == 6 => Op::new(base::ld_r_r, 19),
        0x40..=0x7F if uses_h_or_l(src) || uses_h_or_l(dst) => Op::new(base::ld_r_r, 8),
        0x80..=0xBF if src == 6 => Op::new(base::alu_r, 19),
        0x80..=0xBF if uses_h_or_l(src) => Op::new(base::alu_r, 8),
        0xCB => Op::new(bits::prefix_indexed_bits, 0),
        0xE1 => Op::new(base::pop_rp, 14),
        0xE3 => Op::new(base::ex_sp_hl, 23),
        0xE5 => Op::new(base::push_rp, 15),
        0xE9 => Op::new(base::jp_hl, 8),
        0xF9 => Op::new(base::ld_sp_hl, 10),
        _ => return None,
    };
    Some(entry)
}

const fn bits_entry(op: u8) -> Op {
    let memory = op & 7 == 6;
    match op >> 6 {
        0 => Op::new(bits::shift, if memory { 15 } else { 8 }),
        1 => Op::new(bits::bit, if memory { 12 } else { 8 }),
        _ => Op::new(bits::res_set, if memory { 15 } else { 8 }),
    }
}

const fn indexed_bits_entry(op: u8) -> Op {
    match op >> 6 {
        0 => Op::new(bits::indexed_shift, 23),
        1 => Op::new(bits::indexed_bit, 20),
        _ => Op::new(bits::indexed_res_set, 23),
    }
}

const fn extended_entry(op: u8) -> Op {
    match op {
        0x47 | 0x4F | 0x57 | 0x5F => Op::new(extended::ld_special, 9),
        0x67 | 0x6F => Op::new(extended::rotate_digit, 18),
        0x40..=0x7F => match op & 0x0F {
            0x0 | 0x8 => Op::new(extended::in_r_c, 12),
            0x1 | 0x9 => Op::new(extended::out_c_r, 12),
            0x2 => Op::new(extended::sbc_hl, 15),
            0xA => Op::new(extended::adc_hl, 15),
            0x3 => Op::new(extended::ld_nn_rp, 20),
            0xB => Op::new(extended::ld_rp_nn, 20),
            0x4 | 0xC => Op::new(extended::neg, 8),
            0x5 | 0xD => Op::new(extended::retn, 14),
            0x6 | 0xE => Op::new(extended::im, 8),
            _ => Op::new(extended::nop, 8),
        },
        0xA0..=0xA3 | 0xA8..=0xAB | 0xB0..=0xB3 | 0xB8..=0xBB => match op & 3 {
            0 => Op::new(extended::block_load, 16),
            1 => Op::new(extended::block_compare, 16),
            2 => Op::new(extended::block_in, 16),
            _ => Op::new(extended::block_out, 16),
        },
        _ => Op::new(extended::nop, 8),
    }
}

pub(super) static BASE: [Op; 256] = {
    let mut table = [Op::new(base::nop, 4); 256];
    let mut i = 0;
    while i < 256 {
        table[i] = Op::new(base_handler(i as u8), BASE_CYCLES[i]);
        i += 1;
    }
    table
};

pub(super) static INDEXED: [Option<Op>; 256] = {
    let mut table = [None; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = indexed_entry(i as u8);
        i += 1;
    }
    table
};

pub(super) static BITS: [Op; 256] = {
    let mut table = [Op::new(base::nop, 8); 256];
    let mut i = 0;
    while i < 256 {
        table[i] = bits_entry(i as u8);
        i += 1;
    }
    table
};

pub(super) static INDEXED_BITS: [Op; 256] = {
    let mut table = [Op::new(base::nop, 23); 256];
    let mut i = 0;
    while i < 256 {
        table[i] = indexed_bits_entry(i as u8);
        i += 1;
    }
    table
};

pub(super) static EXTENDED: [Op; 256] = {
    let mut table = [Op::new(extended::nop, 8); 256];
    let mut i = 0;
    while i < 256 {
        table[i] = extended_entry(i as u8);
        i += 1;
    }
    table
};
