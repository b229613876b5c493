//! Every opcode in every prefix family against documented T-states and
//! instruction lengths.
//!
//! Each instruction runs at `ORIGIN` with all operand bytes zero, so
//! absolute jumps and calls land on `$0000`, relative jumps land on the
//! next instruction, and returns pop `$0000` from zeroed stack memory.
//! Each case runs twice: once with F clear and once with F set, which takes
//! every conditional branch one way and then the other.

use emu_core::SimpleBus;
use zilog_z80::Z80;

const ORIGIN: u16 = 0x1000;
/// HL, IX and IY all point here.
const POINTER: u16 = 0x3000;
const STACK: u16 = 0x5000;

/// Unprefixed costs. Conditional forms hold the not-taken cost; prefixes are 0.
#[rustfmt::skip]
const BASE_TSTATES: [u32; 256] = [
    4, 10,  7,  6,  4,  4,  7,  4,  4, 11,  7,  6,  4,  4,  7,  4,
    8, 10,  7,  6,  4,  4,  7,  4, 12, 11,  7,  6,  4,  4,  7,  4,
    7, 10, 16,  6,  4,  4,  7,  4,  7, 11, 16,  6,  4,  4,  7,  4,
    7, 10, 13,  6, 11, 11, 10,  4,  7, 11, 13,  6,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    7,  7,  7,  7,  7,  7,  4,  7,  4,  4,  4,  4,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    5, 10, 10, 10, 10, 11,  7, 11,  5, 10, 10,  0, 10, 17,  7, 11,
    5, 10, 10, 11, 10, 11,  7, 11,  5,  4, 10, 11, 10,  0,  7, 11,
    5, 10, 10, 19, 10, 11,  7, 11,  5,  4, 10,  4, 10,  0,  7, 11,
    5, 10, 10,  4, 10, 11,  7, 11,  5,  6, 10,  4, 10,  0,  7, 11,
];

#[rustfmt::skip]
const BASE_LENGTHS: [u16; 256] = [
    1, 3, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1,
    2, 3, 1, 1, 1, 1, 2, 1, 2, 1, 1, 1, 1, 1, 2, 1,
    2, 3, 3, 1, 1, 1, 2, 1, 2, 1, 3, 1, 1, 1, 2, 1,
    2, 3, 3, 1, 1, 1, 2, 1, 2, 1, 3, 1, 1, 1, 2, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 3, 3, 3, 1, 2, 1, 1, 1, 3, 0, 3, 3, 2, 1,
    1, 1, 3, 2, 3, 1, 2, 1, 1, 1, 3, 2, 3, 0, 2, 1,
    1, 1, 3, 1, 3, 1, 2, 1, 1, 1, 3, 1, 3, 0, 2, 1,
    1, 1, 3, 1, 3, 1, 2, 1, 1, 1, 3, 1, 3, 0, 2, 1,
];

/// ED $40-$7F. Everything else in the ED page is a block instruction or an
/// 8 T no-op.
#[rustfmt::skip]
const ED_MAIN_TSTATES: [u32; 64] = [
    12, 12, 15, 20,  8, 14,  8,  9, 12, 12, 15, 20,  8, 14,  8,  9,
    12, 12, 15, 20,  8, 14,  8,  9, 12, 12, 15, 20,  8, 14,  8,  9,
    12, 12, 15, 20,  8, 14,  8, 18, 12, 12, 15, 20,  8, 14,  8, 18,
    12, 12, 15, 20,  8, 14,  8,  8, 12, 12, 15, 20,  8, 14,  8,  8,
];

/// Run the first instruction of `program` from `ORIGIN` and report where
/// PC ends up and what it cost.
fn run(program: &[u8], flags_set: bool, bc: u16) -> (u16, u32) {
    let mut bus = SimpleBus::new();
    bus.load(ORIGIN, program);
    let mut cpu = Z80::new();
    cpu.regs.pc = ORIGIN;
    cpu.regs.sp = STACK;
    cpu.regs.f = if flags_set { 0xFF } else { 0x00 };
    // Never equal to the zeroed memory CPIR and CPDR compare against.
    cpu.regs.a = 0x55;
    cpu.regs.set_bc(bc);
    cpu.regs.set_de(0x4000);
    cpu.regs.set_hl(POINTER);
    cpu.regs.ix = POINTER;
    cpu.regs.iy = POINTER;
    let cycles = cpu.step(&mut bus);
    (cpu.regs.pc, cycles)
}

/// NZ, NC, PO and P hold with F clear; Z, C, PE and M hold with F set.
/// DJNZ sits in the NZ slot and is given B = 2 with F clear.
fn condition_holds(op: u8, flags_set: bool) -> bool {
    ((op >> 3) & 1 == 1) == flags_set
}

fn base_expected(op: u8, taken: bool) -> (u16, u32) {
    let index = usize::from(op);
    let next = ORIGIN + BASE_LENGTHS[index];
    let t = BASE_TSTATES[index];
    match op {
        0x10 | 0x20 | 0x28 | 0x30 | 0x38 if taken => (next, t + 5),
        0xC3 | 0xCD | 0xC9 => (0x0000, t),
        0xE9 => (POINTER, t),
        _ if op & 0xC7 == 0xC7 => (u16::from(op & 0x38), t),
        _ if op & 0xC7 == 0xC0 && taken => (0x0000, t + 6),
        _ if op & 0xC7 == 0xC2 && taken => (0x0000, t),
        _ if op & 0xC7 == 0xC4 && taken => (0x0000, t + 7),
        _ => (next, t),
    }
}

#[test]
fn unprefixed_opcodes() {
    for op in 0..=0xFFu8 {
        if matches!(op, 0xCB | 0xDD | 0xED | 0xFD) {
            continue;
        }
        for flags_set in [false, true] {
            let counter: u16 = if flags_set { 1 } else { 2 };
            let got = run(&[op, 0x00, 0x00], flags_set, counter << 8);
            let expected = base_expected(op, condition_holds(op, flags_set));
            assert_eq!(got, expected, "{op:02X} with flags set: {flags_set}");
        }
    }
}

#[test]
fn bit_opcodes() {
    for op in 0..=0xFFu8 {
        let expected = match (op & 0x07, op & 0xC0) {
            (6, 0x40) => 12,
            (6, _) => 15,
            _ => 8,
        };
        assert_eq!(run(&[0xCB, op], false, 0), (ORIGIN + 2, expected), "CB {op:02X}");
    }
}

fn extended_expected(op: u8, repeating: bool) -> (u16, u32) {
    match op {
        0x40..=0x7F => {
            let t = ED_MAIN_TSTATES[usize::from(op - 0x40)];
            match op & 0x0F {
                0x3 | 0xB => (ORIGIN + 4, t),
                // RETN and RETI pop the zeroed stack.
                0x5 | 0xD => (0x0000, t),
                _ => (ORIGIN + 2, t),
            }
        }
        0xB0..=0xB3 | 0xB8..=0xBB if repeating => (ORIGIN, 21),
        0xA0..=0xA3 | 0xA8..=0xAB | 0xB0..=0xB3 | 0xB8..=0xBB => (ORIGIN + 2, 16),
        _ => (ORIGIN + 2, 8),
    }
}

#[test]
fn extended_opcodes() {
    for op in 0..=0xFFu8 {
        for flags_set in [false, true] {
            // Repeat forms go round again with a count of 2 and stop at 1.
            // LD and CP count in BC, IN and OUT in B.
            let counter: u16 = if flags_set { 1 } else { 2 };
            let bc = if op & 0x02 == 0 { counter } else { counter << 8 };
            let got = run(&[0xED, op, 0x00, 0x00], flags_set, bc);
            let expected = extended_expected(op, !flags_set);
            assert_eq!(got, expected, "ED {op:02X} with count {counter}");
        }
    }
}

/// Length and cost of the instructions DD and FD change. `None` means the
/// prefix acts alone.
fn indexed_expected(op: u8) -> Option<(u16, u32)> {
    let cost = match op {
        0x09 | 0x19 | 0x29 | 0x39 => (2, 15),
        0x21 => (4, 14),
        0x22 | 0x2A => (4, 20),
        0x23 | 0x2B => (2, 10),
        0x24 | 0x25 | 0x2C | 0x2D => (2, 8),
        0x26 | 0x2E => (3, 11),
        0x34 | 0x35 => (3, 23),
        0x36 => (4, 19),
        0x44 | 0x45 | 0x4C | 0x4D | 0x54 | 0x55 | 0x5C | 0x5D => (2, 8),
        0x60..=0x65 | 0x67..=0x6D | 0x6F | 0x7C | 0x7D => (2, 8),
        0x46 | 0x4E | 0x56 | 0x5E | 0x66 | 0x6E | 0x7E => (3, 19),
        0x70..=0x75 | 0x77 => (3, 19),
        0x84 | 0x85 | 0x8C | 0x8D | 0x94 | 0x95 | 0x9C | 0x9D => (2, 8),
        0xA4 | 0xA5 | 0xAC | 0xAD | 0xB4 | 0xB5 | 0xBC | 0xBD => (2, 8),
        0x86 | 0x8E | 0x96 | 0x9E | 0xA6 | 0xAE | 0xB6 | 0xBE => (3, 19),
        0xE1 => (2, 14),
        0xE3 => (2, 23),
        0xE5 => (2, 15),
        0xE9 => (2, 8),
        0xF9 => (2, 10),
        _ => return None,
    };
    Some(cost)
}

#[test]
fn index_prefixed_opcodes() {
    for prefix in [0xDD, 0xFD] {
        for op in 0..=0xFFu8 {
            if op == 0xCB {
                continue;
            }
            let expected = match indexed_expected(op) {
                Some((_, t)) if op == 0xE9 => (POINTER, t),
                Some((length, t)) => (ORIGIN + length, t),
                None => (ORIGIN + 1, 4),
            };
            let got = run(&[prefix, op, 0x00, 0x00], false, 0);
            assert_eq!(got, expected, "{prefix:02X} {op:02X}");
        }
    }
}

#[test]
fn index_prefixed_bit_opcodes() {
    for prefix in [0xDD, 0xFD] {
        for op in 0..=0xFFu8 {
            let expected = if op & 0xC0 == 0x40 { 20 } else { 23 };
            let got = run(&[prefix, 0xCB, 0x00, op], false, 0);
            assert_eq!(got, (ORIGIN + 4, expected), "{prefix:02X} CB 00 {op:02X}");
        }
    }
}
