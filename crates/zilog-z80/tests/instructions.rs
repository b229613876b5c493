//! Instruction-level tests on a flat 64K bus.

use emu_core::{Bus, Cpu, ReadResult, SimpleBus};
use zilog_z80::{CF, Exit, HF, NF, PF, SF, XF, YF, Z80, ZF};

fn load(program: &[u8]) -> (Z80, SimpleBus) {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, program);
    (Z80::new(), bus)
}

/// Execute the first instruction of `program` and report (PC, T-states).
fn single(program: &[u8]) -> (u16, u32) {
    let (mut cpu, mut bus) = load(program);
    let cycles = cpu.step(&mut bus);
    (cpu.regs.pc, cycles)
}

#[test]
fn pc_advance_and_cycle_cost() {
    let cases: &[(&[u8], u16, u32)] = &[
        (&[0x00], 1, 4),
        (&[0x01, 0x34, 0x12], 3, 10),
        (&[0x3E, 0x05], 2, 7),
        (&[0x7E], 1, 7),
        (&[0x34], 1, 11),
        (&[0x22, 0x00, 0x50], 3, 16),
        (&[0xE3], 1, 19),
        (&[0xCB, 0x00], 2, 8),
        (&[0xCB, 0x46], 2, 12),
        (&[0xCB, 0x06], 2, 15),
        (&[0xDD, 0x21, 0x00, 0x40], 4, 14),
        (&[0xDD, 0x7E, 0x05], 3, 19),
        (&[0xDD, 0x36, 0x01, 0x99], 4, 19),
        (&[0xDD, 0x24], 2, 8),
        (&[0xFD, 0xE5], 2, 15),
        (&[0xDD, 0xCB, 0x01, 0x46], 4, 20),
        (&[0xFD, 0xCB, 0x01, 0xC6], 4, 23),
        (&[0xED, 0x44], 2, 8),
        (&[0xED, 0x4B, 0x00, 0x50], 4, 20),
        (&[0xED, 0x6F], 2, 18),
        (&[0xD3, 0xFE], 2, 11),
    ];
    for &(program, pc, cycles) in cases {
        assert_eq!(single(program), (pc, cycles), "program {program:02X?}");
    }
}

#[test]
fn jumps_land_on_their_targets() {
    assert_eq!(single(&[0xC3, 0x00, 0x80]), (0x8000, 10));
    assert_eq!(single(&[0x18, 0x02]), (0x0004, 12));
    assert_eq!(single(&[0xCD, 0x34, 0x12]), (0x1234, 17));
    assert_eq!(single(&[0xFF]), (0x0038, 11));
}

#[test]
fn conditional_branches_charge_extra_when_taken() {
    // Power-on F is $FF, so Z and C are set.
    assert_eq!(single(&[0x28, 0x10]), (0x0012, 12)); // JR Z
    assert_eq!(single(&[0x20, 0x10]), (0x0002, 7)); // JR NZ
    assert_eq!(single(&[0xCC, 0x00, 0x30]), (0x3000, 17)); // CALL Z
    assert_eq!(single(&[0xC4, 0x00, 0x30]), (0x0003, 10)); // CALL NZ
    assert_eq!(single(&[0xC0]), (0x0001, 5)); // RET NZ

    // B starts at zero, so DJNZ wraps to $FF and loops.
    assert_eq!(single(&[0x10, 0xFE]), (0x0000, 13));
}

#[test]
fn undefined_extended_opcode_is_a_no_op() {
    let (mut cpu, mut bus) = load(&[0xED, 0x00, 0xED, 0x77]);
    let before = cpu.regs;
    assert_eq!(cpu.step(&mut bus), 8);
    assert_eq!(cpu.step(&mut bus), 8);
    assert_eq!(cpu.regs.pc, 4);
    assert_eq!(cpu.regs.af(), before.af());
    assert_eq!(cpu.regs.hl(), before.hl());
}

#[test]
fn lone_index_prefix_is_a_four_cycle_no_op() {
    // DD followed by LD B,C: the prefix is dropped and LD runs normally.
    let (mut cpu, mut bus) = load(&[0xDD, 0x41]);
    cpu.regs.c = 0x5A;
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.regs.pc, 1);
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.regs.b, 0x5A);
}

#[test]
fn repeated_prefixes_each_cost_four() {
    let (mut cpu, mut bus) = load(&[0xDD, 0xFD, 0x21, 0x34, 0x12]);
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.step(&mut bus), 14);
    assert_eq!(cpu.regs.iy, 0x1234);
    assert_eq!(cpu.regs.ix, 0xFFFF);
}

#[test]
fn refresh_register_counts_prefixes() {
    let (mut cpu, mut bus) = load(&[0xDD, 0x21, 0x00, 0x00, 0xDD, 0xCB, 0x00, 0x46]);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.r, 2);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.r, 4);
}

#[test]
fn adc_wraps_to_zero_with_half_and_full_carry() {
    // SCF; LD A,0; ADC A,$FF
    let (mut cpu, mut bus) = load(&[0x37, 0x3E, 0x00, 0xCE, 0xFF]);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.regs.a, 0);
    assert_eq!(cpu.regs.f, ZF | HF | CF);
}

#[test]
fn sixteen_bit_arithmetic_overflow() {
    // LD HL,$7FFF; LD BC,1; OR A; ADC HL,BC
    let (mut cpu, mut bus) = load(&[0x21, 0xFF, 0x7F, 0x01, 0x01, 0x00, 0xB7, 0xED, 0x4A]);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.step(&mut bus), 15);
    assert_eq!(cpu.regs.hl(), 0x8000);
    assert_eq!(cpu.regs.f & (SF | ZF | PF | CF | NF), SF | PF);

    // LD HL,0; LD BC,1; OR A; SBC HL,BC
    let (mut cpu, mut bus) = load(&[0x21, 0x00, 0x00, 0x01, 0x01, 0x00, 0xB7, 0xED, 0x42]);
    for _ in 0..4 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.regs.hl(), 0xFFFF);
    assert_eq!(cpu.regs.f & (SF | ZF | CF | NF), SF | CF | NF);
}

#[test]
fn scf_undocumented_bits_follow_q_latch() {
    // LD A,0 leaves F alone, so SCF takes X/Y from F.
    let (mut cpu, mut bus) = load(&[0x3E, 0x00, 0x37]);
    cpu.regs.f = YF | XF;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.f & (YF | XF | CF), YF | XF | CF);

    // XOR A writes F, so SCF takes X/Y from A alone.
    let (mut cpu, mut bus) = load(&[0xAF, 0x37]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.f & (YF | XF), 0);
}

#[test]
fn ldir_copies_and_repeats() {
    // LD HL,$4000; LD DE,$5000; LD BC,3; LDIR
    let program = [0x21, 0x00, 0x40, 0x11, 0x00, 0x50, 0x01, 0x03, 0x00, 0xED, 0xB0];
    let (mut cpu, mut bus) = load(&program);
    bus.load(0x4000, &[1, 2, 3]);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.step(&mut bus), 21);
    assert_eq!(cpu.regs.pc, 9);
    assert_eq!(cpu.step(&mut bus), 21);
    assert_eq!(cpu.step(&mut bus), 16);
    assert_eq!(cpu.regs.pc, 11);
    assert_eq!(cpu.regs.bc(), 0);
    assert_eq!((bus.peek(0x5000), bus.peek(0x5001), bus.peek(0x5002)), (1, 2, 3));
    assert_eq!(cpu.regs.f & PF, 0);
}

#[test]
fn indexed_bit_op_copies_result_to_register() {
    // LD IX,$4000; RLC (IX+1),B
    let (mut cpu, mut bus) = load(&[0xDD, 0x21, 0x00, 0x40, 0xDD, 0xCB, 0x01, 0x00]);
    bus.poke(0x4001, 0x81);
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 23);
    assert_eq!(bus.peek(0x4001), 0x03);
    assert_eq!(cpu.regs.b, 0x03);
    assert_eq!(cpu.regs.f & CF, CF);
}

#[test]
fn indexed_load_keeps_plain_h() {
    // LD IX,$4000; LD H,(IX+2)
    let (mut cpu, mut bus) = load(&[0xDD, 0x21, 0x00, 0x40, 0xDD, 0x66, 0x02]);
    bus.poke(0x4002, 0x77);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.h, 0x77);
    assert_eq!(cpu.regs.ix, 0x4000);
}

#[test]
fn out_puts_accumulator_on_high_address_lines() {
    let (mut cpu, mut bus) = load(&[0x3E, 0x07, 0xD3, 0xFE]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(bus.last_io_write, Some((0x07FE, 0x07)));
}

#[test]
fn halted_cpu_resumes_after_halt_on_im1_interrupt() {
    // IM 1; EI; HALT
    let (mut cpu, mut bus) = load(&[0xED, 0x56, 0xFB, 0x76]);
    cpu.regs.sp = 0x8000;
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert!(cpu.is_halted());
    assert_eq!(cpu.step(&mut bus), 4);

    cpu.set_interrupt_line(true);
    assert_eq!(cpu.step(&mut bus), 13);
    assert!(!cpu.is_halted());
    assert_eq!(cpu.regs.pc, 0x0038);
    assert_eq!(bus.peek(0x7FFE), 0x04);
    assert!(!cpu.regs.iff1 && !cpu.regs.iff2);
}

#[test]
fn no_interrupt_straight_after_ei() {
    let (mut cpu, mut bus) = load(&[0xFB, 0x00, 0x00]);
    cpu.regs.im = 1;
    cpu.set_interrupt_line(true);
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.regs.pc, 2);
    assert_eq!(cpu.step(&mut bus), 13);
    assert_eq!(cpu.regs.pc, 0x0038);
}

#[test]
fn im0_executes_rst_38_from_floating_bus() {
    let (mut cpu, mut bus) = load(&[0x00]);
    cpu.regs.iff1 = true;
    cpu.set_interrupt_line(true);
    assert_eq!(cpu.step(&mut bus), 13);
    assert_eq!(cpu.regs.pc, 0x0038);
}

#[test]
fn im2_reads_vector_table() {
    let (mut cpu, mut bus) = load(&[0x00]);
    bus.load(0x80FF, &[0x34, 0x12]);
    cpu.regs.i = 0x80;
    cpu.regs.im = 2;
    cpu.regs.iff1 = true;
    cpu.set_interrupt_line(true);
    assert_eq!(cpu.step(&mut bus), 19);
    assert_eq!(cpu.regs.pc, 0x1234);
}

#[test]
fn nmi_keeps_iff2() {
    let (mut cpu, mut bus) = load(&[0x00]);
    cpu.regs.iff1 = true;
    cpu.regs.iff2 = true;
    cpu.nmi();
    assert_eq!(cpu.step(&mut bus), 11);
    assert_eq!(cpu.regs.pc, 0x0066);
    assert!(!cpu.regs.iff1);
    assert!(cpu.regs.iff2);
}

#[test]
fn run_until_stops_at_trap_before_executing() {
    let (mut cpu, mut bus) = load(&[0x00; 16]);
    assert_eq!(cpu.run_until(&mut bus, 1_000, Some(0x0003)), Exit::Trap);
    assert_eq!(cpu.regs.pc, 3);
    assert_eq!(cpu.clock(), 12);
}

#[test]
fn run_until_may_overshoot_limit_by_one_instruction() {
    // LD BC,nn is 10 T-states.
    let (mut cpu, mut bus) = load(&[0x01, 0x00, 0x00, 0x01, 0x00, 0x00]);
    assert_eq!(cpu.run_until(&mut bus, 15, None), Exit::Limit);
    assert_eq!(cpu.clock(), 20);
}

#[test]
fn run_until_reports_accepted_interrupt() {
    let (mut cpu, mut bus) = load(&[0x00; 4]);
    cpu.regs.im = 1;
    cpu.regs.iff1 = true;
    cpu.set_interrupt_line(true);
    assert_eq!(cpu.run_until(&mut bus, 1_000, None), Exit::Interrupt);
    assert_eq!(cpu.clock(), 13);
}

#[test]
fn advance_consumes_at_least_the_budget() {
    let (mut cpu, mut bus) = load(&[0x00; 64]);
    assert_eq!(cpu.advance(&mut bus, 10), 12);
    assert_eq!(cpu.pc(), 3);
}

/// Adds one wait state to every memory access.
struct SlowBus(SimpleBus);

impl Bus for SlowBus {
    fn read(&mut self, address: u16, clock: u64) -> ReadResult {
        ReadResult::with_wait(self.0.read(address, clock).data, 1)
    }

    fn write(&mut self, address: u16, value: u8, clock: u64) -> u8 {
        self.0.write(address, value, clock) + 1
    }

    fn io_read(&mut self, port: u16, clock: u64) -> ReadResult {
        self.0.io_read(port, clock)
    }

    fn io_write(&mut self, port: u16, value: u8, clock: u64) -> u8 {
        self.0.io_write(port, value, clock)
    }
}

#[test]
fn bus_wait_states_are_added_to_the_cost() {
    // LD A,(HL): fetch plus one read.
    let (mut cpu, inner) = load(&[0x7E]);
    let mut bus = SlowBus(inner);
    assert_eq!(cpu.step(&mut bus), 9);
    assert_eq!(cpu.clock(), 9);
}
