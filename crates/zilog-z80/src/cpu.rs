//! Z80 CPU core: instruction stepping, interrupts and the operand helpers
//! the instruction handlers share.
//!
//! Instructions run to completion in one call. Timing comes from the
//! dispatch tables plus whatever wait states the bus reports, so each
//! access is stamped with a nominal T-state: the instruction start plus the
//! M-cycles issued so far.

#![allow(clippy::cast_possible_truncation)] // Low-byte extraction.
#![allow(clippy::cast_possible_wrap)] // Displacements are signed bytes.
#![allow(clippy::struct_excessive_bools)]

use emu_core::{Bus, Cpu, Observable, Value};

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::registers::Registers;

mod base;
mod bits;
mod dispatch;
mod extended;

use dispatch::BASE;

/// Why [`Z80::run_until`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The clock reached the limit.
    Limit,
    /// An NMI or maskable interrupt was accepted.
    Interrupt,
    /// PC reached the trap address. The instruction there has not run.
    Trap,
}

/// Which register stands in for HL in the current instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Index {
    Hl,
    Ix,
    Iy,
}

/// Zilog Z80 CPU.
///
/// The CPU does not own the bus. Every call that executes code borrows one,
/// so the machine keeps ownership of memory and peripherals.
pub struct Z80 {
    pub regs: Registers,
    /// T-states since power-on.
    clock: u64,
    /// Level of the maskable interrupt request line.
    int_line: bool,
    nmi_pending: bool,
    /// Set by `EI` and by a lone DD/FD prefix. No maskable interrupt is
    /// accepted until one more instruction has run.
    int_blocked: bool,
    /// Flags written by the current instruction (zero if it left F alone).
    q: u8,
    prev_q: u8,
    index: Index,
    /// T-states issued so far in the current instruction, excluding waits.
    t: u32,
    /// Wait states the bus has added to the current instruction.
    wait: u32,
}

impl Z80 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::default(),
            clock: 0,
            int_line: false,
            nmi_pending: false,
            int_blocked: false,
            q: 0,
            prev_q: 0,
            index: Index::Hl,
            t: 0,
            wait: 0,
        }
    }

    /// T-states elapsed since power-on.
    #[must_use]
    pub const fn clock(&self) -> u64 {
        self.clock
    }

    #[must_use]
    pub const fn interrupt_line(&self) -> bool {
        self.int_line
    }

    /// Execute one instruction, or accept one pending interrupt.
    ///
    /// Returns the T-states consumed, wait states included.
    pub fn step(&mut self, bus: &mut dyn Bus) -> u32 {
        if let Some(cost) = self.service_interrupts(bus) {
            return cost;
        }
        self.execute(bus)
    }

    /// Run whole instructions until the clock reaches `limit`.
    ///
    /// Stops early when an interrupt is accepted, or before executing the
    /// instruction at `trap`. The last instruction may overshoot `limit`.
    pub fn run_until(&mut self, bus: &mut dyn Bus, limit: u64, trap: Option<u16>) -> Exit {
        while self.clock < limit {
            if self.service_interrupts(bus).is_some() {
                return Exit::Interrupt;
            }
            if trap == Some(self.regs.pc) && !self.regs.halted {
                return Exit::Trap;
            }
            self.execute(bus);
        }
        Exit::Limit
    }

    fn begin(&mut self) {
        self.t = 0;
        self.wait = 0;
        self.index = Index::Hl;
        self.prev_q = self.q;
        self.q = 0;
    }

    fn finish(&mut self, cycles: u32) -> u32 {
        let cost = cycles + self.wait;
        self.clock += u64::from(cost);
        cost
    }

    fn execute(&mut self, bus: &mut dyn Bus) -> u32 {
        self.begin();
        self.int_blocked = false;
        if self.regs.halted {
            // HALT keeps issuing NOP fetches without moving PC.
            self.regs.bump_r();
            return self.finish(4);
        }
        let opcode = self.fetch_opcode(bus);
        let op = &BASE[usize::from(opcode)];
        let extra = (op.exec)(self, bus, opcode);
        self.finish(u32::from(op.cycles) + u32::from(extra))
    }

    fn service_interrupts(&mut self, bus: &mut dyn Bus) -> Option<u32> {
        let cycles = if self.nmi_pending {
            self.nmi_pending = false;
            self.begin();
            self.accept_nmi(bus)
        } else if self.int_line && self.regs.iff1 && !self.int_blocked {
            self.begin();
            self.accept_int(bus)
        } else {
            return None;
        };
        Some(self.finish(cycles))
    }

    fn accept_nmi(&mut self, bus: &mut dyn Bus) -> u32 {
        self.regs.halted = false;
        self.regs.bump_r();
        self.regs.iff1 = false;
        self.t = 5;
        self.push(bus, self.regs.pc);
        self.regs.pc = 0x0066;
        self.regs.wz = 0x0066;
        11
    }

    fn accept_int(&mut self, bus: &mut dyn Bus) -> u32 {
        self.regs.halted = false;
        self.regs.bump_r();
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        let data = bus.interrupt_data();
        let cycles = match self.regs.im {
            2 => {
                self.t = 7;
                self.push(bus, self.regs.pc);
                let vector = (u16::from(self.regs.i) << 8) | u16::from(data);
                self.regs.pc = self.read_word(bus, vector);
                19
            }
            1 => {
                self.t = 7;
                self.push(bus, self.regs.pc);
                self.regs.pc = 0x0038;
                13
            }
            _ => {
                // Mode 0 executes the byte on the data bus. The acknowledge
                // cycle is two T-states longer than a normal fetch.
                self.t = 6;
                let op = &BASE[usize::from(data)];
                let extra = (op.exec)(self, bus, data);
                2 + u32::from(op.cycles) + u32::from(extra)
            }
        };
        self.regs.wz = self.regs.pc;
        cycles
    }

    // Bus access. Each helper charges the nominal M-cycle length to `t` and
    // collects the bus's wait states.

    fn now(&self) -> u64 {
        self.clock + u64::from(self.t + self.wait)
    }

    fn fetch_opcode(&mut self, bus: &mut dyn Bus) -> u8 {
        let result = bus.read(self.regs.pc, self.now());
        self.wait += u32::from(result.wait);
        self.t += 4;
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.regs.bump_r();
        result.data
    }

    /// Look at the next opcode byte without fetching it.
    fn peek_opcode(&mut self, bus: &mut dyn Bus) -> u8 {
        bus.read(self.regs.pc, self.now()).data
    }

    fn read_byte(&mut self, bus: &mut dyn Bus, addr: u16) -> u8 {
        let result = bus.read(addr, self.now());
        self.wait += u32::from(result.wait);
        self.t += 3;
        result.data
    }

    fn write_byte(&mut self, bus: &mut dyn Bus, addr: u16, value: u8) {
        let wait = bus.write(addr, value, self.now());
        self.wait += u32::from(wait);
        self.t += 3;
    }

    fn read_word(&mut self, bus: &mut dyn Bus, addr: u16) -> u16 {
        let lo = self.read_byte(bus, addr);
        let hi = self.read_byte(bus, addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn write_word(&mut self, bus: &mut dyn Bus, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write_byte(bus, addr, lo);
        self.write_byte(bus, addr.wrapping_add(1), hi);
    }

    fn imm8(&mut self, bus: &mut dyn Bus) -> u8 {
        let value = self.read_byte(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    fn imm16(&mut self, bus: &mut dyn Bus) -> u16 {
        let lo = self.imm8(bus);
        let hi = self.imm8(bus);
        u16::from_le_bytes([lo, hi])
    }

    /// Push high byte first, as the hardware does.
    fn push(&mut self, bus: &mut dyn Bus, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_byte(bus, self.regs.sp, hi);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_byte(bus, self.regs.sp, lo);
    }

    fn pop(&mut self, bus: &mut dyn Bus) -> u16 {
        let value = self.read_word(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        value
    }

    fn port_in(&mut self, bus: &mut dyn Bus, port: u16) -> u8 {
        let result = bus.io_read(port, self.now());
        self.wait += u32::from(result.wait);
        self.t += 4;
        result.data
    }

    fn port_out(&mut self, bus: &mut dyn Bus, port: u16, value: u8) {
        let wait = bus.io_write(port, value, self.now());
        self.wait += u32::from(wait);
        self.t += 4;
    }

    // Register access.

    /// Write F and latch it for the undocumented SCF/CCF behaviour.
    fn set_f(&mut self, value: u8) {
        self.regs.f = value;
        self.q = value;
    }

    fn index_reg(&self) -> u16 {
        match self.index {
            Index::Hl => self.regs.hl(),
            Index::Ix => self.regs.ix,
            Index::Iy => self.regs.iy,
        }
    }

    fn set_index_reg(&mut self, value: u16) {
        match self.index {
            Index::Hl => self.regs.set_hl(value),
            Index::Ix => self.regs.ix = value,
            Index::Iy => self.regs.iy = value,
        }
    }

    /// 8-bit register by 3-bit encoding. Codes 4 and 5 follow the index
    /// prefix (IXH/IXL/IYH/IYL). Code 6 is a memory operand and is handled
    /// by the callers.
    fn reg8(&self, r: u8) -> u8 {
        match r & 7 {
            4 => (self.index_reg() >> 8) as u8,
            5 => self.index_reg() as u8,
            r => self.plain_reg8(r),
        }
    }

    fn set_reg8(&mut self, r: u8, value: u8) {
        match r & 7 {
            4 => {
                let w = self.index_reg();
                self.set_index_reg((w & 0x00FF) | (u16::from(value) << 8));
            }
            5 => {
                let w = self.index_reg();
                self.set_index_reg((w & 0xFF00) | u16::from(value));
            }
            r => self.set_plain_reg8(r, value),
        }
    }

    /// 8-bit register ignoring any index prefix: codes 4 and 5 are H and L.
    fn plain_reg8(&self, r: u8) -> u8 {
        match r & 7 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            6 => 0,
            7 => self.regs.a,
            _ => unreachable!(),
        }
    }

    fn set_plain_reg8(&mut self, r: u8, value: u8) {
        match r & 7 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            6 => {}
            7 => self.regs.a = value,
            _ => unreachable!(),
        }
    }

    /// Address of the memory operand: HL, or IX+d/IY+d under a prefix (which
    /// fetches the displacement and sets WZ).
    fn operand_addr(&mut self, bus: &mut dyn Bus) -> u16 {
        if self.index == Index::Hl {
            return self.regs.hl();
        }
        let d = self.imm8(bus) as i8;
        let addr = self.index_reg().wrapping_add_signed(i16::from(d));
        self.regs.wz = addr;
        addr
    }

    /// Source operand by 3-bit encoding, reading memory for code 6.
    fn load_operand(&mut self, bus: &mut dyn Bus, r: u8) -> u8 {
        if r & 7 == 6 {
            let addr = self.operand_addr(bus);
            self.read_byte(bus, addr)
        } else {
            self.reg8(r)
        }
    }

    /// Register pair by 2-bit encoding: BC, DE, HL (or index), SP.
    fn reg16(&self, rp: u8) -> u16 {
        match rp & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.index_reg(),
            3 => self.regs.sp,
            _ => unreachable!(),
        }
    }

    fn set_reg16(&mut self, rp: u8, value: u16) {
        match rp & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.set_index_reg(value),
            3 => self.regs.sp = value,
            _ => unreachable!(),
        }
    }

    /// Register pair for PUSH/POP, where code 3 is AF.
    fn stack_reg16(&self, rp: u8) -> u16 {
        if rp & 3 == 3 { self.regs.af() } else { self.reg16(rp) }
    }

    fn set_stack_reg16(&mut self, rp: u8, value: u16) {
        if rp & 3 == 3 {
            self.regs.set_af(value);
        } else {
            self.set_reg16(rp, value);
        }
    }

    /// Condition code by 3-bit encoding: NZ Z NC C PO PE P M.
    fn condition(&self, cc: u8) -> bool {
        let f = self.regs.f;
        match cc & 7 {
            0 => f & ZF == 0,
            1 => f & ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & PF == 0,
            5 => f & PF != 0,
            6 => f & SF == 0,
            7 => f & SF != 0,
            _ => unreachable!(),
        }
    }

    fn carry(&self) -> bool {
        self.regs.f & CF != 0
    }
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu for Z80 {
    type Registers = Registers;

    fn advance<B: Bus>(&mut self, bus: &mut B, budget: u32) -> u32 {
        let start = self.clock;
        self.run_until(bus, start + u64::from(budget), None);
        u32::try_from(self.clock - start).unwrap_or(u32::MAX)
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Self::Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.regs.halted
    }

    fn set_interrupt_line(&mut self, asserted: bool) {
        self.int_line = asserted;
    }

    fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

const Z80_QUERY_PATHS: &[&str] = &[
    "a", "f", "b", "c", "d", "e", "h", "l",
    "af", "bc", "de", "hl",
    "af'", "bc'", "de'", "hl'",
    "ix", "iy", "sp", "pc", "i", "r", "wz",
    "flags.s", "flags.z", "flags.y", "flags.h",
    "flags.x", "flags.p", "flags.n", "flags.c",
    "iff1", "iff2", "im", "halted", "int_line", "clock",
];

impl Observable for Z80 {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        let flag = |mask: u8| Some(Value::from(r.f & mask != 0));
        match path {
            "a" => Some(r.a.into()),
            "f" => Some(r.f.into()),
            "b" => Some(r.b.into()),
            "c" => Some(r.c.into()),
            "d" => Some(r.d.into()),
            "e" => Some(r.e.into()),
            "h" => Some(r.h.into()),
            "l" => Some(r.l.into()),
            "af" => Some(r.af().into()),
            "bc" => Some(r.bc().into()),
            "de" => Some(r.de().into()),
            "hl" => Some(r.hl().into()),
            "af'" => Some(u16::from_be_bytes([r.a_alt, r.f_alt]).into()),
            "bc'" => Some(u16::from_be_bytes([r.b_alt, r.c_alt]).into()),
            "de'" => Some(u16::from_be_bytes([r.d_alt, r.e_alt]).into()),
            "hl'" => Some(u16::from_be_bytes([r.h_alt, r.l_alt]).into()),
            "ix" => Some(r.ix.into()),
            "iy" => Some(r.iy.into()),
            "sp" => Some(r.sp.into()),
            "pc" => Some(r.pc.into()),
            "i" => Some(r.i.into()),
            "r" => Some(r.r.into()),
            "wz" => Some(r.wz.into()),
            "flags.s" => flag(SF),
            "flags.z" => flag(ZF),
            "flags.y" => flag(YF),
            "flags.h" => flag(HF),
            "flags.x" => flag(XF),
            "flags.p" => flag(PF),
            "flags.n" => flag(NF),
            "flags.c" => flag(CF),
            "iff1" => Some(r.iff1.into()),
            "iff2" => Some(r.iff2.into()),
            "im" => Some(r.im.into()),
            "halted" => Some(r.halted.into()),
            "int_line" => Some(self.int_line.into()),
            "clock" => Some(self.clock.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        Z80_QUERY_PATHS
    }
}
