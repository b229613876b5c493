//! Zilog Z80 CPU.
//!
//! Each call to [`Z80::step`] executes one whole instruction (or accepts one
//! interrupt) and returns the T-states it cost. Opcodes are decoded through
//! static tables, one per prefix family.

mod alu;
mod cpu;
mod flags;
mod registers;

pub use cpu::{Exit, Z80};
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use registers::Registers;
