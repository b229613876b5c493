//! CPU core trait.

use crate::Bus;

/// A CPU core.
///
/// CPUs execute whole instructions and access memory through a bus. The bus
/// is passed in, not owned, so the system keeps ownership of memory and
/// peripherals and can hand the CPU a narrow view of them.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Execute instructions until at least `budget` T-states have elapsed.
    ///
    /// Returns the number of T-states actually consumed, which may overshoot
    /// the budget by part of one instruction. Implementations may return
    /// early at an interrupt acceptance boundary.
    fn advance<B: Bus>(&mut self, bus: &mut B, budget: u32) -> u32;

    /// Returns the current program counter.
    fn pc(&self) -> u16;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU is halted.
    fn is_halted(&self) -> bool;

    /// Drive the maskable interrupt request line.
    fn set_interrupt_line(&mut self, asserted: bool);

    /// Request a non-maskable interrupt.
    fn nmi(&mut self);

    /// Reset the CPU to its power-on state.
    fn reset(&mut self);
}
