//! Core traits and types for instruction-stepped emulation.
//!
//! Time is counted in CPU T-states. Every bus access carries the T-state at
//! which it happens so that the system can charge contention wait states.

mod bus;
mod cpu;
mod observable;

pub use bus::{Bus, ReadResult, SimpleBus};
pub use cpu::Cpu;
pub use observable::{Observable, Value};
