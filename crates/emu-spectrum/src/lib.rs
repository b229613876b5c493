//! Instruction-stepped ZX Spectrum emulation engine.
//!
//! Covers the Sinclair 16K, 48K, 128K and +2. The CPU runs whole
//! instructions up to the next scheduled event; frame interrupts and tape
//! signal edges are events on an absolute T-state timeline. Memory
//! contention is charged per access from that timeline.
//!
//! The engine has no keyboard, sound or display. Screen memory is exposed
//! as raw bytes.

mod bus;
mod config;
mod error;
mod memory;
mod scheduler;
mod screen;
mod spectrum;
mod tape;
mod ula;

pub use bus::SpectrumBus;
pub use config::{MachineInfo, Settings, SpectrumModel, Timings};
pub use error::{Error, Result};
pub use memory::{PAGE_SIZE, PagedMemory, SCREEN_SIZE};
pub use scheduler::{Event, EventHandler, EventKind, Scheduler};
pub use screen::{ATTRIBUTES_SIZE, BITMAP_SIZE, Screen};
pub use spectrum::{LoadStatus, MachineState, Spectrum};
pub use tape::TapeDeck;
pub use ula::Ula;
