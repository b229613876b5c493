//! Spectrum bus: memory and I/O routing.
//!
//! The bus connects the Z80 to paged memory and the ULA. Two ports are
//! decoded:
//!
//! - $FE (any even port): border and MIC on write; EAR on read. No keys are
//!   ever pressed, so the keyboard half-rows always read high.
//! - $7FFD (A15 and A1 low): memory paging on 128K models.
//!
//! # Contention
//!
//! Every access carries the absolute T-state at which it starts. The ULA
//! turns that into wait states, which the bus returns to the CPU.

#![allow(clippy::cast_possible_truncation)]

use emu_core::{Bus, ReadResult};

use crate::memory::PagedMemory;
use crate::ula::Ula;

/// The Spectrum bus, implementing `emu_core::Bus`.
pub struct SpectrumBus {
    pub memory: PagedMemory,
    pub ula: Ula,
    /// Last value written to port $FE (for EAR loopback and border).
    pub last_fe_write: u8,
    /// Tape EAR level: `Some(level)` while a tape signal is active, `None`
    /// falls back to MIC loopback (bit 3 of last $FE write).
    pub tape_ear: Option<bool>,
}

impl SpectrumBus {
    #[must_use]
    pub fn new(memory: PagedMemory, ula: Ula) -> Self {
        Self {
            memory,
            ula,
            last_fe_write: 0,
            tape_ear: None,
        }
    }

    /// Bit 6 of a $FE read.
    fn ear_bit(&self) -> u8 {
        match self.tape_ear {
            Some(true) => 0x40,
            Some(false) => 0x00,
            None => (self.last_fe_write & 0x08) << 3,
        }
    }

    fn io_wait(&self, port: u16, clock: u64) -> u8 {
        let ula_port = port & 0x01 == 0;
        let contended_high = self.memory.is_contended(port);
        self.ula.io_contention(contended_high, ula_port, clock)
    }
}

impl Bus for SpectrumBus {
    fn read(&mut self, address: u16, clock: u64) -> ReadResult {
        let data = self.memory.read(address);
        let wait = self.ula.contention(self.memory.is_contended(address), clock);
        ReadResult::with_wait(data, wait)
    }

    fn write(&mut self, address: u16, value: u8, clock: u64) -> u8 {
        let wait = self.ula.contention(self.memory.is_contended(address), clock);
        self.memory.write(address, value);
        wait
    }

    fn io_read(&mut self, port: u16, clock: u64) -> ReadResult {
        let wait = self.io_wait(port, clock);
        // Bits 0-4: keyboard (all released), bit 5 and 7: always 1.
        let data = if port & 0x01 == 0 {
            0x1F | 0xA0 | self.ear_bit()
        } else {
            0xFF
        };
        ReadResult::with_wait(data, wait)
    }

    fn io_write(&mut self, port: u16, value: u8, clock: u64) -> u8 {
        let wait = self.io_wait(port, clock);
        let ula_port = port & 0x01 == 0;

        if ula_port {
            self.last_fe_write = value;
            self.ula.set_border(value);
        }

        // A15 and A1 low. A0 is not decoded, so $7FFC pages as well.
        if port & 0x8002 == 0x0000 {
            self.memory.write_paging(value);
        }

        wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SpectrumModel, Timings};

    fn make_bus(model: SpectrumModel) -> SpectrumBus {
        let timings = model.timings().unwrap_or(Timings::SINCLAIR_48K);
        SpectrumBus::new(PagedMemory::new(model, &[]), Ula::new(&timings, true))
    }

    #[test]
    fn memory_read_write() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        bus.write(0x8000, 0xAB, 0);
        assert_eq!(bus.read(0x8000, 0).data, 0xAB);
    }

    #[test]
    fn rom_write_ignored() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        bus.write(0x0000, 0xFF, 0);
        assert_eq!(bus.read(0x0000, 0).data, 0x00);
    }

    #[test]
    fn contended_read_waits() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        assert_eq!(bus.read(0x4000, 14_335).wait, 6);
        assert_eq!(bus.read(0x8000, 14_335).wait, 0);
        assert_eq!(bus.write(0x4000, 0, 14_336), 5);
    }

    #[test]
    fn fe_read_with_no_keys() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        assert_eq!(bus.io_read(0xFEFE, 0).data, 0xBF);

        // MIC loopback.
        bus.io_write(0x00FE, 0x08, 0);
        assert_eq!(bus.io_read(0xFEFE, 0).data, 0xFF);
    }

    #[test]
    fn tape_level_overrides_loopback() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        bus.io_write(0x00FE, 0x08, 0);
        bus.tape_ear = Some(false);
        assert_eq!(bus.io_read(0x7FFE, 0).data & 0x40, 0x00);
        bus.tape_ear = Some(true);
        assert_eq!(bus.io_read(0x7FFE, 0).data & 0x40, 0x40);
    }

    #[test]
    fn border_from_fe_write() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        bus.io_write(0x00FE, 0x12, 0);
        assert_eq!(bus.ula.border(), 2);
    }

    #[test]
    fn odd_port_reads_ff() {
        let mut bus = make_bus(SpectrumModel::Spectrum48K);
        assert_eq!(bus.io_read(0x00FF, 0).data, 0xFF);
    }

    #[test]
    fn port_7ffd_pages_128k() {
        let mut bus = make_bus(SpectrumModel::Spectrum128K);
        bus.write(0xC000, 0x11, 0);
        bus.io_write(0x7FFD, 0x01, 0);
        assert_eq!(bus.read(0xC000, 0).data, 0x00);
        bus.io_write(0x7FFD, 0x00, 0);
        assert_eq!(bus.read(0xC000, 0).data, 0x11);
    }

    #[test]
    fn paging_ignores_a0() {
        let mut bus = make_bus(SpectrumModel::Spectrum128K);
        bus.io_write(0x7FFC, 0x03, 0);
        assert_eq!(bus.memory.paging_register(), 0x03);
        assert_eq!(bus.ula.border(), 3);
    }

    #[test]
    fn fe_write_does_not_page() {
        let mut bus = make_bus(SpectrumModel::Spectrum128K);
        bus.io_write(0x00FE, 0x07, 0);
        assert_eq!(bus.memory.paging_register(), 0);
    }
}
