//! Memory and I/O bus interface.

/// Result of a bus read: the data byte plus any wait states the access cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadResult {
    pub data: u8,
    /// Extra T-states inserted by the bus (memory or I/O contention).
    pub wait: u8,
}

impl ReadResult {
    #[must_use]
    pub const fn new(data: u8) -> Self {
        Self { data, wait: 0 }
    }

    #[must_use]
    pub const fn with_wait(data: u8, wait: u8) -> Self {
        Self { data, wait }
    }
}

/// Memory and I/O bus interface.
///
/// Components access memory and peripherals through this trait. The bus
/// handles address decoding and routing to the appropriate device.
///
/// Every access carries `clock`, the absolute T-state at which the access
/// starts. Buses that model contention use it to work out how many wait
/// states to insert; the rest ignore it.
pub trait Bus {
    /// Read a byte from memory.
    fn read(&mut self, address: u16, clock: u64) -> ReadResult;

    /// Write a byte to memory. Returns wait states.
    fn write(&mut self, address: u16, value: u8, clock: u64) -> u8;

    /// Read a byte from an I/O port.
    fn io_read(&mut self, port: u16, clock: u64) -> ReadResult;

    /// Write a byte to an I/O port. Returns wait states.
    fn io_write(&mut self, port: u16, value: u8, clock: u64) -> u8;

    /// Byte the interrupting device places on the data bus during an
    /// interrupt acknowledge cycle. Spectrums leave the bus floating high.
    fn interrupt_data(&mut self) -> u8 {
        0xFF
    }
}

/// Flat 64K RAM bus with no contention. I/O reads return `$FF`.
///
/// Used by CPU tests and anything that needs a plain address space.
pub struct SimpleBus {
    ram: Vec<u8>,
    /// Last value written to each port, for tests that check `OUT`.
    pub last_io_write: Option<(u16, u8)>,
    /// Value returned for every I/O read.
    pub io_value: u8,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: vec![0; 0x10000],
            last_io_write: None,
            io_value: 0xFF,
        }
    }

    /// Copy `data` into memory starting at `address` (wrapping at 64K).
    pub fn load(&mut self, address: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.ram[address.wrapping_add(i as u16) as usize] = byte;
        }
    }

    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    pub fn poke(&mut self, address: u16, value: u8) {
        self.ram[address as usize] = value;
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16, _clock: u64) -> ReadResult {
        ReadResult::new(self.ram[address as usize])
    }

    fn write(&mut self, address: u16, value: u8, _clock: u64) -> u8 {
        self.ram[address as usize] = value;
        0
    }

    fn io_read(&mut self, _port: u16, _clock: u64) -> ReadResult {
        ReadResult::new(self.io_value)
    }

    fn io_write(&mut self, port: u16, value: u8, _clock: u64) -> u8 {
        self.last_io_write = Some((port, value));
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_wraps_at_top_of_memory() {
        let mut bus = SimpleBus::new();
        bus.load(0xFFFF, &[0x11, 0x22]);
        assert_eq!(bus.peek(0xFFFF), 0x11);
        assert_eq!(bus.peek(0x0000), 0x22);
    }

    #[test]
    fn io_write_is_recorded() {
        let mut bus = SimpleBus::new();
        assert_eq!(bus.io_write(0x12FE, 0x07, 0), 0);
        assert_eq!(bus.last_io_write, Some((0x12FE, 0x07)));
        assert_eq!(bus.io_read(0x12FE, 0).data, 0xFF);
    }
}
