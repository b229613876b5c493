//! Spectrum memory subsystem.
//!
//! The 64K address space is four 16K slots. Each slot is backed by a ROM
//! page, a RAM page, or nothing. RAM pages keep their 128K numbering on every
//! model, so the screen always lives in page 5:
//!
//! | slot | 16K      | 48K   | 128K / +2                      |
//! |------|----------|-------|--------------------------------|
//! | 0    | ROM 0    | ROM 0 | ROM 0 or 1 ($7FFD bit 4)       |
//! | 1    | RAM 5    | RAM 5 | RAM 5                          |
//! | 2    | unmapped | RAM 2 | RAM 2                          |
//! | 3    | unmapped | RAM 0 | RAM 0-7 ($7FFD bits 0-2)       |
//!
//! Odd RAM pages share the bus with the ULA and are contended.

use tracing::debug;

use crate::config::SpectrumModel;

pub const PAGE_SIZE: usize = 0x4000;

/// Bytes of bitmap plus attributes at the start of a screen page.
pub const SCREEN_SIZE: usize = 6912;

type Page = Box<[u8; PAGE_SIZE]>;

fn blank_page() -> Page {
    Box::new([0; PAGE_SIZE])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Rom(usize),
    Ram(usize),
    Unmapped,
}

/// ROM and RAM pages plus the slot map.
pub struct PagedMemory {
    roms: Vec<Page>,
    ram: [Option<Page>; 8],
    slots: [Slot; 4],
    /// Last value written to $7FFD.
    paging: u8,
    /// Set by bit 5 of $7FFD; cleared only by reset.
    locked: bool,
    has_paging: bool,
}

impl PagedMemory {
    /// Build the memory for `model`. Each ROM image is copied into its own
    /// page; missing or short images leave the rest of the page zeroed.
    #[must_use]
    pub fn new(model: SpectrumModel, roms: &[&[u8]]) -> Self {
        let rom_count = model.rom_files().len().max(1);
        let roms = (0..rom_count)
            .map(|index| {
                let mut page = blank_page();
                if let Some(image) = roms.get(index) {
                    let len = image.len().min(PAGE_SIZE);
                    page[..len].copy_from_slice(&image[..len]);
                }
                page
            })
            .collect();

        let fitted: &[usize] = match model.ram_pages() {
            1 => &[5],
            3 => &[5, 2, 0],
            _ => &[0, 1, 2, 3, 4, 5, 6, 7],
        };
        let mut ram: [Option<Page>; 8] = Default::default();
        for &page in fitted {
            ram[page] = Some(blank_page());
        }

        let mut memory = Self {
            roms,
            ram,
            slots: [Slot::Unmapped; 4],
            paging: 0,
            locked: false,
            has_paging: model.has_paging(),
        };
        memory.reset_paging();
        memory
    }

    fn slot(&self, addr: u16) -> (Slot, usize) {
        (self.slots[usize::from(addr >> 14)], usize::from(addr) & (PAGE_SIZE - 1))
    }

    #[must_use]
    pub fn read(&self, addr: u16) -> u8 {
        match self.slot(addr) {
            (Slot::Rom(page), offset) => self.roms[page][offset],
            (Slot::Ram(page), offset) => self.ram[page].as_ref().map_or(0xFF, |p| p[offset]),
            (Slot::Unmapped, _) => 0xFF,
        }
    }

    /// Write a byte. ROM and unmapped slots ignore writes.
    pub fn write(&mut self, addr: u16, value: u8) {
        if let (Slot::Ram(page), offset) = self.slot(addr)
            && let Some(page) = self.ram[page].as_mut()
        {
            page[offset] = value;
        }
    }

    #[must_use]
    pub fn read_word(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }

    pub fn write_word(&mut self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }

    /// Handle a write to $7FFD. Ignored on models without paging and once
    /// the lock bit has been set.
    pub fn write_paging(&mut self, value: u8) {
        if !self.has_paging {
            return;
        }
        if self.locked {
            debug!(value, "paging write ignored, register locked");
            return;
        }
        self.paging = value;
        self.locked = value & 0x20 != 0;
        self.apply_paging();
        debug!(
            value,
            ram = value & 0x07,
            rom = (value >> 4) & 1,
            screen = self.screen_page(),
            locked = self.locked,
            "memory paged"
        );
    }

    fn apply_paging(&mut self) {
        let has = |page: usize| self.ram[page].is_some();
        self.slots = [
            Slot::Rom(usize::from((self.paging >> 4) & 1).min(self.roms.len() - 1)),
            if has(5) { Slot::Ram(5) } else { Slot::Unmapped },
            if has(2) { Slot::Ram(2) } else { Slot::Unmapped },
            match usize::from(self.paging & 0x07) {
                page if has(page) => Slot::Ram(page),
                _ => Slot::Unmapped,
            },
        ];
    }

    /// Restore power-on paging and release the lock.
    pub fn reset_paging(&mut self) {
        self.paging = 0;
        self.locked = false;
        self.apply_paging();
    }

    /// Zero every RAM page.
    pub fn clear_ram(&mut self) {
        for page in self.ram.iter_mut().flatten() {
            page.fill(0);
        }
    }

    /// Whether `addr` is in a page the ULA contends.
    #[must_use]
    pub fn is_contended(&self, addr: u16) -> bool {
        matches!(self.slot(addr).0, Slot::Ram(page) if page & 1 == 1)
    }

    /// RAM page the ULA displays: 5, or 7 when the shadow screen is selected.
    #[must_use]
    pub fn screen_page(&self) -> usize {
        if self.paging & 0x08 != 0 { 7 } else { 5 }
    }

    /// Bitmap and attributes of the displayed screen.
    #[must_use]
    pub fn screen(&self) -> &[u8] {
        match &self.ram[self.screen_page()] {
            Some(page) => &page[..SCREEN_SIZE],
            None => &[],
        }
    }

    /// A RAM page by number, if fitted.
    #[must_use]
    pub fn ram_page(&self, page: usize) -> Option<&[u8; PAGE_SIZE]> {
        self.ram.get(page)?.as_deref()
    }

    /// ROM page mapped at $0000.
    #[must_use]
    pub fn active_rom(&self) -> usize {
        match self.slots[0] {
            Slot::Rom(page) => page,
            _ => 0,
        }
    }

    /// Last value written to $7FFD.
    #[must_use]
    pub fn paging_register(&self) -> u8 {
        self.paging
    }
}
