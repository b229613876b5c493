//! Top-level Spectrum system.
//!
//! `Spectrum` owns the selected machine and the tape deck. The caller drives
//! it in two halves:
//!
//! - [`Spectrum::do_opcodes`] runs the CPU up to the next scheduled event.
//! - [`Spectrum::do_events`] fires every event that is now due.
//!
//! # Frame loop
//!
//! A `Frame` event fires every `tstates_per_frame` T-states. It raises INT,
//! schedules an `InterruptEnd` `interrupt_length` T-states later and re-arms
//! itself. The first frame event is at the end of the first frame.
//!
//! # Lifecycle
//!
//! `Uninitialized → Configured → Running → Destroyed`. Stepping needs a
//! selected machine; after `destroy` every call fails.

use std::path::Path;
use std::time::Duration;

use emu_core::{Cpu, Observable, Value};
use format_spectrum_tap::TapFile;
use tracing::{debug, info, warn};
use zilog_z80::{CF, Exit, Registers, Z80};

use crate::bus::SpectrumBus;
use crate::config::{MachineInfo, Settings, SpectrumModel, Timings};
use crate::error::{Error, Result};
use crate::memory::{PAGE_SIZE, PagedMemory};
use crate::scheduler::{Event, EventHandler, EventKind, Scheduler};
use crate::screen::Screen;
use crate::tape::TapeDeck;
use crate::ula::Ula;

/// ROM address of the LD-BYTES routine (tape loading entry point).
const LD_BYTES_ADDR: u16 = 0x0556;

/// Lifecycle stage of a [`Spectrum`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Uninitialized,
    Configured,
    Running,
    Destroyed,
}

/// Why [`Spectrum::load_tape_wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Every block was played or trapped.
    Completed,
    /// The T-state budget ran out first.
    TimedOut,
}

/// Everything built by `select_machine`.
struct Machine {
    info: MachineInfo,
    cpu: Z80,
    bus: SpectrumBus,
    scheduler: Scheduler,
    /// T-state at which the current frame started.
    frame_origin: u64,
    frame_count: u64,
}

impl Machine {
    fn new(info: MachineInfo, memory: PagedMemory, contended: bool) -> Self {
        let ula = Ula::new(&info.timings, contended);
        let mut machine = Self {
            info,
            cpu: Z80::new(),
            bus: SpectrumBus::new(memory, ula),
            scheduler: Scheduler::new(),
            frame_origin: 0,
            frame_count: 0,
        };
        machine.restart_clock();
        machine
    }

    /// Put the CPU at power-on state and start timing from T-state zero.
    fn restart_clock(&mut self) {
        self.cpu.reset();
        self.scheduler.clear();
        self.scheduler
            .schedule(u64::from(self.info.timings.tstates_per_frame), EventKind::Frame);
        self.frame_origin = 0;
        self.frame_count = 0;
        self.bus.tape_ear = None;
        self.bus.last_fe_write = 0;
    }

    fn now(&self) -> u64 {
        self.cpu.clock()
    }

    /// ROM page holding 48K BASIC, where the loader trap applies.
    fn basic_rom(&self) -> usize {
        self.info.rom_pages.saturating_sub(1)
    }

    /// Service a call to LD-BYTES from the next tape block.
    ///
    /// On entry A holds the expected flag, DE the length, IX the
    /// destination, and carry is set for LOAD and clear for VERIFY. On
    /// return carry reports success, IX and DE have moved past the bytes
    /// handled, and the routine's caller is resumed.
    ///
    /// Returns false, leaving the CPU untouched, when the tape is out of
    /// blocks.
    fn trap_load(&mut self, tape: &mut TapeDeck) -> bool {
        let Some(block) = tape.next_block() else {
            return false;
        };
        let regs = &mut self.cpu.regs;
        let expected = usize::from(regs.de());
        let is_load = regs.f & CF != 0;
        debug!(
            flag = block.flag,
            expected_flag = regs.a,
            length = expected,
            dest = regs.ix,
            is_load,
            "tape trap"
        );

        let mut success = block.flag == regs.a;
        if success {
            let count = expected.min(block.data.len());
            let mut parity = block.flag;
            for (i, &byte) in block.data[..count].iter().enumerate() {
                let addr = regs.ix.wrapping_add(i as u16);
                if is_load {
                    self.bus.memory.write(addr, byte);
                } else if self.bus.memory.read(addr) != byte {
                    success = false;
                }
                parity ^= byte;
            }
            let stored = block.data.get(count).copied().unwrap_or(block.checksum);
            success &= count == expected && parity == stored;
            regs.ix = regs.ix.wrapping_add(count as u16);
            regs.set_de((expected - count) as u16);
            regs.a = parity ^ stored;
        }

        regs.f = if success { regs.f | CF } else { regs.f & !CF };
        regs.pc = self.bus.memory.read_word(regs.sp);
        regs.sp = regs.sp.wrapping_add(2);
        regs.wz = regs.pc;
        true
    }
}

/// Narrow view of the hardware handed to the scheduler.
struct Devices<'a> {
    cpu: &'a mut Z80,
    bus: &'a mut SpectrumBus,
    tape: &'a mut TapeDeck,
    timings: &'a Timings,
    frame_origin: &'a mut u64,
    frame_count: &'a mut u64,
}

impl EventHandler for Devices<'_> {
    fn handle(&mut self, event: Event, scheduler: &mut Scheduler) {
        match event.kind {
            EventKind::Frame => {
                self.cpu.set_interrupt_line(true);
                *self.frame_origin = event.time;
                *self.frame_count += 1;
                scheduler.schedule(
                    event.time + u64::from(self.timings.interrupt_length),
                    EventKind::InterruptEnd,
                );
                scheduler.schedule(
                    event.time + u64::from(self.timings.tstates_per_frame),
                    EventKind::Frame,
                );
            }
            EventKind::InterruptEnd => self.cpu.set_interrupt_line(false),
            EventKind::TapeEdge => {
                if let Some(delay) = self.tape.next_edge() {
                    self.bus.tape_ear = Some(self.tape.level());
                    scheduler.schedule(event.time + u64::from(delay), EventKind::TapeEdge);
                } else {
                    self.bus.tape_ear = None;
                    info!(blocks = self.tape.block_count(), "end of tape");
                }
            }
        }
    }
}

/// ZX Spectrum system.
pub struct Spectrum {
    settings: Settings,
    state: MachineState,
    machine: Option<Machine>,
    tape: TapeDeck,
}

impl Spectrum {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            state: MachineState::Uninitialized,
            machine: None,
            tape: TapeDeck::new(Timings::SINCLAIR_48K.processor_speed),
        }
    }

    fn check_alive(&self) -> Result<()> {
        if self.state == MachineState::Destroyed {
            Err(Error::UseAfterDestroy)
        } else {
            Ok(())
        }
    }

    fn machine(&self) -> Result<&Machine> {
        self.check_alive()?;
        self.machine.as_ref().ok_or(Error::NoMachineSelected)
    }

    fn machine_mut(&mut self) -> Result<&mut Machine> {
        self.check_alive()?;
        self.machine.as_mut().ok_or(Error::NoMachineSelected)
    }

    /// Select `model`, loading its ROMs from [`Settings::rom_dir`].
    ///
    /// Without a ROM directory the ROM pages are left blank.
    pub fn select_machine(&mut self, model: SpectrumModel) -> Result<()> {
        self.check_alive()?;
        Self::check_supported(model)?;

        let roms = match &self.settings.rom_dir {
            Some(dir) => model
                .rom_files()
                .iter()
                .map(|name| {
                    let path = dir.join(name);
                    std::fs::read(&path).map_err(|source| Error::Rom { path, source })
                })
                .collect::<Result<Vec<_>>>()?,
            None => {
                warn!(model = model.id(), "no ROM directory set, ROM pages left blank");
                Vec::new()
            }
        };
        let images: Vec<&[u8]> = roms.iter().map(Vec::as_slice).collect();
        self.select_machine_with_roms(model, &images)
    }

    /// Select `model` with the given ROM images, one per ROM page. Missing
    /// trailing images leave their pages blank.
    pub fn select_machine_with_roms(&mut self, model: SpectrumModel, roms: &[&[u8]]) -> Result<()> {
        self.check_alive()?;
        let timings = Self::check_supported(model)?;
        if let Some((index, rom)) = roms
            .iter()
            .enumerate()
            .find(|(_, rom)| rom.len() != PAGE_SIZE)
        {
            return Err(Error::RomSize {
                index,
                expected: PAGE_SIZE,
                actual: rom.len(),
            });
        }

        let info = MachineInfo::new(model, timings);
        let memory = PagedMemory::new(model, roms);
        self.machine = Some(Machine::new(info, memory, self.settings.contended_memory));
        self.tape.stop();
        self.tape.set_processor_speed(timings.processor_speed);
        self.state = MachineState::Configured;
        info!(
            model = model.id(),
            roms = roms.len(),
            processor_speed = timings.processor_speed,
            "machine selected"
        );
        Ok(())
    }

    fn check_supported(model: SpectrumModel) -> Result<Timings> {
        model.timings().ok_or_else(|| {
            warn!(?model, "unsupported machine model");
            Error::Configuration { model }
        })
    }

    /// Soft reset: CPU and paging back to power-on, RAM kept. A loaded tape
    /// stays in the deck, stopped where it was.
    pub fn reset(&mut self) -> Result<()> {
        let machine = self.machine_mut()?;
        machine.restart_clock();
        machine.bus.memory.reset_paging();
        self.tape.stop();
        self.state = MachineState::Configured;
        info!("machine reset");
        Ok(())
    }

    /// Reset and clear RAM.
    pub fn hard_reset(&mut self) -> Result<()> {
        self.machine_mut()?.bus.memory.clear_ram();
        self.reset()
    }

    /// Run the CPU until the next scheduled event is due or an interrupt is
    /// accepted. Returns the T-states executed.
    pub fn do_opcodes(&mut self) -> Result<u64> {
        self.run_opcodes(u64::MAX)
    }

    /// `do_opcodes`, stopping no later than the first instruction boundary
    /// at or past `deadline`.
    fn run_opcodes(&mut self, deadline: u64) -> Result<u64> {
        self.check_alive()?;
        let tape_traps = self.settings.tape_traps;
        let Some(machine) = self.machine.as_mut() else {
            return Err(Error::NoMachineSelected);
        };
        let start = machine.now();
        let limit = machine
            .scheduler
            .next_event_time()
            .map_or(deadline, |next| next.min(deadline));

        loop {
            let trap = (tape_traps
                && self.tape.is_loaded()
                && machine.bus.memory.active_rom() == machine.basic_rom())
            .then_some(LD_BYTES_ADDR);
            match machine.cpu.run_until(&mut machine.bus, limit, trap) {
                Exit::Trap => {
                    if !machine.trap_load(&mut self.tape) {
                        machine.cpu.step(&mut machine.bus);
                    }
                }
                Exit::Limit | Exit::Interrupt => break,
            }
        }

        self.state = MachineState::Running;
        Ok(machine.now() - start)
    }

    /// Fire every event that is due. Returns how many fired.
    pub fn do_events(&mut self) -> Result<usize> {
        self.check_alive()?;
        let Some(machine) = self.machine.as_mut() else {
            return Err(Error::NoMachineSelected);
        };
        let now = machine.cpu.clock();
        let mut devices = Devices {
            cpu: &mut machine.cpu,
            bus: &mut machine.bus,
            tape: &mut self.tape,
            timings: &machine.info.timings,
            frame_origin: &mut machine.frame_origin,
            frame_count: &mut machine.frame_count,
        };
        let fired = machine.scheduler.advance(now, &mut devices);
        self.state = MachineState::Running;
        Ok(fired)
    }

    /// Alternate `do_opcodes` and `do_events` until the next frame starts.
    pub fn run_frame(&mut self) -> Result<()> {
        let frame = self.frame_count()?;
        while self.frame_count()? == frame {
            self.do_opcodes()?;
            self.do_events()?;
        }
        Ok(())
    }

    pub fn get_info(&self) -> Result<MachineInfo> {
        Ok(self.machine()?.info.clone())
    }

    /// Snapshot of the CPU registers.
    pub fn processor(&self) -> Result<Registers> {
        Ok(self.machine()?.cpu.registers())
    }

    /// Overwrite the CPU registers. Execution continues from the new PC at
    /// the next `do_opcodes`.
    pub fn set_processor(&mut self, regs: Registers) -> Result<()> {
        let machine = self.machine_mut()?;
        machine.cpu.regs = regs;
        debug!(pc = regs.pc, sp = regs.sp, "registers set");
        Ok(())
    }

    /// T-states since the last reset.
    pub fn tstates(&self) -> Result<u64> {
        Ok(self.machine()?.now())
    }

    /// T-states since the current frame started.
    pub fn frame_tstate(&self) -> Result<u64> {
        let machine = self.machine()?;
        Ok(machine.now() - machine.frame_origin)
    }

    /// Frames started since the last reset.
    pub fn frame_count(&self) -> Result<u64> {
        Ok(self.machine()?.frame_count)
    }

    pub fn settings(&self) -> Result<&Settings> {
        self.check_alive()?;
        Ok(&self.settings)
    }

    /// Changes take effect at the next `select_machine`, except
    /// `tape_traps`, `fastload` and `emulation_speed`, which apply at once.
    pub fn settings_mut(&mut self) -> Result<&mut Settings> {
        self.check_alive()?;
        Ok(&mut self.settings)
    }

    /// How long the caller should take over each frame, or `None` to run
    /// flat out.
    pub fn frame_pacing(&self) -> Result<Option<Duration>> {
        let timings = self.machine()?.info.timings;
        if self.fast_loading() {
            return Ok(None);
        }
        Ok(self.settings.frame_duration(&timings))
    }

    pub fn is_fast_loading_active(&self) -> Result<bool> {
        self.check_alive()?;
        Ok(self.fast_loading())
    }

    fn fast_loading(&self) -> bool {
        self.settings.fastload && self.tape.is_playing()
    }

    /// Read a byte as the CPU would see it, without contention.
    pub fn read_memory(&self, addr: u16) -> Result<u8> {
        Ok(self.machine()?.bus.memory.read(addr))
    }

    /// Write a byte as the CPU would. ROM ignores writes.
    pub fn write_memory(&mut self, addr: u16, value: u8) -> Result<()> {
        self.machine_mut()?.bus.memory.write(addr, value);
        Ok(())
    }

    pub fn screen_data(&self) -> Result<Screen<'_>> {
        Ok(Screen::new(self.machine()?.bus.memory.screen()))
    }

    /// RAM page currently displayed.
    pub fn screen_page_num(&self) -> Result<usize> {
        Ok(self.machine()?.bus.memory.screen_page())
    }

    /// A RAM page by number, or `None` if the model does not fit it.
    pub fn ram_page(&self, page: usize) -> Result<Option<&[u8; PAGE_SIZE]>> {
        Ok(self.machine()?.bus.memory.ram_page(page))
    }

    /// Replace the tape with a TAP image. On a parse error the current tape
    /// is kept as it was.
    pub fn load_tape(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_alive()?;
        let tap = TapFile::parse(bytes)?;
        self.stop_signal();
        info!(
            blocks = tap.blocks.len(),
            bytes = bytes.len(),
            "tape loaded"
        );
        let headers = tap
            .blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| Some((index, block.header()?)));
        for (index, header) in headers {
            debug!(index, %header, "tape header");
        }
        self.tape.insert(tap);
        Ok(())
    }

    /// [`Spectrum::load_tape`] from a file.
    pub fn load_tape_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.check_alive()?;
        let bytes = std::fs::read(path)?;
        self.load_tape(&bytes)
    }

    /// Load a tape, play it, and run until every block has been consumed or
    /// `budget` T-states have passed. The CPU stops at the first instruction
    /// boundary past the budget.
    pub fn load_tape_wait(&mut self, bytes: &[u8], budget: u64) -> Result<LoadStatus> {
        self.machine()?;
        self.load_tape(bytes)?;
        self.play_tape()?;
        let start = self.tstates()?;
        let deadline = start.saturating_add(budget);
        loop {
            if self.tape.is_finished() {
                return Ok(LoadStatus::Completed);
            }
            if self.tstates()? >= deadline {
                warn!(budget, block = self.tape.block_index(), "tape load timed out");
                return Ok(LoadStatus::TimedOut);
            }
            self.run_opcodes(deadline)?;
            self.do_events()?;
        }
    }

    /// Start the tape signal. Returns whether the deck is playing.
    pub fn play_tape(&mut self) -> Result<bool> {
        self.check_alive()?;
        let Some(machine) = self.machine.as_mut() else {
            return Err(Error::NoMachineSelected);
        };
        let playing = self.tape.play();
        if playing && !machine.scheduler.is_scheduled(EventKind::TapeEdge) {
            machine.scheduler.schedule(machine.now(), EventKind::TapeEdge);
        }
        debug!(playing, block = self.tape.block_index(), "tape play");
        Ok(playing)
    }

    pub fn stop_tape(&mut self) -> Result<()> {
        self.check_alive()?;
        self.stop_signal();
        debug!(block = self.tape.block_index(), "tape stop");
        Ok(())
    }

    /// Back to the first block. A playing tape keeps playing from there.
    pub fn rewind_tape(&mut self) -> Result<()> {
        self.check_alive()?;
        let playing = self.tape.is_playing();
        self.stop_signal();
        self.tape.rewind();
        debug!("tape rewind");
        if playing {
            self.play_tape()?;
        }
        Ok(())
    }

    pub fn eject_tape(&mut self) -> Result<()> {
        self.check_alive()?;
        self.stop_signal();
        self.tape.eject();
        info!("tape ejected");
        Ok(())
    }

    fn stop_signal(&mut self) {
        self.tape.stop();
        if let Some(machine) = self.machine.as_mut() {
            machine.scheduler.remove(EventKind::TapeEdge);
            machine.bus.tape_ear = None;
        }
    }

    pub fn tape(&self) -> Result<&TapeDeck> {
        self.check_alive()?;
        Ok(&self.tape)
    }

    /// Release the machine. Every later call fails with
    /// [`Error::UseAfterDestroy`].
    pub fn destroy(&mut self) -> Result<()> {
        self.check_alive()?;
        self.machine = None;
        self.tape.eject();
        self.state = MachineState::Destroyed;
        info!("machine destroyed");
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> MachineState {
        self.state
    }
}

impl Default for Spectrum {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Drop for Spectrum {
    fn drop(&mut self) {
        if self.state != MachineState::Destroyed {
            let _ = self.destroy();
        }
    }
}

fn parse_address(text: &str) -> Option<u16> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else if let Some(hex) = text.strip_prefix('$') {
        u16::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

impl Observable for Spectrum {
    fn query(&self, path: &str) -> Option<Value> {
        let machine = self.machine().ok()?;
        if let Some(rest) = path.strip_prefix("cpu.") {
            machine.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("memory.") {
            parse_address(rest).map(|a| Value::U8(machine.bus.memory.read(a)))
        } else {
            match path {
                "model" => Some(machine.info.id.into()),
                "frame" => Some(machine.frame_count.into()),
                "tstate" => Some((machine.now() - machine.frame_origin).into()),
                "paging" => Some(machine.bus.memory.paging_register().into()),
                "border" => Some(machine.bus.ula.border().into()),
                "tape.block" => Some((self.tape.block_index() as u64).into()),
                "tape.playing" => Some(self.tape.is_playing().into()),
                "tape.level" => Some(self.tape.level().into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<z80_paths>",
            "memory.<address>",
            "model",
            "frame",
            "tstate",
            "paging",
            "border",
            "tape.block",
            "tape.playing",
            "tape.level",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 48K with a ROM that just halts: DI; HALT.
    fn make_spectrum() -> Spectrum {
        let mut rom = vec![0u8; PAGE_SIZE];
        rom[0] = 0xF3;
        rom[1] = 0x76;
        let mut spectrum = Spectrum::default();
        spectrum
            .select_machine_with_roms(SpectrumModel::Spectrum48K, &[&rom])
            .expect("48K is supported");
        spectrum
    }

    #[test]
    fn first_do_opcodes_runs_to_first_frame() {
        let mut spectrum = make_spectrum();
        let elapsed = spectrum.do_opcodes().expect("configured");
        assert_eq!(elapsed, 69_888);
        assert_eq!(spectrum.do_events().expect("configured"), 1);
        assert_eq!(spectrum.frame_count().expect("configured"), 1);
        assert_eq!(spectrum.frame_tstate().expect("configured"), 0);
    }

    #[test]
    fn interrupt_line_follows_frame() {
        let mut spectrum = make_spectrum();
        spectrum.run_frame().expect("configured");
        assert_eq!(spectrum.query("cpu.int_line"), Some(Value::Bool(true)));
        spectrum.do_opcodes().expect("configured");
        spectrum.do_events().expect("configured");
        assert_eq!(spectrum.query("cpu.int_line"), Some(Value::Bool(false)));
    }

    #[test]
    fn observable_paths() {
        let mut spectrum = make_spectrum();
        assert_eq!(spectrum.query("cpu.pc"), Some(Value::U16(0)));
        assert_eq!(spectrum.query("memory.0x0000"), Some(Value::U8(0xF3)));
        assert_eq!(spectrum.query("memory.$0001"), Some(Value::U8(0x76)));
        assert_eq!(spectrum.query("model"), Some(Value::String("48".into())));
        assert_eq!(spectrum.query("tape.playing"), Some(Value::Bool(false)));
        spectrum.write_memory(0x8000, 0xAB).expect("configured");
        assert_eq!(spectrum.query("memory.32768"), Some(Value::U8(0xAB)));
        assert_eq!(spectrum.query("nonsense"), None);
    }

    #[test]
    fn nothing_to_query_before_selection() {
        let spectrum = Spectrum::default();
        assert_eq!(spectrum.query("cpu.pc"), None);
    }

    #[test]
    fn rom_size_checked() {
        let mut spectrum = Spectrum::default();
        let err = spectrum
            .select_machine_with_roms(SpectrumModel::Spectrum48K, &[&[0; 100]])
            .expect_err("short ROM");
        assert!(matches!(
            err,
            Error::RomSize {
                index: 0,
                expected: 16_384,
                actual: 100
            }
        ));
    }

    #[test]
    fn fast_loading_disables_pacing() {
        let mut spectrum = make_spectrum();
        assert!(spectrum.frame_pacing().expect("configured").is_some());
        let tap = TapFile {
            blocks: vec![format_spectrum_tap::TapBlock::new(0xFF, vec![1])],
        };
        spectrum
            .load_tape(&tap.to_bytes().expect("block fits"))
            .expect("valid tape");
        assert!(spectrum.play_tape().expect("configured"));
        assert!(spectrum.is_fast_loading_active().expect("alive"));
        assert!(spectrum.frame_pacing().expect("configured").is_none());

        spectrum.settings_mut().expect("alive").fastload = false;
        assert!(spectrum.frame_pacing().expect("configured").is_some());
    }
}
