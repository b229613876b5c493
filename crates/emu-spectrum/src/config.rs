//! Model selection, timing constants and runtime settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Spectrum models.
///
/// Every model can be named, but only the Sinclair 16K, 48K, 128K and +2
/// have machine definitions. Selecting any other fails with
/// [`crate::Error::Configuration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpectrumModel {
    // Sinclair
    Spectrum16K,
    Spectrum48K,
    Spectrum128K,
    SpectrumPlus2,
    SpectrumPlus2A,
    SpectrumPlus3,
    // Timex
    TimexTC2048,
    // Russian/Eastern European
    Pentagon128,
    ScorpionZS256,
}

impl SpectrumModel {
    /// Short machine id, as used in ROM and snapshot file names.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Spectrum16K => "16",
            Self::Spectrum48K => "48",
            Self::Spectrum128K => "128",
            Self::SpectrumPlus2 => "plus2",
            Self::SpectrumPlus2A => "plus2a",
            Self::SpectrumPlus3 => "plus3",
            Self::TimexTC2048 => "2048",
            Self::Pentagon128 => "pentagon",
            Self::ScorpionZS256 => "scorpion",
        }
    }

    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(
            self,
            Self::Spectrum16K | Self::Spectrum48K | Self::Spectrum128K | Self::SpectrumPlus2
        )
    }

    /// Whether port $7FFD pages memory.
    #[must_use]
    pub const fn has_paging(self) -> bool {
        matches!(self, Self::Spectrum128K | Self::SpectrumPlus2)
    }

    /// Timing constants, for supported models only.
    #[must_use]
    pub const fn timings(self) -> Option<Timings> {
        match self {
            Self::Spectrum16K | Self::Spectrum48K => Some(Timings::SINCLAIR_48K),
            Self::Spectrum128K | Self::SpectrumPlus2 => Some(Timings::SINCLAIR_128K),
            _ => None,
        }
    }

    /// ROM file names looked up in [`Settings::rom_dir`], one per ROM page.
    #[must_use]
    pub const fn rom_files(self) -> &'static [&'static str] {
        match self {
            Self::Spectrum16K | Self::Spectrum48K => &["48.rom"],
            Self::Spectrum128K => &["128-0.rom", "128-1.rom"],
            Self::SpectrumPlus2 => &["plus2-0.rom", "plus2-1.rom"],
            _ => &[],
        }
    }

    /// Number of 16K RAM pages fitted.
    #[must_use]
    pub const fn ram_pages(self) -> usize {
        match self {
            Self::Spectrum16K => 1,
            Self::Spectrum48K => 3,
            _ => 8,
        }
    }
}

/// Frame and line timing, in CPU T-states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timings {
    /// CPU clock in Hz.
    pub processor_speed: u32,
    pub tstates_per_frame: u32,
    pub tstates_per_line: u32,
    /// How long INT stays asserted after the frame starts.
    pub interrupt_length: u32,
    pub left_border: u32,
    pub horizontal_screen: u32,
    pub right_border: u32,
    /// First T-state at which the ULA contends the CPU.
    pub first_contended: u32,
}

impl Timings {
    pub const SINCLAIR_48K: Self = Self {
        processor_speed: 3_500_000,
        tstates_per_frame: 69_888,
        tstates_per_line: 224,
        interrupt_length: 32,
        left_border: 24,
        horizontal_screen: 128,
        right_border: 24,
        first_contended: 14_335,
    };

    pub const SINCLAIR_128K: Self = Self {
        processor_speed: 3_546_900,
        tstates_per_frame: 70_908,
        tstates_per_line: 228,
        interrupt_length: 36,
        left_border: 24,
        horizontal_screen: 128,
        right_border: 24,
        first_contended: 14_361,
    };
}

/// Snapshot of the selected machine, returned by
/// [`crate::Spectrum::get_info`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineInfo {
    pub model: SpectrumModel,
    pub id: &'static str,
    pub timings: Timings,
    pub ram_pages: usize,
    pub rom_pages: usize,
}

impl MachineInfo {
    #[must_use]
    pub fn new(model: SpectrumModel, timings: Timings) -> Self {
        Self {
            model,
            id: model.id(),
            timings,
            ram_pages: model.ram_pages(),
            rom_pages: model.rom_files().len(),
        }
    }
}

/// Runtime settings. Missing fields take their defaults when deserialised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Speed as a percentage of real hardware. Zero runs unthrottled.
    pub emulation_speed: u32,
    /// Intercept the ROM loader and copy tape blocks straight into memory.
    pub tape_traps: bool,
    /// Run unthrottled while the tape is playing.
    pub fastload: bool,
    pub contended_memory: bool,
    /// Directory holding ROM images. Blank ROMs are used when unset.
    pub rom_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            emulation_speed: 100,
            tape_traps: true,
            fastload: true,
            contended_memory: true,
            rom_dir: None,
        }
    }
}

impl Settings {
    /// Wall-clock time one frame should take, or `None` when unthrottled.
    #[must_use]
    pub fn frame_duration(&self, timings: &Timings) -> Option<Duration> {
        if self.emulation_speed == 0 {
            return None;
        }
        let nanos = u128::from(timings.tstates_per_frame) * 100_000_000_000
            / (u128::from(timings.processor_speed) * u128::from(self.emulation_speed));
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }
}
