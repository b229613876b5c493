//! Tape deck: turns TAP blocks into EAR level transitions.
//!
//! Each block is played the way the ROM SAVE routine records it: a pilot
//! tone, two sync pulses, then every byte of flag, data and checksum MSB
//! first, each bit being two equal pulses. A one-second pause at low level
//! follows every block.
//!
//! Pulse lengths are the ROM's, in 3.5 MHz T-states, scaled to the CPU
//! clock of the selected machine.

#![allow(clippy::cast_possible_truncation)]

use format_spectrum_tap::{TapBlock, TapFile};

const PILOT_PULSE: u32 = 2168;
const SYNC1_PULSE: u32 = 667;
const SYNC2_PULSE: u32 = 735;
const ZERO_PULSE: u32 = 855;
const ONE_PULSE: u32 = 1710;
const HEADER_PILOT_COUNT: u16 = 8063;
const DATA_PILOT_COUNT: u16 = 3223;

/// The clock the ROM pulse lengths are specified against.
const REFERENCE_SPEED: u64 = 3_500_000;

/// Position within the current block's signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pilot { remaining: u16 },
    Sync1,
    Sync2,
    /// `byte` indexes flag, data and checksum as one sequence.
    Data { byte: usize, bit: u8, second_half: bool },
    Pause,
    /// Past the last block.
    End,
}

/// Virtual tape deck: a TAP image, a play head and the EAR level.
#[derive(Debug, Clone)]
pub struct TapeDeck {
    tap: Option<TapFile>,
    block_index: usize,
    phase: Phase,
    playing: bool,
    level: bool,
    /// Level transitions produced since the tape was inserted.
    edges: u64,
    processor_speed: u32,
}

impl TapeDeck {
    /// Create an empty deck for a CPU running at `processor_speed` Hz.
    #[must_use]
    pub fn new(processor_speed: u32) -> Self {
        Self {
            tap: None,
            block_index: 0,
            phase: Phase::End,
            playing: false,
            level: false,
            edges: 0,
            processor_speed,
        }
    }

    pub fn set_processor_speed(&mut self, processor_speed: u32) {
        self.processor_speed = processor_speed;
    }

    /// Insert a tape, replacing any other. The deck is stopped at the start.
    pub fn insert(&mut self, tap: TapFile) {
        self.tap = Some(tap);
        self.playing = false;
        self.edges = 0;
        self.rewind();
    }

    pub fn eject(&mut self) {
        self.tap = None;
        self.playing = false;
        self.edges = 0;
        self.rewind();
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.tap.is_some()
    }

    /// Start playing. Returns whether the deck is now playing; it will not
    /// start without a tape or past the last block.
    pub fn play(&mut self) -> bool {
        self.playing = self.is_loaded() && !self.is_finished();
        self.playing
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Move the play head back to the first block.
    pub fn rewind(&mut self) {
        self.block_index = 0;
        self.level = false;
        self.start_block();
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Every block has been played or trapped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.block_index >= self.block_count()
    }

    /// Current EAR level.
    #[must_use]
    pub fn level(&self) -> bool {
        self.level
    }

    #[must_use]
    pub fn block_index(&self) -> usize {
        self.block_index
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.tap.as_ref().map_or(0, |t| t.blocks.len())
    }

    #[must_use]
    pub fn edges(&self) -> u64 {
        self.edges
    }

    fn current_block(&self) -> Option<&TapBlock> {
        self.tap.as_ref()?.blocks.get(self.block_index)
    }

    fn start_block(&mut self) {
        self.phase = match self.current_block() {
            Some(block) if block.is_header() => Phase::Pilot {
                remaining: HEADER_PILOT_COUNT,
            },
            Some(_) => Phase::Pilot {
                remaining: DATA_PILOT_COUNT,
            },
            None => Phase::End,
        };
    }

    fn scale(&self, tstates: u32) -> u32 {
        (u64::from(tstates) * u64::from(self.processor_speed) / REFERENCE_SPEED) as u32
    }

    /// Take the block under the play head for the loader trap and move on
    /// to the next one.
    pub fn next_block(&mut self) -> Option<TapBlock> {
        let block = self.current_block()?.clone();
        self.block_index += 1;
        self.level = false;
        self.start_block();
        Some(block)
    }

    /// Produce the next level transition.
    ///
    /// The level flips now and the return value is how many T-states the
    /// new level lasts. Returns `None` and stops the deck when the tape
    /// runs out or the deck is not playing.
    pub fn next_edge(&mut self) -> Option<u32> {
        if !self.playing {
            return None;
        }

        let (pulse, next) = match (self.phase, self.current_block()) {
            (Phase::End, _) | (_, None) => {
                self.playing = false;
                self.phase = Phase::End;
                return None;
            }
            (Phase::Pilot { remaining }, Some(_)) => {
                let next = if remaining > 1 {
                    Phase::Pilot {
                        remaining: remaining - 1,
                    }
                } else {
                    Phase::Sync1
                };
                (PILOT_PULSE, next)
            }
            (Phase::Sync1, Some(_)) => (SYNC1_PULSE, Phase::Sync2),
            (Phase::Sync2, Some(_)) => (
                SYNC2_PULSE,
                Phase::Data {
                    byte: 0,
                    bit: 0,
                    second_half: false,
                },
            ),
            (Phase::Data { byte, bit, second_half }, Some(block)) => {
                let value = block.payload_byte(byte).unwrap_or(0);
                let pulse = if value & (0x80 >> bit) != 0 {
                    ONE_PULSE
                } else {
                    ZERO_PULSE
                };
                let next = match (second_half, bit) {
                    (false, _) => Phase::Data {
                        byte,
                        bit,
                        second_half: true,
                    },
                    (true, 0..7) => Phase::Data {
                        byte,
                        bit: bit + 1,
                        second_half: false,
                    },
                    (true, _) if byte + 1 < block.payload_len() => Phase::Data {
                        byte: byte + 1,
                        bit: 0,
                        second_half: false,
                    },
                    (true, _) => Phase::Pause,
                };
                (pulse, next)
            }
            (Phase::Pause, Some(_)) => {
                // The signal drops low for one second before the next block.
                self.level = false;
                self.edges += 1;
                self.block_index += 1;
                self.start_block();
                return Some(self.processor_speed);
            }
        };

        self.level = !self.level;
        self.edges += 1;
        self.phase = next;
        Some(self.scale(pulse))
    }
}
