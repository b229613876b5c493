//! ULA memory and I/O contention.
//!
//! While the ULA fetches the 192 screen lines it holds the CPU off
//! contended memory. For the 128 T-states of each line in which it is
//! fetching, the delay follows an 8 T-state pattern: `[6, 5, 4, 3, 2, 1, 0, 0]`.
//! The first contended T-state is model-specific (14335 on the 48K, 14361
//! on the 128K).
//!
//! Access times are nominal: each M-cycle is stamped with the instruction's
//! start plus standard M-cycle lengths and the waits already charged.
//! Internal cycles that the real ULA would also stretch are not contended
//! individually.

#![allow(clippy::cast_possible_truncation)]

use crate::config::Timings;

/// Contention delay pattern (repeats every 8 T-states).
const CONTENTION_PATTERN: [u8; 8] = [6, 5, 4, 3, 2, 1, 0, 0];

/// Screen lines during which the ULA fetches.
const SCREEN_LINES: u32 = 192;

/// T-states per line spent fetching.
const FETCH_TSTATES: u32 = 128;

/// Contention timing for the selected model, plus the border latch.
#[derive(Debug, Clone)]
pub struct Ula {
    tstates_per_frame: u32,
    tstates_per_line: u32,
    first_contended: u32,
    enabled: bool,
    /// Border colour from bits 0-2 of the last $FE write.
    border: u8,
}

impl Ula {
    #[must_use]
    pub fn new(timings: &Timings, enabled: bool) -> Self {
        Self {
            tstates_per_frame: timings.tstates_per_frame,
            tstates_per_line: timings.tstates_per_line,
            first_contended: timings.first_contended,
            enabled,
            border: 7,
        }
    }

    /// Delay for a contended access starting at absolute T-state `clock`.
    /// Frames start at multiples of the frame length.
    #[must_use]
    pub fn delay(&self, clock: u64) -> u8 {
        if !self.enabled {
            return 0;
        }
        let frame_tstate = (clock % u64::from(self.tstates_per_frame)) as u32;
        let Some(offset) = frame_tstate.checked_sub(self.first_contended) else {
            return 0;
        };
        if offset >= SCREEN_LINES * self.tstates_per_line {
            return 0;
        }
        let column = offset % self.tstates_per_line;
        if column >= FETCH_TSTATES {
            return 0;
        }
        CONTENTION_PATTERN[(column % 8) as usize]
    }

    /// Wait states for a memory access.
    #[must_use]
    pub fn contention(&self, contended: bool, clock: u64) -> u8 {
        if contended { self.delay(clock) } else { 0 }
    }

    /// Wait states for a 4 T-state I/O cycle starting at `clock`.
    ///
    /// | high byte $40-$7F? | even port? | pattern        |
    /// |--------------------|------------|----------------|
    /// | no                 | yes        | N:1, C:3       |
    /// | no                 | no         | N:4            |
    /// | yes                | yes        | C:1, C:3       |
    /// | yes                | no         | C:1 ×4         |
    ///
    /// "C:n" applies the delay at the current position, then moves n
    /// T-states on.
    #[must_use]
    pub fn io_contention(&self, contended_high: bool, ula_port: bool, clock: u64) -> u8 {
        match (contended_high, ula_port) {
            (false, false) => 0,
            (false, true) => self.delay(clock + 1),
            (true, true) => {
                let first = self.delay(clock);
                first + self.delay(clock + 1 + u64::from(first))
            }
            (true, false) => {
                let mut at = clock;
                let mut total = 0;
                for _ in 0..4 {
                    let delay = self.delay(at);
                    total += delay;
                    at += 1 + u64::from(delay);
                }
                total
            }
        }
    }

    #[must_use]
    pub fn border(&self) -> u8 {
        self.border
    }

    pub fn set_border(&mut self, colour: u8) {
        self.border = colour & 0x07;
    }
}
