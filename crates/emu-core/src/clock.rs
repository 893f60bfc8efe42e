//! Master clock and clock-domain scaling.

/// Master clock configuration for a system.
///
/// Each system has a master crystal that drives all timing. The CPU and its
/// peripherals run at integer divisions of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Crystal frequency in Hz (e.g. `21_477_272` for an NTSC NES).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Frequency of a component clocked at `frequency_hz / divider`.
    #[must_use]
    pub const fn divided(&self, divider: u64) -> u64 {
        self.frequency_hz / divider
    }

    /// Frames per second for a frame of `master_ticks` crystal ticks.
    #[must_use]
    pub fn frame_rate(&self, master_ticks: u64) -> f64 {
        self.frequency_hz as f64 / master_ticks as f64
    }
}

/// Converts elapsed CPU cycles into ticks of another clock domain.
///
/// Holds the exact rational remainder between calls, so a ratio such as
/// 16/5 (PAL NES dots per CPU cycle) never drifts however long it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaledClock {
    /// Unit ticks per CPU cycle, as `numerator / denominator`.
    numerator: u64,
    denominator: u64,
    /// Charged but not yet taken, in 1/denominator unit ticks.
    pending: u64,
}

impl ScaledClock {
    /// A clock running `numerator / denominator` ticks per CPU cycle.
    #[must_use]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator: numerator as u64,
            denominator: if denominator == 0 { 1 } else { denominator as u64 },
            pending: 0,
        }
    }

    /// Charge `cycles` CPU cycles.
    pub fn add(&mut self, cycles: u32) {
        self.pending += u64::from(cycles) * self.numerator;
    }

    /// Take the whole unit ticks that fit before the last `hold_back` charged
    /// CPU cycles. The fraction, and the held-back cycles, stay pending.
    pub fn take(&mut self, hold_back: u32) -> u32 {
        let held = u64::from(hold_back) * self.numerator;
        if self.pending <= held {
            return 0;
        }
        let whole = (self.pending - held) / self.denominator;
        self.pending -= whole * self.denominator;
        whole as u32
    }

    /// Unit ticks still pending, rounded down.
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.pending / self.denominator
    }

    /// Drop everything pending.
    pub fn clear(&mut self) {
        self.pending = 0;
    }
}
