//! Ricoh 2A03 audio processing unit.
//!
//! The APU lives on the CPU die and is ticked once per CPU cycle. This
//! crate models the parts the CPU can observe: the frame sequencer that
//! raises the frame IRQ, and the channel length counters that `$4015`
//! reports. Waveform synthesis is left to the output layer.
//!
//! # Registers
//!
//! | Addr        | Use here                                         |
//! |-------------|--------------------------------------------------|
//! | $4000/$4004 | Bit 5: pulse length halt                         |
//! | $4003/$4007 | Bits 7-3: pulse length load                      |
//! | $4008       | Bit 7: triangle length halt                      |
//! | $400B       | Bits 7-3: triangle length load                   |
//! | $400C       | Bit 5: noise length halt                         |
//! | $400F       | Bits 7-3: noise length load                      |
//! | $4015       | Write: channel enables. Read: status, clears frame IRQ |
//! | $4017       | Bit 7: 5-step mode. Bit 6: IRQ inhibit           |

use emu_core::{Observable, ResetKind, Value};
use tracing::{debug, trace};

/// Length counter load values, indexed by the top 5 bits of the register write.
const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96,
    22, 192, 24, 72, 26, 16, 28, 32, 30,
];

// ---------------------------------------------------------------------------
// Frame sequencer timing
// ---------------------------------------------------------------------------

/// Frame sequencer step boundaries in CPU cycles after a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApuTiming {
    /// Quarter-frame events shared by both modes. The last one is the
    /// 4-step IRQ point and is skipped in 5-step mode.
    pub steps: [u16; 4],
    /// Final 5-step event.
    pub five_step_last: u16,
}

impl ApuTiming {
    pub const NTSC: Self = Self {
        steps: [7457, 14913, 22371, 29829],
        five_step_last: 37281,
    };

    pub const PAL: Self = Self {
        steps: [8313, 16627, 24939, 33253],
        five_step_last: 41565,
    };

    /// Cycles in one 4-step sequence.
    #[must_use]
    pub fn four_step_period(&self) -> u16 {
        self.steps[3] + 1
    }

    /// Cycles in one 5-step sequence.
    #[must_use]
    pub fn five_step_period(&self) -> u16 {
        self.five_step_last + 1
    }
}

/// Frame counter mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameCounterMode {
    /// 4-step: generates IRQ, 4 quarter-frame events per sequence.
    FourStep,
    /// 5-step: no IRQ, 5 quarter-frame events per sequence.
    FiveStep,
}

impl FrameCounterMode {
    fn from_register(value: u8) -> Self {
        if value & 0x80 != 0 {
            Self::FiveStep
        } else {
            Self::FourStep
        }
    }
}

// ---------------------------------------------------------------------------
// Length counter
// ---------------------------------------------------------------------------

/// Counts down at half-frame rate. A channel is audible while non-zero.
#[derive(Debug, Clone, Default)]
struct LengthCounter {
    counter: u8,
    halt: bool,
    enabled: bool,
}

impl LengthCounter {
    fn clock(&mut self) {
        if !self.halt && self.counter > 0 {
            self.counter -= 1;
        }
    }

    fn active(&self) -> bool {
        self.counter > 0
    }

    fn load(&mut self, value: u8) {
        if self.enabled {
            self.counter = LENGTH_TABLE[usize::from(value >> 3)];
        }
    }

    /// Disabling clears the counter.
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.counter = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// APU
// ---------------------------------------------------------------------------

/// NES APU.
pub struct Apu {
    timing: ApuTiming,

    /// Pulse 1, pulse 2, triangle, noise.
    lengths: [LengthCounter; 4],

    // Frame counter
    frame_mode: FrameCounterMode,
    frame_counter: u16,
    frame_irq_inhibit: bool,
    frame_irq_flag: bool,
    /// `$4017` value and the CPU cycles left before it resets the sequencer.
    pending_reset: Option<(u8, u8)>,
    /// Last value written to `$4017`.
    frame_register: u8,

    /// CPU cycle parity.
    odd_cycle: bool,
}

impl Apu {
    #[must_use]
    pub fn new(timing: ApuTiming) -> Self {
        Self {
            timing,
            lengths: Default::default(),
            frame_mode: FrameCounterMode::FourStep,
            frame_counter: 0,
            frame_irq_inhibit: false,
            frame_irq_flag: false,
            pending_reset: None,
            frame_register: 0,
            odd_cycle: false,
        }
    }

    /// A power reset behaves as if `$4017` were written with 0; the reset
    /// button keeps the last sequencer mode. Both silence every channel.
    pub fn reset(&mut self, kind: ResetKind) {
        debug!(?kind, "apu reset");
        self.write(0x4015, 0x00);
        self.frame_irq_flag = false;
        self.pending_reset = None;
        if kind == ResetKind::Power {
            self.frame_register = 0;
            self.odd_cycle = false;
        }
        self.restart_sequencer(self.frame_register);
    }

    /// Read an APU register ($4015 is the only readable APU register).
    pub fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0x4015 => {
                let mut status = 0u8;
                for (bit, length) in self.lengths.iter().enumerate() {
                    if length.active() {
                        status |= 1 << bit;
                    }
                }
                if self.frame_irq_flag {
                    status |= 0x40;
                }
                // Reading $4015 clears the frame IRQ flag
                self.frame_irq_flag = false;
                status
            }
            _ => 0,
        }
    }

    /// Non-destructive status for observation.
    #[must_use]
    pub fn peek_status(&self) -> u8 {
        let lengths = self
            .lengths
            .iter()
            .enumerate()
            .fold(0u8, |acc, (bit, l)| acc | (u8::from(l.active()) << bit));
        lengths | if self.frame_irq_flag { 0x40 } else { 0 }
    }

    /// Write an APU register ($4000-$4013, $4015, $4017).
    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x4000 => self.lengths[0].halt = value & 0x20 != 0,
            0x4004 => self.lengths[1].halt = value & 0x20 != 0,
            0x4008 => self.lengths[2].halt = value & 0x80 != 0,
            0x400C => self.lengths[3].halt = value & 0x20 != 0,
            0x4003 => self.lengths[0].load(value),
            0x4007 => self.lengths[1].load(value),
            0x400B => self.lengths[2].load(value),
            0x400F => self.lengths[3].load(value),
            0x4015 => {
                for (bit, length) in self.lengths.iter_mut().enumerate() {
                    length.set_enabled(value & (1 << bit) != 0);
                }
            }
            0x4017 => {
                self.frame_register = value;
                self.frame_irq_inhibit = value & 0x40 != 0;
                if self.frame_irq_inhibit {
                    self.frame_irq_flag = false;
                }
                // The sequencer restarts 3 cycles after a write on an odd
                // cycle and 4 after one on an even cycle.
                let delay = if self.odd_cycle { 3 } else { 4 };
                self.pending_reset = Some((value, delay));
            }
            _ => {}
        }
    }

    /// Tick the APU one CPU cycle.
    pub fn tick(&mut self) {
        self.odd_cycle = !self.odd_cycle;

        if let Some((value, delay)) = self.pending_reset {
            if delay <= 1 {
                self.pending_reset = None;
                self.restart_sequencer(value);
                return;
            }
            self.pending_reset = Some((value, delay - 1));
        }

        self.clock_frame_counter();
    }

    fn restart_sequencer(&mut self, value: u8) {
        self.frame_mode = FrameCounterMode::from_register(value);
        self.frame_irq_inhibit = value & 0x40 != 0;
        self.frame_counter = 0;
        trace!(mode = ?self.frame_mode, "frame sequencer restart");
        // In 5-step mode, immediately clock all units
        if self.frame_mode == FrameCounterMode::FiveStep {
            self.clock_half_frame();
        }
    }

    /// Clock the frame counter. Generates quarter-frame and half-frame
    /// events at the appropriate CPU cycle counts.
    fn clock_frame_counter(&mut self) {
        self.frame_counter += 1;
        let steps = self.timing.steps;
        let counter = self.frame_counter;

        match self.frame_mode {
            FrameCounterMode::FourStep => {
                if counter == steps[1] || counter == steps[3] {
                    self.clock_half_frame();
                }
                if counter == steps[3] && !self.frame_irq_inhibit {
                    self.frame_irq_flag = true;
                }
                if counter >= self.timing.four_step_period() {
                    self.frame_counter = 0;
                }
            }
            FrameCounterMode::FiveStep => {
                if counter == steps[1] || counter == self.timing.five_step_last {
                    self.clock_half_frame();
                }
                if counter >= self.timing.five_step_period() {
                    self.frame_counter = 0;
                }
            }
        }
    }

    /// Half-frame: clock length counters. Quarter-frame envelope and
    /// linear counter clocks have no CPU-visible effect.
    fn clock_half_frame(&mut self) {
        for length in &mut self.lengths {
            length.clock();
        }
    }

    /// Frame IRQ output level.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.frame_irq_flag
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new(ApuTiming::NTSC)
    }
}

impl Observable for Apu {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "frame_counter.mode" => {
                let mode: u8 = match self.frame_mode {
                    FrameCounterMode::FourStep => 0,
                    FrameCounterMode::FiveStep => 1,
                };
                Some(mode.into())
            }
            "frame_counter.cycle" => Some(self.frame_counter.into()),
            "frame_irq" => Some(self.frame_irq_flag.into()),
            "frame_irq_inhibit" => Some(self.frame_irq_inhibit.into()),
            "status" => Some(self.peek_status().into()),
            "pulse1.length" => Some(self.lengths[0].counter.into()),
            "pulse2.length" => Some(self.lengths[1].counter.into()),
            "triangle.length" => Some(self.lengths[2].counter.into()),
            "noise.length" => Some(self.lengths[3].counter.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "frame_counter.mode",
            "frame_counter.cycle",
            "frame_irq",
            "frame_irq_inhibit",
            "status",
            "pulse1.length",
            "pulse2.length",
            "triangle.length",
            "noise.length",
        ]
    }
}
