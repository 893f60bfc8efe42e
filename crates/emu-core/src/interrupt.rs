//! Interrupt line registry.
//!
//! IRQ is a wired-OR level: each device drives its own bit and the line is
//! asserted while any bit is set. NMI is edge-triggered: only a low-to-high
//! transition produces a request, and the CPU consumes that request once.
//!
//! The registry keeps its own tick count, advanced by whichever unit drives
//! NMI (the NES picture unit advances it once per dot). An NMI edge only
//! becomes visible to the CPU once it has been held for `nmi_settle` ticks,
//! which reproduces the one-cycle edge-detector latency of the real CPU.

use std::fmt;

/// One device's bit on the shared IRQ line.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IrqSource(u8);

impl IrqSource {
    pub const APU_FRAME: Self = Self(0x01);
    pub const APU_DMC: Self = Self(0x02);
    pub const MAPPER: Self = Self(0x04);
    pub const DISK: Self = Self(0x08);
    pub const VDP: Self = Self(0x10);
    /// Expansion port or test harness.
    pub const EXTERNAL: Self = Self(0x80);

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for IrqSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::APU_FRAME => "APU_FRAME",
            Self::APU_DMC => "APU_DMC",
            Self::MAPPER => "MAPPER",
            Self::DISK => "DISK",
            Self::VDP => "VDP",
            Self::EXTERNAL => "EXTERNAL",
            _ => return write!(f, "IrqSource({:#04X})", self.0),
        };
        f.write_str(name)
    }
}

/// IRQ and NMI request lines shared between devices and the CPU.
#[derive(Debug, Clone, Default)]
pub struct InterruptLines {
    /// Asserted IRQ source bits.
    irq: u8,
    /// Current NMI line level.
    nmi_line: bool,
    /// Tick at which the last untaken NMI edge occurred.
    nmi_edge: Option<u64>,
    ticks: u64,
    nmi_settle: u64,
}

impl InterruptLines {
    /// Registry whose NMI edges become visible `nmi_settle` ticks after they
    /// occur.
    #[must_use]
    pub fn new(nmi_settle: u64) -> Self {
        Self {
            nmi_settle,
            ..Self::default()
        }
    }

    /// Advance the registry's tick count.
    pub fn advance(&mut self, ticks: u64) {
        self.ticks = self.ticks.wrapping_add(ticks);
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn assert_irq(&mut self, source: IrqSource) {
        self.irq |= source.0;
    }

    pub fn release_irq(&mut self, source: IrqSource) {
        self.irq &= !source.0;
    }

    /// Drive a source's bit to `level`.
    pub fn set_irq(&mut self, source: IrqSource, level: bool) {
        if level {
            self.assert_irq(source);
        } else {
            self.release_irq(source);
        }
    }

    /// True while any device holds IRQ.
    #[must_use]
    pub fn irq_asserted(&self) -> bool {
        self.irq != 0
    }

    #[must_use]
    pub fn irq_held_by(&self, source: IrqSource) -> bool {
        self.irq & source.0 != 0
    }

    /// Raise the NMI line. Only a rising edge is recorded.
    pub fn assert_nmi(&mut self) {
        if !self.nmi_line {
            self.nmi_line = true;
            self.nmi_edge = Some(self.ticks);
        }
    }

    /// Lower the NMI line. An edge already recorded stays pending.
    pub fn release_nmi(&mut self) {
        self.nmi_line = false;
    }

    /// Discard an edge the CPU has not taken yet.
    pub fn cancel_nmi(&mut self) {
        self.nmi_edge = None;
    }

    #[must_use]
    pub fn nmi_line(&self) -> bool {
        self.nmi_line
    }

    /// True if an edge is recorded, settled or not.
    #[must_use]
    pub fn nmi_edge_pending(&self) -> bool {
        self.nmi_edge.is_some()
    }

    /// Consume a settled NMI edge.
    pub fn take_nmi(&mut self) -> bool {
        match self.nmi_edge {
            Some(at) if self.ticks.wrapping_sub(at) >= self.nmi_settle => {
                self.nmi_edge = None;
                true
            }
            _ => false,
        }
    }

    /// Power-on state: every line low, no edge recorded.
    pub fn clear(&mut self) {
        self.irq = 0;
        self.nmi_line = false;
        self.nmi_edge = None;
    }
}
