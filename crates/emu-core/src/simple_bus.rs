//! Flat 64 KiB bus for driving CPU cores in tests.

use crate::{Bus, InterruptLines, IoBus, IrqSource, ResetKind, Synchronize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

/// One recorded bus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusAccess {
    /// Elapsed cycles when the access happened.
    pub cycle: u64,
    pub address: u16,
    pub value: u8,
    pub kind: AccessKind,
}

/// Interrupt line change scheduled at an elapsed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    AssertIrq,
    ReleaseIrq,
    AssertNmi,
    ReleaseNmi,
}

/// RAM everywhere, an access log, and a miniature dispatcher.
///
/// `synchronize` advances an elapsed-cycle count one cycle at a time and
/// applies any [`Signal`] scheduled at that cycle, the same way a machine's
/// peripherals would raise lines during catch-up. NMI edges are visible to
/// the next poll with no settle delay.
pub struct SimpleBus {
    memory: Vec<u8>,
    ports: [u8; 256],
    log: Vec<BusAccess>,
    charged: u64,
    elapsed: u64,
    lines: InterruptLines,
    schedule: Vec<(u64, Signal)>,
    resets: Vec<ResetKind>,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: vec![0; 0x1_0000],
            ports: [0xFF; 256],
            log: Vec::new(),
            charged: 0,
            elapsed: 0,
            lines: InterruptLines::new(0),
            schedule: Vec::new(),
            resets: Vec::new(),
        }
    }

    /// Copy `data` into memory starting at `address` (wrapping at 64 KiB).
    pub fn load(&mut self, address: u16, data: &[u8]) {
        for (offset, &byte) in data.iter().enumerate() {
            let addr = address.wrapping_add(offset as u16);
            self.memory[usize::from(addr)] = byte;
        }
    }

    /// Store a little-endian vector at `vector` pointing at `target`.
    pub fn set_vector(&mut self, vector: u16, target: u16) {
        self.load(vector, &target.to_le_bytes());
    }

    /// Read memory without recording an access.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.memory[usize::from(address)]
    }

    /// Write memory without recording an access.
    pub fn poke(&mut self, address: u16, value: u8) {
        self.memory[usize::from(address)] = value;
    }

    /// Value returned by `port_in(port)`.
    pub fn set_port(&mut self, port: u8, value: u8) {
        self.ports[usize::from(port)] = value;
    }

    /// Change an interrupt line once `cycle` cycles have elapsed.
    pub fn schedule(&mut self, cycle: u64, signal: Signal) {
        self.schedule.push((cycle, signal));
    }

    #[must_use]
    pub fn log(&self) -> &[BusAccess] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Recorded writes as `(address, value)` pairs.
    #[must_use]
    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.log
            .iter()
            .filter(|a| a.kind == AccessKind::Write)
            .map(|a| (a.address, a.value))
            .collect()
    }

    /// Cycles charged through `add_cycles`.
    #[must_use]
    pub fn charged(&self) -> u64 {
        self.charged
    }

    /// Cycles the miniature dispatcher has run.
    #[must_use]
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// Reset hooks received, oldest first.
    #[must_use]
    pub fn resets(&self) -> &[ResetKind] {
        &self.resets
    }

    fn apply_due(&mut self) {
        let elapsed = self.elapsed;
        let lines = &mut self.lines;
        self.schedule.retain(|&(at, signal)| {
            if at > elapsed {
                return true;
            }
            match signal {
                Signal::AssertIrq => lines.assert_irq(IrqSource::EXTERNAL),
                Signal::ReleaseIrq => lines.release_irq(IrqSource::EXTERNAL),
                Signal::AssertNmi => lines.assert_nmi(),
                Signal::ReleaseNmi => lines.release_nmi(),
            }
            false
        });
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        let value = self.memory[usize::from(address)];
        self.log.push(BusAccess {
            cycle: self.elapsed,
            address,
            value,
            kind: AccessKind::Read,
        });
        value
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory[usize::from(address)] = value;
        self.log.push(BusAccess {
            cycle: self.elapsed,
            address,
            value,
            kind: AccessKind::Write,
        });
    }
}

impl IoBus for SimpleBus {
    fn port_in(&mut self, port: u8) -> u8 {
        self.ports[usize::from(port)]
    }

    fn port_out(&mut self, port: u8, value: u8) {
        self.ports[usize::from(port)] = value;
    }
}

impl Synchronize for SimpleBus {
    fn add_cycles(&mut self, cycles: u8) {
        self.charged += u64::from(cycles);
    }

    fn synchronize(&mut self, extra: i32) {
        let hold_back = u64::from(extra.max(0).unsigned_abs());
        let target = self.charged.saturating_sub(hold_back);
        self.apply_due();
        while self.elapsed < target {
            self.elapsed += 1;
            self.lines.advance(1);
            self.apply_due();
        }
    }

    fn interrupts(&mut self) -> &mut InterruptLines {
        &mut self.lines
    }

    fn on_reset(&mut self, kind: ResetKind) {
        self.resets.push(kind);
    }
}
