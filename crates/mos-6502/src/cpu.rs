//! 6502 execution engine.
//!
//! `step()` runs one whole instruction. The instruction's base cycle count
//! is charged to the bus as soon as the opcode is decoded, and every later
//! bus access first synchronizes the machine up to the start of its own
//! cycle, so devices observe each access at the cycle the real CPU would
//! perform it. Interrupt polling happens at the same point as on hardware:
//! the start of the final cycle for most instructions.

use emu_core::{Bus, Cpu, Observable, ResetKind, Synchronize, Value};
use tracing::debug;

use crate::flags::{B, C, D, I, N, V, Z};
use crate::table::OPCODES;
use crate::Registers;

/// Cycles taken by the reset, IRQ, NMI and BRK sequences.
pub const INTERRUPT_CYCLES: u8 = 7;

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles of an interrupt sequence still to run when it samples NMI for a
/// vector takeover: the P push and the two vector reads.
const HIJACK_HOLD_BACK: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupt {
    Nmi,
    Irq,
    Brk,
}

/// The MOS 6502 CPU.
#[derive(Debug, Clone)]
pub struct Mos6502 {
    pub regs: Registers,

    /// NMI latched by polling, serviced before the next opcode fetch.
    pub(crate) nmi_pending: bool,

    /// IRQ latched by polling.
    pub(crate) irq_pending: bool,

    /// Set by CLI: a latched IRQ waits one more instruction.
    pub(crate) int_delay: bool,

    reset: Option<ResetKind>,

    /// Elapsed cycles since construction (wrapping).
    cycles: u64,

    /// Cycles charged to the current step that have not elapsed yet.
    pub(crate) owed: u32,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    /// A CPU at power-on. The first `step()` runs the reset sequence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            nmi_pending: false,
            irq_pending: false,
            int_delay: false,
            reset: Some(ResetKind::Power),
            cycles: 0,
            owed: 0,
        }
    }

    /// Request a reset, serviced at the start of the next `step()`.
    pub fn request_reset(&mut self, kind: ResetKind) {
        self.reset = Some(kind);
    }

    /// Drop a pending reset and start executing at `pc` (test harnesses).
    pub fn skip_reset(&mut self, pc: u16) {
        self.reset = None;
        self.regs.s = 0xFD;
        self.regs.pc = pc;
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    #[must_use]
    pub fn nmi_pending(&self) -> bool {
        self.nmi_pending
    }

    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    #[must_use]
    pub fn int_delay(&self) -> bool {
        self.int_delay
    }

    /// Execute one instruction, or one reset/interrupt sequence.
    pub fn step<B: Bus + Synchronize>(&mut self, bus: &mut B) {
        if let Some(kind) = self.reset.take() {
            self.reset_sequence(bus, kind);
        } else if self.nmi_pending {
            self.charge(bus, INTERRUPT_CYCLES);
            self.interrupt_sequence(bus, Interrupt::Nmi);
            self.nmi_pending = false;
            self.int_delay = false;
        } else if self.irq_pending && !self.int_delay {
            self.charge(bus, INTERRUPT_CYCLES);
            self.interrupt_sequence(bus, Interrupt::Irq);
            self.irq_pending = false;
        } else {
            self.int_delay = false;
            let byte = bus.read(self.regs.pc);
            self.regs.pc = self.regs.pc.wrapping_add(1);
            let opcode = OPCODES[usize::from(byte)];
            self.charge(bus, opcode.cycles);
            self.owed -= 1;
            self.execute(bus, byte, opcode);
        }
        self.owed = 0;
        bus.synchronize(0);
    }

    /// Charge `cycles` with no CPU bus activity (DMA halts).
    pub fn stall<B: Synchronize>(&mut self, bus: &mut B, cycles: u16) {
        let mut left = cycles;
        while left > 0 {
            let chunk = left.min(u16::from(u8::MAX)) as u8;
            self.cycles = self.cycles.wrapping_add(u64::from(chunk));
            bus.add_cycles(chunk);
            left -= u16::from(chunk);
        }
        bus.synchronize(0);
    }

    // ========================================================================
    // Cycle accounting and bus access
    // ========================================================================

    pub(crate) fn charge<B: Synchronize>(&mut self, bus: &mut B, cycles: u8) {
        self.cycles = self.cycles.wrapping_add(u64::from(cycles));
        self.owed += u32::from(cycles);
        bus.add_cycles(cycles);
    }

    /// Bring the machine up to the start of the next owed cycle.
    fn catch_up<B: Synchronize>(&self, bus: &mut B) {
        bus.synchronize(self.owed as i32);
    }

    pub(crate) fn read<B: Bus + Synchronize>(&mut self, bus: &mut B, addr: u16) -> u8 {
        debug_assert!(self.owed > 0, "bus read at {addr:#06X} with no cycle charged");
        self.catch_up(bus);
        let value = bus.read(addr);
        self.owed = self.owed.saturating_sub(1);
        value
    }

    pub(crate) fn write<B: Bus + Synchronize>(&mut self, bus: &mut B, addr: u16, value: u8) {
        debug_assert!(self.owed > 0, "bus write at {addr:#06X} with no cycle charged");
        self.catch_up(bus);
        bus.write(addr, value);
        self.owed = self.owed.saturating_sub(1);
    }

    /// Read the byte at PC and advance PC.
    pub(crate) fn fetch<B: Bus + Synchronize>(&mut self, bus: &mut B) -> u8 {
        let value = self.read(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    pub(crate) fn fetch_word<B: Bus + Synchronize>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch(bus);
        let hi = self.fetch(bus);
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn push<B: Bus + Synchronize>(&mut self, bus: &mut B, value: u8) {
        let addr = self.regs.push();
        self.write(bus, addr, value);
    }

    pub(crate) fn pull<B: Bus + Synchronize>(&mut self, bus: &mut B) -> u8 {
        let addr = self.regs.pop();
        self.read(bus, addr)
    }

    // ========================================================================
    // Interrupts
    // ========================================================================

    /// Latch interrupt requests as seen at the start of the next owed cycle.
    ///
    /// NMI: a settled edge in the registry becomes `nmi_pending`. IRQ: the
    /// line is sampled against the I flag as it is *now*; `int_delay`
    /// (set by CLI before it polls) lets a held line through while I is
    /// still set.
    pub(crate) fn poll<B: Synchronize>(&mut self, bus: &mut B) {
        self.poll_ahead(bus, self.owed);
    }

    /// Poll with the machine brought up to `hold_back` cycles short of the
    /// end of the current step.
    pub(crate) fn poll_ahead<B: Synchronize>(&mut self, bus: &mut B, hold_back: u32) {
        debug_assert!(hold_back <= self.owed, "poll ahead of the next bus access");
        bus.synchronize(hold_back as i32);
        let masked = self.regs.p.is_set(I) && !self.int_delay;
        let lines = bus.interrupts();
        if lines.take_nmi() {
            self.nmi_pending = true;
        }
        self.irq_pending = lines.irq_asserted() && !masked;
    }

    /// Push PC and P, then load PC from the vector.
    ///
    /// NMI, IRQ and BRK share the sequence. An NMI seen by the end of the
    /// fourth cycle takes over the vector fetch.
    pub(crate) fn interrupt_sequence<B: Bus + Synchronize>(
        &mut self,
        bus: &mut B,
        kind: Interrupt,
    ) {
        if kind == Interrupt::Brk {
            // Padding byte.
            let _ = self.fetch(bus);
        } else {
            let _ = self.read(bus, self.regs.pc);
            let _ = self.read(bus, self.regs.pc);
        }

        let [pcl, pch] = self.regs.pc.to_le_bytes();
        self.push(bus, pch);
        self.push(bus, pcl);
        self.poll_ahead(bus, HIJACK_HOLD_BACK);
        let status = if kind == Interrupt::Brk {
            self.regs.p.to_byte_brk()
        } else {
            self.regs.p.to_byte_irq()
        };
        self.push(bus, status);

        let vector = if kind == Interrupt::Nmi || self.nmi_pending {
            self.nmi_pending = false;
            NMI_VECTOR
        } else {
            IRQ_VECTOR
        };
        let lo = self.read(bus, vector);
        let hi = self.read(bus, vector.wrapping_add(1));
        self.regs.pc = u16::from_le_bytes([lo, hi]);
        self.regs.p.set(I);
        self.irq_pending = false;
    }

    fn reset_sequence<B: Bus + Synchronize>(&mut self, bus: &mut B, kind: ResetKind) {
        debug!(?kind, "6502 reset");
        bus.on_reset(kind);
        if kind == ResetKind::Power {
            self.regs = Registers::new();
        }
        self.nmi_pending = false;
        self.irq_pending = false;
        self.int_delay = false;

        self.charge(bus, INTERRUPT_CYCLES);
        let _ = self.read(bus, self.regs.pc);
        let _ = self.read(bus, self.regs.pc);
        // Three pushes with the bus held in read mode.
        for _ in 0..3 {
            let addr = self.regs.push();
            let _ = self.read(bus, addr);
        }
        let lo = self.read(bus, RESET_VECTOR);
        let hi = self.read(bus, RESET_VECTOR + 1);
        self.regs.pc = u16::from_le_bytes([lo, hi]);
        self.regs.p.set(I);
    }
}

impl<Bs: Bus + Synchronize> Cpu<Bs> for Mos6502 {
    fn step(&mut self, bus: &mut Bs) {
        Mos6502::step(self, bus);
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn cycles(&self) -> u64 {
        self.cycles
    }

    fn request_reset(&mut self, kind: ResetKind) {
        Mos6502::request_reset(self, kind);
    }
}

impl Observable for Mos6502 {
    fn query(&self, path: &str) -> Option<Value> {
        let p = self.regs.p;
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "s" | "sp" => Some(self.regs.s.into()),
            "p" | "status" => Some(p.0.into()),
            "flags.c" => Some(p.is_set(C).into()),
            "flags.z" => Some(p.is_set(Z).into()),
            "flags.i" => Some(p.is_set(I).into()),
            "flags.d" => Some(p.is_set(D).into()),
            "flags.b" => Some(p.is_set(B).into()),
            "flags.v" => Some(p.is_set(V).into()),
            "flags.n" => Some(p.is_set(N).into()),
            "cycles" => Some(self.cycles.into()),
            "nmi_pending" => Some(self.nmi_pending.into()),
            "irq_pending" => Some(self.irq_pending.into()),
            "int_delay" => Some(self.int_delay.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc",
            "a",
            "x",
            "y",
            "s",
            "p",
            "flags.c",
            "flags.z",
            "flags.i",
            "flags.d",
            "flags.b",
            "flags.v",
            "flags.n",
            "cycles",
            "nmi_pending",
            "irq_pending",
            "int_delay",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::SimpleBus;

    fn boot(program: &[u8]) -> (Mos6502, SimpleBus) {
        let mut bus = SimpleBus::new();
        bus.load(0x8000, program);
        bus.set_vector(RESET_VECTOR, 0x8000);
        let mut cpu = Mos6502::new();
        cpu.step(&mut bus);
        (cpu, bus)
    }

    #[test]
    fn power_reset_loads_vector_and_sets_stack() {
        let (cpu, bus) = boot(&[0xEA]);
        assert_eq!(cpu.regs.pc, 0x8000);
        assert_eq!(cpu.regs.s, 0xFD);
        assert!(cpu.regs.p.is_set(I));
        assert_eq!(cpu.cycles(), 7);
        assert_eq!(bus.elapsed(), 7);
        assert_eq!(bus.resets(), &[ResetKind::Power]);
    }

    #[test]
    fn soft_reset_keeps_accumulator_and_drops_stack_by_three() {
        let (mut cpu, mut bus) = boot(&[0xA9, 0x5A, 0xEA]);
        cpu.step(&mut bus);
        cpu.regs.p.clear(I);
        cpu.request_reset(ResetKind::Soft);
        cpu.step(&mut bus);
        assert_eq!(cpu.regs.a, 0x5A);
        assert_eq!(cpu.regs.s, 0xFA);
        assert_eq!(cpu.regs.pc, 0x8000);
        assert!(cpu.regs.p.is_set(I));
    }

    #[test]
    fn reset_is_serviced_ahead_of_pending_nmi() {
        let (mut cpu, mut bus) = boot(&[0xEA, 0xEA]);
        cpu.nmi_pending = true;
        cpu.request_reset(ResetKind::Soft);
        cpu.step(&mut bus);
        assert_eq!(cpu.regs.pc, 0x8000);
        assert!(!cpu.nmi_pending());
    }

    #[test]
    fn stall_charges_cycles_without_bus_access() {
        let (mut cpu, mut bus) = boot(&[0xEA]);
        bus.clear_log();
        cpu.stall(&mut bus, 513);
        assert_eq!(cpu.cycles(), 7 + 513);
        assert_eq!(bus.elapsed(), 7 + 513);
        assert!(bus.log().is_empty());
    }

    #[test]
    fn observable_paths_resolve() {
        let (cpu, _) = boot(&[0xEA]);
        for path in cpu.query_paths() {
            assert!(cpu.query(path).is_some(), "{path}");
        }
        assert_eq!(cpu.query("pc"), Some(Value::U16(0x8000)));
    }
}
