//! Z80 execution engine.
//!
//! Every machine cycle is charged to the bus as it begins. Memory and port
//! accesses then synchronize the machine up to the T-state where the real
//! CPU samples or drives the data bus, so a device sees the access at the
//! point it would on hardware. Internal cycles are charged without a
//! catch-up; the next access or the end of the step brings devices level.
//!
//! Interrupts are sampled at instruction boundaries. NMI is an edge taken
//! from the registry; INT is the level of the shared line, honoured when
//! IFF1 is set and the previous instruction was not `EI`.

use emu_core::{Bus, Cpu, IoBus, Observable, ResetKind, Synchronize, Value};
use tracing::{debug, trace};

use crate::Registers;
use crate::flags::{CF, HF, NF, PF, SF, ZF};

/// T-states taken by the reset sequence.
pub const RESET_CYCLES: u8 = 3;

pub const NMI_VECTOR: u16 = 0x0066;

/// Restart address for interrupt mode 1. Mode 0 lands here too: the data
/// bus floats to `$FF` during the acknowledge, which reads as `RST 38h`.
pub const IM1_VECTOR: u16 = 0x0038;

/// Interrupt acknowledge: an M1 cycle stretched by two wait states plus
/// one internal T-state before the push.
const ACKNOWLEDGE_CYCLES: u8 = 7;

/// NMI acknowledge: an opcode fetch whose data is thrown away.
const NMI_FETCH_CYCLES: u8 = 5;

/// Everything the core needs from the machine.
pub trait Z80Bus: Bus + IoBus + Synchronize {}

impl<T: Bus + IoBus + Synchronize + ?Sized> Z80Bus for T {}

/// The Zilog Z80 CPU.
#[derive(Debug, Clone)]
pub struct Z80 {
    pub regs: Registers,

    /// Set by `EI`: INT is not sampled until one more instruction has run.
    pub ei_delay: bool,

    /// The last instruction was `LD A,I` or `LD A,R`. An INT accepted
    /// straight after one clears P/V.
    pub ld_a_ir: bool,

    /// F as left by the last instruction when it changed the flags, zero
    /// otherwise. Feeds X and Y of `SCF` and `CCF`.
    pub q: u8,

    /// `q` of the instruction before the one executing.
    pub(crate) prev_q: u8,

    reset: Option<ResetKind>,

    /// Elapsed T-states since construction (wrapping).
    cycles: u64,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    /// A CPU at power-on. The first `step()` runs the reset sequence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::power_on(),
            ei_delay: false,
            ld_a_ir: false,
            q: 0,
            prev_q: 0,
            reset: Some(ResetKind::Power),
            cycles: 0,
        }
    }

    pub fn request_reset(&mut self, kind: ResetKind) {
        self.reset = Some(kind);
    }

    /// Drop a pending reset and start executing at `pc` (test harnesses).
    pub fn skip_reset(&mut self, pc: u16) {
        self.reset = None;
        self.regs.pc = pc;
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Execute one instruction, or one reset or interrupt sequence.
    pub fn step<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        self.prev_q = std::mem::take(&mut self.q);
        let after_ld_a_ir = std::mem::take(&mut self.ld_a_ir);

        if let Some(kind) = self.reset.take() {
            self.reset_sequence(bus, kind);
        } else if bus.interrupts().take_nmi() {
            self.nmi_sequence(bus);
        } else if self.regs.iff1 && !self.ei_delay && bus.interrupts().irq_asserted() {
            self.int_sequence(bus, after_ld_a_ir);
        } else {
            self.ei_delay = false;
            if self.regs.halted {
                // HALT keeps fetching at PC and throws the opcode away.
                let _ = self.opcode_at(bus, self.regs.pc);
            } else {
                let opcode = self.fetch_opcode(bus);
                self.execute(bus, opcode);
            }
        }
        bus.synchronize(0);
    }

    // ========================================================================
    // Cycle accounting and bus access
    // ========================================================================

    fn charge<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, cycles: u8) {
        self.cycles = self.cycles.wrapping_add(u64::from(cycles));
        bus.add_cycles(cycles);
    }

    /// Internal T-states with no bus activity.
    pub(crate) fn idle<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, cycles: u8) {
        self.charge(bus, cycles);
    }

    /// Charge a machine cycle and catch up to its access point.
    fn begin<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, cycles: u8, after_access: u8) {
        self.charge(bus, cycles);
        bus.synchronize(i32::from(after_access));
    }

    /// M1: four T-states, opcode latched at the end of T2, refresh after.
    fn opcode_at<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) -> u8 {
        self.begin(bus, 4, 2);
        let opcode = bus.read(addr);
        self.regs.refresh();
        opcode
    }

    pub(crate) fn fetch_opcode<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let opcode = self.opcode_at(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        opcode
    }

    pub(crate) fn read<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) -> u8 {
        self.begin(bus, 3, 1);
        bus.read(addr)
    }

    pub(crate) fn write<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, addr: u16, value: u8) {
        self.begin(bus, 3, 1);
        bus.write(addr, value);
    }

    /// I/O cycles include the automatic wait state. The port number is the
    /// low half of the address; the upper half carries A or B.
    pub(crate) fn port_in<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, port: u16) -> u8 {
        self.begin(bus, 4, 1);
        bus.port_in(port as u8)
    }

    pub(crate) fn port_out<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, port: u16, value: u8) {
        self.begin(bus, 4, 1);
        bus.port_out(port as u8, value);
    }

    /// Read the byte at PC and advance PC.
    pub(crate) fn fetch<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let value = self.read(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    pub(crate) fn fetch_word<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch(bus);
        let hi = self.fetch(bus);
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn read_word<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) -> u16 {
        let lo = self.read(bus, addr);
        let hi = self.read(bus, addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn write_word<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write(bus, addr, lo);
        self.write(bus, addr.wrapping_add(1), hi);
    }

    /// Pushes the high byte first.
    pub(crate) fn push<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write(bus, self.regs.sp, hi);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write(bus, self.regs.sp, lo);
    }

    pub(crate) fn pop<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = self.read(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.read(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }

    /// Replace F and record it as this instruction's Q.
    pub(crate) fn set_flags(&mut self, f: u8) {
        self.regs.f = f;
        self.q = f;
    }

    // ========================================================================
    // Interrupts and reset
    // ========================================================================

    fn nmi_sequence<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        trace!(pc = format_args!("${:04X}", self.regs.pc), "NMI");
        self.regs.halted = false;
        self.ei_delay = false;
        self.charge(bus, NMI_FETCH_CYCLES);
        self.regs.refresh();
        self.regs.iff1 = false;
        self.push(bus, self.regs.pc);
        self.regs.pc = NMI_VECTOR;
        self.regs.wz = NMI_VECTOR;
    }

    fn int_sequence<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, after_ld_a_ir: bool) {
        trace!(
            pc = format_args!("${:04X}", self.regs.pc),
            mode = self.regs.im,
            "INT"
        );
        if after_ld_a_ir {
            self.regs.f &= !PF;
        }
        self.regs.halted = false;
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        self.charge(bus, ACKNOWLEDGE_CYCLES);
        self.regs.refresh();
        self.push(bus, self.regs.pc);
        self.regs.pc = if self.regs.im == 2 {
            let table = u16::from_be_bytes([self.regs.i, 0xFF]);
            self.read_word(bus, table)
        } else {
            IM1_VECTOR
        };
        self.regs.wz = self.regs.pc;
    }

    fn reset_sequence<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, kind: ResetKind) {
        debug!(?kind, "Z80 reset");
        bus.on_reset(kind);
        if kind == ResetKind::Power {
            self.regs = Registers::power_on();
        } else {
            let regs = &mut self.regs;
            regs.pc = 0;
            regs.i = 0;
            regs.r = 0;
            regs.iff1 = false;
            regs.iff2 = false;
            regs.im = 0;
            regs.halted = false;
        }
        self.ei_delay = false;
        self.charge(bus, RESET_CYCLES);
    }
}

impl<B: Z80Bus + ?Sized> Cpu<B> for Z80 {
    fn step(&mut self, bus: &mut B) {
        Z80::step(self, bus);
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn cycles(&self) -> u64 {
        self.cycles
    }

    fn request_reset(&mut self, kind: ResetKind) {
        Z80::request_reset(self, kind);
    }
}

impl Observable for Z80 {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        let flag = |bit: u8| Some(Value::Bool(r.f & bit != 0));
        match path {
            "pc" => Some(r.pc.into()),
            "sp" => Some(r.sp.into()),
            "a" => Some(r.a.into()),
            "f" => Some(r.f.into()),
            "af" => Some(r.af().into()),
            "bc" => Some(r.bc().into()),
            "de" => Some(r.de().into()),
            "hl" => Some(r.hl().into()),
            "ix" => Some(r.ix.into()),
            "iy" => Some(r.iy.into()),
            "i" => Some(r.i.into()),
            "r" => Some(r.r.into()),
            "wz" => Some(r.wz.into()),
            "iff1" => Some(r.iff1.into()),
            "iff2" => Some(r.iff2.into()),
            "im" => Some(r.im.into()),
            "halted" => Some(r.halted.into()),
            "flags.s" => flag(SF),
            "flags.z" => flag(ZF),
            "flags.h" => flag(HF),
            "flags.pv" => flag(PF),
            "flags.n" => flag(NF),
            "flags.c" => flag(CF),
            "cycles" => Some(self.cycles.into()),
            "ei_delay" => Some(self.ei_delay.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc",
            "sp",
            "a",
            "f",
            "af",
            "bc",
            "de",
            "hl",
            "ix",
            "iy",
            "i",
            "r",
            "wz",
            "iff1",
            "iff2",
            "im",
            "halted",
            "flags.s",
            "flags.z",
            "flags.h",
            "flags.pv",
            "flags.n",
            "flags.c",
            "cycles",
            "ei_delay",
        ]
    }
}
