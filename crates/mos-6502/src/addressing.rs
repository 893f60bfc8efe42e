//! Addressing-mode resolution.
//!
//! Each mode is a fixed sequence of bus cycles ending with an effective
//! address. The final data access belongs to the operation, so it happens
//! after the operation has polled for interrupts.

use emu_core::{Bus, Synchronize};

use crate::Mos6502;
use crate::table::Mode;

/// Resolved operand of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operand {
    /// No memory operand (implied, or the operation fetches its own).
    None,
    Accumulator,
    Memory(u16),
}

impl Mos6502 {
    pub(crate) fn resolve<B: Bus + Synchronize>(&mut self, bus: &mut B, mode: Mode) -> Operand {
        match mode {
            Mode::Implied | Mode::Relative | Mode::Indirect => Operand::None,
            Mode::Accumulator => Operand::Accumulator,
            Mode::Immediate => {
                let addr = self.regs.pc;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                Operand::Memory(addr)
            }
            Mode::ZeroPage => Operand::Memory(u16::from(self.fetch(bus))),
            Mode::ZeroPageX => self.zero_page_indexed(bus, self.regs.x),
            Mode::ZeroPageY => self.zero_page_indexed(bus, self.regs.y),
            Mode::Absolute => Operand::Memory(self.fetch_word(bus)),
            Mode::AbsoluteX => self.absolute_indexed(bus, self.regs.x, false),
            Mode::AbsoluteXWrite => self.absolute_indexed(bus, self.regs.x, true),
            Mode::AbsoluteY => self.absolute_indexed(bus, self.regs.y, false),
            Mode::AbsoluteYWrite => self.absolute_indexed(bus, self.regs.y, true),
            Mode::IndirectX => {
                let ptr = self.fetch(bus);
                // Index is added while the unindexed pointer is read.
                let _ = self.read(bus, u16::from(ptr));
                let ptr = ptr.wrapping_add(self.regs.x);
                let lo = self.read(bus, u16::from(ptr));
                let hi = self.read(bus, u16::from(ptr.wrapping_add(1)));
                Operand::Memory(u16::from_le_bytes([lo, hi]))
            }
            Mode::IndirectY => self.indirect_indexed(bus, false),
            Mode::IndirectYWrite => self.indirect_indexed(bus, true),
        }
    }

    /// zp,X / zp,Y: the sum wraps within page zero.
    fn zero_page_indexed<B: Bus + Synchronize>(&mut self, bus: &mut B, index: u8) -> Operand {
        let base = self.fetch(bus);
        let _ = self.read(bus, u16::from(base));
        Operand::Memory(u16::from(base.wrapping_add(index)))
    }

    fn absolute_indexed<B: Bus + Synchronize>(
        &mut self,
        bus: &mut B,
        index: u8,
        write: bool,
    ) -> Operand {
        let base = self.fetch_word(bus);
        Operand::Memory(self.index_address(bus, base, index, write))
    }

    fn indirect_indexed<B: Bus + Synchronize>(&mut self, bus: &mut B, write: bool) -> Operand {
        let ptr = self.fetch(bus);
        let lo = self.read(bus, u16::from(ptr));
        let hi = self.read(bus, u16::from(ptr.wrapping_add(1)));
        let base = u16::from_le_bytes([lo, hi]);
        Operand::Memory(self.index_address(bus, base, self.regs.y, write))
    }

    /// Add an index to a 16-bit base.
    ///
    /// The CPU first reads from the address with the carry into the high
    /// byte not applied yet. Reads skip that cycle when no carry happens;
    /// writes and read-modify-writes always spend it.
    fn index_address<B: Bus + Synchronize>(
        &mut self,
        bus: &mut B,
        base: u16,
        index: u8,
        write: bool,
    ) -> u16 {
        let addr = base.wrapping_add(u16::from(index));
        let crossed = (base ^ addr) & 0xFF00 != 0;
        if crossed && !write {
            self.charge(bus, 1);
        }
        if crossed || write {
            let uncarried = (base & 0xFF00) | (addr & 0x00FF);
            let _ = self.read(bus, uncarried);
        }
        addr
    }
}
