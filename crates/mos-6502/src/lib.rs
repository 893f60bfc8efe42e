//! Step-driven MOS 6502 core with bus-cycle-exact timing.
//!
//! One call to [`Mos6502::step`] executes one instruction (or a reset or
//! interrupt sequence in its place). Inside it, every bus cycle the real
//! CPU performs is reproduced in order, dummy reads included, and the
//! machine is synchronized up to each access before it happens. Devices
//! that watch the bus therefore see the same access pattern, at the same
//! cycles, as on hardware.
//!
//! This is the NMOS core as used in the Ricoh 2A03: the D flag can be set
//! and pushed but ADC/SBC are always binary. Unofficial opcodes run with
//! their documented cycle counts and addressing-mode bus cycles; those
//! outside the NOP family have no architectural effect.

mod addressing;
mod cpu;
mod execute;
pub mod flags;
mod registers;
mod table;

pub use cpu::{INTERRUPT_CYCLES, IRQ_VECTOR, Mos6502, NMI_VECTOR, RESET_VECTOR};
pub use flags::Status;
pub use registers::Registers;
pub use table::{Mnemonic, Mode, OPCODES, Opcode};
