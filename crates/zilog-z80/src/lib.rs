//! Step-driven Zilog Z80 core with T-state-exact bus timing.
//!
//! One call to [`Z80::step`] executes one instruction, prefixes included,
//! or an interrupt or reset sequence in its place. Each machine cycle is
//! charged to the bus when it starts and the machine is brought up to the
//! access point before memory or a port is touched, so a VDP or PSG sees
//! every access at the T-state the real CPU performs it.
//!
//! The undocumented parts of the instruction set are covered: IXH/IXL
//! operands, SLL, the DDCB/FDCB register copies, the X/Y flags (including
//! the MEMPTR and Q effects) and the block instruction flag quirks.

mod alu;
mod cpu;
mod execute;
pub mod flags;
mod registers;

pub use cpu::{IM1_VECTOR, NMI_VECTOR, RESET_CYCLES, Z80, Z80Bus};
pub use registers::Registers;
