//! Shared contracts for step-driven, cycle-accurate emulation.
//!
//! A CPU core executes one instruction per `step()` and charges the cycles
//! it consumes to its bus. The bus owns every other unit of the machine and
//! runs them forward when the core calls [`Synchronize::synchronize`], so
//! peripherals always lag the CPU by a known number of cycles and never run
//! ahead of it. Interrupt requests raised during that catch-up land in an
//! [`InterruptLines`] registry the core polls on documented sub-cycles.

mod bus;
mod clock;
mod cpu;
mod interrupt;
mod observable;
mod output;
mod simple_bus;

pub use bus::{Bus, IoBus, Synchronize};
pub use clock::{MasterClock, ScaledClock};
pub use cpu::{Cpu, ResetKind};
pub use interrupt::{InterruptLines, IrqSource};
pub use observable::{Observable, Value};
pub use output::{AudioUnit, Frame, FrameSink, HeadlessAudio};
pub use simple_bus::{AccessKind, BusAccess, Signal, SimpleBus};
