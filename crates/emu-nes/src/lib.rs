//! Cycle-accurate NES and Famicom timing core.
//!
//! The NES master clock ticks at 21,477,272 Hz (NTSC crystal). The PPU
//! ticks at crystal/4 (5,369,318 Hz) and the CPU at crystal/12
//! (1,789,773 Hz), giving a 3:1 PPU:CPU ratio. PAL runs a 26,601,713 Hz
//! crystal divided by 5 and 16, so 3.2 dots per CPU cycle.
//!
//! One frame = 341 PPU dots × 262 scanlines = 89,342 PPU cycles, with the
//! last pre-render dot skipped on odd frames while rendering.

mod bus;
mod config;
mod controller;
mod fds;
mod nes;

pub use bus::NesBus;
pub use config::{NesConfig, NesRegion};
pub use controller::{Controller, NesButton};
pub use fds::Fds;
pub use nes::Nes;
pub use nes_cartridge::{CartridgeError, Mirroring};
