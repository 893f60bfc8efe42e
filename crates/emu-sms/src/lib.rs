//! Sega Master System.
//!
//! The machine around a Z80 core: cartridge slot banking, work RAM, the
//! port-mapped VDP, PSG, FM unit and control ports, and the dispatcher that
//! keeps them level with the CPU. The Z80 is supplied by the caller through
//! `emu_core::Cpu`; the runner binary uses `zilog_z80::Z80`.

mod bus;
mod cartridge;
mod config;
mod joypad;
mod sms;

pub use bus::SmsBus;
pub use cartridge::{Cartridge, CartridgeError, SlotMapper};
pub use config::{SmsConfig, SmsRegion};
pub use joypad::{ControlPorts, SmsButton};
pub use sms::Sms;
