//! Top-level NES system.
//!
//! The CPU drives time: each `step()` runs one instruction, and the bus
//! brings the PPU (3 dots per CPU cycle on NTSC, 3.2 on PAL), APU and
//! cartridge up to every access as it happens. OAM DMA is run here, after
//! the instruction that requested it, as CPU stall cycles plus 256 copies.

use emu_core::{Bus, FrameSink, IrqSource, Observable, ResetKind, Value};
use mos_6502::Mos6502;
use nes_cartridge::{CartridgeError, Mapper, create_mapper};
use tracing::{info, trace};

use crate::bus::NesBus;
use crate::config::{NesConfig, NesRegion};
use crate::controller::NesButton;
use crate::fds::Fds;

/// NES system.
pub struct Nes {
    cpu: Mos6502,
    bus: NesBus,
    region: NesRegion,
}

impl Nes {
    /// Assemble the machine and run the power-on reset sequence.
    pub fn new(config: NesConfig, sink: Box<dyn FrameSink>) -> Result<Self, CartridgeError> {
        let (cartridge, cartridge_irq) = if config.disk_system {
            let fds: Box<dyn Mapper> = Box::new(Fds::new(config.prg_rom));
            (fds, IrqSource::DISK)
        } else {
            let board = create_mapper(
                config.mapper,
                config.prg_rom,
                config.chr_rom,
                config.mirroring,
            )?;
            (board, IrqSource::MAPPER)
        };
        info!(region = ?config.region, disk_system = config.disk_system, "NES");

        let mut nes = Self {
            cpu: Mos6502::new(),
            bus: NesBus::new(config.region, cartridge, cartridge_irq, sink),
            region: config.region,
        };
        nes.step();
        Ok(nes)
    }

    /// Execute one instruction (or interrupt/reset sequence), plus any OAM
    /// DMA it started.
    pub fn step(&mut self) {
        self.cpu.step(&mut self.bus);
        if let Some(page) = self.bus.take_dma() {
            self.run_oam_dma(page);
        }
    }

    /// Run until the PPU starts the next frame.
    ///
    /// Returns the number of CPU cycles executed.
    pub fn run_frame(&mut self) -> u64 {
        let start_frame = self.bus.ppu.frame_count();
        let start_cycles = self.cpu.cycles();
        while self.bus.ppu.frame_count() == start_frame {
            self.step();
        }
        self.cpu.cycles().wrapping_sub(start_cycles)
    }

    /// Request a reset; it runs at the start of the next step.
    pub fn reset(&mut self, kind: ResetKind) {
        self.cpu.request_reset(kind);
    }

    /// Press or release a button on controller 1 (`player` 0) or 2.
    pub fn set_button(&mut self, player: usize, button: NesButton, pressed: bool) {
        match player {
            0 => self.bus.controller1.set_button(button, pressed),
            1 => self.bus.controller2.set_button(button, pressed),
            _ => {}
        }
    }

    /// One alignment cycle (two on an odd CPU cycle), then 256 read/write
    /// pairs into `$2004`.
    fn run_oam_dma(&mut self, page: u8) {
        trace!(page, "OAM DMA");
        let align = if self.cpu.cycles() % 2 == 1 { 2 } else { 1 };
        self.cpu.stall(&mut self.bus, align);
        let base = u16::from(page) << 8;
        for offset in 0..256 {
            let value = self.bus.read(base | offset);
            self.bus.write(0x2004, value);
            self.cpu.stall(&mut self.bus, 2);
        }
    }

    #[must_use]
    pub fn region(&self) -> NesRegion {
        self.region
    }

    #[must_use]
    pub fn cpu(&self) -> &Mos6502 {
        &self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut NesBus {
        &mut self.bus
    }

    /// Frames started since power-on.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.bus.ppu.frame_count()
    }
}

impl Observable for Nes {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("ppu.") {
            self.bus.ppu.query(rest)
        } else if let Some(rest) = path.strip_prefix("apu.") {
            self.bus.apu.query(rest)
        } else if let Some(rest) = path.strip_prefix("memory.") {
            let addr =
                if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
                    u16::from_str_radix(hex, 16).ok()
                } else if let Some(hex) = rest.strip_prefix('$') {
                    u16::from_str_radix(hex, 16).ok()
                } else {
                    rest.parse().ok()
                };
            addr.map(|a| Value::U8(self.bus.peek_ram(a)))
        } else {
            match path {
                "frame_count" => Some(self.frame_count().into()),
                "open_bus" => Some(self.bus.open_bus().into()),
                _ => self.cpu.query(path),
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<6502_paths>",
            "ppu.<ppu_paths>",
            "apu.frame_counter.mode",
            "apu.frame_irq",
            "memory.<address>",
            "frame_count",
            "open_bus",
        ]
    }
}
