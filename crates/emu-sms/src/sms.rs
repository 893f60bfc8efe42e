//! Top-level Master System.
//!
//! Generic over the Z80 core: anything implementing `Cpu<SmsBus>` that
//! charges its cycles through `Synchronize` and reaches memory and ports
//! through `Bus` and `IoBus` can drive the machine.

use emu_core::{AudioUnit, Cpu, FrameSink, HeadlessAudio, Observable, ResetKind, Value};
use tracing::info;

use crate::bus::SmsBus;
use crate::cartridge::{Cartridge, CartridgeError};
use crate::config::{SmsConfig, SmsRegion};
use crate::joypad::SmsButton;

pub struct Sms<C> {
    cpu: C,
    bus: SmsBus,
    region: SmsRegion,
}

impl<C: Cpu<SmsBus>> Sms<C> {
    /// Assemble the machine with headless sound chips and run the power-on
    /// reset.
    pub fn new(config: SmsConfig, cpu: C, sink: Box<dyn FrameSink>) -> Result<Self, CartridgeError> {
        let fm: Option<Box<dyn AudioUnit>> = if config.fm_sound {
            Some(Box::new(HeadlessAudio::new()))
        } else {
            None
        };
        Self::with_audio(config, cpu, sink, Box::new(HeadlessAudio::new()), fm)
    }

    /// Assemble the machine around caller-supplied sound chips. `fm` is
    /// ignored unless the configuration fits the FM unit.
    pub fn with_audio(
        config: SmsConfig,
        mut cpu: C,
        sink: Box<dyn FrameSink>,
        psg: Box<dyn AudioUnit>,
        fm: Option<Box<dyn AudioUnit>>,
    ) -> Result<Self, CartridgeError> {
        let cartridge = Cartridge::new(config.rom, config.slot_mapper)?;
        info!(
            region = ?config.region,
            mapper = ?config.slot_mapper,
            fm = config.fm_sound,
            "SMS"
        );
        let fm = fm.filter(|_| config.fm_sound);
        let bus = SmsBus::new(config.region, cartridge, psg, fm, sink);

        cpu.request_reset(ResetKind::Power);
        let mut sms = Self {
            cpu,
            bus,
            region: config.region,
        };
        sms.step();
        Ok(sms)
    }

    /// Execute one instruction (or interrupt/reset sequence).
    pub fn step(&mut self) {
        self.cpu.step(&mut self.bus);
    }

    /// Run until the VDP wraps to the next frame.
    ///
    /// Returns the number of Z80 cycles executed.
    pub fn run_frame(&mut self) -> u64 {
        let start_frame = self.bus.vdp.frame_count();
        let start_cycles = self.cpu.cycles();
        while self.bus.vdp.frame_count() == start_frame {
            self.step();
        }
        self.cpu.cycles().wrapping_sub(start_cycles)
    }

    /// Request a CPU reset; it runs at the start of the next step.
    pub fn reset(&mut self, kind: ResetKind) {
        self.cpu.request_reset(kind);
    }

    pub fn set_button(&mut self, player: usize, button: SmsButton, pressed: bool) {
        self.bus.set_button(player, button, pressed);
    }

    pub fn set_pause(&mut self, pressed: bool) {
        self.bus.set_pause(pressed);
    }

    /// The reset button is read by software through port `$DD`.
    pub fn set_reset_button(&mut self, pressed: bool) {
        self.bus.set_reset_button(pressed);
    }

    #[must_use]
    pub fn region(&self) -> SmsRegion {
        self.region
    }

    #[must_use]
    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut C {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &SmsBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SmsBus {
        &mut self.bus
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.bus.vdp.frame_count()
    }
}

impl<C: Cpu<SmsBus>> Observable for Sms<C> {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("vdp.") {
            return self.bus.vdp.query(rest);
        }
        if let Some(rest) = path.strip_prefix("memory.") {
            let addr = match rest.strip_prefix("0x").or_else(|| rest.strip_prefix('$')) {
                Some(hex) => u16::from_str_radix(hex, 16).ok(),
                None => rest.parse().ok(),
            };
            return addr.map(|a| self.bus.peek(a).into());
        }
        match path {
            "cpu.pc" => Some(self.cpu.pc().into()),
            "cpu.cycles" => Some(self.cpu.cycles().into()),
            "frame_count" => Some(self.frame_count().into()),
            "memory_control" => Some(self.bus.memory_control().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "vdp.<vdp_paths>",
            "memory.<address>",
            "cpu.pc",
            "cpu.cycles",
            "frame_count",
            "memory_control",
        ]
    }
}
