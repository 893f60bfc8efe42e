//! Master System bus: Z80 memory and port decoding plus the dispatcher.
//!
//! Memory is the three cartridge slots and 8K of work RAM mirrored across
//! `$C000-$FFFF`. Ports decode only A7, A6 and A0, so `port & 0xC1`
//! selects the device. On catch-up the VDP runs three units per Z80
//! cycle, the PSG one tick per 16 cycles and the FM unit one per 72.

use emu_core::{
    AudioUnit, Bus, Frame, FrameSink, InterruptLines, IoBus, IrqSource, ResetKind, ScaledClock,
    Synchronize,
};
use sega_vdp::{FB_WIDTH, Vdp};
use tracing::{debug, trace};

use crate::cartridge::Cartridge;
use crate::config::SmsRegion;
use crate::joypad::{ControlPorts, SmsButton};

// $3E bits, set to disable
const CART_DISABLE: u8 = 0x40;
const IO_DISABLE: u8 = 0x04;

/// Memory control as the BIOS leaves it: cartridge and I/O on.
const MEMORY_CONTROL_BOOTED: u8 = 0xAB;

pub struct SmsBus {
    /// 8K work RAM.
    pub ram: [u8; 0x2000],
    pub cartridge: Cartridge,
    pub vdp: Vdp,
    psg: Box<dyn AudioUnit>,
    /// FM unit, when fitted.
    fm: Option<Box<dyn AudioUnit>>,
    /// Last `$F0` write.
    fm_address: u8,
    /// `$F2`: bit 0 FM on, bit 1 PSG off.
    audio_control: u8,
    ports: ControlPorts,
    memory_control: u8,
    lines: InterruptLines,
    vdp_clock: ScaledClock,
    psg_clock: ScaledClock,
    fm_clock: ScaledClock,
    sink: Box<dyn FrameSink>,
}

impl SmsBus {
    #[must_use]
    pub fn new(
        region: SmsRegion,
        cartridge: Cartridge,
        psg: Box<dyn AudioUnit>,
        fm: Option<Box<dyn AudioUnit>>,
        sink: Box<dyn FrameSink>,
    ) -> Self {
        Self {
            ram: [0; 0x2000],
            cartridge,
            vdp: Vdp::new(region.vdp_timing()),
            psg,
            fm,
            fm_address: 0,
            audio_control: 0,
            ports: ControlPorts::new(region.inverts_io_outputs()),
            memory_control: MEMORY_CONTROL_BOOTED,
            lines: InterruptLines::new(0),
            vdp_clock: ScaledClock::new(region.cpu_divider(), region.vdp_divider()),
            psg_clock: ScaledClock::new(1, region.psg_divider()),
            fm_clock: ScaledClock::new(1, region.fm_divider()),
            sink,
        }
    }

    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        if addr >= 0xC000 {
            self.ram[usize::from(addr & 0x1FFF)]
        } else {
            self.cartridge.read(addr)
        }
    }

    pub fn set_button(&mut self, player: usize, button: SmsButton, pressed: bool) {
        self.ports.set_button(player, button, pressed);
    }

    pub fn set_reset_button(&mut self, pressed: bool) {
        self.ports.set_reset_button(pressed);
    }

    /// The pause button is wired to the Z80 NMI input.
    pub fn set_pause(&mut self, pressed: bool) {
        if pressed {
            self.lines.assert_nmi();
        } else {
            self.lines.release_nmi();
        }
    }

    #[must_use]
    pub fn memory_control(&self) -> u8 {
        self.memory_control
    }

    #[must_use]
    pub fn fm_fitted(&self) -> bool {
        self.fm.is_some()
    }

    #[must_use]
    pub fn audio_control(&self) -> u8 {
        self.audio_control
    }

    #[must_use]
    pub fn fm_address(&self) -> u8 {
        self.fm_address
    }

    fn update_irq(&mut self) {
        self.lines.set_irq(IrqSource::VDP, self.vdp.irq());
    }

    fn deliver_frame(&mut self) {
        if !self.vdp.take_frame() {
            return;
        }
        let number = self.vdp.frame_count();
        trace!(frame = number, "frame delivered");
        self.sink.present(&Frame {
            width: FB_WIDTH,
            height: usize::from(self.vdp.active_lines()),
            pixels: self.vdp.framebuffer(),
            number,
        });
    }

    fn io_enabled(&self) -> bool {
        self.memory_control & IO_DISABLE == 0
    }

    fn write_memory_control(&mut self, value: u8) {
        if value != self.memory_control {
            debug!(value = format_args!("{value:#04X}"), "memory control");
        }
        self.memory_control = value;
    }
}

impl Bus for SmsBus {
    fn read(&mut self, addr: u16) -> u8 {
        if addr >= 0xC000 {
            self.ram[usize::from(addr & 0x1FFF)]
        } else if self.memory_control & CART_DISABLE != 0 {
            0xFF
        } else {
            self.cartridge.read(addr)
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        if addr >= 0xC000 {
            self.ram[usize::from(addr & 0x1FFF)] = value;
            if addr >= 0xFFFC {
                self.cartridge.write_control(addr, value);
            }
        } else {
            self.cartridge.write(addr, value);
        }
    }
}

impl IoBus for SmsBus {
    fn port_in(&mut self, port: u8) -> u8 {
        match port & 0xC1 {
            0x00 | 0x01 => 0xFF,
            0x40 => self.vdp.v_counter(),
            0x41 => self.vdp.h_counter(),
            0x80 => self.vdp.read_data(),
            0x81 => {
                let status = self.vdp.read_status();
                self.update_irq();
                status
            }
            0xC0 if port == 0xF2 && self.fm.is_some() => self.audio_control,
            0xC0 if self.io_enabled() => self.ports.port_a(),
            0xC1 if self.io_enabled() => self.ports.port_b(),
            _ => 0xFF,
        }
    }

    fn port_out(&mut self, port: u8, value: u8) {
        match port & 0xC1 {
            0x00 => self.write_memory_control(value),
            0x01 => {
                if self.ports.write_io_control(value) {
                    self.vdp.latch_h_counter();
                }
            }
            0x40 | 0x41 => self.psg.write(value),
            0x80 => self.vdp.write_data(value),
            0x81 => {
                self.vdp.write_control(value);
                self.update_irq();
            }
            0xC0 | 0xC1 => match (port, self.fm.as_mut()) {
                (0xF0, Some(_)) => self.fm_address = value,
                (0xF1, Some(fm)) => fm.write(value),
                (0xF2, Some(_)) => {
                    debug!(value = value & 0x03, "audio control");
                    self.audio_control = value & 0x03;
                }
                _ => {}
            },
            _ => {}
        }
    }
}

impl Synchronize for SmsBus {
    fn add_cycles(&mut self, cycles: u8) {
        let cycles = u32::from(cycles);
        self.vdp_clock.add(cycles);
        self.psg_clock.add(cycles);
        self.fm_clock.add(cycles);
    }

    fn synchronize(&mut self, extra: i32) {
        let extra = extra.max(0) as u32;
        let units = self.vdp_clock.take(extra);
        self.vdp.run(units);

        let ticks = self.psg_clock.take(extra);
        if ticks > 0 {
            self.psg.run(ticks);
        }
        let ticks = self.fm_clock.take(extra);
        if let Some(fm) = self.fm.as_mut().filter(|_| ticks > 0) {
            fm.run(ticks);
        }

        self.update_irq();
        self.deliver_frame();
    }

    fn interrupts(&mut self) -> &mut InterruptLines {
        &mut self.lines
    }

    fn on_reset(&mut self, kind: ResetKind) {
        debug!(?kind, "SMS reset");
        self.lines.clear();
        if kind == ResetKind::Power {
            self.ram = [0; 0x2000];
            self.vdp.reset();
            self.cartridge.reset();
            self.memory_control = MEMORY_CONTROL_BOOTED;
            self.ports.write_io_control(0xFF);
            self.fm_address = 0;
            self.audio_control = 0;
            self.vdp_clock.clear();
            self.psg_clock.clear();
            self.fm_clock.clear();
        }
    }
}
