//! NES bus: CPU address routing and the per-access dispatcher.
//!
//! Implements `emu_core::Bus` for the NES. Routes CPU addresses to
//! internal RAM, PPU registers, APU, controllers, and cartridge. The
//! `Synchronize` side runs the PPU, APU and cartridge up to the CPU before
//! each access and copies their IRQ outputs into the shared registry.
//!
//! The NES is fully memory-mapped. There is no separate I/O address space.

use emu_core::{
    Bus, Frame, FrameSink, InterruptLines, IrqSource, ResetKind, ScaledClock, Synchronize,
};
use nes_cartridge::{Mapper, PpuPort};
use ricoh_apu_2a03::Apu;
use ricoh_ppu_2c02::{FB_HEIGHT, FB_WIDTH, Ppu};
use tracing::{debug, trace};

use crate::config::NesRegion;
use crate::controller::Controller;

/// The NES bus, implementing `emu_core::Bus`.
pub struct NesBus {
    /// 2K internal RAM ($0000-$07FF, mirrored to $1FFF).
    pub ram: [u8; 2048],
    pub ppu: Ppu,
    pub apu: Apu,
    /// Cartridge board, or the disk system adapter.
    pub cartridge: Box<dyn Mapper>,
    /// Registry bit the cartridge IRQ drives.
    cartridge_irq: IrqSource,
    pub controller1: Controller,
    pub controller2: Controller,
    /// OAM DMA pending page (set when $4014 is written).
    oam_dma_page: Option<u8>,
    /// Last value on the CPU data bus.
    open_bus: u8,
    lines: InterruptLines,
    ppu_clock: ScaledClock,
    /// CPU cycles charged but not yet run.
    pending_cycles: u32,
    sink: Box<dyn FrameSink>,
}

impl NesBus {
    #[must_use]
    pub fn new(
        region: NesRegion,
        cartridge: Box<dyn Mapper>,
        cartridge_irq: IrqSource,
        sink: Box<dyn FrameSink>,
    ) -> Self {
        Self {
            ram: [0; 2048],
            ppu: Ppu::new(region.ppu_timing()),
            apu: Apu::new(region.apu_timing()),
            cartridge,
            cartridge_irq,
            controller1: Controller::new(),
            controller2: Controller::new(),
            oam_dma_page: None,
            open_bus: 0,
            // The CPU sees an NMI edge two dots after the PPU raises it.
            lines: InterruptLines::new(2),
            ppu_clock: ScaledClock::new(region.cpu_divider(), region.ppu_divider()),
            pending_cycles: 0,
            sink,
        }
    }

    /// Peek a byte from RAM without side effects (for observation).
    #[must_use]
    pub fn peek_ram(&self, addr: u16) -> u8 {
        self.ram[usize::from(addr & 0x07FF)]
    }

    /// Take a pending OAM DMA request.
    pub fn take_dma(&mut self) -> Option<u8> {
        self.oam_dma_page.take()
    }

    #[must_use]
    pub fn open_bus(&self) -> u8 {
        self.open_bus
    }

    /// Run one CPU cycle of every unit. `hold_back` is the number of charged
    /// CPU cycles remaining after this one.
    fn run_cycle(&mut self, hold_back: u32) {
        let dots = self.ppu_clock.take(hold_back);
        let mut port = PpuPort(self.cartridge.as_mut());
        for _ in 0..dots {
            self.ppu.tick(&mut self.lines, &mut port);
        }
        self.apu.tick();
        self.cartridge.clock_cpu(1);
    }

    fn deliver_frame(&mut self) {
        if !self.ppu.take_frame() {
            return;
        }
        let number = self.ppu.frame_count();
        trace!(frame = number, "frame delivered");
        self.sink.present(&Frame {
            width: FB_WIDTH as usize,
            height: FB_HEIGHT as usize,
            pixels: self.ppu.framebuffer(),
            number,
        });
    }

    fn read_controller(&mut self, port: u16) -> u8 {
        let bit = if port == 0x4016 {
            self.controller1.read()
        } else {
            self.controller2.read()
        };
        (self.open_bus & 0xE0) | bit
    }
}

impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        let data = match addr {
            0x0000..=0x1FFF => self.ram[usize::from(addr & 0x07FF)],
            0x2000..=0x3FFF => {
                let mut port = PpuPort(self.cartridge.as_mut());
                self.ppu.cpu_read(addr & 0x0007, &mut self.lines, &mut port)
            }
            0x4015 => {
                // Bit 5 is not driven.
                let status = self.apu.read(addr);
                (status & !0x20) | (self.open_bus & 0x20)
            }
            0x4016 | 0x4017 => self.read_controller(addr),
            0x4000..=0x401F => self.open_bus,
            0x4020..=0xFFFF => self.cartridge.cpu_read(addr).unwrap_or(self.open_bus),
        };
        self.open_bus = data;
        data
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.open_bus = value;
        match addr {
            0x0000..=0x1FFF => self.ram[usize::from(addr & 0x07FF)] = value,
            0x2000..=0x3FFF => {
                let mut port = PpuPort(self.cartridge.as_mut());
                self.ppu
                    .cpu_write(addr & 0x0007, value, &mut self.lines, &mut port);
            }
            0x4014 => self.oam_dma_page = Some(value),
            0x4016 => {
                self.controller1.write(value);
                self.controller2.write(value);
            }
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write(addr, value),
            0x4018..=0x401F => {}
            0x4020..=0xFFFF => self.cartridge.cpu_write(addr, value),
        }
    }
}

impl Synchronize for NesBus {
    fn add_cycles(&mut self, cycles: u8) {
        self.pending_cycles += u32::from(cycles);
        self.ppu_clock.add(u32::from(cycles));
    }

    fn synchronize(&mut self, extra: i32) {
        let extra = extra.max(0) as u32;
        debug_assert!(extra <= self.pending_cycles, "synchronize past charged cycles");
        while self.pending_cycles > extra {
            self.pending_cycles -= 1;
            self.run_cycle(self.pending_cycles);
        }
        self.lines
            .set_irq(IrqSource::APU_FRAME, self.apu.irq_pending());
        self.lines
            .set_irq(self.cartridge_irq, self.cartridge.irq_pending());
        self.deliver_frame();
    }

    fn interrupts(&mut self) -> &mut InterruptLines {
        &mut self.lines
    }

    fn on_reset(&mut self, kind: ResetKind) {
        debug!(?kind, "NES reset");
        self.ppu.reset(kind);
        self.apu.reset(kind);
        self.cartridge.reset();
        self.oam_dma_page = None;
        self.lines.clear();
        if kind == ResetKind::Power {
            self.ram = [0; 2048];
            self.open_bus = 0;
            self.ppu_clock.clear();
            self.pending_cycles = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use nes_cartridge::{ChrMemory, Mirroring, Nrom};

    fn make_bus(region: NesRegion) -> NesBus {
        let mapper = Box::new(Nrom::new(
            vec![0xEA; 0x8000],
            ChrMemory::new(Vec::new()),
            Mirroring::Horizontal,
        ));
        NesBus::new(region, mapper, IrqSource::MAPPER, Box::new(|_: &Frame<'_>| {}))
    }

    fn run(bus: &mut NesBus, cycles: u32) {
        for _ in 0..cycles {
            bus.add_cycles(1);
            bus.synchronize(0);
        }
    }

    #[test]
    fn power_reset_drops_clock_remainders() {
        let mut fresh = make_bus(NesRegion::Pal);
        let mut bus = make_bus(NesRegion::Pal);
        // 3.2 dots a cycle: leave a fractional dot and two unrun cycles.
        run(&mut bus, 1);
        bus.add_cycles(2);
        bus.on_reset(ResetKind::Power);
        assert_eq!(bus.pending_cycles, 0);
        assert_eq!(bus.ppu_clock.pending(), 0);

        run(&mut fresh, 5);
        run(&mut bus, 5);
        assert_eq!(
            (bus.ppu.scanline(), bus.ppu.dot()),
            (fresh.ppu.scanline(), fresh.ppu.dot())
        );
    }

    #[test]
    fn ram_mirrors() {
        let mut bus = make_bus(NesRegion::Ntsc);
        bus.write(0x0000, 0xAB);
        assert_eq!(bus.read(0x0800), 0xAB);
        assert_eq!(bus.read(0x1000), 0xAB);
        assert_eq!(bus.read(0x1800), 0xAB);
    }

    #[test]
    fn cartridge_prg_read() {
        let mut bus = make_bus(NesRegion::Ntsc);
        assert_eq!(bus.read(0x8000), 0xEA);
        assert_eq!(bus.read(0xFFFC), 0xEA);
    }

    #[test]
    fn unmapped_reads_are_open_bus() {
        let mut bus = make_bus(NesRegion::Ntsc);
        bus.read(0x8000);
        assert_eq!(bus.read(0x5000), 0xEA);
        bus.write(0x0010, 0x42);
        assert_eq!(bus.read(0x4018), 0x42);
    }

    #[test]
    fn controller_read_keeps_open_bus_high_bits() {
        let mut bus = make_bus(NesRegion::Ntsc);
        bus.controller1.set_button(crate::NesButton::A, true);
        bus.write(0x4016, 1);
        bus.write(0x4016, 0);
        bus.read(0x8000);
        assert_eq!(bus.read(0x4016), 0xE1);
    }

    #[test]
    fn oam_dma_request() {
        let mut bus = make_bus(NesRegion::Ntsc);
        assert!(bus.take_dma().is_none());
        bus.write(0x4014, 0x02);
        assert_eq!(bus.take_dma(), Some(0x02));
        assert!(bus.take_dma().is_none());
    }

    #[test]
    fn three_dots_per_ntsc_cycle() {
        let mut bus = make_bus(NesRegion::Ntsc);
        run(&mut bus, 10);
        // Power-on position is the pre-render line, dot 0.
        assert_eq!(bus.ppu.scanline(), 261);
        assert_eq!(bus.ppu.dot(), 30);
    }

    #[test]
    fn pal_ratio_does_not_drift() {
        let mut bus = make_bus(NesRegion::Pal);
        run(&mut bus, 5);
        assert_eq!(bus.ppu.dot(), 16);
        run(&mut bus, 5 * 20);
        assert_eq!(u32::from(bus.ppu.dot()), 16 * 21 % 341);
    }

    #[test]
    fn held_back_cycles_are_not_run() {
        let mut bus = make_bus(NesRegion::Ntsc);
        bus.add_cycles(4);
        bus.synchronize(3);
        assert_eq!(bus.ppu.dot(), 3);
        bus.synchronize(0);
        assert_eq!(bus.ppu.dot(), 12);
    }

    #[test]
    fn frame_irq_reaches_registry() {
        let mut bus = make_bus(NesRegion::Ntsc);
        run(&mut bus, 29_828);
        assert!(!bus.interrupts().irq_asserted());
        run(&mut bus, 2);
        assert!(bus.interrupts().irq_held_by(IrqSource::APU_FRAME));
        bus.read(0x4015);
        bus.synchronize(0);
        assert!(!bus.interrupts().irq_asserted());
    }

    #[test]
    fn vblank_nmi_reaches_registry() {
        let mut bus = make_bus(NesRegion::Ntsc);
        bus.write(0x2000, 0x80);
        // Pre-render line plus 241 lines, then dot 1 and the settle time.
        let dots = 341 + 241 * 341 + 1 + 2;
        run(&mut bus, dots / 3 + 1);
        assert!(bus.interrupts().take_nmi());
    }

    #[test]
    fn frames_are_delivered_to_sink() {
        let frames = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&frames);
        let mapper = Box::new(Nrom::new(
            vec![0; 0x4000],
            ChrMemory::new(Vec::new()),
            Mirroring::Vertical,
        ));
        let sink = move |frame: &Frame<'_>| {
            assert_eq!(frame.pixels.len(), frame.width * frame.height);
            seen.borrow_mut().push(frame.number);
        };
        let mut bus = NesBus::new(NesRegion::Ntsc, mapper, IrqSource::MAPPER, Box::new(sink));
        run(&mut bus, 89_342 * 2 / 3 + 10);
        assert_eq!(*frames.borrow(), [1, 2]);
    }

    #[test]
    fn power_reset_clears_ram() {
        let mut bus = make_bus(NesRegion::Ntsc);
        bus.write(0x0123, 0x55);
        bus.on_reset(ResetKind::Soft);
        assert_eq!(bus.peek_ram(0x0123), 0x55);
        bus.on_reset(ResetKind::Power);
        assert_eq!(bus.peek_ram(0x0123), 0x00);
    }
}
