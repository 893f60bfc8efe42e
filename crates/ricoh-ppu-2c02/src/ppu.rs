//! Dot-clocked 2C02 core.
//!
//! One `tick()` = one PPU dot. Each line is 341 dots; NTSC frames are 262
//! lines and PAL frames 312.
//!
//! ## Scanline layout
//! - 0-239: visible scanlines
//! - 240: post-render (idle)
//! - 241: vblank starts at dot 1
//! - last line: pre-render

use emu_core::{InterruptLines, Observable, ResetKind, Value};
use tracing::debug;

use crate::palette::PALETTE;
use crate::{Mirroring, PpuBus};

/// Framebuffer dimensions.
pub const FB_WIDTH: u32 = 256;
pub const FB_HEIGHT: u32 = 240;

const DOTS_PER_LINE: u16 = 341;
const VBLANK_LINE: u16 = 241;

const STATUS_VBLANK: u8 = 0x80;
const STATUS_SPRITE0: u8 = 0x40;
const STATUS_OVERFLOW: u8 = 0x20;

/// Frame geometry of one PPU revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpuTiming {
    /// Lines per frame, pre-render included.
    pub scanlines: u16,
    /// Odd frames drop the last pre-render dot while rendering is on.
    pub odd_frame_skip: bool,
}

impl PpuTiming {
    /// 2C02.
    pub const NTSC: Self = Self {
        scanlines: 262,
        odd_frame_skip: true,
    };

    /// 2C07.
    pub const PAL: Self = Self {
        scanlines: 312,
        odd_frame_skip: false,
    };

    #[must_use]
    pub fn pre_render_line(&self) -> u16 {
        self.scanlines - 1
    }

    /// Dots in a frame with no skipped dot.
    #[must_use]
    pub fn dots_per_frame(&self) -> u32 {
        u32::from(self.scanlines) * u32::from(DOTS_PER_LINE)
    }
}

/// PPU 2C02.
pub struct Ppu {
    timing: PpuTiming,

    // VRAM
    nametable_ram: [u8; 2048],
    palette_ram: [u8; 32],
    oam: [u8; 256],

    // Registers
    ctrl: u8,
    mask: u8,
    status: u8,
    oam_addr: u8,
    /// Last value written to any register; low status bits read it back.
    latch: u8,

    // Loopy scroll/address registers
    v: u16,
    t: u16,
    fine_x: u8,
    w: bool,

    // Data read buffer ($2007)
    read_buffer: u8,

    // Position of the next dot to run
    scanline: u16,
    dot: u16,
    frame_odd: bool,

    // Fetch pipeline
    next_tile: u8,
    sprite_rows: [u16; 8],
    /// A12 level of the last pattern address driven.
    a12: bool,

    // NMI generation
    /// Dots run since vblank was set, saturating.
    vblank_age: u16,
    /// Vblank still reads set for the dot after pre-render clears it.
    vblank_echo: bool,
    nmi_pulled: bool,
    nmi_suppressed: bool,

    // Output
    framebuffer: Vec<u32>,
    frame_ready: bool,
    frames: u64,
}

impl Ppu {
    #[must_use]
    pub fn new(timing: PpuTiming) -> Self {
        Self {
            timing,

            nametable_ram: [0; 2048],
            palette_ram: [0; 32],
            oam: [0; 256],

            ctrl: 0,
            mask: 0,
            status: 0,
            oam_addr: 0,
            latch: 0,

            v: 0,
            t: 0,
            fine_x: 0,
            w: false,

            read_buffer: 0,

            scanline: timing.pre_render_line(),
            dot: 0,
            frame_odd: false,

            next_tile: 0,
            sprite_rows: [0; 8],
            a12: false,

            vblank_age: u16::MAX,
            vblank_echo: false,
            nmi_pulled: false,
            nmi_suppressed: false,

            framebuffer: vec![0; (FB_WIDTH * FB_HEIGHT) as usize],
            frame_ready: false,
            frames: 0,
        }
    }

    /// Power-on or reset-button state. A power reset also clears memory
    /// and returns the clock to the start of pre-render.
    pub fn reset(&mut self, kind: ResetKind) {
        debug!(?kind, "ppu reset");
        self.ctrl = 0;
        self.mask = 0;
        self.w = false;
        self.t = 0;
        self.fine_x = 0;
        self.read_buffer = 0;
        self.nmi_pulled = false;
        self.nmi_suppressed = false;
        if kind == ResetKind::Power {
            let timing = self.timing;
            *self = Self::new(timing);
        }
    }

    /// One PPU dot.
    ///
    /// Advances the interrupt registry's tick count, so NMI settle time is
    /// measured in dots.
    pub fn tick(&mut self, lines: &mut InterruptLines, bus: &mut dyn PpuBus) {
        lines.advance(1);
        self.vblank_age = self.vblank_age.saturating_add(1);

        if self.scanline < 240 {
            if self.scanline == 0 && self.dot == 0 {
                self.frame_ready = true;
                self.frames += 1;
            }
            if self.rendering_enabled() {
                self.fetch(bus, false);
            }
            if (1..=256).contains(&self.dot) {
                self.write_backdrop();
            }
        } else if self.scanline == VBLANK_LINE && self.dot == 1 {
            self.status |= STATUS_VBLANK;
            self.vblank_age = 0;
            self.check_nmi(lines);
        } else if self.scanline == self.timing.pre_render_line() {
            self.tick_pre_render(lines, bus);
        }

        self.dot += 1;
        if self.dot >= DOTS_PER_LINE {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline >= self.timing.scanlines {
                self.scanline = 0;
                self.frame_odd = !self.frame_odd;
            }
        }
    }

    fn tick_pre_render(&mut self, lines: &mut InterruptLines, bus: &mut dyn PpuBus) {
        if self.dot == 1 {
            self.vblank_echo = self.status & STATUS_VBLANK != 0;
            self.status &= !(STATUS_VBLANK | STATUS_SPRITE0 | STATUS_OVERFLOW);
            self.nmi_pulled = false;
            self.nmi_suppressed = false;
            lines.release_nmi();
        } else if self.dot == 2 {
            self.vblank_echo = false;
        }

        if self.rendering_enabled() {
            self.fetch(bus, true);

            if (280..=304).contains(&self.dot) {
                self.copy_vertical();
            }

            if self.dot == 339 && self.frame_odd && self.timing.odd_frame_skip {
                self.dot = 340;
            }
        }
    }

    /// Memory fetches and scroll updates of a rendering line.
    fn fetch(&mut self, bus: &mut dyn PpuBus, pre_render: bool) {
        match self.dot {
            1..=256 | 321..=336 => self.background_fetch(bus),
            257..=320 => {
                if self.dot == 257 {
                    self.copy_horizontal();
                    if pre_render {
                        self.clear_sprites();
                    } else {
                        self.evaluate_sprites();
                    }
                }
                self.oam_addr = 0;
                self.sprite_fetch(bus);
            }
            _ => {}
        }
        if self.dot == 256 {
            self.increment_y();
        }
    }

    fn background_fetch(&mut self, bus: &mut dyn PpuBus) {
        let cycle = if self.dot >= 321 {
            self.dot - 321
        } else {
            self.dot - 1
        };

        match cycle & 0x07 {
            0 => {
                let nt_addr = 0x2000 | (self.v & 0x0FFF);
                self.next_tile = self.ppu_read(nt_addr, bus);
            }
            4 => {
                let addr = self.background_row();
                self.pattern_fetch(addr, bus);
            }
            6 => {
                let addr = self.background_row() + 8;
                self.pattern_fetch(addr, bus);
            }
            7 => self.increment_x(),
            _ => {}
        }
    }

    fn background_row(&self) -> u16 {
        let table = if self.ctrl & 0x10 != 0 { 0x1000u16 } else { 0 };
        let fine_y = (self.v >> 12) & 0x07;
        table + u16::from(self.next_tile) * 16 + fine_y
    }

    fn sprite_fetch(&mut self, bus: &mut dyn PpuBus) {
        let offset = self.dot - 257;
        let row = self.sprite_rows[usize::from(offset / 8)];
        match offset & 0x07 {
            4 => self.pattern_fetch(row, bus),
            6 => self.pattern_fetch(row + 8, bus),
            _ => {}
        }
    }

    /// Pick the first eight sprites on the next line. A ninth sets the
    /// overflow flag; the hardware's diagonal OAM scan is not modelled.
    fn evaluate_sprites(&mut self) {
        let height: u16 = if self.ctrl & 0x20 != 0 { 16 } else { 8 };
        let mut found = 0;
        for sprite in self.oam.chunks_exact(4) {
            let row = self.scanline.wrapping_sub(u16::from(sprite[0]));
            if row >= height {
                continue;
            }
            if found == 8 {
                self.status |= STATUS_OVERFLOW;
                break;
            }
            self.sprite_rows[found] = sprite_row_addr(self.ctrl, sprite[1], sprite[2], row);
            found += 1;
        }
        for slot in &mut self.sprite_rows[found..] {
            *slot = sprite_row_addr(self.ctrl, 0xFF, 0, 0);
        }
    }

    /// Unused slots still fetch tile $FF.
    fn clear_sprites(&mut self) {
        self.sprite_rows = [sprite_row_addr(self.ctrl, 0xFF, 0, 0); 8];
    }

    fn pattern_fetch(&mut self, addr: u16, bus: &mut dyn PpuBus) {
        self.drive_address(addr, bus);
        bus.chr_read(addr);
    }

    /// Track A12 of an address placed on the PPU bus.
    fn drive_address(&mut self, addr: u16, bus: &mut dyn PpuBus) {
        let high = addr & 0x1000 != 0;
        if high && !self.a12 {
            bus.a12_rise();
        }
        self.a12 = high;
    }

    fn write_backdrop(&mut self) {
        let x = usize::from(self.dot - 1);
        let y = usize::from(self.scanline);
        // With rendering off and v pointing into palette RAM the PPU shows
        // that entry instead of the backdrop.
        let mut index = if !self.rendering_enabled() && self.v & 0x3F00 == 0x3F00 {
            self.palette_ram[mirror_palette_addr(self.v) as usize]
        } else {
            self.palette_ram[0]
        };
        if self.mask & 0x01 != 0 {
            index &= 0x30;
        }
        self.framebuffer[y * FB_WIDTH as usize + x] = PALETTE[usize::from(index & 0x3F)];
    }

    // === Scrolling ===

    fn increment_x(&mut self) {
        if self.v & 0x001F == 31 {
            self.v &= !0x001F;
            self.v ^= 0x0400; // Switch horizontal nametable
        } else {
            self.v += 1;
        }
    }

    fn increment_y(&mut self) {
        if (self.v & 0x7000) != 0x7000 {
            self.v += 0x1000;
        } else {
            self.v &= !0x7000;
            let mut coarse_y = (self.v & 0x03E0) >> 5;
            if coarse_y == 29 {
                coarse_y = 0;
                self.v ^= 0x0800; // Switch vertical nametable
            } else if coarse_y == 31 {
                coarse_y = 0;
            } else {
                coarse_y += 1;
            }
            self.v = (self.v & !0x03E0) | (coarse_y << 5);
        }
    }

    fn copy_horizontal(&mut self) {
        // v: ....A .....EDCBA = t: ....A .....EDCBA
        self.v = (self.v & !0x041F) | (self.t & 0x041F);
    }

    fn copy_vertical(&mut self) {
        // v: GHIA.BC DEF..... = t: GHIA.BC DEF.....
        self.v = (self.v & !0x7BE0) | (self.t & 0x7BE0);
    }

    /// `$2007` moves v by the increment, except on a rendering line where
    /// it bumps coarse X and Y together.
    fn advance_data_address(&mut self, bus: &mut dyn PpuBus) {
        let rendering_line =
            self.scanline < 240 || self.scanline == self.timing.pre_render_line();
        if self.rendering_enabled() && rendering_line {
            self.increment_x();
            self.increment_y();
        } else {
            self.v = self
                .v
                .wrapping_add(if self.ctrl & 0x04 != 0 { 32 } else { 1 });
            self.v &= 0x7FFF;
        }
        self.drive_address(self.v, bus);
    }

    // === NMI ===

    fn check_nmi(&mut self, lines: &mut InterruptLines) {
        if self.ctrl & 0x80 != 0
            && self.status & STATUS_VBLANK != 0
            && !self.nmi_pulled
            && !self.nmi_suppressed
        {
            self.nmi_pulled = true;
            lines.assert_nmi();
        }
    }

    fn suppress_nmi(&mut self, lines: &mut InterruptLines) {
        self.nmi_suppressed = true;
        lines.cancel_nmi();
    }

    // === Register access (CPU side) ===

    /// CPU read from PPU register ($2000-$2007 mirrored).
    pub fn cpu_read(&mut self, reg: u16, lines: &mut InterruptLines, bus: &mut dyn PpuBus) -> u8 {
        match reg & 0x07 {
            // $2002 - PPUSTATUS
            2 => {
                // Reading on the dot vblank is set returns it clear; one or
                // two dots later it reads set but the NMI is lost.
                match self.vblank_age {
                    0 => {
                        self.status &= !STATUS_VBLANK;
                        self.suppress_nmi(lines);
                    }
                    1 | 2 => self.suppress_nmi(lines),
                    _ => {}
                }
                let echo = if self.vblank_echo { STATUS_VBLANK } else { 0 };
                let result = ((self.status | echo) & 0xE0) | (self.latch & 0x1F);
                self.status &= !STATUS_VBLANK;
                self.vblank_echo = false;
                self.w = false;
                lines.release_nmi();
                result
            }
            // $2004 - OAMDATA
            4 => self.oam[self.oam_addr as usize],
            // $2007 - PPUDATA
            7 => {
                let addr = self.v & 0x3FFF;
                let mut result = self.read_buffer;
                self.read_buffer = self.ppu_read(addr, bus);
                // Palette reads are not buffered
                if addr >= 0x3F00 {
                    result = self.palette_ram[mirror_palette_addr(addr) as usize];
                    // Buffer gets the nametable byte "underneath"
                    self.read_buffer = self.ppu_read(addr & 0x2FFF, bus);
                }
                self.advance_data_address(bus);
                result
            }
            _ => self.latch,
        }
    }

    /// CPU write to PPU register ($2000-$2007 mirrored).
    pub fn cpu_write(
        &mut self,
        reg: u16,
        val: u8,
        lines: &mut InterruptLines,
        bus: &mut dyn PpuBus,
    ) {
        self.latch = val;
        match reg & 0x07 {
            // $2000 - PPUCTRL
            0 => {
                self.ctrl = val;
                self.t = (self.t & !0x0C00) | (u16::from(val & 0x03) << 10);
                if val & 0x80 == 0 {
                    self.nmi_pulled = false;
                    self.nmi_suppressed = false;
                    lines.release_nmi();
                    lines.cancel_nmi();
                } else {
                    self.check_nmi(lines);
                }
            }
            // $2001 - PPUMASK
            1 => self.mask = val,
            // $2003 - OAMADDR
            3 => self.oam_addr = val,
            // $2004 - OAMDATA
            4 => {
                self.oam[self.oam_addr as usize] = val;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            // $2005 - PPUSCROLL
            5 => {
                if !self.w {
                    self.t = (self.t & !0x001F) | (u16::from(val) >> 3);
                    self.fine_x = val & 0x07;
                } else {
                    self.t = (self.t & !0x73E0)
                        | (u16::from(val & 0x07) << 12)
                        | (u16::from(val >> 3) << 5);
                }
                self.w = !self.w;
            }
            // $2006 - PPUADDR
            6 => {
                if !self.w {
                    self.t = (self.t & 0x00FF) | (u16::from(val & 0x3F) << 8);
                } else {
                    self.t = (self.t & 0xFF00) | u16::from(val);
                    self.v = self.t;
                    self.drive_address(self.v, bus);
                }
                self.w = !self.w;
            }
            // $2007 - PPUDATA
            7 => {
                let addr = self.v & 0x3FFF;
                self.ppu_write(addr, val, bus);
                self.advance_data_address(bus);
            }
            _ => {}
        }
    }

    // === PPU memory access ===

    fn ppu_read(&self, addr: u16, bus: &mut dyn PpuBus) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => bus.chr_read(addr),
            0x2000..=0x3EFF => {
                self.nametable_ram[mirror_nametable_addr(addr, bus.mirroring()) as usize]
            }
            _ => self.palette_ram[mirror_palette_addr(addr) as usize],
        }
    }

    fn ppu_write(&mut self, addr: u16, val: u8, bus: &mut dyn PpuBus) {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => bus.chr_write(addr, val),
            0x2000..=0x3EFF => {
                let mirrored = mirror_nametable_addr(addr, bus.mirroring());
                self.nametable_ram[mirrored as usize] = val;
            }
            _ => self.palette_ram[mirror_palette_addr(addr) as usize] = val,
        }
    }

    // === Helpers ===

    fn rendering_enabled(&self) -> bool {
        self.mask & 0x18 != 0
    }

    /// Consume the frame-complete flag raised at line 0, dot 0.
    pub fn take_frame(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    /// Frames started since power-on.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Reference to the framebuffer (ARGB32, 256x240).
    #[must_use]
    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer
    }

    #[must_use]
    pub fn timing(&self) -> PpuTiming {
        self.timing
    }

    /// Current scanline.
    #[must_use]
    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    /// Current dot.
    #[must_use]
    pub fn dot(&self) -> u16 {
        self.dot
    }

    #[must_use]
    pub fn in_vblank(&self) -> bool {
        self.status & STATUS_VBLANK != 0
    }
}

impl Observable for Ppu {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "scanline" => Some(self.scanline.into()),
            "dot" => Some(self.dot.into()),
            "frame" => Some(self.frames.into()),
            "odd_frame" => Some(self.frame_odd.into()),
            "ctrl" => Some(self.ctrl.into()),
            "mask" => Some(self.mask.into()),
            "status" => Some(self.status.into()),
            "oam_addr" => Some(self.oam_addr.into()),
            "v" => Some(self.v.into()),
            "t" => Some(self.t.into()),
            "fine_x" => Some(self.fine_x.into()),
            "w" => Some(self.w.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "scanline", "dot", "frame", "odd_frame", "ctrl", "mask", "status", "oam_addr", "v",
            "t", "fine_x", "w",
        ]
    }
}

/// Pattern address of one sprite row (low plane).
fn sprite_row_addr(ctrl: u8, tile: u8, attribs: u8, row: u16) -> u16 {
    let flip_v = attribs & 0x80 != 0;
    if ctrl & 0x20 != 0 {
        // 8x16 sprites: bit 0 of tile = pattern table, bits 1-7 = tile
        let table = u16::from(tile & 1) * 0x1000;
        let row = if flip_v { 15 - row } else { row };
        let tile = u16::from(tile & 0xFE) + u16::from(row >= 8);
        table + tile * 16 + (row & 7)
    } else {
        let table = if ctrl & 0x08 != 0 { 0x1000u16 } else { 0 };
        let row = if flip_v { 7 - row } else { row };
        table + u16::from(tile) * 16 + row
    }
}

fn mirror_nametable_addr(addr: u16, mirroring: Mirroring) -> u16 {
    let nt_addr = (addr - 0x2000) & 0x0FFF;
    match mirroring {
        // Nametables 0,1 → page 0; 2,3 → page 1
        Mirroring::Horizontal => (nt_addr / 0x0800) * 0x0400 + (nt_addr & 0x03FF),
        // Nametables 0,2 → page 0; 1,3 → page 1
        Mirroring::Vertical => nt_addr & 0x07FF,
        // Four-screen boards carry the extra 2K; only the console's 2K is
        // modelled.
        Mirroring::FourScreen => nt_addr & 0x07FF,
        Mirroring::SingleScreenLower => nt_addr & 0x03FF,
        Mirroring::SingleScreenUpper => 0x0400 + (nt_addr & 0x03FF),
    }
}

fn mirror_palette_addr(addr: u16) -> u16 {
    let a = (addr - 0x3F00) & 0x1F;
    // $3F10/$3F14/$3F18/$3F1C mirror $3F00/$3F04/$3F08/$3F0C
    if a & 0x13 == 0x10 { a - 0x10 } else { a }
}
