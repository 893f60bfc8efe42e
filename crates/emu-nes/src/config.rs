//! NES configuration.

use emu_core::MasterClock;
use nes_cartridge::Mirroring;
use ricoh_apu_2a03::ApuTiming;
use ricoh_ppu_2c02::PpuTiming;

/// Video region. Determines frame timing and APU rates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum NesRegion {
    /// NTSC: 60 Hz, 262 scanlines, 1,789,773 Hz CPU.
    #[default]
    Ntsc,
    /// PAL: 50 Hz, 312 scanlines, 1,662,607 Hz CPU.
    Pal,
}

impl NesRegion {
    /// Master crystal.
    #[must_use]
    pub const fn master_clock(self) -> MasterClock {
        match self {
            Self::Ntsc => MasterClock::new(21_477_272),
            Self::Pal => MasterClock::new(26_601_713),
        }
    }

    /// Crystal ticks per CPU cycle.
    #[must_use]
    pub const fn cpu_divider(self) -> u32 {
        match self {
            Self::Ntsc => 12,
            Self::Pal => 16,
        }
    }

    /// Crystal ticks per PPU dot.
    #[must_use]
    pub const fn ppu_divider(self) -> u32 {
        match self {
            Self::Ntsc => 4,
            Self::Pal => 5,
        }
    }

    /// Total scanlines per frame (including pre-render and VBlank).
    #[must_use]
    pub const fn scanlines_per_frame(self) -> u16 {
        self.ppu_timing().scanlines
    }

    /// CPU frequency in Hz.
    #[must_use]
    pub const fn cpu_hz(self) -> u64 {
        self.master_clock().divided(self.cpu_divider() as u64)
    }

    #[must_use]
    pub const fn ppu_timing(self) -> PpuTiming {
        match self {
            Self::Ntsc => PpuTiming::NTSC,
            Self::Pal => PpuTiming::PAL,
        }
    }

    #[must_use]
    pub const fn apu_timing(self) -> ApuTiming {
        match self {
            Self::Ntsc => ApuTiming::NTSC,
            Self::Pal => ApuTiming::PAL,
        }
    }

    /// Frames per second with rendering off (no skipped dot).
    #[must_use]
    pub fn frame_rate(self) -> f64 {
        let dots = u64::from(self.ppu_timing().dots_per_frame());
        self.master_clock()
            .frame_rate(dots * u64::from(self.ppu_divider()))
    }
}

/// NES configuration.
#[derive(Debug, Clone)]
pub struct NesConfig {
    /// Video region (NTSC or PAL). Defaults to NTSC.
    pub region: NesRegion,
    /// PRG ROM image, or the 8K BIOS when `disk_system` is set.
    pub prg_rom: Vec<u8>,
    /// CHR ROM image. Empty gives the board 8K of CHR RAM.
    pub chr_rom: Vec<u8>,
    /// Hardwired nametable arrangement, for boards without mirroring control.
    pub mirroring: Mirroring,
    /// iNES mapper number. Ignored for the disk system.
    pub mapper: u16,
    /// Famicom Disk System: RAM adapter and timer IRQ in place of a cartridge.
    pub disk_system: bool,
}

impl Default for NesConfig {
    fn default() -> Self {
        Self {
            region: NesRegion::Ntsc,
            prg_rom: Vec::new(),
            chr_rom: Vec::new(),
            mirroring: Mirroring::Horizontal,
            mapper: 0,
            disk_system: false,
        }
    }
}
