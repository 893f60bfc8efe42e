//! Master System configuration.

use emu_core::MasterClock;
use sega_vdp::VdpTiming;

use crate::cartridge::SlotMapper;

/// Console model. Decides video timing, and whether the FM unit's ports
/// exist.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SmsRegion {
    /// North American / export console, 60 Hz.
    #[default]
    Ntsc,
    /// European console, 50 Hz.
    Pal,
    /// Japanese Mark III / SMS with the YM2413 FM unit.
    Japan,
}

impl SmsRegion {
    #[must_use]
    pub const fn master_clock(self) -> MasterClock {
        match self {
            Self::Ntsc | Self::Japan => MasterClock::new(53_693_175),
            Self::Pal => MasterClock::new(53_203_424),
        }
    }

    /// Crystal ticks per Z80 cycle.
    #[must_use]
    pub const fn cpu_divider(self) -> u32 {
        15
    }

    /// Crystal ticks per VDP unit.
    #[must_use]
    pub const fn vdp_divider(self) -> u32 {
        5
    }

    /// Z80 cycles per PSG tick.
    #[must_use]
    pub const fn psg_divider(self) -> u32 {
        16
    }

    /// Z80 cycles per FM tick.
    #[must_use]
    pub const fn fm_divider(self) -> u32 {
        72
    }

    #[must_use]
    pub const fn cpu_hz(self) -> u64 {
        self.master_clock().divided(self.cpu_divider() as u64)
    }

    #[must_use]
    pub const fn vdp_timing(self) -> VdpTiming {
        match self {
            Self::Ntsc | Self::Japan => VdpTiming::NTSC,
            Self::Pal => VdpTiming::PAL,
        }
    }

    /// Japanese machines shipped (or could be fitted) with FM sound.
    #[must_use]
    pub const fn has_fm(self) -> bool {
        matches!(self, Self::Japan)
    }

    /// Japanese consoles read their own TH/TR outputs back inverted.
    #[must_use]
    pub const fn inverts_io_outputs(self) -> bool {
        matches!(self, Self::Japan)
    }

    #[must_use]
    pub fn frame_rate(self) -> f64 {
        let units = u64::from(self.vdp_timing().lines) * 684;
        self.master_clock()
            .frame_rate(units * u64::from(self.vdp_divider()))
    }
}

/// Machine configuration.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub region: SmsRegion,
    /// Cartridge ROM image.
    pub rom: Vec<u8>,
    pub slot_mapper: SlotMapper,
    /// FM unit fitted: ports `$F0-$F2` respond.
    pub fm_sound: bool,
}

impl SmsConfig {
    /// Configuration for `rom` on a `region` console, with the mapper
    /// guessed from the image size and FM fitted on Japanese machines.
    #[must_use]
    pub fn new(region: SmsRegion, rom: Vec<u8>) -> Self {
        Self {
            region,
            slot_mapper: SlotMapper::detect(rom.len()),
            rom,
            fm_sound: region.has_fm(),
        }
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self::new(SmsRegion::default(), Vec::new())
    }
}
