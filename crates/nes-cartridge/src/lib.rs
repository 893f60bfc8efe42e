//! NES cartridge boards.
//!
//! A board maps CPU `$4020-$FFFF` and PPU `$0000-$1FFF` onto its ROM and
//! RAM, picks the nametable arrangement, and may drive the shared IRQ
//! line. Supports NROM (Mapper 0), MMC3 (Mapper 4), VRC4 (Mappers 21, 23
//! and 25) and VRC3 (Mapper 73).
//!
//! Some IRQ counters run off the CPU clock ([`Mapper::clock_cpu`]), others
//! off PPU address line A12 ([`Mapper::ppu_a12_rise`]). The machine calls
//! both on every board and ORs [`Mapper::irq_pending`] into its IRQ line.

mod mmc3;
mod nrom;
mod vrc3;
mod vrc4;

pub use mmc3::Mmc3;
pub use nrom::Nrom;
pub use ricoh_ppu_2c02::Mirroring;
pub use vrc3::Vrc3;
pub use vrc4::{Vrc4, Vrc4Wiring};

use ricoh_ppu_2c02::PpuBus;
use thiserror::Error;
use tracing::info;

/// Board construction failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartridgeError {
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u16),
    #[error("mapper {mapper} cannot use a PRG ROM of {size} bytes")]
    PrgSize { mapper: u16, size: usize },
    #[error("mapper {mapper} cannot use a CHR ROM of {size} bytes")]
    ChrSize { mapper: u16, size: usize },
}

/// Mapper trait: translates CPU and PPU addresses to cartridge ROM/RAM.
///
/// `chr_read` takes `&mut self` because some boards update internal
/// latches when the PPU reads pattern memory; `cpu_read` does for
/// registers that acknowledge on read.
pub trait Mapper {
    /// `None` leaves the data bus floating (open bus).
    fn cpu_read(&mut self, addr: u16) -> Option<u8>;
    fn cpu_write(&mut self, addr: u16, value: u8);
    fn chr_read(&mut self, addr: u16) -> u8;
    fn chr_write(&mut self, addr: u16, value: u8);
    fn mirroring(&self) -> Mirroring;

    /// Elapsed CPU cycles, for counters clocked by M2.
    fn clock_cpu(&mut self, _cycles: u32) {}

    /// PPU A12 went from low to high.
    fn ppu_a12_rise(&mut self) {}

    /// Whether the board is asserting IRQ. Default: no IRQ.
    fn irq_pending(&self) -> bool {
        false
    }

    /// Board state after the console's reset line is pulsed.
    fn reset(&mut self) {}
}

/// Presents a board to the PPU.
pub struct PpuPort<'a>(pub &'a mut dyn Mapper);

impl PpuBus for PpuPort<'_> {
    fn chr_read(&mut self, addr: u16) -> u8 {
        self.0.chr_read(addr)
    }

    fn chr_write(&mut self, addr: u16, value: u8) {
        self.0.chr_write(addr, value);
    }

    fn mirroring(&self) -> Mirroring {
        self.0.mirroring()
    }

    fn a12_rise(&mut self) {
        self.0.ppu_a12_rise();
    }
}

/// Build the board for an iNES mapper number.
///
/// An empty `chr_rom` gives the board 8K of CHR RAM. `mirroring` is the
/// hardwired arrangement; boards with mirroring control ignore it.
pub fn create_mapper(
    id: u16,
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
    mirroring: Mirroring,
) -> Result<Box<dyn Mapper>, CartridgeError> {
    let prg_size = prg_rom.len();
    let prg_ok = match id {
        0 => prg_size == 0x4000 || prg_size == 0x8000,
        4 | 21 | 23 | 25 => prg_size >= 0x4000 && prg_size % 0x2000 == 0,
        73 => prg_size >= 0x4000 && prg_size % 0x4000 == 0,
        _ => return Err(CartridgeError::UnsupportedMapper(id)),
    };
    if !prg_ok {
        return Err(CartridgeError::PrgSize {
            mapper: id,
            size: prg_size,
        });
    }
    let chr_ok = match id {
        0 | 73 => chr_rom.is_empty() || chr_rom.len() == 0x2000,
        _ => chr_rom.len() % 0x0400 == 0,
    };
    if !chr_ok {
        return Err(CartridgeError::ChrSize {
            mapper: id,
            size: chr_rom.len(),
        });
    }

    info!(mapper = id, prg = prg_size, chr = chr_rom.len(), "cartridge");
    let chr = ChrMemory::new(chr_rom);
    let mapper: Box<dyn Mapper> = match id {
        0 => Box::new(Nrom::new(prg_rom, chr, mirroring)),
        4 => Box::new(Mmc3::new(prg_rom, chr)),
        21 => Box::new(Vrc4::new(prg_rom, chr, Vrc4Wiring::Vrc4ac)),
        23 => Box::new(Vrc4::new(prg_rom, chr, Vrc4Wiring::Vrc4ef)),
        25 => Box::new(Vrc4::new(prg_rom, chr, Vrc4Wiring::Vrc4bd)),
        _ => Box::new(Vrc3::new(prg_rom, chr, mirroring)),
    };
    Ok(mapper)
}

/// Pattern memory: CHR ROM, or 8K of CHR RAM when the board has no ROM.
#[derive(Debug, Clone)]
pub struct ChrMemory {
    data: Vec<u8>,
    is_ram: bool,
}

impl ChrMemory {
    #[must_use]
    pub fn new(rom: Vec<u8>) -> Self {
        if rom.is_empty() {
            Self {
                data: vec![0; 0x2000],
                is_ram: true,
            }
        } else {
            Self {
                data: rom,
                is_ram: false,
            }
        }
    }

    /// Byte `addr & 0x3FF` of 1K bank `bank`, wrapping at the memory size.
    fn read_1k(&self, bank: usize, addr: u16) -> u8 {
        self.data[self.index(bank, addr)]
    }

    fn write_1k(&mut self, bank: usize, addr: u16, value: u8) {
        if self.is_ram {
            let index = self.index(bank, addr);
            self.data[index] = value;
        }
    }

    fn index(&self, bank: usize, addr: u16) -> usize {
        (bank * 0x400 + usize::from(addr & 0x3FF)) % self.data.len()
    }

    /// Unbanked access to `$0000-$1FFF`.
    fn read(&self, addr: u16) -> u8 {
        self.data[usize::from(addr & 0x1FFF) % self.data.len()]
    }

    fn write(&mut self, addr: u16, value: u8) {
        if self.is_ram {
            let index = usize::from(addr & 0x1FFF) % self.data.len();
            self.data[index] = value;
        }
    }
}

/// Read a byte from 8K PRG bank `bank` (wrapping at the ROM size).
fn read_prg_8k(prg_rom: &[u8], bank: usize, addr: u16) -> u8 {
    let count = prg_rom.len() / 0x2000;
    prg_rom[(bank % count) * 0x2000 + usize::from(addr & 0x1FFF)]
}
