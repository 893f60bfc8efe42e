//! Ricoh 2C02 picture processing unit.
//!
//! A timing model of the NES PPU: the dot/scanline clock, the vblank flag
//! and its NMI output, the CPU-visible registers, and the pattern-table
//! fetches whose address line A12 clocks scanline-counting mappers. Pixels
//! are not composed; each visible dot writes the backdrop colour.
//!
//! # Registers ($2000-$2007, mirrored every 8 bytes)
//!
//! | Reg   | Name      | Description                                   |
//! |-------|-----------|-----------------------------------------------|
//! | $2000 | PPUCTRL   | NMI enable, sprite size, pattern tables, increment |
//! | $2001 | PPUMASK   | Rendering enables, greyscale, emphasis        |
//! | $2002 | PPUSTATUS | Vblank, sprite 0, overflow (read clears vblank) |
//! | $2003 | OAMADDR   | OAM address                                   |
//! | $2004 | OAMDATA   | OAM data (write increments address)           |
//! | $2005 | PPUSCROLL | Scroll, two writes                            |
//! | $2006 | PPUADDR   | VRAM address, two writes                      |
//! | $2007 | PPUDATA   | VRAM data, buffered reads                     |

mod palette;
mod ppu;

pub use palette::PALETTE;
pub use ppu::{FB_HEIGHT, FB_WIDTH, Ppu, PpuTiming};

/// Nametable arrangement selected by the cartridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
    SingleScreenLower,
    SingleScreenUpper,
}

/// The cartridge side of the PPU address bus.
///
/// `$0000-$1FFF` is pattern memory on the cartridge; nametable RAM lives
/// in the console but its arrangement comes from the cartridge.
pub trait PpuBus {
    fn chr_read(&mut self, addr: u16) -> u8;

    fn chr_write(&mut self, addr: u16, value: u8);

    fn mirroring(&self) -> Mirroring;

    /// PPU address line A12 went from low to high.
    fn a12_rise(&mut self) {}
}
