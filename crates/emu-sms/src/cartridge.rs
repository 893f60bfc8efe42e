//! Cartridge slot and its bank-switching hardware.
//!
//! The Z80 sees three 16K slots at `$0000`, `$4000` and `$8000`. Which ROM
//! bank each slot shows depends on the board:
//!
//! - **Sega** (315-5208/5235): frame registers written through the top of
//!   RAM at `$FFFD-$FFFF`, `$FFFC` maps 16K of cartridge RAM into slot 2.
//!   The first 1K of slot 0 always shows bank 0 so the interrupt vectors
//!   survive switching.
//! - **Codemasters**: a frame register at the first byte of each slot.
//! - **Generic**: 48K or less, no registers.

use thiserror::Error;
use tracing::{debug, trace};

const BANK_SIZE: usize = 0x4000;
const CART_RAM_SIZE: usize = 0x8000;
/// First address past the slot area.
const SLOT_END: u16 = 0xC000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartridgeError {
    #[error("ROM image is empty")]
    Empty,
    #[error("ROM size {size} is not a whole number of 16K banks")]
    Misaligned { size: usize },
}

/// Bank-switching scheme of the cartridge board.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SlotMapper {
    #[default]
    Sega,
    Codemasters,
    Generic,
}

impl SlotMapper {
    /// Images larger than the three slots need banking; assume Sega.
    #[must_use]
    pub fn detect(rom_size: usize) -> Self {
        if rom_size > BANK_SIZE * 3 {
            Self::Sega
        } else {
            Self::Generic
        }
    }
}

pub struct Cartridge {
    rom: Vec<u8>,
    banks: usize,
    mapper: SlotMapper,
    /// Bank number per slot.
    frames: [u8; 3],
    /// Sega `$FFFC`: bit 3 maps RAM into slot 2, bit 2 picks its half.
    ram_control: u8,
    ram: Box<[u8; CART_RAM_SIZE]>,
}

impl Cartridge {
    pub fn new(rom: Vec<u8>, mapper: SlotMapper) -> Result<Self, CartridgeError> {
        if rom.is_empty() {
            return Err(CartridgeError::Empty);
        }
        if rom.len() % BANK_SIZE != 0 {
            return Err(CartridgeError::Misaligned { size: rom.len() });
        }
        let banks = rom.len() / BANK_SIZE;
        debug!(?mapper, banks, "SMS cartridge");
        let mut cartridge = Self {
            rom,
            banks,
            mapper,
            frames: [0; 3],
            ram_control: 0,
            ram: Box::new([0; CART_RAM_SIZE]),
        };
        cartridge.reset();
        Ok(cartridge)
    }

    /// Power-on bank layout.
    pub fn reset(&mut self) {
        self.frames = match self.mapper {
            SlotMapper::Codemasters => [0, 1, 0],
            SlotMapper::Sega | SlotMapper::Generic => [0, 1, 2],
        };
        self.ram_control = 0;
    }

    #[must_use]
    pub fn mapper(&self) -> SlotMapper {
        self.mapper
    }

    /// Read from the slot area, `$0000-$BFFF`. Addresses above it are not
    /// driven by the cartridge and read as `$FF`.
    #[must_use]
    pub fn read(&self, addr: u16) -> u8 {
        if addr >= SLOT_END {
            return 0xFF;
        }
        let slot = usize::from(addr >> 14);
        let offset = usize::from(addr) & (BANK_SIZE - 1);
        if self.mapper == SlotMapper::Sega {
            if addr < 0x0400 {
                return self.rom[usize::from(addr)];
            }
            if slot == 2 && self.ram_control & 0x08 != 0 {
                return self.ram[self.ram_offset(offset)];
            }
        }
        self.rom[self.bank(slot) * BANK_SIZE + offset]
    }

    /// Write to the slot area, `$0000-$BFFF`. Writes above it are ignored.
    pub fn write(&mut self, addr: u16, value: u8) {
        if addr >= SLOT_END {
            return;
        }
        match self.mapper {
            SlotMapper::Codemasters if addr & 0x3FFF == 0 => {
                let slot = usize::from(addr >> 14);
                trace!(slot, bank = value, "Codemasters frame");
                self.frames[slot] = value;
            }
            SlotMapper::Sega if addr >= 0x8000 && self.ram_control & 0x08 != 0 => {
                let offset = self.ram_offset(usize::from(addr) & (BANK_SIZE - 1));
                self.ram[offset] = value;
            }
            _ => {}
        }
    }

    /// Sega frame control, written at `$FFFC-$FFFF` alongside RAM.
    pub fn write_control(&mut self, addr: u16, value: u8) {
        if self.mapper != SlotMapper::Sega {
            return;
        }
        match addr {
            0xFFFC => {
                if value & 0x08 != self.ram_control & 0x08 {
                    debug!(enabled = value & 0x08 != 0, "cartridge RAM");
                }
                self.ram_control = value;
            }
            0xFFFD..=0xFFFF => {
                let slot = usize::from(addr - 0xFFFD);
                trace!(slot, bank = value, "Sega frame");
                self.frames[slot] = value;
            }
            _ => {}
        }
    }

    /// Bank shown in `slot`. Frame values wrap at the image size.
    fn bank(&self, slot: usize) -> usize {
        usize::from(self.frames[slot]) % self.banks
    }

    fn ram_offset(&self, offset: usize) -> usize {
        (usize::from(self.ram_control & 0x04) << 12) | offset
    }
}
