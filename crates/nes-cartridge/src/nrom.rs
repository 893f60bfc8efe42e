use crate::{ChrMemory, Mapper, Mirroring};

/// NROM (Mapper 0): no bank switching.
///
/// - PRG: 16K mirrored at $8000-$FFFF, or 32K at $8000-$FFFF
/// - PRG RAM: 8K at $6000-$7FFF (Family Basic boards)
/// - CHR: 8K at PPU $0000-$1FFF, RAM when the cartridge has no CHR ROM
pub struct Nrom {
    prg_rom: Vec<u8>,
    prg_ram: Box<[u8; 0x2000]>,
    chr: ChrMemory,
    mirroring: Mirroring,
}

impl Nrom {
    #[must_use]
    pub fn new(prg_rom: Vec<u8>, chr: ChrMemory, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            prg_ram: Box::new([0; 0x2000]),
            chr,
            mirroring,
        }
    }
}

impl Mapper for Nrom {
    fn cpu_read(&mut self, addr: u16) -> Option<u8> {
        match addr {
            0x6000..=0x7FFF => Some(self.prg_ram[usize::from(addr - 0x6000)]),
            0x8000..=0xFFFF => {
                let offset = usize::from(addr - 0x8000) % self.prg_rom.len();
                Some(self.prg_rom[offset])
            }
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        if let 0x6000..=0x7FFF = addr {
            self.prg_ram[usize::from(addr - 0x6000)] = value;
        }
    }

    fn chr_read(&mut self, addr: u16) -> u8 {
        self.chr.read(addr)
    }

    fn chr_write(&mut self, addr: u16, value: u8) {
        self.chr.write(addr, value);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
