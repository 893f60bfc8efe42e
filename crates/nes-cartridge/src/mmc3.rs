use crate::{ChrMemory, Mapper, Mirroring, read_prg_8k};

/// MMC3 (Mapper 4, TxROM): fine-grained banking and scanline counter.
///
/// - PRG: 4 x 8K windows with two switchable modes
/// - CHR: 8 x 1K windows (mixed 2K/1K granularity) with two modes
/// - PRG RAM: 8K at $6000-$7FFF with write protection
/// - Mirroring: dynamically switchable H/V
/// - Scanline counter: clocked by PPU A12 rising edges
pub struct Mmc3 {
    prg_rom: Vec<u8>,
    chr: ChrMemory,
    prg_ram: Box<[u8; 0x2000]>,
    /// Bank select register ($8000): bits 0-2 = target register,
    /// bit 6 = PRG mode, bit 7 = CHR mode.
    bank_select: u8,
    /// R0-R7 bank registers, written via $8001.
    registers: [u8; 8],
    mirroring: Mirroring,
    prg_ram_enable: bool,
    prg_ram_write_protect: bool,
    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq_pending: bool,
}

impl Mmc3 {
    #[must_use]
    pub fn new(prg_rom: Vec<u8>, chr: ChrMemory) -> Self {
        Self {
            prg_rom,
            chr,
            prg_ram: Box::new([0; 0x2000]),
            bank_select: 0,
            registers: [0; 8],
            mirroring: Mirroring::Vertical,
            prg_ram_enable: true,
            prg_ram_write_protect: false,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq_pending: false,
        }
    }

    fn prg_8k_count(&self) -> usize {
        self.prg_rom.len() / 0x2000
    }

    /// 8K bank mapped at CPU `$8000-$FFFF`.
    fn prg_bank(&self, addr: u16) -> usize {
        let swap = self.bank_select & 0x40 != 0;
        let r6 = usize::from(self.registers[6] & 0x3F);
        let second_last = self.prg_8k_count() - 2;
        match (addr >> 13) & 3 {
            0 if swap => second_last,
            0 => r6,
            1 => usize::from(self.registers[7] & 0x3F),
            2 if swap => r6,
            2 => second_last,
            _ => self.prg_8k_count() - 1,
        }
    }

    /// 1K bank mapped at PPU `addr`.
    ///
    /// Mode 0: 2K,2K,1K,1K,1K,1K. Mode 1 swaps the two halves.
    fn chr_bank(&self, addr: u16) -> usize {
        let mut window = (addr >> 10) & 7;
        if self.bank_select & 0x80 != 0 {
            window ^= 4;
        }
        let r = &self.registers;
        usize::from(match window {
            0 => r[0] & 0xFE,
            1 => r[0] | 1,
            2 => r[1] & 0xFE,
            3 => r[1] | 1,
            n => r[usize::from(n) - 2],
        })
    }

    fn clock_irq_counter(&mut self) {
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_pending = true;
        }
    }
}

impl Mapper for Mmc3 {
    fn cpu_read(&mut self, addr: u16) -> Option<u8> {
        match addr {
            0x6000..=0x7FFF if self.prg_ram_enable => {
                Some(self.prg_ram[usize::from(addr - 0x6000)])
            }
            0x8000..=0xFFFF => Some(read_prg_8k(&self.prg_rom, self.prg_bank(addr), addr)),
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        let even = addr & 1 == 0;
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enable && !self.prg_ram_write_protect {
                    self.prg_ram[usize::from(addr - 0x6000)] = value;
                }
            }
            0x8000..=0x9FFF if even => self.bank_select = value,
            0x8000..=0x9FFF => {
                let reg = usize::from(self.bank_select & 0x07);
                self.registers[reg] = value;
            }
            0xA000..=0xBFFF if even => {
                self.mirroring = if value & 1 == 0 {
                    Mirroring::Vertical
                } else {
                    Mirroring::Horizontal
                };
            }
            0xA000..=0xBFFF => {
                self.prg_ram_write_protect = value & 0x40 != 0;
                self.prg_ram_enable = value & 0x80 != 0;
            }
            0xC000..=0xDFFF if even => self.irq_latch = value,
            0xC000..=0xDFFF => {
                self.irq_counter = 0;
                self.irq_reload = true;
            }
            0xE000..=0xFFFF if even => {
                self.irq_enabled = false;
                self.irq_pending = false;
            }
            0xE000..=0xFFFF => self.irq_enabled = true,
            _ => {}
        }
    }

    fn chr_read(&mut self, addr: u16) -> u8 {
        self.chr.read_1k(self.chr_bank(addr), addr)
    }

    fn chr_write(&mut self, addr: u16, value: u8) {
        let bank = self.chr_bank(addr);
        self.chr.write_1k(bank, addr, value);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn ppu_a12_rise(&mut self) {
        self.clock_irq_counter();
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn reset(&mut self) {
        self.irq_enabled = false;
        self.irq_pending = false;
    }
}
