use crate::{ChrMemory, Mapper, Mirroring};

/// Konami VRC3 (Mapper 73).
///
/// - PRG: 16K switchable at $8000, last 16K fixed at $C000
/// - PRG RAM: 8K at $6000-$7FFF
/// - CHR: 8K, unbanked
/// - IRQ: 16-bit (or 8-bit) up-counter clocked every CPU cycle
pub struct Vrc3 {
    prg_rom: Vec<u8>,
    chr: ChrMemory,
    prg_ram: Box<[u8; 0x2000]>,
    prg_bank: u8,
    mirroring: Mirroring,
    irq_latch: u16,
    irq_counter: u16,
    /// Bit 0: enable after acknowledge, bit 1: enable, bit 2: 8-bit mode.
    irq_control: u8,
    irq_pending: bool,
}

impl Vrc3 {
    #[must_use]
    pub fn new(prg_rom: Vec<u8>, chr: ChrMemory, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            chr,
            prg_ram: Box::new([0; 0x2000]),
            prg_bank: 0,
            mirroring,
            irq_latch: 0,
            irq_counter: 0,
            irq_control: 0,
            irq_pending: false,
        }
    }

    fn set_latch_nibble(&mut self, nibble: u16, value: u8) {
        let shift = nibble * 4;
        self.irq_latch = (self.irq_latch & !(0xF << shift)) | (u16::from(value & 0x0F) << shift);
    }

    fn clock_irq(&mut self) {
        if self.irq_control & 0x02 == 0 {
            return;
        }
        if self.irq_control & 0x04 == 0 {
            if self.irq_counter == 0xFFFF {
                self.irq_pending = true;
                self.irq_counter = self.irq_latch;
            } else {
                self.irq_counter += 1;
            }
        } else {
            // 8-bit mode: only the low byte counts; the high byte holds.
            let low = self.irq_counter as u8;
            let high = self.irq_counter & 0xFF00;
            if low == 0xFF {
                self.irq_pending = true;
                self.irq_counter = high | (self.irq_latch & 0x00FF);
            } else {
                self.irq_counter = high | u16::from(low + 1);
            }
        }
    }
}

impl Mapper for Vrc3 {
    fn cpu_read(&mut self, addr: u16) -> Option<u8> {
        let offset = usize::from(addr & 0x3FFF);
        match addr {
            0x6000..=0x7FFF => Some(self.prg_ram[usize::from(addr - 0x6000)]),
            0x8000..=0xBFFF => {
                let count = self.prg_rom.len() / 0x4000;
                let bank = usize::from(self.prg_bank) % count;
                Some(self.prg_rom[bank * 0x4000 + offset])
            }
            0xC000..=0xFFFF => Some(self.prg_rom[self.prg_rom.len() - 0x4000 + offset]),
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        match addr & 0xF000 {
            0x6000 | 0x7000 => self.prg_ram[usize::from(addr - 0x6000)] = value,
            0x8000 => self.set_latch_nibble(0, value),
            0x9000 => self.set_latch_nibble(1, value),
            0xA000 => self.set_latch_nibble(2, value),
            0xB000 => self.set_latch_nibble(3, value),
            0xC000 => {
                self.irq_control = value & 0x07;
                if self.irq_control & 0x02 != 0 {
                    self.irq_counter = self.irq_latch;
                }
                self.irq_pending = false;
            }
            0xD000 => {
                self.irq_pending = false;
                let c = self.irq_control;
                self.irq_control = (c & 0x04) | ((c & 0x01) << 1) | (c & 0x01);
            }
            0xF000 => self.prg_bank = value & 0x07,
            _ => {}
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

    fn clock_cpu(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.clock_irq();
        }
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn reset(&mut self) {
        self.irq_control = 0;
        self.irq_pending = false;
    }
}
