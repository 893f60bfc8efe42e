use crate::{ChrMemory, Mapper, Mirroring, read_prg_8k};

/// How a VRC4 board connects CPU address lines to the chip's two
/// register-select pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vrc4Wiring {
    /// Mapper 21: select 0 on A1 or A6, select 1 on A2 or A7.
    Vrc4ac,
    /// Mapper 23: select 0 on A0 or A2, select 1 on A1 or A3.
    Vrc4ef,
    /// Mapper 25: select 0 on A1 or A3, select 1 on A0 or A2.
    Vrc4bd,
}

impl Vrc4Wiring {
    /// Register index 0-3 within a `$x000` group.
    fn select(self, addr: u16) -> u8 {
        let line = |n: u16| u8::from(addr & (1 << n) != 0);
        let (s0, s1) = match self {
            Self::Vrc4ac => (line(1) | line(6), line(2) | line(7)),
            Self::Vrc4ef => (line(0) | line(2), line(1) | line(3)),
            Self::Vrc4bd => (line(1) | line(3), line(0) | line(2)),
        };
        s0 | (s1 << 1)
    }
}

/// Prescaler periods in CPU cycles; they average to one scanline (341/3).
const PRESCALER_PERIODS: [u8; 3] = [114, 114, 113];

/// Konami VRC4 (Mappers 21, 23, 25).
///
/// - PRG: two switchable 8K banks, swappable between $8000 and $C000;
///   $E000 is fixed to the last bank
/// - CHR: 8 x 1K banks, each set by a low/high nibble register pair
/// - PRG RAM: 8K at $6000-$7FFF
/// - IRQ: 8-bit up-counter clocked per scanline (prescaled) or per CPU cycle
pub struct Vrc4 {
    prg_rom: Vec<u8>,
    chr: ChrMemory,
    prg_ram: Box<[u8; 0x2000]>,
    wiring: Vrc4Wiring,
    prg_select: [u8; 2],
    prg_swap: bool,
    chr_banks: [u16; 8],
    mirroring: Mirroring,
    irq_latch: u8,
    irq_counter: u8,
    /// Bit 0: enable after acknowledge, bit 1: enable, bit 2: cycle mode.
    irq_control: u8,
    prescaler: u8,
    prescaler_step: usize,
    irq_pending: bool,
}

impl Vrc4 {
    #[must_use]
    pub fn new(prg_rom: Vec<u8>, chr: ChrMemory, wiring: Vrc4Wiring) -> Self {
        Self {
            prg_rom,
            chr,
            prg_ram: Box::new([0; 0x2000]),
            wiring,
            prg_select: [0, 0],
            prg_swap: false,
            chr_banks: [0; 8],
            mirroring: Mirroring::Vertical,
            irq_latch: 0,
            irq_counter: 0,
            irq_control: 0,
            prescaler: PRESCALER_PERIODS[0],
            prescaler_step: 0,
            irq_pending: false,
        }
    }

    fn prg_bank(&self, addr: u16) -> usize {
        let last = self.prg_rom.len() / 0x2000 - 1;
        let select0 = usize::from(self.prg_select[0] & 0x1F);
        match (addr >> 13) & 3 {
            0 if self.prg_swap => last - 1,
            0 => select0,
            1 => usize::from(self.prg_select[1] & 0x1F),
            2 if self.prg_swap => select0,
            2 => last - 1,
            _ => last,
        }
    }

    fn write_chr_select(&mut self, addr: u16, reg: u8, value: u8) {
        // $B000 holds banks 0-1, $C000 banks 2-3, and so on.
        let bank = usize::from((addr >> 12) - 0xB) * 2 + usize::from(reg >> 1);
        let current = self.chr_banks[bank];
        self.chr_banks[bank] = if reg & 1 == 0 {
            (current & 0x1F0) | u16::from(value & 0x0F)
        } else {
            (current & 0x00F) | (u16::from(value & 0x1F) << 4)
        };
    }

    fn write_irq(&mut self, reg: u8, value: u8) {
        match reg {
            0 => self.irq_latch = (self.irq_latch & 0xF0) | (value & 0x0F),
            1 => self.irq_latch = (self.irq_latch & 0x0F) | (value << 4),
            2 => {
                self.irq_control = value & 0x07;
                if self.irq_control & 0x02 != 0 {
                    self.irq_counter = self.irq_latch;
                    self.prescaler = PRESCALER_PERIODS[0];
                    self.prescaler_step = 0;
                }
                self.irq_pending = false;
            }
            _ => {
                self.irq_pending = false;
                let c = self.irq_control;
                self.irq_control = (c & 0x04) | ((c & 0x01) << 1) | (c & 0x01);
            }
        }
    }

    fn clock_counter(&mut self) {
        if self.irq_counter == 0xFF {
            self.irq_pending = true;
            self.irq_counter = self.irq_latch;
        } else {
            self.irq_counter += 1;
        }
    }

    fn clock_irq(&mut self) {
        if self.irq_control & 0x02 == 0 {
            return;
        }
        if self.irq_control & 0x04 != 0 {
            self.clock_counter();
            return;
        }
        self.prescaler -= 1;
        if self.prescaler == 0 {
            self.prescaler = PRESCALER_PERIODS[self.prescaler_step];
            self.prescaler_step = (self.prescaler_step + 1) % PRESCALER_PERIODS.len();
            self.clock_counter();
        }
    }
}

impl Mapper for Vrc4 {
    fn cpu_read(&mut self, addr: u16) -> Option<u8> {
        match addr {
            0x6000..=0x7FFF => Some(self.prg_ram[usize::from(addr - 0x6000)]),
            0x8000..=0xFFFF => Some(read_prg_8k(&self.prg_rom, self.prg_bank(addr), addr)),
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        if let 0x6000..=0x7FFF = addr {
            self.prg_ram[usize::from(addr - 0x6000)] = value;
            return;
        }
        let reg = self.wiring.select(addr);
        match addr & 0xF000 {
            0x8000 => self.prg_select[0] = value,
            0x9000 if reg < 2 => {
                self.mirroring = match value & 3 {
                    0 => Mirroring::Vertical,
                    1 => Mirroring::Horizontal,
                    2 => Mirroring::SingleScreenLower,
                    _ => Mirroring::SingleScreenUpper,
                };
            }
            0x9000 => self.prg_swap = value & 0x02 != 0,
            0xA000 => self.prg_select[1] = value,
            0xB000..=0xE000 => self.write_chr_select(addr, reg, value),
            0xF000 => self.write_irq(reg, value),
            _ => {}
        }
    }

    fn chr_read(&mut self, addr: u16) -> u8 {
        let bank = self.chr_banks[usize::from((addr >> 10) & 7)];
        self.chr.read_1k(usize::from(bank), addr)
    }

    fn chr_write(&mut self, addr: u16, value: u8) {
        let bank = self.chr_banks[usize::from((addr >> 10) & 7)];
        self.chr.write_1k(usize::from(bank), addr, value);
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
