//! Famicom Disk System RAM adapter.
//!
//! Takes the cartridge slot: 32K of program RAM at $6000-$DFFF, the 8K
//! BIOS at $E000-$FFFF, 8K of CHR RAM, and a 16-bit CPU-cycle timer that
//! raises IRQ. The drive itself reports an empty slot.
//!
//! | Addr  | Use                                                     |
//! |-------|---------------------------------------------------------|
//! | $4020 | Timer reload, low byte                                  |
//! | $4021 | Timer reload, high byte                                 |
//! | $4022 | Bit 0: repeat, bit 1: enable (needs $4023 bit 0)        |
//! | $4023 | Bit 0: disk I/O enable, bit 1: sound I/O enable         |
//! | $4025 | Bit 3: horizontal mirroring; drive control bits         |
//! | $4026 | External connector output                               |
//! | $4030 | Status: bit 0 timer IRQ, bit 1 transfer; read acknowledges |
//! | $4032 | Drive status                                            |
//! | $4033 | External connector input                                |

use nes_cartridge::{Mapper, Mirroring};
use tracing::trace;

/// Drive status with no disk: not inserted, not ready.
const DRIVE_EMPTY: u8 = 0x03;

pub struct Fds {
    bios: Vec<u8>,
    ram: Box<[u8; 0x8000]>,
    chr_ram: Box<[u8; 0x2000]>,
    /// Sound channel registers $4040-$4092, latched but not synthesized.
    sound_regs: Box<[u8; 0x53]>,
    timer_reload: u16,
    timer_counter: u16,
    timer_repeat: bool,
    timer_enabled: bool,
    timer_irq: bool,
    disk_io_enabled: bool,
    sound_io_enabled: bool,
    /// Last $4025 write.
    control: u8,
    ext_output: u8,
    transfer_flag: bool,
}

impl Fds {
    /// Adapter running `bios` (8K, repeated to fill $E000-$FFFF if shorter).
    #[must_use]
    pub fn new(bios: Vec<u8>) -> Self {
        let bios = if bios.is_empty() { vec![0; 0x2000] } else { bios };
        Self {
            bios,
            ram: Box::new([0; 0x8000]),
            chr_ram: Box::new([0; 0x2000]),
            sound_regs: Box::new([0; 0x53]),
            timer_reload: 0,
            timer_counter: 0,
            timer_repeat: false,
            timer_enabled: false,
            timer_irq: false,
            disk_io_enabled: false,
            sound_io_enabled: false,
            control: 0,
            ext_output: 0,
            transfer_flag: false,
        }
    }

    fn read_status(&mut self) -> u8 {
        let value = (u8::from(self.disk_io_enabled) << 7)
            | (u8::from(self.transfer_flag) << 1)
            | u8::from(self.timer_irq);
        self.timer_irq = false;
        self.transfer_flag = false;
        value
    }

    fn clock_timer(&mut self) {
        if !self.timer_enabled {
            return;
        }
        if self.timer_counter == 0 {
            trace!("disk timer IRQ");
            self.timer_irq = true;
            self.timer_counter = self.timer_reload;
            if !self.timer_repeat {
                self.timer_enabled = false;
            }
        } else {
            self.timer_counter -= 1;
        }
    }
}

impl Mapper for Fds {
    fn cpu_read(&mut self, addr: u16) -> Option<u8> {
        match addr {
            0x4030 => Some(self.read_status()),
            0x4031 => {
                self.transfer_flag = false;
                Some(0)
            }
            0x4032 => Some(DRIVE_EMPTY),
            0x4033 => Some(0x80 | (self.ext_output & 0x7F)),
            0x4040..=0x407F if self.sound_io_enabled => {
                Some(self.sound_regs[usize::from(addr - 0x4040)] & 0x3F)
            }
            0x6000..=0xDFFF => Some(self.ram[usize::from(addr - 0x6000)]),
            0xE000..=0xFFFF => {
                let offset = usize::from(addr - 0xE000) % self.bios.len();
                Some(self.bios[offset])
            }
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        match addr {
            0x4020 => self.timer_reload = (self.timer_reload & 0xFF00) | u16::from(value),
            0x4021 => self.timer_reload = (self.timer_reload & 0x00FF) | (u16::from(value) << 8),
            0x4022 => {
                self.timer_enabled = self.disk_io_enabled && value & 0x02 != 0;
                self.timer_repeat = value & 0x01 != 0;
                if self.timer_enabled {
                    self.timer_counter = self.timer_reload;
                } else {
                    self.timer_irq = false;
                }
            }
            0x4023 => {
                self.disk_io_enabled = value & 0x01 != 0;
                self.sound_io_enabled = value & 0x02 != 0;
                if !self.disk_io_enabled {
                    self.timer_enabled = false;
                    self.timer_irq = false;
                }
            }
            0x4024 => self.transfer_flag = false,
            0x4025 => self.control = value,
            0x4026 => self.ext_output = value & 0x7F,
            0x4040..=0x4092 if self.sound_io_enabled => {
                self.sound_regs[usize::from(addr - 0x4040)] = value;
            }
            0x6000..=0xDFFF => self.ram[usize::from(addr - 0x6000)] = value,
            _ => {}
        }
    }

    fn chr_read(&mut self, addr: u16) -> u8 {
        self.chr_ram[usize::from(addr & 0x1FFF)]
    }

    fn chr_write(&mut self, addr: u16, value: u8) {
        self.chr_ram[usize::from(addr & 0x1FFF)] = value;
    }

    fn mirroring(&self) -> Mirroring {
        if self.control & 0x08 != 0 {
            Mirroring::Horizontal
        } else {
            Mirroring::Vertical
        }
    }

    fn clock_cpu(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.clock_timer();
        }
    }

    fn irq_pending(&self) -> bool {
        self.timer_irq
    }

    fn reset(&mut self) {
        self.timer_enabled = false;
        self.timer_irq = false;
        self.disk_io_enabled = false;
    }
}
