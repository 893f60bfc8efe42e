//! Unit-clocked VDP core.

use emu_core::{Observable, Value};
use tracing::{debug, trace};

use crate::timing::{SHORT_ACTIVE, TALL_ACTIVE, VdpTiming};

/// Framebuffer width; the height follows the active display mode.
pub const FB_WIDTH: usize = 256;

const VRAM_SIZE: usize = 0x4000;
const CRAM_SIZE: usize = 0x20;

/// First and one-past-last unit of a line.
const LINE_START: i16 = -94;
const LINE_END: i16 = 590;
/// V counter advances here.
const V_INCREMENT_UNIT: i16 = -48;
/// Frame interrupt flag is raised here on the first line below the display.
const FRAME_INT_UNIT: i16 = -52;
/// Line counter decrements or reloads here.
const LINE_COUNTER_UNIT: i16 = -51;

const STATUS_INT: u8 = 0x80;

/// Register file after power-on; the line reload starts at $FF.
const POWER_REGISTERS: [u8; 11] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xFF];

/// What the data port talks to, set by the top two bits of a control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Code {
    VramRead,
    VramWrite,
    Register,
    CramWrite,
}

impl Code {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::VramRead,
            1 => Self::VramWrite,
            2 => Self::Register,
            _ => Self::CramWrite,
        }
    }
}

/// Mode 4 VDP.
pub struct Vdp {
    timing: VdpTiming,

    vram: Box<[u8; VRAM_SIZE]>,
    cram: [u8; CRAM_SIZE],
    registers: [u8; 11],

    // Port state
    address: u16,
    code: Code,
    /// First control byte waiting for its partner.
    control_latch: Option<u8>,
    read_buffer: u8,
    status: u8,

    // Counters
    unit: i16,
    line: u16,
    line_counter: u8,
    line_int: bool,
    h_latch: u8,
    active_lines: u16,

    framebuffer: Vec<u32>,
    frame_ready: bool,
    frames: u64,
}

impl Vdp {
    #[must_use]
    pub fn new(timing: VdpTiming) -> Self {
        Self {
            timing,
            vram: Box::new([0; VRAM_SIZE]),
            cram: [0; CRAM_SIZE],
            registers: POWER_REGISTERS,
            address: 0,
            code: Code::VramRead,
            control_latch: None,
            read_buffer: 0,
            status: 0,
            unit: LINE_START,
            line: 0,
            line_counter: 0xFF,
            line_int: false,
            h_latch: 0,
            active_lines: SHORT_ACTIVE,
            framebuffer: vec![0xFF00_0000; FB_WIDTH * usize::from(TALL_ACTIVE)],
            frame_ready: false,
            frames: 0,
        }
    }

    /// Return to the power-on state. VRAM and CRAM keep their contents.
    pub fn reset(&mut self) {
        debug!("VDP reset");
        self.registers = POWER_REGISTERS;
        self.address = 0;
        self.code = Code::VramRead;
        self.control_latch = None;
        self.read_buffer = 0;
        self.status = 0;
        self.unit = LINE_START;
        self.line = 0;
        self.line_counter = 0xFF;
        self.line_int = false;
        self.active_lines = SHORT_ACTIVE;
        self.frame_ready = false;
    }

    /// Run `units` VDP clock units.
    pub fn run(&mut self, units: u32) {
        for _ in 0..units {
            self.tick();
        }
    }

    /// One clock unit.
    pub fn tick(&mut self) {
        if self.unit == LINE_END {
            self.unit = LINE_START;
            if self.line < self.active_lines {
                self.draw_line();
            }
        }

        if self.unit == V_INCREMENT_UNIT {
            self.line += 1;
        }
        if self.line == self.timing.lines {
            self.line = 0;
            self.frames += 1;
            self.frame_ready = true;
            trace!(frame = self.frames, "VDP frame");
        } else if self.line == self.active_lines && self.unit == FRAME_INT_UNIT {
            self.status |= STATUS_INT;
        }

        if self.unit == LINE_COUNTER_UNIT {
            if self.line <= self.active_lines {
                self.line_counter = self.line_counter.wrapping_sub(1);
                if self.line_counter == 0xFF {
                    self.line_counter = self.registers[10];
                    self.line_int = true;
                }
            } else {
                self.line_counter = self.registers[10];
            }
        }

        self.unit += 1;
    }

    /// Interrupt output level.
    #[must_use]
    pub fn irq(&self) -> bool {
        let frame = self.status & STATUS_INT != 0 && self.registers[1] & 0x20 != 0;
        let line = self.line_int && self.registers[0] & 0x10 != 0;
        frame || line
    }

    /// Control port read: status flags. Clears both interrupt flags and the
    /// control byte latch.
    pub fn read_status(&mut self) -> u8 {
        let value = self.status;
        self.status = 0;
        self.line_int = false;
        self.control_latch = None;
        value
    }

    /// Control port write.
    pub fn write_control(&mut self, value: u8) {
        let Some(low) = self.control_latch.take() else {
            // The low address byte lands immediately.
            self.control_latch = Some(value);
            self.address = (self.address & 0x3F00) | u16::from(value);
            return;
        };
        self.address = (u16::from(value & 0x3F) << 8) | u16::from(low);
        self.code = Code::from_bits(value >> 6);
        match self.code {
            Code::VramRead => {
                self.read_buffer = self.vram[usize::from(self.address)];
                self.address = (self.address + 1) & 0x3FFF;
            }
            Code::Register => self.write_register(value & 0x0F, low),
            Code::VramWrite | Code::CramWrite => {}
        }
    }

    /// Data port read: the buffered byte, then refill from VRAM.
    pub fn read_data(&mut self) -> u8 {
        let value = self.read_buffer;
        self.read_buffer = self.vram[usize::from(self.address)];
        self.address = (self.address + 1) & 0x3FFF;
        self.control_latch = None;
        value
    }

    /// Data port write.
    pub fn write_data(&mut self, value: u8) {
        if self.code == Code::CramWrite {
            self.cram[usize::from(self.address) & (CRAM_SIZE - 1)] = value;
        } else {
            self.vram[usize::from(self.address)] = value;
        }
        self.address = (self.address + 1) & 0x3FFF;
        self.read_buffer = value;
        self.control_latch = None;
    }

    fn write_register(&mut self, reg: u8, value: u8) {
        let Some(slot) = self.registers.get_mut(usize::from(reg)) else {
            trace!(reg, value, "write to unused VDP register");
            return;
        };
        *slot = value;
        if reg <= 1 {
            self.update_mode();
        }
    }

    /// Mode 4 with M2 and M1 set (and M3 clear) selects 224 lines.
    fn update_mode(&mut self) {
        let m4 = self.registers[0] & 0x04 != 0;
        let m2 = self.registers[0] & 0x02 != 0;
        let m1 = self.registers[1] & 0x10 != 0;
        let m3 = self.registers[1] & 0x08 != 0;
        let active = if m4 && m2 && m1 && !m3 {
            TALL_ACTIVE
        } else {
            SHORT_ACTIVE
        };
        if active != self.active_lines {
            debug!(lines = active, "VDP active height");
            self.active_lines = active;
        }
    }

    /// Fill the current line with the backdrop, or black when blanked.
    fn draw_line(&mut self) {
        let colour = if self.registers[1] & 0x40 != 0 {
            let index = 0x10 | usize::from(self.registers[7] & 0x0F);
            cram_to_argb(self.cram[index])
        } else {
            0xFF00_0000
        };
        let start = usize::from(self.line) * FB_WIDTH;
        self.framebuffer[start..start + FB_WIDTH].fill(colour);
    }

    /// Latch the H counter (a TH input edge).
    pub fn latch_h_counter(&mut self) {
        self.h_latch = (self.unit >> 2) as u8;
    }

    /// H counter as last latched.
    #[must_use]
    pub fn h_counter(&self) -> u8 {
        self.h_latch
    }

    #[must_use]
    pub fn v_counter(&self) -> u8 {
        self.timing.v_counter(self.line, self.active_lines)
    }

    /// True once after each frame wrap.
    pub fn take_frame(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Active display lines: 192 or 224.
    #[must_use]
    pub fn active_lines(&self) -> u16 {
        self.active_lines
    }

    /// Pixels of the active display, `FB_WIDTH` wide.
    #[must_use]
    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer[..FB_WIDTH * usize::from(self.active_lines)]
    }

    #[must_use]
    pub fn line(&self) -> u16 {
        self.line
    }

    #[must_use]
    pub fn unit(&self) -> i16 {
        self.unit
    }

    #[must_use]
    pub fn register(&self, reg: usize) -> u8 {
        self.registers.get(reg).copied().unwrap_or(0)
    }
}

/// `--BBGGRR` to ARGB.
fn cram_to_argb(value: u8) -> u32 {
    let expand = |bits: u8| u32::from(bits & 0x03) * 0x55;
    0xFF00_0000 | (expand(value) << 16) | (expand(value >> 2) << 8) | expand(value >> 4)
}

impl Observable for Vdp {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "line" => Some(self.line.into()),
            "unit" => Some(((self.unit - LINE_START) as u16).into()),
            "v_counter" => Some(self.v_counter().into()),
            "h_counter" => Some(self.h_latch.into()),
            "status" => Some(self.status.into()),
            "line_counter" => Some(self.line_counter.into()),
            "line_int" => Some(self.line_int.into()),
            "irq" => Some(self.irq().into()),
            "address" => Some(self.address.into()),
            "frame" => Some(self.frames.into()),
            _ => path
                .strip_prefix("reg")
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|n| self.registers.get(n))
                .map(|&v| v.into()),
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "line",
            "unit",
            "v_counter",
            "h_counter",
            "status",
            "line_counter",
            "line_int",
            "irq",
            "address",
            "frame",
            "reg<0-10>",
        ]
    }
}
