//! Control ports: two joypads, the reset button, and the I/O control
//! register that can turn the TH and TR pins into outputs.
//!
//! Every input is active low.
//!
//! | Port | Bits                                                        |
//! |------|-------------------------------------------------------------|
//! | $DC  | 0-3 P1 up/down/left/right, 4 P1 TL, 5 P1 TR, 6-7 P2 up/down |
//! | $DD  | 0-1 P2 left/right, 2 P2 TL, 3 P2 TR, 4 reset, 6 P1 TH, 7 P2 TH |

/// Joypad input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmsButton {
    Up,
    Down,
    Left,
    Right,
    /// TL pin.
    Button1,
    /// TR pin.
    Button2,
}

// $3F bits
const TR_A_INPUT: u8 = 0x01;
const TH_A_INPUT: u8 = 0x02;
const TR_B_INPUT: u8 = 0x04;
const TH_B_INPUT: u8 = 0x08;
const TR_A_LEVEL: u8 = 0x10;
const TH_A_LEVEL: u8 = 0x20;
const TR_B_LEVEL: u8 = 0x40;
const TH_B_LEVEL: u8 = 0x80;

#[derive(Debug, Clone)]
pub struct ControlPorts {
    /// Pressed buttons per player, one bit per `SmsButton`.
    pressed: [u8; 2],
    reset_button: bool,
    io_control: u8,
    invert_outputs: bool,
}

impl ControlPorts {
    #[must_use]
    pub fn new(invert_outputs: bool) -> Self {
        Self {
            pressed: [0; 2],
            reset_button: false,
            io_control: 0xFF,
            invert_outputs,
        }
    }

    pub fn set_button(&mut self, player: usize, button: SmsButton, pressed: bool) {
        let Some(state) = self.pressed.get_mut(player) else {
            return;
        };
        let mask = 1 << button as u8;
        if pressed {
            *state |= mask;
        } else {
            *state &= !mask;
        }
    }

    pub fn set_reset_button(&mut self, pressed: bool) {
        self.reset_button = pressed;
    }

    /// Write `$3F`. Returns true if a TH pin driven as an output went high,
    /// which latches the VDP H counter.
    pub fn write_io_control(&mut self, value: u8) -> bool {
        let before = self.th_outputs_high();
        self.io_control = value;
        self.th_outputs_high() & !before != 0
    }

    #[must_use]
    pub fn io_control(&self) -> u8 {
        self.io_control
    }

    /// Port `$DC`.
    #[must_use]
    pub fn port_a(&self) -> u8 {
        let p1 = self.pressed[0];
        let p2 = self.pressed[1];
        // Pressed lines pull low.
        let mut low = (p1 & 0x3F) | ((p2 & 0x03) << 6);
        low = self.apply_output(low, 0x20, TR_A_INPUT, TR_A_LEVEL);
        !low
    }

    /// Port `$DD`.
    #[must_use]
    pub fn port_b(&self) -> u8 {
        let p2 = self.pressed[1];
        let mut low = (p2 >> 2) & 0x0F;
        if self.reset_button {
            low |= 0x10;
        }
        low = self.apply_output(low, 0x08, TR_B_INPUT, TR_B_LEVEL);
        low = self.apply_output(low, 0x40, TH_A_INPUT, TH_A_LEVEL);
        low = self.apply_output(low, 0x80, TH_B_INPUT, TH_B_LEVEL);
        !low
    }

    /// Replace the input at `bit` (in pulled-low form) with the driven
    /// level when the pin is an output.
    fn apply_output(&self, low: u8, bit: u8, input: u8, level: u8) -> u8 {
        if self.io_control & input != 0 {
            return low;
        }
        let high = (self.io_control & level != 0) != self.invert_outputs;
        if high { low & !bit } else { low | bit }
    }

    fn th_outputs_high(&self) -> u8 {
        let c = self.io_control;
        let a = c & TH_A_INPUT == 0 && c & TH_A_LEVEL != 0;
        let b = c & TH_B_INPUT == 0 && c & TH_B_LEVEL != 0;
        u8::from(a) | (u8::from(b) << 1)
    }
}
