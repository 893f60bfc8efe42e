//! Standard NES joypad.
//!
//! A serial shift register read one bit at a time through $4016/$4017.
//! Writing bit 0 = 1 to $4016 holds the register in reload (strobe);
//! writing bit 0 = 0 latches the current buttons.

/// Button on the standard controller, in shift order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NesButton {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

impl NesButton {
    /// Position in the shift register.
    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Default)]
pub struct Controller {
    buttons: u8,
    shift_register: u8,
    strobe: bool,
}

impl Controller {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_button(&mut self, button: NesButton, pressed: bool) {
        let mask = 1 << button.bit();
        if pressed {
            self.buttons |= mask;
        } else {
            self.buttons &= !mask;
        }
        if self.strobe {
            self.shift_register = self.buttons;
        }
    }

    /// Bit 0 of the shift register. Official pads shift in 1s, so reads
    /// past the eighth return 1.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return self.buttons & 1;
        }
        let bit = self.shift_register & 1;
        self.shift_register = (self.shift_register >> 1) | 0x80;
        bit
    }

    pub fn write(&mut self, value: u8) {
        let strobe = value & 1 != 0;
        if self.strobe && !strobe {
            self.shift_register = self.buttons;
        }
        self.strobe = strobe;
    }

    #[must_use]
    pub fn buttons(&self) -> u8 {
        self.buttons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strobe_latch_and_read() {
        let mut c = Controller::new();
        c.set_button(NesButton::A, true);
        c.set_button(NesButton::Start, true);
        c.write(1);
        c.write(0);

        let bits: Vec<u8> = (0..8).map(|_| c.read()).collect();
        assert_eq!(bits, [1, 0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(c.read(), 1);
    }

    #[test]
    fn strobe_held_returns_a() {
        let mut c = Controller::new();
        c.set_button(NesButton::A, true);
        c.write(1);
        assert_eq!(c.read(), 1);
        assert_eq!(c.read(), 1);
        c.set_button(NesButton::A, false);
        assert_eq!(c.read(), 0);
    }

    #[test]
    fn latch_ignores_later_presses() {
        let mut c = Controller::new();
        c.write(1);
        c.write(0);
        c.set_button(NesButton::A, true);
        assert_eq!(c.read(), 0);
        assert_eq!(c.buttons(), 0x01);
    }
}
