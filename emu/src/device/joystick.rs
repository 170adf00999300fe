// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

// https://www.c64-wiki.com/index.php/Joystick

/// One of the two digital joystick ports: four direction bits plus a fire
/// button, read as active-low bits 0-4 wherever the port is wired onto a
/// CIA data port (port A for joystick 2, port B for joystick 1).
pub struct Joystick {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
    fire: bool,
}

impl Joystick {
    pub fn new() -> Self {
        Joystick {
            up: false,
            down: false,
            left: false,
            right: false,
            fire: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Joystick::new();
    }

    pub fn set_up(&mut self, pressed: bool) {
        self.up = pressed;
    }

    pub fn set_down(&mut self, pressed: bool) {
        self.down = pressed;
    }

    pub fn set_left(&mut self, pressed: bool) {
        self.left = pressed;
    }

    pub fn set_right(&mut self, pressed: bool) {
        self.right = pressed;
    }

    pub fn set_fire(&mut self, pressed: bool) {
        self.fire = pressed;
    }

    /// Active-low port value: bit 0 up, bit 1 down, bit 2 left, bit 3
    /// right, bit 4 fire, bits 5-7 high (unused by a real joystick port).
    pub fn port_value(&self) -> u8 {
        let mut value = 0xffu8;
        value.set_bit(0, !self.up);
        value.set_bit(1, !self.down);
        value.set_bit(2, !self.left);
        value.set_bit(3, !self.right);
        value.set_bit(4, !self.fire);
        value
    }
}

impl Default for Joystick {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_port_value_is_all_high() {
        let joystick = Joystick::new();
        assert_eq!(0xff, joystick.port_value());
    }

    #[test]
    fn fire_pulls_bit4_low() {
        let mut joystick = Joystick::new();
        joystick.set_fire(true);
        assert_eq!(0xef, joystick.port_value());
    }

    #[test]
    fn reset_clears_all_directions() {
        let mut joystick = Joystick::new();
        joystick.set_up(true);
        joystick.set_fire(true);
        joystick.reset();
        assert_eq!(0xff, joystick.port_value());
    }
}
