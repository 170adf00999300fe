// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

// Spec: 6526 COMPLEX INTERFACE ADAPTER (CIA) Datasheet, Timer A/B control registers.

#[derive(Copy, Clone, PartialEq)]
pub enum Mode {
    TimerA,
    TimerB,
}

#[derive(Copy, Clone, PartialEq)]
enum RunMode {
    OneShot,
    Continuous,
}

#[derive(Copy, Clone, PartialEq)]
enum OutMode {
    Pulse,
    Toggle,
}

/// One of a CIA's two 16-bit down counters. Timer A always counts PHI2 or
/// CNT pulses; Timer B can additionally be cascaded off Timer A's underflow,
/// which is how the two are chained into a 32-bit counter.
pub struct Timer {
    mode: Mode,
    // Control register state
    start: bool,
    pb_on: bool,
    out_mode: OutMode,
    run_mode: RunMode,
    input: u8,
    extra_bits: u8,
    // Counter state
    latch: u16,
    value: u16,
    pb_output: bool,
    cascade_pulse: bool,
}

impl Timer {
    pub fn new(mode: Mode) -> Self {
        let mut timer = Self {
            mode,
            start: false,
            pb_on: false,
            out_mode: OutMode::Pulse,
            run_mode: RunMode::Continuous,
            input: 0,
            extra_bits: 0,
            latch: 0,
            value: 0,
            pb_output: false,
            cascade_pulse: false,
        };
        timer.reset();
        timer
    }

    pub fn reset(&mut self) {
        self.start = false;
        self.pb_on = false;
        self.out_mode = OutMode::Pulse;
        self.run_mode = RunMode::Continuous;
        self.input = 0;
        self.extra_bits = 0;
        self.latch = 0xffff;
        self.value = 0x0000;
        self.pb_output = false;
        self.cascade_pulse = false;
    }

    /// Feeds the external count source for this cycle: the CNT pin for
    /// `Input::Cnt`-style modes, or Timer A's underflow for Timer B's
    /// cascaded input modes.
    pub fn feed_source(&mut self, pulse: bool) {
        self.cascade_pulse = pulse;
    }

    /// Advances the timer by one cycle, returning `true` on the cycle it
    /// underflows (and reloads from the latch).
    pub fn clock(&mut self) -> bool {
        if !self.start {
            return false;
        }
        let counts = match self.mode {
            Mode::TimerA => match self.input {
                0 => true,               // PHI2
                _ => self.cascade_pulse,  // CNT
            },
            Mode::TimerB => match self.input {
                0 => true,              // PHI2
                1 => self.cascade_pulse, // CNT
                2 => self.cascade_pulse, // Timer A underflow
                _ => self.cascade_pulse, // Timer A underflow and CNT high
            },
        };
        let underflow = if counts {
            if self.value == 0 {
                self.value = self.latch;
                if self.run_mode == RunMode::OneShot {
                    self.start = false;
                }
                true
            } else {
                self.value -= 1;
                false
            }
        } else {
            false
        };
        if self.pb_on {
            self.pb_output = match self.out_mode {
                OutMode::Pulse => underflow,
                OutMode::Toggle => {
                    if underflow {
                        !self.pb_output
                    } else {
                        self.pb_output
                    }
                }
            };
        }
        underflow
    }

    pub fn is_pb_on(&self) -> bool {
        self.pb_on
    }

    pub fn get_pb_output(&self) -> bool {
        self.pb_output
    }

    pub fn get_counter(&self) -> u16 {
        self.value
    }

    pub fn get_counter_lo(&self) -> u8 {
        self.value as u8
    }

    pub fn get_counter_hi(&self) -> u8 {
        (self.value >> 8) as u8
    }

    pub fn get_latch(&self) -> u16 {
        self.latch
    }

    pub fn set_latch_lo(&mut self, value: u8) {
        self.latch = (self.latch & 0xff00) | u16::from(value);
    }

    pub fn set_latch_hi(&mut self, value: u8) {
        self.latch = (self.latch & 0x00ff) | (u16::from(value) << 8);
        if !self.start {
            self.value = self.latch;
        }
    }

    pub fn get_config(&self) -> u8 {
        let mut config = 0u8;
        config.set_bit(0, self.start);
        config.set_bit(1, self.pb_on);
        config.set_bit(2, self.out_mode == OutMode::Toggle);
        config.set_bit(3, self.run_mode == RunMode::OneShot);
        let input_bits = match self.mode {
            Mode::TimerA => u8::from(self.input & 0x01) << 5,
            Mode::TimerB => (self.input & 0x03) << 5,
        };
        config | input_bits | self.extra_bits
    }

    pub fn set_config(&mut self, value: u8) {
        self.start = value.get_bit(0);
        self.pb_on = value.get_bit(1);
        self.out_mode = if value.get_bit(2) {
            OutMode::Toggle
        } else {
            OutMode::Pulse
        };
        self.run_mode = if value.get_bit(3) {
            RunMode::OneShot
        } else {
            RunMode::Continuous
        };
        if value.get_bit(4) {
            self.value = self.latch;
        }
        self.input = match self.mode {
            Mode::TimerA => (value >> 5) & 0x01,
            Mode::TimerB => (value >> 5) & 0x03,
        };
        self.extra_bits = value & 0b1100_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_timer_tracks_latch_high_byte_write() {
        let mut timer = Timer::new(Mode::TimerA);
        timer.set_latch_lo(0x03);
        timer.set_latch_hi(0x00);
        assert_eq!(3, timer.get_counter());
    }

    #[test]
    fn continuous_timer_reloads_and_reports_underflow() {
        let mut timer = Timer::new(Mode::TimerA);
        timer.set_latch_lo(0x03);
        timer.set_latch_hi(0x00);
        timer.set_config(0b0000_0001); // start, continuous, pulse, phi2
        timer.feed_source(false);
        assert_eq!(false, timer.clock());
        assert_eq!(2, timer.get_counter());
        timer.feed_source(false);
        assert_eq!(false, timer.clock());
        timer.feed_source(false);
        assert_eq!(false, timer.clock());
        timer.feed_source(false);
        assert_eq!(true, timer.clock());
        assert_eq!(3, timer.get_counter());
    }

    #[test]
    fn one_shot_timer_stops_after_underflow() {
        let mut timer = Timer::new(Mode::TimerA);
        timer.set_latch_lo(0x01);
        timer.set_latch_hi(0x00);
        timer.set_config(0b0000_1001); // start, one-shot
        timer.feed_source(false);
        assert_eq!(false, timer.clock());
        timer.feed_source(false);
        assert_eq!(true, timer.clock());
        timer.feed_source(false);
        assert_eq!(false, timer.clock());
        assert_eq!(1, timer.get_counter());
    }

    #[test]
    fn force_load_reloads_value_from_latch_without_waiting_for_a_clock() {
        let mut timer = Timer::new(Mode::TimerA);
        timer.set_latch_lo(0x10);
        timer.set_latch_hi(0x00);
        timer.set_config(0b0000_0001); // start, continuous, pulse, phi2
        timer.feed_source(false);
        timer.clock();
        timer.feed_source(false);
        timer.clock();
        assert_eq!(0x0e, timer.get_counter());
        timer.set_config(0b0001_0001); // force load (bit 4) while still running
        assert_eq!(0x10, timer.get_counter());
    }

    #[test]
    fn cascaded_timer_b_counts_timer_a_underflows() {
        let mut timer_a = Timer::new(Mode::TimerA);
        timer_a.set_latch_lo(0x01);
        timer_a.set_latch_hi(0x00);
        timer_a.set_config(0b0000_0001);
        let mut timer_b = Timer::new(Mode::TimerB);
        timer_b.set_latch_lo(0x05);
        timer_b.set_latch_hi(0x00);
        timer_b.set_config(0b0100_0001); // start, input mode 2 = timer A underflow
        for _ in 0..4 {
            timer_a.feed_source(false);
            let underflow_a = timer_a.clock();
            timer_b.feed_source(underflow_a);
            timer_b.clock();
        }
        assert_eq!(3, timer_b.get_counter());
    }
}
