// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use mos64_core::{IoPort, Pin, Pulse, Shared, Tape};

const DUTY_CYCLE: u32 = 50;

/// Datasette motor/sense/data-out wiring onto the C64's processor port and
/// CIA1 flag pin. Holds a pulse stream (`Tape`, each pulse the cycle count
/// until the next flux transition) and the mechanical play/rewind/fast-
/// forward state a user drives directly.
pub struct Datassette {
    io_port: Shared<IoPort>,
    flag_pin: Shared<Pin>,
    tape: Option<Box<dyn Tape>>,
    playing: bool,
    rewinding: bool,
    fast_forwarding: bool,
    current_pulse: Pulse,
}

impl Datassette {
    pub fn new(io_port: Shared<IoPort>, flag_pin: Shared<Pin>) -> Self {
        Datassette {
            io_port,
            flag_pin,
            tape: None,
            playing: false,
            rewinding: false,
            fast_forwarding: false,
            current_pulse: Pulse::new(0, DUTY_CYCLE),
        }
    }

    pub fn attach(&mut self, tape: Box<dyn Tape>) {
        self.tape = Some(tape);
        self.update_sense();
    }

    pub fn detach(&mut self) {
        self.press_stop();
        self.tape = None;
        self.update_sense();
    }

    pub fn reset(&mut self) {
        self.press_stop();
        self.current_pulse = Pulse::new(0, DUTY_CYCLE);
        if let Some(ref mut tape) = self.tape {
            tape.seek(0);
        }
    }

    fn motor_on(&self) -> bool {
        !self.io_port.borrow().get_value().get_bit(5)
    }

    pub fn press_play(&mut self) {
        if self.tape.is_some() {
            self.playing = true;
            self.rewinding = false;
            self.fast_forwarding = false;
        }
        self.update_sense();
    }

    pub fn press_stop(&mut self) {
        self.playing = false;
        self.rewinding = false;
        self.fast_forwarding = false;
        self.update_sense();
    }

    pub fn press_rewind(&mut self) {
        if let Some(ref mut tape) = self.tape {
            tape.seek(0);
        }
        self.rewinding = true;
        self.playing = false;
        self.fast_forwarding = false;
        self.update_sense();
    }

    pub fn press_fast_forward(&mut self) {
        self.fast_forwarding = true;
        self.playing = false;
        self.rewinding = false;
        self.update_sense();
    }

    fn update_sense(&mut self) {
        let any_key_down = self.playing || self.rewinding || self.fast_forwarding;
        self.io_port.borrow_mut().set_input_bit(4, !any_key_down);
    }

    /// One master-clock cycle: while the motor is on and play is down, drives
    /// a duty-cycle square wave onto the CIA1 flag pin for the current tape
    /// pulse, holding it low long enough for a once-per-cycle sampler (the
    /// CIA clocks before the datasette every cycle) to observe the edge.
    pub fn clock(&mut self) {
        if !self.playing || !self.motor_on() {
            return;
        }
        let tape = match self.tape {
            Some(ref mut tape) => tape,
            None => return,
        };
        if self.current_pulse.is_done() {
            match tape.read_pulse() {
                Some(cycles) => self.current_pulse = Pulse::new(cycles.max(1), DUTY_CYCLE),
                None => {
                    self.playing = false;
                    return;
                }
            }
        }
        if !self.current_pulse.is_done() {
            self.flag_pin.borrow_mut().set(self.current_pulse.advance());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mos64_core::io::cia::{reg, Cia, Mode};
    use mos64_core::{new_shared, Chip, IrqLine};

    struct FakeTape {
        pulses: Vec<u32>,
        pos: usize,
    }

    impl Tape for FakeTape {
        fn read_pulse(&mut self) -> Option<u32> {
            let pulse = self.pulses.get(self.pos).copied();
            self.pos += 1;
            pulse
        }

        fn seek(&mut self, pos: usize) -> bool {
            self.pos = pos;
            true
        }
    }

    fn new_datassette() -> (Datassette, Shared<Pin>) {
        // Direction 0x2f matches the CPU processor port's reset value: bit 5
        // (motor) is an output, driven low here to mean "motor on"; bit 4
        // (sense) stays an input so `update_sense` is still observable.
        let io_port = new_shared(IoPort::new(0x2f, 0xff));
        let flag_pin = new_shared(Pin::new(true));
        (Datassette::new(io_port, flag_pin.clone()), flag_pin)
    }

    #[test]
    fn idle_without_tape_does_not_play() {
        let (mut datassette, _flag_pin) = new_datassette();
        datassette.press_play();
        datassette.clock();
    }

    #[test]
    fn pulse_raises_cia1_flag_interrupt() {
        let (mut datassette, flag_pin) = new_datassette();
        // Two pulses: the first only carries the flag pin from its
        // post-reset low back up to high, so the falling edge that should
        // trip the CIA's FLAG latch only happens once the second pulse
        // begins.
        datassette.attach(Box::new(FakeTape {
            pulses: vec![4, 4],
            pos: 0,
        }));

        let cnt_pin = new_shared(Pin::new(true));
        let cia_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia_port_b = new_shared(IoPort::new(0x00, 0xff));
        let irq_line = new_shared(IrqLine::new("irq"));
        let mut cia = Cia::new(
            Mode::Cia1,
            None,
            None,
            None,
            cnt_pin,
            cia_port_a,
            cia_port_b,
            flag_pin,
            irq_line.clone(),
        );
        cia.reset();
        cia.write(reg::ICR, 0b1001_0000); // unmask FLAG (event bit 4)

        datassette.press_play();
        let mut triggered = false;
        for _ in 0..40 {
            // CIA samples the flag pin before the datassette drives it,
            // matching the C64's per-cycle wiring order.
            cia.clock();
            datassette.clock();
            if irq_line.borrow().is_low() {
                triggered = true;
                break;
            }
        }
        assert!(triggered, "CIA1 never saw a FLAG falling edge");
        assert_eq!(0x80, cia.read(reg::ICR) & 0x80);
    }

    #[test]
    fn sense_bit_goes_low_while_a_key_is_down() {
        let (mut datassette, _flag_pin) = new_datassette();
        datassette.attach(Box::new(FakeTape {
            pulses: vec![10],
            pos: 0,
        }));
        assert!(datassette.io_port.borrow().get_value().get_bit(4));
        datassette.press_play();
        assert!(!datassette.io_port.borrow().get_value().get_bit(4));
        datassette.press_stop();
        assert!(datassette.io_port.borrow().get_value().get_bit(4));
    }

    struct CountingTape {
        pulses: Vec<u32>,
        pos: usize,
        reads: Shared<usize>,
    }

    impl Tape for CountingTape {
        fn read_pulse(&mut self) -> Option<u32> {
            *self.reads.borrow_mut() += 1;
            let pulse = self.pulses.get(self.pos).copied();
            self.pos += 1;
            pulse
        }

        fn seek(&mut self, pos: usize) -> bool {
            self.pos = pos;
            true
        }
    }

    #[test]
    fn falling_edge_count_matches_pulse_count() {
        let (mut datassette, _flag_pin) = new_datassette();
        let reads = new_shared(0usize);
        datassette.attach(Box::new(CountingTape {
            pulses: vec![3, 1, 2],
            pos: 0,
            reads: reads.clone(),
        }));
        datassette.press_play();
        for _ in 0..(3 + 1 + 2) {
            datassette.clock();
        }
        assert_eq!(3, *reads.borrow());
        assert!(datassette.playing);

        datassette.clock(); // one more pulse lookup, past the end of the tape
        assert_eq!(4, *reads.borrow());
        assert!(!datassette.playing);
    }

    #[test]
    fn exhausted_tape_stops_playback() {
        let (mut datassette, _flag_pin) = new_datassette();
        datassette.attach(Box::new(FakeTape {
            pulses: vec![],
            pos: 0,
        }));
        datassette.press_play();
        datassette.clock();
        assert!(!datassette.playing);
    }
}
