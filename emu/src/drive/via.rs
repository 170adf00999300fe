// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use mos64_core::{new_shared, EdgeDetector, IrqControl, Pin, Shared};

// Spec: 6522 VERSATILE INTERFACE ADAPTER (VIA) Datasheet

pub mod reg {
    pub const ORB: u8 = 0x00;
    pub const ORA: u8 = 0x01;
    pub const DDRB: u8 = 0x02;
    pub const DDRA: u8 = 0x03;
    pub const T1C_L: u8 = 0x04;
    pub const T1C_H: u8 = 0x05;
    pub const T1L_L: u8 = 0x06;
    pub const T1L_H: u8 = 0x07;
    pub const T2C_L: u8 = 0x08;
    pub const T2C_H: u8 = 0x09;
    pub const SR: u8 = 0x0a;
    pub const ACR: u8 = 0x0b;
    pub const PCR: u8 = 0x0c;
    pub const IFR: u8 = 0x0d;
    pub const IER: u8 = 0x0e;
    pub const ORA_NH: u8 = 0x0f;
}

mod ifr {
    pub const CA2: u8 = 0;
    pub const CA1: u8 = 1;
    pub const SR: u8 = 2;
    pub const CB2: u8 = 3;
    pub const CB1: u8 = 4;
    pub const T2: u8 = 5;
    pub const T1: u8 = 6;
}

#[derive(Copy, Clone, PartialEq)]
enum EdgeSelect {
    Negative,
    Positive,
}

impl EdgeSelect {
    fn from_bit(bit: bool) -> Self {
        if bit {
            EdgeSelect::Positive
        } else {
            EdgeSelect::Negative
        }
    }

    fn is_rising(self) -> bool {
        self == EdgeSelect::Positive
    }
}

/// One of VIA1's/VIA2's two 16-bit counter/latch pairs. Timer 1 supports
/// one-shot and free-run (with optional PB7 square wave); Timer 2 supports
/// one-shot and pulse-counting off PB6.
struct Timer {
    counter: u16,
    latch: u16,
    pb7: bool,
}

impl Timer {
    fn new() -> Self {
        Timer {
            counter: 0xffff,
            latch: 0xffff,
            pb7: true,
        }
    }

    /// Ticks the counter down by one, returning `true` on underflow
    /// (counter was 0 before this tick).
    fn tick(&mut self) -> bool {
        let underflowed = self.counter == 0;
        self.counter = self.counter.wrapping_sub(1);
        underflowed
    }

    fn reload(&mut self) {
        self.counter = self.latch;
    }
}

/// Register-level model of the 6522 VIA, shared between VIA1 (serial bus)
/// and VIA2 (read/write head) — see the port-specific wiring each owner
/// layers on top via `get_port_a`/`get_port_b`/`set_port_a_input`/
/// `set_port_b_input`.
pub struct Via6522 {
    ora: u8,
    orb: u8,
    ira: u8,
    irb: u8,
    ddra: u8,
    ddrb: u8,
    t1: Timer,
    t2: Timer,
    t1_free_run: bool,
    t1_pb7_enabled: bool,
    t2_pulse_counting: bool,
    sr: u8,
    pcr: u8,
    irq_control: IrqControl,
    ca1: Shared<Pin>,
    ca2: Shared<Pin>,
    cb1: Shared<Pin>,
    cb2: Shared<Pin>,
    ca1_edge: EdgeDetector,
    cb1_edge: EdgeDetector,
}

impl Via6522 {
    pub fn new() -> Self {
        Via6522 {
            ora: 0,
            orb: 0,
            ira: 0,
            irb: 0,
            ddra: 0,
            ddrb: 0,
            t1: Timer::new(),
            t2: Timer::new(),
            t1_free_run: false,
            t1_pb7_enabled: false,
            t2_pulse_counting: false,
            sr: 0,
            pcr: 0,
            irq_control: IrqControl::new(),
            ca1: new_shared(Pin::new(true)),
            ca2: new_shared(Pin::new(true)),
            cb1: new_shared(Pin::new(true)),
            cb2: new_shared(Pin::new(true)),
            ca1_edge: EdgeDetector::new(true),
            cb1_edge: EdgeDetector::new(true),
        }
    }

    pub fn ca1_pin(&self) -> Shared<Pin> {
        self.ca1.clone()
    }

    pub fn ca2_pin(&self) -> Shared<Pin> {
        self.ca2.clone()
    }

    pub fn cb1_pin(&self) -> Shared<Pin> {
        self.cb1.clone()
    }

    pub fn cb2_pin(&self) -> Shared<Pin> {
        self.cb2.clone()
    }

    pub fn reset(&mut self) {
        self.ora = 0;
        self.orb = 0;
        self.ira = 0;
        self.irb = 0;
        self.ddra = 0;
        self.ddrb = 0;
        self.t1 = Timer::new();
        self.t2 = Timer::new();
        self.t1_free_run = false;
        self.t1_pb7_enabled = false;
        self.t2_pulse_counting = false;
        self.sr = 0;
        self.pcr = 0;
        self.irq_control.reset();
    }

    /// The externally visible value of port A/B: output bits come from
    /// OR{A,B} where DDR selects output, input bits come from whatever was
    /// last latched into IR{A,B}.
    pub fn port_a_value(&self) -> u8 {
        (self.ora & self.ddra) | (self.ira & !self.ddra)
    }

    pub fn port_b_value(&self) -> u8 {
        (self.orb & self.ddrb) | (self.irb & !self.ddrb)
    }

    pub fn set_port_a_input(&mut self, value: u8) {
        self.ira = value;
    }

    pub fn set_port_b_input(&mut self, value: u8) {
        self.irb = value;
    }

    pub fn set_ca1(&mut self, high: bool) {
        let edge_select = EdgeSelect::from_bit(self.pcr.get_bit(0));
        if self.ca1_edge.sample(high, edge_select.is_rising()) {
            self.irq_control.set_event(ifr::CA1);
        }
        self.ca1.borrow_mut().set(high);
    }

    pub fn set_cb1(&mut self, high: bool) {
        let edge_select = EdgeSelect::from_bit(self.pcr.get_bit(4));
        if self.cb1_edge.sample(high, edge_select.is_rising()) {
            self.irq_control.set_event(ifr::CB1);
        }
        self.cb1.borrow_mut().set(high);
    }

    pub fn irq(&self) -> bool {
        self.irq_control.is_triggered()
    }

    /// PB7's square-wave output when Timer 1 is in free-run, PB7-enabled
    /// mode (ACR bits 6-7).
    pub fn t1_pb7(&self) -> Option<bool> {
        if self.t1_pb7_enabled {
            Some(self.t1.pb7)
        } else {
            None
        }
    }

    pub fn read(&mut self, register: u8) -> u8 {
        match register & 0x0f {
            reg::ORB => {
                let value = self.port_b_value();
                self.irq_control.clear_events(1 << ifr::CB1 | 1 << ifr::CB2);
                value
            }
            reg::ORA => {
                let value = self.port_a_value();
                self.irq_control.clear_events(1 << ifr::CA1 | 1 << ifr::CA2);
                value
            }
            reg::DDRB => self.ddrb,
            reg::DDRA => self.ddra,
            reg::T1C_L => {
                self.irq_control.clear_events(1 << ifr::T1);
                self.t1.counter as u8
            }
            reg::T1C_H => (self.t1.counter >> 8) as u8,
            reg::T1L_L => self.t1.latch as u8,
            reg::T1L_H => (self.t1.latch >> 8) as u8,
            reg::T2C_L => {
                self.irq_control.clear_events(1 << ifr::T2);
                self.t2.counter as u8
            }
            reg::T2C_H => (self.t2.counter >> 8) as u8,
            reg::SR => self.sr,
            reg::ACR => self.acr_value(),
            reg::PCR => self.pcr,
            reg::IFR => self.irq_control.get_data(),
            reg::IER => self.irq_control.get_mask() | 0x80,
            reg::ORA_NH => self.port_a_value(),
            _ => unreachable!(),
        }
    }

    pub fn write(&mut self, register: u8, value: u8) {
        match register & 0x0f {
            reg::ORB => {
                self.orb = value;
                self.irq_control.clear_events(1 << ifr::CB1 | 1 << ifr::CB2);
            }
            reg::ORA | reg::ORA_NH => {
                self.ora = value;
                self.irq_control.clear_events(1 << ifr::CA1 | 1 << ifr::CA2);
            }
            reg::DDRB => self.ddrb = value,
            reg::DDRA => self.ddra = value,
            reg::T1C_L => self.t1.latch = (self.t1.latch & 0xff00) | u16::from(value),
            reg::T1C_H => {
                self.t1.latch = (self.t1.latch & 0x00ff) | (u16::from(value) << 8);
                self.t1.reload();
                self.t1.pb7 = false;
                self.irq_control.clear_events(1 << ifr::T1);
            }
            reg::T1L_L => self.t1.latch = (self.t1.latch & 0xff00) | u16::from(value),
            reg::T1L_H => {
                self.t1.latch = (self.t1.latch & 0x00ff) | (u16::from(value) << 8);
                self.irq_control.clear_events(1 << ifr::T1);
            }
            reg::T2C_L => self.t2.latch = (self.t2.latch & 0xff00) | u16::from(value),
            reg::T2C_H => {
                self.t2.latch = (self.t2.latch & 0x00ff) | (u16::from(value) << 8);
                self.t2.reload();
                self.irq_control.clear_events(1 << ifr::T2);
            }
            reg::SR => self.sr = value,
            reg::ACR => self.set_acr(value),
            reg::PCR => self.pcr = value,
            reg::IFR => self.irq_control.clear_events(value & 0x7f),
            reg::IER => self.irq_control.update_mask(value),
            _ => unreachable!(),
        }
    }

    fn acr_value(&self) -> u8 {
        let mut value = 0u8;
        value.set_bit(6, self.t1_free_run);
        value.set_bit(7, self.t1_pb7_enabled);
        value.set_bit(5, self.t2_pulse_counting);
        value
    }

    fn set_acr(&mut self, value: u8) {
        self.t1_free_run = value.get_bit(6);
        self.t1_pb7_enabled = value.get_bit(7);
        self.t2_pulse_counting = value.get_bit(5);
    }

    /// One Phi2 cycle: advances both timers, firing IRQ events on
    /// underflow and reloading / toggling PB7 per the active mode.
    pub fn clock(&mut self) {
        if self.t1.tick() {
            self.irq_control.set_event(ifr::T1);
            self.t1.pb7 = !self.t1.pb7;
            if self.t1_free_run {
                self.t1.reload();
            }
        }
        if !self.t2_pulse_counting && self.t2.tick() {
            self.irq_control.set_event(ifr::T2);
        }
    }

    /// Pulse-counting mode: VIA2 calls this once per byte-ready pulse
    /// instead of `clock()` ticking Timer 2 every cycle.
    pub fn pulse_t2(&mut self) {
        if self.t2_pulse_counting && self.t2.tick() {
            self.irq_control.set_event(ifr::T2);
        }
    }
}

impl Default for Via6522 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddr_selects_output_vs_input_bits() {
        let mut via = Via6522::new();
        via.write(reg::DDRA, 0x0f);
        via.write(reg::ORA, 0xaa);
        via.set_port_a_input(0xff);
        assert_eq!(0xfa, via.port_a_value());
    }

    #[test]
    fn timer1_one_shot_fires_irq_on_underflow() {
        let mut via = Via6522::new();
        via.write(reg::IER, 0b1100_0000); // enable T1
        via.write(reg::T1L_L, 2);
        via.write(reg::T1C_H, 0);
        assert!(!via.irq());
        via.clock();
        via.clock();
        via.clock();
        assert!(via.irq());
    }

    #[test]
    fn timer1_free_run_reloads_instead_of_stopping() {
        let mut via = Via6522::new();
        via.write(reg::ACR, 0b0100_0000);
        via.write(reg::T1L_L, 1);
        via.write(reg::T1C_H, 0);
        via.clock();
        via.clock();
        let counter_after_first_underflow = via.t1.counter;
        via.clock();
        via.clock();
        assert_eq!(counter_after_first_underflow, via.t1.counter);
    }

    #[test]
    fn ca1_rising_edge_latches_ifr_when_selected() {
        let mut via = Via6522::new();
        via.write(reg::PCR, 0b0000_0001); // CA1 positive edge
        via.set_ca1(false);
        assert!(!via.irq_control.is_triggered());
        via.write(reg::IER, 0b1000_0010);
        via.set_ca1(true);
        assert!(via.irq());
    }

    #[test]
    fn reading_ora_clears_ca1_ca2_ifr_bits() {
        let mut via = Via6522::new();
        via.write(reg::PCR, 0b0000_0001);
        via.write(reg::IER, 0b1000_0010);
        via.set_ca1(false);
        via.set_ca1(true);
        assert!(via.irq());
        via.read(reg::ORA);
        assert!(!via.irq());
    }
}
