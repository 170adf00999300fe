// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::factory::{Chip, VicModel, VideoOutput};
use crate::util::{IrqLine, Pin, Ram, Rom, Shared, SharedCell};
use crate::video::vic_memory::VicMemory;

// The VIC-II's raster/character/sprite pixel pipeline is treated as an
// external collaborator: this models the register bank and the raster
// line counter/IRQ-compare timing a CPU program actually observes,
// without rendering pixels into `frame_buffer` itself. A real frontend
// drives graphics-mode decode from the same register file and
// `VicMemory` view this chip already wires up.

const REG_COUNT: usize = 0x2f;

pub struct Vic {
    mem: VicMemory,
    #[allow(unused)]
    frame_buffer: Shared<dyn VideoOutput>,
    vsync_flag: SharedCell<bool>,
    ba_line: Shared<Pin>,
    irq_line: Shared<IrqLine>,
    regs: [u8; REG_COUNT],
    raster: u16,
    raster_compare: u16,
    cycle_in_line: u16,
    cycles_per_line: u16,
    lines_per_frame: u16,
}

impl Vic {
    pub fn new(
        chip_model: VicModel,
        _color_ram: Shared<Ram>,
        ram: Shared<Ram>,
        rom_charset: Shared<Rom>,
        vic_base_address: SharedCell<u16>,
        frame_buffer: Shared<dyn VideoOutput>,
        vsync_flag: SharedCell<bool>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
    ) -> Self {
        let (cycles_per_line, lines_per_frame) = match chip_model {
            VicModel::Mos6569 => (63, 312),
            VicModel::Mos6567 => (65, 263),
        };
        Vic {
            mem: VicMemory::new(vic_base_address, rom_charset, ram),
            frame_buffer,
            vsync_flag,
            ba_line,
            irq_line,
            regs: [0; REG_COUNT],
            raster: 0,
            raster_compare: 0,
            cycle_in_line: 0,
            cycles_per_line,
            lines_per_frame,
        }
    }

    fn trigger_irq(&mut self, source: usize) {
        self.regs[0x19].set_bit(source, true);
        if self.regs[0x1a].get_bit(source) {
            self.regs[0x19].set_bit(7, true);
            self.irq_line.borrow_mut().set_low(1, true);
        }
    }

    pub fn clock(&mut self) {
        self.cycle_in_line += 1;
        if self.cycle_in_line >= self.cycles_per_line {
            self.cycle_in_line = 0;
            self.raster += 1;
            if self.raster >= self.lines_per_frame {
                self.raster = 0;
                self.vsync_flag.set(true);
            }
            self.regs[0x11].set_bit(7, self.raster.get_bit(8));
            self.regs[0x12] = self.raster as u8;
            if self.raster == self.raster_compare {
                self.trigger_irq(0);
            }
        }
        // Badline stalls depend on the character-mode pixel decode this
        // stub does not implement, so BA is left released.
        self.ba_line.borrow_mut().set_high();
    }

    pub fn clock_delta(&mut self, delta: u32) {
        for _ in 0..delta {
            self.clock();
        }
    }

    pub fn process_vsync(&mut self) {
        self.vsync_flag.set(false);
    }

    pub fn reset(&mut self) {
        self.regs = [0; REG_COUNT];
        self.raster = 0;
        self.raster_compare = 0;
        self.cycle_in_line = 0;
        self.irq_line.borrow_mut().set_low(1, false);
    }

    pub fn read(&mut self, reg: u8) -> u8 {
        let reg = reg as usize % REG_COUNT;
        match reg {
            0x11 => (self.regs[0x11] & 0x7f) | ((self.raster.get_bit(8) as u8) << 7),
            0x12 => self.raster as u8,
            0x19 => self.regs[0x19] | 0x70,
            0x1e | 0x1f => {
                let value = self.regs[reg];
                self.regs[reg] = 0;
                value
            }
            _ => self.regs[reg],
        }
    }

    pub fn write(&mut self, reg: u8, value: u8) {
        let reg = reg as usize % REG_COUNT;
        match reg {
            0x12 => self.raster_compare = (self.raster_compare & 0x100) | u16::from(value),
            0x11 => {
                self.raster_compare.set_bit(8, value.get_bit(7));
                self.regs[reg] = value;
            }
            0x19 => {
                self.regs[0x19] &= !(value & 0x0f);
                if self.regs[0x19] & 0x0f == 0 {
                    self.regs[0x19] = 0;
                    self.irq_line.borrow_mut().set_low(1, false);
                }
            }
            _ => self.regs[reg] = value,
        }
    }
}

impl Chip for Vic {
    fn clock(&mut self) {
        Vic::clock(self)
    }
    fn clock_delta(&mut self, delta: u32) {
        Vic::clock_delta(self, delta)
    }
    fn process_vsync(&mut self) {
        Vic::process_vsync(self)
    }
    fn reset(&mut self) {
        Vic::reset(self)
    }
    fn read(&mut self, reg: u8) -> u8 {
        Vic::read(self, reg)
    }
    fn write(&mut self, reg: u8, value: u8) {
        Vic::write(self, reg, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{new_shared, new_shared_cell};

    struct NullOutput;

    impl VideoOutput for NullOutput {
        fn get_dimension(&self) -> (usize, usize) {
            (0, 0)
        }
        fn reset(&mut self) {}
        fn write(&mut self, _index: usize, _color: u8) {}
    }

    fn new_vic() -> Vic {
        Vic::new(
            VicModel::Mos6569,
            new_shared(Ram::new(0x0400)),
            new_shared(Ram::new(0x10000)),
            new_shared(Rom::new_with_data(&[0u8; 0x1000], 0x1000)),
            new_shared_cell(0u16),
            new_shared(NullOutput),
            new_shared_cell(false),
            new_shared(Pin::new(true)),
            new_shared(IrqLine::new("vic-irq")),
        )
    }

    #[test]
    fn raster_register_tracks_line_counter() {
        let mut vic = new_vic();
        for _ in 0..63 {
            vic.clock();
        }
        assert_eq!(1, vic.read(0x12));
    }

    #[test]
    fn raster_compare_match_sets_irq_and_status_bit() {
        let mut vic = new_vic();
        vic.write(0x12, 1);
        vic.write(0x1a, 0x01);
        for _ in 0..63 {
            vic.clock();
        }
        assert!(vic.irq_line.borrow().is_low());
        assert_eq!(0x81, vic.read(0x19) & 0x81);
    }

    #[test]
    fn clearing_the_irq_status_bit_releases_the_irq_line() {
        let mut vic = new_vic();
        vic.write(0x12, 1);
        vic.write(0x1a, 0x01);
        for _ in 0..63 {
            vic.clock();
        }
        vic.write(0x19, 0x01);
        assert_eq!(0, vic.read(0x19) & 0x01);
        assert!(!vic.irq_line.borrow().is_low());
    }
}
