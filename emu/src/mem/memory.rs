// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;
use mos64_core::{Addressable, AddressableFaded, Bank, Mmu, Ram, Rom, Shared};

// Spec: COMMODORE 64 MEMORY MAPS p. 263
// Design:
//   Inspired by UAE memory address64k/bank concepts.
//   We define Addressable trait to represent a bank of memory and use memory configuration
//   based on zones that can be mapped to different banks. CPU uses IoPort @ 0x0001 to reconfigure
//   memory layout. Bank routing itself lives in the shared `Pla`/`Mmu` rather
//   than here, so the debugger (or a cartridge) can query it without going
//   through a full, side-effecting bus read.

pub struct Memory {
    mmu: Shared<dyn Mmu>,
    // Addressable
    basic: Shared<Rom>,
    charset: Shared<Rom>,
    expansion_port: Shared<dyn AddressableFaded>,
    io: Box<dyn Addressable>,
    kernal: Shared<Rom>,
    ram: Shared<Ram>,
}

impl Memory {
    pub fn new(
        mmu: Shared<dyn Mmu>,
        expansion_port: Shared<dyn AddressableFaded>,
        io: Box<dyn Addressable>,
        ram: Shared<Ram>,
        rom_basic: Shared<Rom>,
        rom_charset: Shared<Rom>,
        rom_kernal: Shared<Rom>,
    ) -> Self {
        Memory {
            mmu,
            basic: rom_basic,
            charset: rom_charset,
            expansion_port,
            io,
            kernal: rom_kernal,
            ram,
        }
    }
}

impl Addressable for Memory {
    fn read(&self, address: u16) -> u8 {
        match self.mmu.borrow().map(address) {
            Bank::Ram | Bank::ProcessorPort => self.ram.borrow().read(address),
            Bank::Basic => self.basic.borrow().read(address),
            Bank::Charset => self.charset.borrow().read(address & 0x0fff),
            Bank::Kernal => self.kernal.borrow().read(address),
            Bank::RomL => self.expansion_port.borrow_mut().read(address).unwrap_or(0),
            Bank::RomH => self.expansion_port.borrow_mut().read(address).unwrap_or(0),
            Bank::Io => self.io.read(address),
            Bank::Disabled => 0,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match self.mmu.borrow().poke_target(address) {
            Bank::Io => self.io.write(address, value),
            Bank::Disabled => {}
            _ => self.ram.borrow_mut().write(address, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::Pla;
    use mos64_core::new_shared;

    struct FadedRam(Ram);

    impl AddressableFaded for FadedRam {
        fn read(&mut self, address: u16) -> Option<u8> {
            Some(self.0.read(address))
        }

        fn write(&mut self, address: u16, value: u8) {
            self.0.write(address, value)
        }
    }

    fn setup_memory() -> (Memory, Shared<dyn Mmu>) {
        let mmu: Shared<dyn Mmu> = new_shared(Pla::new());
        let basic = new_shared(Rom::new(0x2000, 0xa000, 0x10));
        let charset = new_shared(Rom::new(0x1000, 0x0000, 0x11));
        let kernal = new_shared(Rom::new(0x2000, 0xe000, 0x12));
        let mut mmio = Box::new(Ram::new(0x10000));
        mmio.fill(0x22);
        let mut expansion_ram = Ram::new(0x10000);
        expansion_ram.fill(0x33);
        let expansion_port: Shared<dyn AddressableFaded> = new_shared(FadedRam(expansion_ram));
        let ram = new_shared(Ram::new(0x10000));
        ram.borrow_mut().fill(0x44);
        let mem = Memory::new(mmu.clone(), expansion_port, mmio, ram, basic, charset, kernal);
        (mem, mmu)
    }

    #[test]
    fn read_basic() {
        let (mem, _mmu) = setup_memory();
        assert_eq!(0x10, mem.read(0xa000));
    }

    #[test]
    fn read_charset() {
        let (mem, mmu) = setup_memory();
        mmu.borrow_mut().switch_banks(27);
        assert_eq!(0x11, mem.read(0xd000));
    }

    #[test]
    fn read_io() {
        let (mem, _mmu) = setup_memory();
        assert_eq!(0x22, mem.read(0xd000));
    }

    #[test]
    fn read_kernal() {
        let (mem, _mmu) = setup_memory();
        assert_eq!(0x12, mem.read(0xe000));
    }

    #[test]
    fn write_page_0() {
        let (mut mem, _mmu) = setup_memory();
        mem.write(0x00f0, 0xff);
        assert_eq!(0xff, mem.ram.borrow().read(0x00f0));
    }

    #[test]
    fn write_through_rom_lands_in_ram() {
        let (mut mem, _mmu) = setup_memory();
        mem.write(0xe010, 0xff);
        assert_eq!(0xff, mem.ram.borrow().read(0xe010));
        assert_eq!(0x12, mem.read(0xe010));
    }

    #[test]
    fn ultimax_mode_opens_the_bus_in_unmapped_zones() {
        let (mem, mmu) = setup_memory();
        mmu.borrow_mut().switch_banks(20);
        assert_eq!(0, mem.read(0x1000));
        assert_eq!(0x33, mem.read(0x8000));
    }
}
