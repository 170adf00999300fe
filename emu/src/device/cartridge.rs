// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;
use bit_field::BitField;
use log::LogLevel;
use mos64_core::Bank;

// Spec: http://ist.uwaterloo.ca/~schepers/formats/CRT.TXT

pub enum ChipType {
    Rom,
    Ram,
    FlashRom,
}

impl ChipType {
    pub fn from(chip_type: u16) -> ChipType {
        match chip_type {
            0x00 => ChipType::Rom,
            0x01 => ChipType::Ram,
            0x02 => ChipType::FlashRom,
            _ => panic!("invalid chip type {}", chip_type),
        }
    }
}

pub struct Chip {
    pub chip_type: ChipType,
    pub bank_number: u8,
    pub offset: u16,
    pub size: u16,
    pub data: Vec<u8>,
}

/// Declarative layout for the long tail of named hardware types that differ
/// from one of the bespoke variants only in register offset, bank width, or
/// fixed GAME/EXROM behavior (StarDOS, Kingsoft, Dinamic, Zipp-Code Saw,
/// Silverrock 128, Mach 5, Diashow Maker, Super Snapshot variants, ...).
#[derive(Clone, Copy, PartialEq)]
pub struct GenericLayout {
    pub bank_on_io2: bool,
    pub bank_follows_read_address: bool,
    pub bank_mask: u8,
}

impl Default for GenericLayout {
    fn default() -> Self {
        GenericLayout {
            bank_on_io2: false,
            bank_follows_read_address: false,
            bank_mask: 0x3f,
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
pub enum HwType {
    Normal,
    ActionReplay,
    KcsPower,
    Final3,
    SimonsBasic,
    OceanType1,
    Expert,
    FunPlay,
    SuperGames,
    EasyFlash,
    GeoRam,
    Zaxxon,
    MagicDesk,
    Westermann,
    Rex,
    EpyxFastLoad,
    WarpSpeed,
    Isepic,
    Comal80,
    FreezeFrame,
    Generic(GenericLayout),
}

impl HwType {
    pub fn from(value: u16) -> HwType {
        match value {
            0 => HwType::Normal,
            1 => HwType::ActionReplay,
            2 => HwType::KcsPower,
            3 => HwType::Final3,
            4 => HwType::SimonsBasic,
            5 => HwType::OceanType1,
            6 => HwType::Expert,
            7 => HwType::FunPlay,
            8 => HwType::SuperGames,
            10 => HwType::EpyxFastLoad,
            11 => HwType::Westermann,
            12 => HwType::Rex,
            16 => HwType::WarpSpeed,
            18 => HwType::Zaxxon,
            19 => HwType::MagicDesk,
            21 => HwType::Comal80,
            32 => HwType::EasyFlash,
            45 => HwType::FreezeFrame,
            60 => HwType::GeoRam,
            82 => HwType::Isepic,
            _ => HwType::Generic(GenericLayout::default()),
        }
    }

    pub fn is_mirrowed(&self) -> bool {
        matches!(self, HwType::OceanType1 | HwType::MagicDesk | HwType::Normal)
    }
}

pub struct IoConfig {
    pub exrom: bool,
    pub game: bool,
}

impl IoConfig {
    pub fn new() -> Self {
        IoConfig {
            exrom: true,
            game: true,
        }
    }
}

impl Default for IoConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Epyx FastLoad's on-board capacitor discharges on ROML/IO1 access and
/// charges back up over time; once it's been idle this many cycles the
/// cartridge grounds itself out of the memory map.
const EPYX_CAPACITOR_CYCLES: u32 = 512;

#[allow(unused)]
pub struct Cartridge {
    version: u16,
    hw_type: HwType,
    exrom: bool,
    game: bool,
    banks: Vec<Option<Chip>>,
    io_observer: Option<Box<dyn Fn(&IoConfig)>>,
    is_mirrowed: bool,
    ram: Option<Vec<u8>>,
    // Runtime state
    bank_lo: Option<usize>,
    bank_hi: Option<usize>,
    io_config: IoConfig,
    reg_value: u8,
    ram_bank: usize,
    ram_enabled: bool,
    locked: bool,
    freeze_pending: bool,
    nmi_counter: u8,
    switch_pos: i8,
    capacitor: u32,
}

impl Cartridge {
    pub fn new(version: u16, hw_type: HwType, exrom: bool, game: bool) -> Self {
        let ram = match hw_type {
            HwType::GeoRam => Some(vec![0; 512 * 1024]),
            HwType::Isepic => Some(vec![0; 2048]),
            HwType::Expert => Some(vec![0; 8192]),
            _ => None,
        };
        let mut banks = Vec::with_capacity(64);
        banks.resize_with(64, || None);
        Cartridge {
            version,
            is_mirrowed: hw_type.is_mirrowed(),
            hw_type,
            exrom,
            game,
            banks,
            io_observer: None,
            ram,
            bank_lo: None,
            bank_hi: None,
            io_config: IoConfig::new(),
            reg_value: 0,
            ram_bank: 0,
            ram_enabled: false,
            locked: false,
            freeze_pending: false,
            nmi_counter: 0,
            switch_pos: 0,
            capacitor: 0,
        }
    }

    pub fn set_io_observer(&mut self, observer: Option<Box<dyn Fn(&IoConfig)>>) {
        self.io_observer = observer;
    }

    pub fn add(&mut self, chip: Chip) {
        let bank_num = chip.bank_number as usize;
        self.banks[bank_num] = Some(chip);
    }

    pub fn has_freeze_button(&self) -> bool {
        matches!(self.hw_type, HwType::ActionReplay | HwType::Final3 | HwType::Expert)
    }

    pub fn has_reset_button(&self) -> bool {
        true
    }

    pub fn has_switch(&self) -> bool {
        matches!(self.hw_type, HwType::Expert)
    }

    /// -1 = OFF, 0 = PRG, 1 = ON.
    pub fn get_switch(&self) -> i8 {
        self.switch_pos
    }

    pub fn set_switch(&mut self, position: i8) {
        self.switch_pos = position;
        if self.hw_type == HwType::Expert {
            self.reset();
        }
    }

    pub fn press_freeze_button(&mut self) {
        if !self.has_freeze_button() {
            return;
        }
        self.freeze_pending = true;
        if self.hw_type == HwType::ActionReplay {
            self.io_config.exrom = false;
            self.io_config.game = false;
            self.notify_io_changed();
        }
    }

    pub fn release_freeze_button(&mut self) {
        self.freeze_pending = false;
    }

    /// Final Cartridge III delays grounding GAME by a few cycles after the
    /// freeze button is pressed so the CPU reads the NMI vector under the
    /// old bank configuration.
    pub fn nmi_will_trigger(&mut self) {
        if self.hw_type == HwType::Final3 && self.freeze_pending {
            self.nmi_counter = 4;
        }
    }

    pub fn nmi_did_trigger(&mut self) {
        if self.hw_type == HwType::Final3 && self.nmi_counter > 0 {
            self.nmi_counter -= 1;
            if self.nmi_counter == 0 {
                self.io_config.game = false;
                self.notify_io_changed();
            }
        }
    }

    /// Per-cycle hook for cartridges with internal timing state independent
    /// of bus access (Epyx FastLoad's capacitor).
    pub fn execute(&mut self, delta: u32) {
        if self.hw_type == HwType::EpyxFastLoad && self.capacitor < EPYX_CAPACITOR_CYCLES {
            self.capacitor = self.capacitor.saturating_add(delta);
            if self.capacitor >= EPYX_CAPACITOR_CYCLES {
                self.io_config.exrom = true;
                self.notify_io_changed();
            }
        }
    }

    /// Overrides the PLA's peek/poke table should layer in while this
    /// cartridge is active (Isepic remapping $D000/$F000 reads to its
    /// onboard RAM page while its switch is engaged). Forwarded by
    /// `ExpansionPort::peek_poke_overrides` into `Pla::apply_overrides`.
    pub fn peek_poke_overrides(&self) -> Vec<(u8, Option<Bank>, Option<Bank>)> {
        if self.hw_type == HwType::Isepic && self.switch_pos >= 0 {
            vec![(0xd, Some(Bank::RomH), None), (0xf, Some(Bank::RomH), None)]
        } else {
            Vec::new()
        }
    }

    pub fn reset(&mut self) {
        self.bank_lo = None;
        self.bank_hi = None;
        self.ram_bank = 0;
        self.ram_enabled = false;
        self.locked = false;
        self.freeze_pending = false;
        self.nmi_counter = 0;
        self.capacitor = 0;
        self.reset_cart_config();
        if self.banks.iter().any(Option::is_some) {
            self.switch_bank(0);
        }
        self.notify_io_changed();
    }

    /// Forces GAME/EXROM back to the cartridge's power-on state.
    pub fn reset_cart_config(&mut self) {
        self.io_config = match self.hw_type {
            HwType::Expert => IoConfig {
                exrom: self.switch_pos != 1,
                game: true,
            },
            _ => IoConfig {
                exrom: self.exrom,
                game: self.game,
            },
        };
    }

    fn notify_io_changed(&self) {
        if let Some(ref observer) = self.io_observer {
            observer(&self.io_config);
        }
    }

    fn switch_bank(&mut self, bank_number: u8) {
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "cartridge", "Switching to bank {} game {} exrom {}", bank_number, self.io_config.game, self.io_config.exrom);
        }
        if let Some(bank) = self.banks[bank_number as usize].as_ref() {
            match bank.offset {
                0x8000 => {
                    self.bank_lo = Some(bank.bank_number as usize);
                    if self.is_mirrowed {
                        self.bank_hi = self.bank_lo;
                    } else {
                        self.bank_hi = None;
                    }
                }
                0xa000 | 0xe000 => {
                    self.bank_hi = Some(bank.bank_number as usize);
                    if self.is_mirrowed {
                        self.bank_lo = self.bank_hi;
                    } else {
                        self.bank_lo = None;
                    }
                }
                _ => panic!("invalid load address {:04x}", bank.offset),
            }
        }
    }

    // -- Device I/O

    fn read_io1(&mut self, address: u16) -> u8 {
        match self.hw_type {
            HwType::KcsPower => {
                self.io_config.exrom = false;
                self.io_config.game = true;
                self.notify_io_changed();
            }
            HwType::WarpSpeed => {
                self.io_config.exrom = false;
                self.notify_io_changed();
            }
            HwType::FreezeFrame => {
                self.io_config.exrom = false;
                self.io_config.game = true;
                self.notify_io_changed();
            }
            HwType::Westermann | HwType::Rex => {
                self.switch_bank((address & 0x3f) as u8);
            }
            HwType::EpyxFastLoad => {
                self.capacitor = 0;
                self.io_config.exrom = false;
                self.notify_io_changed();
            }
            HwType::Isepic if self.switch_pos >= 0 => {
                let ram = self.ram.as_ref().unwrap();
                let len = ram.len();
                let page = self.ram_bank * 256 + (address & 0xff) as usize;
                return ram[page % len];
            }
            HwType::Generic(layout) if layout.bank_follows_read_address && !layout.bank_on_io2 => {
                self.switch_bank((address as u8) & layout.bank_mask);
            }
            _ => {}
        }
        self.reg_value
    }

    fn read_io2(&mut self, address: u16) -> u8 {
        match self.hw_type {
            HwType::GeoRam => {
                let ram = self.ram.as_ref().unwrap();
                let len = ram.len();
                let offset = self.ram_bank * 256 + (address & 0xff) as usize;
                ram[offset % len]
            }
            HwType::Generic(layout) if layout.bank_follows_read_address && layout.bank_on_io2 => {
                self.switch_bank((address as u8) & layout.bank_mask);
                self.reg_value
            }
            _ => self.reg_value,
        }
    }

    fn write_io1(&mut self, address: u16, value: u8) {
        self.reg_value = value;
        match self.hw_type {
            HwType::ActionReplay => {
                if self.locked {
                    return;
                }
                self.switch_bank(value & 0x03);
                self.io_config.exrom = !value.get_bit(4);
                self.io_config.game = value.get_bit(0) || value.get_bit(5);
                self.ram_enabled = value.get_bit(5);
                self.locked = value.get_bit(2);
                self.notify_io_changed();
            }
            HwType::SimonsBasic => {
                self.io_config.exrom = true;
                self.io_config.game = true;
                self.notify_io_changed();
            }
            HwType::OceanType1 => {
                if value.get_bit(7) {
                    self.switch_bank(value & 0x3f);
                }
            }
            HwType::Expert => {
                if self.switch_pos == 1 {
                    let ram = self.ram.as_mut().unwrap();
                    let len = ram.len();
                    let offset = (address & 0x1fff) as usize;
                    ram[offset % len] = value;
                }
            }
            HwType::Normal => {
                self.switch_bank(value & 0x3f);
            }
            HwType::FunPlay => {
                let bank = (value & 0x01) | ((value >> 3) & 0x06) | ((value >> 2) & 0x08);
                self.switch_bank(bank);
            }
            HwType::SuperGames => {
                if !self.locked {
                    self.switch_bank(value & 0x03);
                    self.io_config.exrom = value.get_bit(2);
                    self.locked = value.get_bit(3);
                    self.notify_io_changed();
                }
            }
            HwType::Zaxxon => {
                self.switch_bank(value & 0x01);
            }
            HwType::MagicDesk => {
                if !value.get_bit(7) {
                    self.switch_bank(value & 0x3f);
                    self.io_config.exrom = self.exrom;
                    self.io_config.game = self.game;
                    self.notify_io_changed();
                } else {
                    self.io_config.exrom = true;
                    self.io_config.game = true;
                    self.notify_io_changed();
                }
            }
            HwType::Comal80 => {
                self.switch_bank(value & 0x03);
                self.io_config.exrom = value.get_bit(6);
                self.notify_io_changed();
            }
            HwType::EasyFlash if address == 0xde00 => {
                self.switch_bank(value & 0x3f);
            }
            HwType::EasyFlash if address == 0xde02 => {
                self.io_config.game = value.get_bit(0);
                self.io_config.exrom = value.get_bit(1);
                self.notify_io_changed();
            }
            HwType::Generic(layout) if !layout.bank_on_io2 && !layout.bank_follows_read_address => {
                self.switch_bank(value & layout.bank_mask);
            }
            _ => {}
        }
    }

    fn write_io2(&mut self, address: u16, value: u8) {
        match self.hw_type {
            HwType::GeoRam if address == 0xdffe => {
                self.ram_bank = (self.ram_bank & !0xff) | value as usize;
            }
            HwType::GeoRam if address == 0xdfff => {
                self.ram_bank = (self.ram_bank & 0xff) | ((value as usize) << 8);
            }
            HwType::GeoRam => {
                let ram = self.ram.as_mut().unwrap();
                let len = ram.len();
                let offset = self.ram_bank * 256 + (address & 0xff) as usize;
                ram[offset % len] = value;
            }
            HwType::Isepic if address == 0xdf00 => {
                self.ram_bank = value as usize;
            }
            HwType::Final3 if address == 0xdfff => {
                if self.locked {
                    return;
                }
                self.switch_bank(value & 0x03);
                self.io_config.exrom = !value.get_bit(4);
                self.io_config.game = value.get_bit(5);
                self.locked = value.get_bit(6);
                self.notify_io_changed();
            }
            HwType::Generic(layout) if layout.bank_on_io2 && !layout.bank_follows_read_address => {
                self.switch_bank(value & layout.bank_mask);
            }
            _ => {}
        }
    }

    pub fn read(&mut self, address: u16) -> Option<u8> {
        match address {
            0x8000..=0x9fff => {
                if let Some(bank_num) = self.bank_lo {
                    let bank = self.banks[bank_num].as_ref().unwrap();
                    Some(bank.data[(address - 0x8000) as usize % bank.data.len()])
                } else if self.hw_type == HwType::Expert && self.switch_pos == 1 {
                    let ram = self.ram.as_ref().unwrap();
                    let len = ram.len();
                    Some(ram[(address & 0x1fff) as usize % len])
                } else {
                    None
                }
            }
            0xa000..=0xbfff | 0xe000..=0xffff => {
                if let Some(bank_num) = self.bank_hi {
                    let bank = self.banks[bank_num].as_ref().unwrap();
                    let offset = if bank.offset == 0x8000 {
                        address - 0x8000
                    } else {
                        address - bank.offset
                    };
                    Some(bank.data[offset as usize % bank.data.len()])
                } else {
                    None
                }
            }
            0xde00..=0xdeff => Some(self.read_io1(address)),
            0xdf00..=0xdfff => Some(self.read_io2(address)),
            _ => None,
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        match address {
            0xde00..=0xdeff => self.write_io1(address, value),
            0xdf00..=0xdfff => self.write_io2(address, value),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_chip(offset: u16, bank_number: u8, byte: u8) -> Chip {
        Chip {
            chip_type: ChipType::Rom,
            bank_number,
            offset,
            size: 0x2000,
            data: vec![byte; 0x2000],
        }
    }

    #[test]
    fn normal_cartridge_switches_banks_on_io1_write() {
        let mut cart = Cartridge::new(1, HwType::Normal, false, true);
        cart.add(rom_chip(0x8000, 0, 0xaa));
        cart.add(rom_chip(0x8000, 1, 0xbb));
        cart.reset();
        assert_eq!(Some(0xaa), cart.read(0x8000));
        cart.write(0xde00, 1);
        assert_eq!(Some(0xbb), cart.read(0x8000));
    }

    #[test]
    fn action_replay_lock_bit_freezes_configuration() {
        let mut cart = Cartridge::new(1, HwType::ActionReplay, false, true);
        cart.add(rom_chip(0x8000, 0, 0x01));
        cart.add(rom_chip(0x8000, 1, 0x02));
        cart.reset();
        cart.write(0xde00, 0b0000_0101); // lock bit set, bank 1
        assert_eq!(Some(0x02), cart.read(0x8000));
        cart.write(0xde00, 0); // should be ignored, still locked
        assert_eq!(Some(0x02), cart.read(0x8000));
    }

    #[test]
    fn georam_addresses_a_ram_page_through_io2() {
        let mut cart = Cartridge::new(1, HwType::GeoRam, true, true);
        cart.write(0xdffe, 2); // select page 2
        cart.write(0xdf10, 0x42);
        assert_eq!(Some(0x42), cart.read(0xdf10));
        cart.write(0xdffe, 0); // switch away
        assert_eq!(Some(0x00), cart.read(0xdf10));
    }

    #[test]
    fn generic_layout_falls_back_for_unlisted_hardware_types() {
        let cart = Cartridge::new(1, HwType::from(9999), false, true);
        assert!(matches!(cart.hw_type, HwType::Generic(_)));
    }

    #[test]
    fn easyflash_mode_register_drives_game_exrom_lines() {
        let mut cart = Cartridge::new(1, HwType::EasyFlash, true, true);
        cart.add(rom_chip(0x8000, 0, 0x10));
        cart.add(rom_chip(0xa000, 0, 0x20));
        cart.reset();
        cart.write(0xde02, 0b0000_0011); // game=1, exrom=1: both banks visible
        assert!(cart.io_config.game);
        assert!(cart.io_config.exrom);
    }

    #[test]
    fn epyx_fastload_capacitor_discharges_after_idle_cycles() {
        let mut cart = Cartridge::new(1, HwType::EpyxFastLoad, true, true);
        cart.reset();
        cart.read(0xde00);
        assert!(!cart.io_config.exrom);
        cart.execute(EPYX_CAPACITOR_CYCLES);
        assert!(cart.io_config.exrom);
    }

    #[test]
    fn isepic_overrides_only_apply_when_switch_engaged() {
        let mut cart = Cartridge::new(1, HwType::Isepic, true, true);
        cart.set_switch(-1);
        assert!(cart.peek_poke_overrides().is_empty());
        cart.set_switch(0);
        assert!(!cart.peek_poke_overrides().is_empty());
    }
}
