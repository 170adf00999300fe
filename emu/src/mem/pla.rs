// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use mos64_core::{Bank, Mmu};

use super::{BankConfig, MemoryMap};

/// Standalone `Mmu` driving the bank-switching view of the address space.
/// Shared between the `Memory` bus (which asks it where reads/writes should
/// land) and anything else that needs bank introspection without causing a
/// side-effecting read (the debugger, a cartridge probing its own windows).
pub struct Pla {
    map: MemoryMap,
    config: BankConfig,
}

impl Pla {
    pub fn new() -> Self {
        let map = MemoryMap::default();
        let config = map.get(31);
        Pla { map, config }
    }

    /// Lets a cartridge layer overrides onto the currently active row
    /// (e.g. Isepic remapping $d000/$f000 reads to cartridge RAM) without
    /// disturbing the underlying table; the next `switch_banks` call
    /// recomputes from the table and drops them.
    pub fn apply_overrides(&mut self, overrides: &[(u8, Option<Bank>, Option<Bank>)]) {
        self.config.apply_overrides(overrides);
    }
}

impl Default for Pla {
    fn default() -> Self {
        Self::new()
    }
}

impl Mmu for Pla {
    fn map(&self, address: u16) -> Bank {
        self.config.peek((address >> 12) as u8)
    }

    fn poke_target(&self, address: u16) -> Bank {
        self.config.poke((address >> 12) as u8)
    }

    fn switch_banks(&mut self, mode: u8) {
        self.config = self.map.get(mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pla_starts_in_the_kernal_basic_io_configuration() {
        let pla = Pla::new();
        assert_eq!(Bank::Basic, pla.map(0xa000));
        assert_eq!(Bank::Io, pla.map(0xd000));
        assert_eq!(Bank::Kernal, pla.map(0xe000));
    }

    #[test]
    fn switch_banks_changes_the_active_row() {
        let mut pla = Pla::new();
        pla.switch_banks(0);
        assert_eq!(Bank::Ram, pla.map(0xa000));
        assert_eq!(Bank::Ram, pla.map(0xd000));
        assert_eq!(Bank::Ram, pla.map(0xe000));
    }

    #[test]
    fn writes_fall_through_rom_to_ram() {
        let pla = Pla::new();
        assert_eq!(Bank::Kernal, pla.map(0xe000));
        assert_eq!(Bank::Ram, pla.poke_target(0xe000));
    }

    #[test]
    fn overrides_are_dropped_on_next_bank_switch() {
        let mut pla = Pla::new();
        pla.apply_overrides(&[(0xd, Some(Bank::RomL), None)]);
        assert_eq!(Bank::RomL, pla.map(0xd000));
        pla.switch_banks(31);
        assert_eq!(Bank::Io, pla.map(0xd000));
    }
}
