// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use mos64_core::Bank;
use mos64_core::Bank::{Basic, Charset, Disabled, Io, Kernal, Ram, RomH, RomL};

// Spec: COMMODORE 64 MEMORY MAPS p. 263 (LORAM/HIRAM/CHAREN/GAME/EXROM bank
// switching matrix). The 5-bit mode index is, MSB to LSB, EXROM GAME CHAREN
// HIRAM LORAM; row 16..=23 (EXROM=1, GAME=0) is the cartridge Ultimax
// configuration, where most of the address space reads as `Bank::Disabled`
// (open bus) outside the two cartridge ROM windows.

/// Packs the five bank-switching selector bits into the table index used by
/// `MemoryMap::get`/`BankConfig`.
pub fn mode_index(loram: bool, hiram: bool, charen: bool, game: bool, exrom: bool) -> u8 {
    (exrom as u8) << 4 | (game as u8) << 3 | (charen as u8) << 2 | (hiram as u8) << 1 | (loram as u8)
}

/// The resolved bank tag for each of the 16 address zones ($0000, $1000, ...,
/// $f000) under one mode, split into the two lookup tables the zone's reads
/// and writes are driven from. They usually agree (e.g. a `Basic` zone reads
/// BASIC ROM and writes through to RAM underneath it) but a cartridge's
/// `apply_override` may steer them independently (Isepic remaps the read side
/// of $d000/$f000 to cartridge RAM while leaving the write side alone).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BankConfig {
    peek_src: [Bank; 16],
    poke_target: [Bank; 16],
}

/// Writes to any ROM-backed zone (BASIC/KERNAL/charset/cartridge ROML/ROMH)
/// and to the zone-0 processor-port window fall straight through to the RAM
/// underneath it, matching how the real PLA only gates reads, never writes.
const fn poke_for(bank: Bank) -> Bank {
    match bank {
        Bank::Io => Bank::Io,
        Bank::Disabled => Bank::Disabled,
        _ => Bank::Ram,
    }
}

impl BankConfig {
    const fn from_zones(zones: [Bank; 16]) -> Self {
        let poke_target = [
            poke_for(zones[0]), poke_for(zones[1]), poke_for(zones[2]), poke_for(zones[3]),
            poke_for(zones[4]), poke_for(zones[5]), poke_for(zones[6]), poke_for(zones[7]),
            poke_for(zones[8]), poke_for(zones[9]), poke_for(zones[10]), poke_for(zones[11]),
            poke_for(zones[12]), poke_for(zones[13]), poke_for(zones[14]), poke_for(zones[15]),
        ];
        BankConfig {
            peek_src: zones,
            poke_target,
        }
    }

    /// Bank driving reads in the given $_000 zone (0..=15).
    pub fn peek(&self, zone: u8) -> Bank {
        self.peek_src[zone as usize]
    }

    /// Bank driving writes in the given $_000 zone (0..=15).
    pub fn poke(&self, zone: u8) -> Bank {
        self.poke_target[zone as usize]
    }

    pub fn peek_src(&self) -> &[Bank; 16] {
        &self.peek_src
    }

    pub fn poke_target(&self) -> &[Bank; 16] {
        &self.poke_target
    }

    /// Lets a cartridge steer individual zones away from the stock table
    /// (e.g. Isepic remapping $d000/$f000 reads to cartridge RAM). Only
    /// zones present in `overrides` are touched.
    pub fn apply_overrides(&mut self, overrides: &[(u8, Option<Bank>, Option<Bank>)]) {
        for &(zone, peek, poke) in overrides {
            if let Some(bank) = peek {
                self.peek_src[zone as usize] = bank;
            }
            if let Some(bank) = poke {
                self.poke_target[zone as usize] = bank;
            }
        }
    }
}

/// Expands a compact 7-zone-group config (as the classic C64 bank switching
/// table is usually drawn: one column per $0000, $1000-$7000, $8000-$9000,
/// $a000-$b000, $c000, $d000, $e000-$f000) into the literal 16-entry table.
/// Zone 0 always carries `Bank::ProcessorPort` regardless of `groups[0]`: the
/// CPU itself special-cases addresses $0000/$0001 ahead of memory dispatch,
/// so the bank map only needs to mark the zone as such for introspection
/// (the debugger, a cartridge probing what's mapped in).
const fn expand_zones(groups: [Bank; 7]) -> [Bank; 16] {
    let [_z0, z1_7, z8_9, za_b, zc, zd, ze_f] = groups;
    [
        Bank::ProcessorPort,
        z1_7, z1_7, z1_7, z1_7, z1_7, z1_7, z1_7,
        z8_9, z8_9,
        za_b, za_b,
        zc,
        zd,
        ze_f, ze_f,
    ]
}

const ALL_RAM: [Bank; 7] = [Ram, Ram, Ram, Ram, Ram, Ram, Ram];
const M2: [Bank; 7] = [Ram, Ram, Ram, RomH, Ram, Charset, Kernal];
const M3: [Bank; 7] = [Ram, Ram, RomL, RomH, Ram, Charset, Kernal];
const M5_29_13: [Bank; 7] = [Ram, Ram, Ram, Ram, Ram, Io, Ram];
const M6: [Bank; 7] = [Ram, Ram, Ram, RomH, Ram, Io, Kernal];
const M7: [Bank; 7] = [Ram, Ram, RomL, RomH, Ram, Io, Kernal];
const M11: [Bank; 7] = [Ram, Ram, RomL, Basic, Ram, Charset, Kernal];
const M15: [Bank; 7] = [Ram, Ram, RomL, Basic, Ram, Io, Kernal];
const M23_16: [Bank; 7] = [Ram, Disabled, RomL, Disabled, Disabled, Io, RomH];
const M25_9: [Bank; 7] = [Ram, Ram, Ram, Ram, Ram, Charset, Ram];
const M26_10: [Bank; 7] = [Ram, Ram, Ram, Ram, Ram, Charset, Kernal];
const M27: [Bank; 7] = [Ram, Ram, Ram, Basic, Ram, Charset, Kernal];
const M30_14: [Bank; 7] = [Ram, Ram, Ram, Ram, Ram, Io, Kernal];
const M31: [Bank; 7] = [Ram, Ram, Ram, Basic, Ram, Io, Kernal];

/// The 32-row bank-switching matrix, indexed by `mode_index`. Each row is a
/// `BankConfig` whose `peek_src`/`poke_target` start out identical; cartridge
/// overrides are layered on top per-mode by the caller (`Memory`), not baked
/// in here, since they depend on which cartridge (if any) is inserted.
pub struct MemoryMap {
    modes: [BankConfig; 32],
}

impl MemoryMap {
    pub fn get(&self, mode: u8) -> BankConfig {
        self.modes[mode as usize]
    }
}

impl Default for MemoryMap {
    fn default() -> Self {
        let rows: [[Bank; 7]; 32] = [
            ALL_RAM,    // 0
            ALL_RAM,    // 1
            M2,         // 2
            M3,         // 3
            ALL_RAM,    // 4
            M5_29_13,   // 5
            M6,         // 6
            M7,         // 7
            ALL_RAM,    // 8
            M25_9,      // 9
            M26_10,     // 10
            M11,        // 11
            ALL_RAM,    // 12
            M5_29_13,   // 13
            M30_14,     // 14
            M15,        // 15
            M23_16,     // 16
            M23_16,     // 17
            M23_16,     // 18
            M23_16,     // 19
            M23_16,     // 20
            M23_16,     // 21
            M23_16,     // 22
            M23_16,     // 23
            ALL_RAM,    // 24
            M25_9,      // 25
            M26_10,     // 26
            M27,        // 27
            ALL_RAM,    // 28
            M5_29_13,   // 29
            M30_14,     // 30
            M31,        // 31
        ];
        let mut modes = [BankConfig::from_zones(expand_zones(ALL_RAM)); 32];
        let mut i = 0;
        while i < 32 {
            modes[i] = BankConfig::from_zones(expand_zones(rows[i]));
            i += 1;
        }
        MemoryMap { modes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_zero_is_always_processor_port() {
        let map = MemoryMap::default();
        for mode in 0..32u8 {
            assert_eq!(Bank::ProcessorPort, map.get(mode).peek(0));
        }
    }

    #[test]
    fn mode_31_is_the_default_kernal_basic_io_configuration() {
        let map = MemoryMap::default();
        let config = map.get(mode_index(true, true, true, true, true));
        assert_eq!(31, mode_index(true, true, true, true, true));
        assert_eq!(Bank::Basic, config.peek(0xa));
        assert_eq!(Bank::Io, config.peek(0xd));
        assert_eq!(Bank::Kernal, config.peek(0xe));
    }

    #[test]
    fn ultimax_mode_opens_the_bus_outside_cartridge_windows() {
        let map = MemoryMap::default();
        let config = map.get(mode_index(false, false, false, false, true));
        assert_eq!(16, mode_index(false, false, false, false, true));
        assert_eq!(Bank::Disabled, config.peek(0x1));
        assert_eq!(Bank::RomL, config.peek(0x8));
        assert_eq!(Bank::Disabled, config.peek(0xb));
        assert_eq!(Bank::Io, config.peek(0xd));
        assert_eq!(Bank::RomH, config.peek(0xe));
    }

    #[test]
    fn write_path_falls_back_to_ram_under_rom() {
        let map = MemoryMap::default();
        let config = map.get(mode_index(true, true, true, true, true));
        assert_eq!(Bank::Ram, config.poke(0xe));
    }

    #[test]
    fn apply_overrides_only_touches_named_zones() {
        let map = MemoryMap::default();
        let mut config = map.get(mode_index(true, true, true, true, false));
        config.apply_overrides(&[(0xd, Some(Bank::RomL), None)]);
        assert_eq!(Bank::RomL, config.peek(0xd));
        assert_eq!(Bank::Ram, config.peek(0xc));
        assert_eq!(Bank::Io, config.poke(0xd));
    }
}
