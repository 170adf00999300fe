// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

mod expansion_port;
mod memory;
mod memory_map;
mod mmio;
mod pla;

pub use self::expansion_port::ExpansionPort;
pub use self::memory::Memory;
pub use self::memory_map::{mode_index, BankConfig, MemoryMap};
pub use self::mmio::Mmio;
pub use self::pla::Pla;
pub use mos64_core::Bank;
