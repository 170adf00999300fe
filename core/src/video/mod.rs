// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

mod mux_unit;
mod vic;
mod vic_memory;

pub use self::mux_unit::{Config as MuxConfig, MuxUnit};
pub use self::vic::Vic;
pub use self::vic_memory::VicMemory;
