// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

mod chip_factory;
mod system_model;
mod types;

pub use self::chip_factory::ChipFactory;
pub use self::system_model::{SidModel, SystemModel, VicModel};
pub use self::types::*;
