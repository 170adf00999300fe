// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

mod disk;
mod gcr;
mod via;
mod vc1541;

pub use self::disk::{Disk, GcrTrack, HALFTRACK_COUNT};
pub use self::via::Via6522;
pub use self::vc1541::Vc1541;
