// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use core::fmt;

/// Version of the snapshot binary format this build writes and expects.
/// Bumped whenever the layout `C64::save_snapshot` produces changes.
pub const SNAPSHOT_VERSION: (u8, u8, u8) = (1, 0, 0);

#[derive(Debug, PartialEq, Eq)]
pub enum SnapshotError {
    /// The snapshot's version header doesn't match this build's.
    VersionMismatch,
    /// The snapshot is too short or otherwise doesn't fit the expected layout.
    Corrupt,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SnapshotError::VersionMismatch => write!(f, "snapshot version mismatch"),
            SnapshotError::Corrupt => write!(f, "corrupt snapshot data"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SnapshotError {}
