// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;
use mos64_emu::drive::Disk;
use mos64_system::{AutostartMethod, Image, C64};

use super::Loader;
use crate::io::{self, Reader};

// SPEC: http://ist.uwaterloo.ca/~schepers/formats/D64.TXT

/// A 35-track sector dump with no error-info bytes appended.
const D64_SIZE: usize = 174848;

struct D64Image {
    disk: Option<Disk>,
}

impl Image for D64Image {
    fn mount(&mut self, c64: &mut C64) {
        info!(target: "loader", "Mounting D64 image");
        if let Some(drive) = c64.drives().first_mut() {
            drive.insert_disk(self.disk.take().unwrap());
        }
    }

    fn unmount(&mut self, c64: &mut C64) {
        if let Some(drive) = c64.drives().first_mut() {
            drive.remove_disk();
        }
    }
}

pub struct D64Loader;

impl D64Loader {
    pub fn new() -> Self {
        Self {}
    }
}

impl Loader for D64Loader {
    fn autostart(&self, reader: &mut dyn Reader) -> io::Result<AutostartMethod> {
        let image = self.load(reader)?;
        Ok(AutostartMethod::WithImage(image))
    }

    fn load(&self, reader: &mut dyn Reader) -> io::Result<Box<dyn Image>> {
        info!(target: "loader", "Loading D64");
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        if data.len() < D64_SIZE {
            return Err(format!(
                "D64 image too short: expected at least {} bytes, got {}",
                D64_SIZE,
                data.len()
            ));
        }
        info!(target: "loader", "Found D64, size {}", data.len());
        let disk = Disk::from_d64(&data[..D64_SIZE]);
        Ok(Box::new(D64Image { disk: Some(disk) }))
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn rejects_an_undersized_image() {
        let mut cursor = Cursor::new(vec![0u8; D64_SIZE - 1]);
        assert!(D64Loader::new().load(&mut cursor).is_err());
    }

    #[test]
    fn loads_a_full_size_sector_dump() {
        let mut cursor = Cursor::new(vec![0u8; D64_SIZE]);
        assert!(D64Loader::new().load(&mut cursor).is_ok());
    }
}
