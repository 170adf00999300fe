// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;
use byteorder::{ByteOrder, LittleEndian};
use core::str;
use mos64_emu::drive::{Disk, GcrTrack, HALFTRACK_COUNT};
use mos64_system::{AutostartMethod, Image, C64};

use super::Loader;
use crate::io::{self, Reader};

// SPEC: http://www.unusedino.de/ec64/technical/formats/g64.html

static HEADER_SIG: &'static str = "GCR-1541";

struct G64Image {
    disk: Option<Disk>,
}

impl Image for G64Image {
    fn mount(&mut self, c64: &mut C64) {
        info!(target: "loader", "Mounting G64 image");
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

pub struct G64Loader;

impl G64Loader {
    pub fn new() -> Self {
        Self {}
    }

    /// Parses the whole file in memory rather than streaming: the track
    /// offset table points at arbitrary byte offsets, which a sequential
    /// `Reader` can't seek to directly.
    fn parse(&self, data: &[u8]) -> io::Result<Disk> {
        if data.len() < 12 {
            return Err("G64 file too short".to_owned());
        }
        let sig = str::from_utf8(&data[0..8]).map_err(|_| "invalid G64 signature".to_owned())?;
        if sig != HEADER_SIG {
            return Err("invalid G64 signature".to_owned());
        }
        let num_tracks = data[9] as usize;
        let offsets_start = 12;
        let speeds_start = offsets_start + num_tracks * 4;
        if data.len() < speeds_start + num_tracks * 4 {
            return Err("truncated G64 track table".to_owned());
        }
        let mut disk = Disk::blank();
        for track in 0..num_tracks.min(HALFTRACK_COUNT) {
            let offset = LittleEndian::read_u32(&data[offsets_start + track * 4..]) as usize;
            if offset == 0 {
                continue;
            }
            if offset + 2 > data.len() {
                return Err(format!("track {} offset out of range", track + 1));
            }
            let length = LittleEndian::read_u16(&data[offset..]) as usize;
            let start = offset + 2;
            if start + length > data.len() {
                return Err(format!("track {} data out of range", track + 1));
            }
            let bytes = data[start..start + length].to_vec();
            let bit_length = bytes.len() * 8;
            disk.set_halftrack(
                track + 1,
                GcrTrack {
                    data: bytes,
                    length: bit_length,
                },
            );
        }
        Ok(disk)
    }
}

impl Loader for G64Loader {
    fn autostart(&self, reader: &mut dyn Reader) -> io::Result<AutostartMethod> {
        let image = self.load(reader)?;
        Ok(AutostartMethod::WithImage(image))
    }

    fn load(&self, reader: &mut dyn Reader) -> io::Result<Box<dyn Image>> {
        info!(target: "loader", "Loading G64");
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let disk = self.parse(&data)?;
        info!(target: "loader", "Found G64, size {}", data.len());
        Ok(Box::new(G64Image { disk: Some(disk) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two track entries: halftrack 1 present with 4 bytes of GCR data,
    /// halftrack 2 absent (zero offset).
    fn fake_g64() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(HEADER_SIG.as_bytes());
        data.push(0); // version
        data.push(2); // number of tracks
        data.extend_from_slice(&[0, 0]); // max track size, unused
        data.extend_from_slice(&28u32.to_le_bytes()); // track 0 offset
        data.extend_from_slice(&0u32.to_le_bytes()); // track 1 absent
        data.extend_from_slice(&0u32.to_le_bytes()); // speed zone table
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&4u16.to_le_bytes()); // track data length
        data.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd]);
        data
    }

    #[test]
    fn parses_a_present_track_and_leaves_absent_ones_blank() {
        let loader = G64Loader::new();
        let disk = loader.parse(&fake_g64()).expect("should parse");
        assert_eq!(&[0xaa, 0xbb, 0xcc, 0xdd], disk.track(1).data.as_slice());
        assert!(disk.track(2).is_clear());
    }

    #[test]
    fn rejects_a_bad_signature() {
        let mut data = fake_g64();
        data[0] = b'X';
        assert!(G64Loader::new().parse(&data).is_err());
    }
}
