// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use crate::drive::gcr;

pub const HALFTRACK_COUNT: usize = 84;
const SYNC_MARK_LEN: usize = 5;
const HEADER_GAP_LEN: usize = 9;
const HEADER_RAW_LEN: usize = 8;
const DATA_RAW_LEN: usize = 1 + 256 + 2 + 1; // block id + 256 data bytes + checksum + off byte
const SECTOR_PER_TRACK: [usize; 43] = [
    0, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 19, 19, 19, 19, 19, 19, 19,
    18, 18, 18, 18, 18, 18, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17,
];
// Natural halftrack capacity in raw bytes per speed zone (outer to inner);
// a whole number of bit-cells at the 16MHz/(16-zone) divider ratios.
const ZONE_CAPACITY: [usize; 4] = [7928, 7696, 7474, 7234];

fn speed_zone(track: usize) -> usize {
    if track <= 17 {
        0
    } else if track <= 24 {
        1
    } else if track <= 30 {
        2
    } else {
        3
    }
}

fn sectors_for_track(track: usize) -> usize {
    SECTOR_PER_TRACK[track]
}

/// One magnetic halftrack: a bit-stream of flux transitions, `length` bits
/// long, addressed MSB-first a byte at a time.
#[derive(Clone)]
pub struct GcrTrack {
    pub data: Vec<u8>,
    pub length: usize,
}

impl GcrTrack {
    fn empty(byte_len: usize) -> Self {
        GcrTrack {
            data: vec![0x55; byte_len],
            length: byte_len * 8,
        }
    }

    pub fn is_clear(&self) -> bool {
        self.data.windows(2).all(|w| w[0] == w[1])
    }

    pub fn read_bit(&self, bit_offset: usize) -> bool {
        let offset = bit_offset % self.length;
        let byte = self.data[offset / 8];
        (byte >> (7 - offset % 8)) & 1 != 0
    }

    pub fn write_bit(&mut self, bit_offset: usize, high: bool) {
        let offset = bit_offset % self.length;
        let mask = 1u8 << (7 - offset % 8);
        if high {
            self.data[offset / 8] |= mask;
        } else {
            self.data[offset / 8] &= !mask;
        }
    }
}

/// A whole disk image: 84 halftracks plus write-protect/dirty state. Built
/// either from a D64 sector dump (`from_d64`) or empty for formatting.
pub struct Disk {
    tracks: Vec<GcrTrack>,
    pub write_protected: bool,
    pub dirty: bool,
}

impl Disk {
    pub fn blank() -> Self {
        let tracks = (1..=HALFTRACK_COUNT)
            .map(|halftrack| {
                let track = (halftrack + 1) / 2;
                GcrTrack::empty(ZONE_CAPACITY[speed_zone(track.min(42))])
            })
            .collect();
        Disk {
            tracks,
            write_protected: false,
            dirty: false,
        }
    }

    pub fn track(&self, halftrack: usize) -> &GcrTrack {
        &self.tracks[halftrack - 1]
    }

    pub fn track_mut(&mut self, halftrack: usize) -> &mut GcrTrack {
        self.dirty = true;
        &mut self.tracks[halftrack - 1]
    }

    /// Replaces a halftrack's raw GCR bitstream wholesale, for image formats
    /// that store flux data directly (G64) rather than encoding it from
    /// sector contents (D64).
    pub fn set_halftrack(&mut self, halftrack: usize, track: GcrTrack) {
        self.tracks[halftrack - 1] = track;
        self.dirty = true;
    }

    /// Encodes a 35-track D64 sector dump (no error table) into GCR
    /// halftracks. Each full track's own halftrack (the odd-numbered ones,
    /// 1-indexed as `2*track - 1`) is populated; the interleaved
    /// half-steps in between are left as a cleared, unformatted track.
    pub fn from_d64(sectors: &[u8]) -> Disk {
        let mut disk = Disk::blank();
        let mut offset = 0usize;
        for track in 1..=35usize {
            let count = sectors_for_track(track);
            let mut bits = BitWriter::new();
            for sector in 0..count {
                const DISK_ID: [u8; 2] = [0x41, 0x41];
                let header = [
                    0x08,
                    sector as u8 ^ track as u8 ^ DISK_ID[0] ^ DISK_ID[1],
                    sector as u8,
                    track as u8,
                    DISK_ID[1],
                    DISK_ID[0],
                    0x0f,
                    0x0f,
                ];
                let data_raw = &sectors[offset..offset + 256];
                offset += 256;
                let mut data_block = Vec::with_capacity(DATA_RAW_LEN);
                data_block.push(0x07);
                data_block.extend_from_slice(data_raw);
                data_block.push(checksum(data_raw));
                data_block.push(0);

                for _ in 0..SYNC_MARK_LEN {
                    bits.push_byte(0xff);
                }
                bits.push_gcr(&gcr::encode_block(&header));
                for _ in 0..HEADER_GAP_LEN {
                    bits.push_byte(0x55);
                }
                for _ in 0..SYNC_MARK_LEN {
                    bits.push_byte(0xff);
                }
                bits.push_gcr(&gcr::encode_block(&data_block));
            }
            let capacity = ZONE_CAPACITY[speed_zone(track)];
            bits.pad_to(capacity, 0x55);
            let halftrack = 2 * track - 1;
            disk.tracks[halftrack - 1] = bits.into_track();
        }
        disk.dirty = false;
        disk
    }

    /// Reverses `from_d64`: scans each full track's halftrack for sync
    /// marks, decodes header and data blocks, and reassembles sectors in
    /// track/sector order. Returns `None` if any sector's block fails to
    /// decode (bad sync, invalid GCR codeword, or checksum mismatch).
    pub fn to_d64(&self) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        for track in 1..=35usize {
            let count = sectors_for_track(track);
            let mut by_sector = vec![None; count];
            let gcr_track = self.track(2 * track - 1);
            let found = scan_sectors(gcr_track, track as u8);
            for (sector, data) in found {
                if (sector as usize) < count {
                    by_sector[sector as usize] = Some(data);
                }
            }
            for slot in by_sector {
                out.extend_from_slice(&slot?);
            }
        }
        Some(out)
    }
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &b| acc ^ b)
}

struct BitWriter {
    bytes: Vec<u8>,
}

impl BitWriter {
    fn new() -> Self {
        BitWriter { bytes: Vec::new() }
    }

    fn push_byte(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    fn push_gcr(&mut self, gcr_bytes: &[u8]) {
        self.bytes.extend_from_slice(gcr_bytes);
    }

    fn pad_to(&mut self, byte_len: usize, fill: u8) {
        while self.bytes.len() < byte_len {
            self.bytes.push(fill);
        }
        self.bytes.truncate(byte_len.max(self.bytes.len()));
    }

    fn into_track(self) -> GcrTrack {
        let length = self.bytes.len() * 8;
        GcrTrack {
            data: self.bytes,
            length,
        }
    }
}

/// Walks a halftrack's bitstream looking for sync marks, decoding the
/// header+data block pair that follows each one that belongs to `track`.
fn scan_sectors(gcr_track: &GcrTrack, track: u8) -> Vec<(u8, Vec<u8>)> {
    let mut results = Vec::new();
    let bytes = &gcr_track.data;
    let mut i = 0usize;
    let mut consecutive_ff = 0usize;
    while i < bytes.len() {
        if bytes[i] == 0xff {
            consecutive_ff += 1;
            i += 1;
            continue;
        }
        if consecutive_ff >= SYNC_MARK_LEN {
            if let Some((header, after_header)) = read_block(bytes, i, HEADER_RAW_LEN) {
                if header[4] == 0xff && header[3] == track {
                    let sector = header[2];
                    let mut j = after_header;
                    while j < bytes.len() && bytes[j] != 0xff {
                        j += 1;
                    }
                    let mut ff_run = 0;
                    while j < bytes.len() && bytes[j] == 0xff {
                        ff_run += 1;
                        j += 1;
                    }
                    if ff_run >= SYNC_MARK_LEN {
                        if let Some((data_block, _)) = read_block(bytes, j, DATA_RAW_LEN) {
                            if data_block[0] == 0x07
                                && checksum(&data_block[1..257]) == data_block[257]
                            {
                                results.push((sector, data_block[1..257].to_vec()));
                            }
                        }
                    }
                }
            }
        }
        consecutive_ff = 0;
        i += 1;
    }
    results
}

fn read_block(bytes: &[u8], start: usize, raw_len: usize) -> Option<(Vec<u8>, usize)> {
    let gcr_len = (raw_len * 5 + 3) / 4;
    if start + gcr_len > bytes.len() {
        return None;
    }
    let decoded = gcr::decode_block(&bytes[start..start + gcr_len], raw_len)?;
    Some((decoded, start + gcr_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_d64() -> Vec<u8> {
        let total_sectors: usize = (1..=35).map(sectors_for_track).sum();
        let mut sectors = vec![0u8; total_sectors * 256];
        for (i, byte) in sectors.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        sectors
    }

    #[test]
    fn d64_round_trips_through_disk_encoding() {
        let original = fake_d64();
        let disk = Disk::from_d64(&original);
        let decoded = disk.to_d64().expect("all sectors should decode");
        assert_eq!(original, decoded);
    }

    #[test]
    fn blank_disk_tracks_are_cleared() {
        let disk = Disk::blank();
        assert!(disk.track(1).is_clear());
    }

    #[test]
    fn bit_read_write_round_trips() {
        let mut disk = Disk::blank();
        let track = disk.track_mut(1);
        track.write_bit(3, true);
        assert!(track.read_bit(3));
        track.write_bit(3, false);
        assert!(!track.read_bit(3));
    }
}
