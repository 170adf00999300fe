// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use mos64_core::factory::{SoundOutput, VideoOutput};

/// Discards every sample. Audio playback is an external collaborator's
/// concern; the headless runner only needs a concrete `SoundOutput` to
/// satisfy `C64::build`.
pub struct NullSound;

impl SoundOutput for NullSound {
    fn reset(&self) {}
    fn write(&self, _samples: &[i16]) {}
}

/// Discards every pixel. Raster presentation is an external collaborator's
/// concern; the headless runner only needs a concrete `VideoOutput` to
/// satisfy `C64::build`.
pub struct NullVideo;

impl VideoOutput for NullVideo {
    fn get_dimension(&self) -> (usize, usize) {
        (0, 0)
    }
    fn reset(&mut self) {}
    fn write(&mut self, _index: usize, _color: u8) {}
}
