// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;

use crate::crt;
use crate::d64;
use crate::g64;
use crate::p00;
use crate::prg;
use crate::tap;
use crate::Loader;

pub struct Loaders;

impl Loaders {
    /// Picks a loader by file extension (case-insensitively). Panics on an
    /// unrecognized extension; callers that accept arbitrary user input
    /// should check the extension against a known set first.
    pub fn from_ext(ext: Option<&str>) -> Box<dyn Loader> {
        match ext.map(str::to_lowercase).as_deref() {
            Some("crt") => Box::new(crt::CrtLoader::new()),
            Some("d64") => Box::new(d64::D64Loader::new()),
            Some("g64") => Box::new(g64::G64Loader::new()),
            Some("p00") => Box::new(p00::P00Loader::new()),
            Some("prg") => Box::new(prg::PrgLoader::new()),
            Some("tap") => Box::new(tap::TapLoader::new()),
            _ => panic!("invalid loader {}", ext.unwrap_or("")),
        }
    }

    #[cfg(feature = "std")]
    pub fn from_path(path: &std::path::Path) -> Box<dyn Loader> {
        let ext = path.extension().map(|s| s.to_str().unwrap_or(""));
        Loaders::from_ext(ext)
    }
}
