// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(feature = "std"), feature(alloc))]

#[cfg(feature = "std")]
extern crate core;
#[cfg(not(feature = "std"))]
#[macro_use]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::prelude::*;
extern crate byteorder;
#[macro_use]
extern crate log;

mod bin;
mod crt;
mod d64;
mod g64;
pub mod io;
mod loaders;
mod p00;
mod prg;
mod tap;

use mos64_system::{AutostartMethod, Image};

pub use self::bin::BinLoader;
pub use self::crt::CrtLoader;
pub use self::d64::D64Loader;
pub use self::g64::G64Loader;
pub use self::loaders::Loaders;
pub use self::p00::P00Loader;
pub use self::prg::PrgLoader;
pub use self::tap::TapLoader;

/// A file-format loader: parses a stream into a mountable `Image` and
/// decides how the machine should bring it up (straight mount, autostart
/// with a queued `RUN`, or a raw binary with no further action). Reader-
/// based rather than path-based so the crate stays usable without `std`;
/// turning a path into a `Reader` is the caller's job.
pub trait Loader {
    fn autostart(&self, reader: &mut dyn io::Reader) -> io::Result<AutostartMethod>;
    fn load(&self, reader: &mut dyn io::Reader) -> io::Result<Box<dyn Image>>;
}
