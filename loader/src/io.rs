// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;
use byteorder::ByteOrder;
use core::result;

pub type Result<T> = result::Result<T, String>;

pub trait Reader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> Result<usize>;
    fn read_exact(&mut self, mut buf: &mut [u8]) -> Result<()>;
    fn consume(&mut self, amt: usize);
}

/// Lets any `std::io::BufRead` (a buffered file, a cursor over bytes already
/// in memory, ...) satisfy `Reader`, so host code can hand real files to the
/// loaders without this crate depending on `std::io` directly.
#[cfg(feature = "std")]
impl<T: std::io::BufRead> Reader for T {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        std::io::Read::read(self, buf).map_err(|e| e.to_string())
    }

    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        std::io::Read::read_to_end(self, buf).map_err(|e| e.to_string())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        std::io::Read::read_exact(self, buf).map_err(|e| e.to_string())
    }

    fn consume(&mut self, amt: usize) {
        std::io::BufRead::consume(self, amt)
    }
}

pub trait ReadBytesExt: Reader {
    #[inline]
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    #[inline]
    fn read_u16<T: ByteOrder>(&mut self) -> Result<u16> {
        let mut buf = [0; 2];
        self.read_exact(&mut buf)?;
        Ok(T::read_u16(&buf))
    }

    #[inline]
    fn read_u32<T: ByteOrder>(&mut self) -> Result<u32> {
        let mut buf = [0; 4];
        self.read_exact(&mut buf)?;
        Ok(T::read_u32(&buf))
    }
}

impl<R: Reader + ?Sized> ReadBytesExt for R {}
