// This file is part of mos64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::rc::Rc;
#[cfg(feature = "std")]
use std::rc::Rc;

/// A tick represents a callback invoked for each clock cycle during a
/// multi-cycle operation that needs to let other components observe
/// individual cycles (e.g. a cartridge's flash erase/program sequence).
pub type TickFn = Rc<dyn Fn()>;

pub fn make_noop() -> TickFn {
    Rc::new(|| {})
}

/// Addressable represents a bank of memory.
pub trait Addressable {
    /// Read byte from the specified address.
    fn read(&self, address: u16) -> u8;
    /// Write byte to the specified address.
    fn write(&mut self, address: u16, value: u8);
}

/// Addressable represents a bank of memory that may be faded by RAM, i.e.
/// a `None` result means "this device does not drive the bus here" and the
/// caller should fall through to whatever RAM/open-bus value applies.
pub trait AddressableFaded {
    /// Read byte from the specified address.
    fn read(&mut self, address: u16) -> Option<u8>;
    /// Write byte to the specified address.
    fn write(&mut self, address: u16, value: u8);
}

/// Memory bank type used with Mmu to determine how to map a memory address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bank {
    Ram,
    Charset,
    Kernal,
    Basic,
    Io,
    RomL,
    RomH,
    ProcessorPort,
    Disabled,
}

/// A chip represents a system component that is driven by clock signal.
pub trait Chip {
    /// The core method of the chip, emulates one clock cycle of the chip.
    fn clock(&mut self);
    /// Process delta cycles at once.
    fn clock_delta(&mut self, delta: u32);
    /// Handle vsync event.
    fn process_vsync(&mut self);
    /// Handle reset signal.
    fn reset(&mut self);
    // I/O
    /// Read value from the specified register.
    fn read(&mut self, reg: u8) -> u8;
    /// Write value to the specified register.
    fn write(&mut self, reg: u8, value: u8);
}

#[derive(Copy, Clone, Debug)]
pub enum Register {
    A,
    X,
    Y,
    Sp,
    Pc,
    P,
}

/// Tag carried by each of the CPU's 65,536 breakpoint-plane entries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BreakpointTag {
    None,
    Hard,
    Soft,
}

/// The CPU's error state, polled by the cycle loop after every micro-step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CpuErrorState {
    Ok,
    HardBreakpointReached,
    SoftBreakpointReached,
    IllegalInstruction,
}

impl CpuErrorState {
    pub fn is_ok(self) -> bool {
        self == CpuErrorState::Ok
    }
}

/// CPU is responsible for decoding and executing instructions, one micro-step
/// (one clock cycle) per call to `clock()`. This mirrors the `Chip` trait
/// rather than a whole-instruction `step()`, so that the machine's fixed
/// per-cycle dispatch order can interleave the CPU with every other clocked
/// component at true cycle granularity, including mid-instruction RDY stalls.
pub trait Cpu {
    // -- Getters/Setters
    fn get_register(&self, reg: Register) -> u8;
    fn set_register(&mut self, reg: Register, value: u8);
    fn get_pc(&self) -> u16;
    fn set_pc(&mut self, value: u16);
    fn get_error_state(&self) -> CpuErrorState;
    fn clear_error_state(&mut self);
    fn set_breakpoint(&mut self, address: u16, tag: BreakpointTag);
    fn clear_breakpoints(&mut self);
    /// Emulates one clock cycle: at most one micro-step of one instruction.
    fn clock(&mut self);
    /// Reset chip.
    fn reset(&mut self);
    // I/O
    /// Read byte from the specified address (side-effect-free, for the debugger).
    fn read(&self, address: u16) -> u8;
    /// Write byte to the specified address.
    fn write(&mut self, address: u16, value: u8);
}

/// Represents memory management unit which controls visible memory banks.
pub trait Mmu {
    /// Map address to the bank currently driving reads at that address.
    fn map(&self, address: u16) -> Bank;
    /// Map address to the bank currently driving writes at that address.
    /// Usually falls through to RAM even where `map` reports a ROM bank
    /// (the PLA only gates reads, never writes).
    fn poke_target(&self, address: u16) -> Bank;
    /// Change bank configuration based on the specified mode (the 5-bit
    /// LORAM/HIRAM/CHAREN/GAME/EXROM selector, see `mode_index`).
    fn switch_banks(&mut self, mode: u8);
}

/// Sound output used by SID chip.
pub trait SoundOutput {
    /// Reset output.
    fn reset(&self);
    /// Write generated sample to the output buffer.
    fn write(&self, samples: &[i16]);
}

/// Video output used by VIC chip.
pub trait VideoOutput {
    /// Get frame buffer width and height.
    fn get_dimension(&self) -> (usize, usize);
    /// Reset output.
    fn reset(&mut self);
    /// Write pixel color to the specified location. Index is computed from raster x, y coordinates:
    /// index = y * pitch + x.
    fn write(&mut self, index: usize, color: u8);
}

pub trait Tape {
    fn read_pulse(&mut self) -> Option<u32>;
    fn seek(&mut self, pos: usize) -> bool;
}
