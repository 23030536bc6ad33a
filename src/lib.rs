//! Fast wake from deep sleep by booting straight out of RTC memory.
//!
//! On the ESP32 the reset controller can be told to start the CPU at `0x5000_0000` instead of the
//! ROM bootloader entry at `0x4000_0400`. This skips ROM unpacking and SPI boot entirely, but the
//! code found there runs without a stack, without register windows set up, and without any runtime.
//!
//! This crate installs a tiny fixed trampoline at that address which prepares the CPU just enough
//! to call a user supplied function living in RTC memory. That function gets an [`EarlyContext`]
//! to perform its time critical work, and then continues to the regular ROM bootloader.
//!
//! # Features
//! - `xtensa`: the real `Esp32` device and the jump used by `EarlyContext::take`.
//! - `postcard` (default): [`Config::to_slice`] and [`Config::from_bytes`], an optional helper to
//!   keep installer settings outside the firmware, for instance in NVS. Installing never needs it.
//! - `defmt` or `log`: diagnostics through either logging framework. Silent without both.
#![no_std]
#![cfg_attr(
    all(feature = "xtensa", target_arch = "xtensa"),
    feature(asm_experimental_arch)
)]

// This must go first, so the macros are visible to the other modules.
mod fmt;

pub mod boot;
pub mod chip;
pub mod early;
pub mod image;
pub mod install;
pub mod memory;
pub mod vector;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod mock;


pub use early::{EarlyContext, GpioNum, Level, TicksPerMicro, TimerGroup};
pub use image::TrampolineImage;
pub use install::{BootFunction, CapacityPolicy, Config, InstalledTrampoline, Installer};
pub use memory::{MemoryMap, MemoryRegion, RegionKind};
pub use vector::ResetVector;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The wake target does not live in memory reachable straight after reset.
    InvalidArgument { addr: u32 },
    /// The wake function lives above the 32-bit address space, which only happens off target.
    PointerTooWide { addr: u64 },
    /// The memory reserved at the trampoline base is too small to hold the trampoline.
    InsufficientCapacity { required: u32, reserved: u32 },
    /// The GPIO has no RTC IO channel, so it can not be driven before the runtime is up.
    UnsupportedPin { gpio: u8 },
    /// Encoded configuration is malformed.
    InvalidConfig,
    /// Provided buffer is too small for the encoded configuration.
    BufferTooSmall,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidArgument { addr } => {
                write!(f, "wake target {addr:#010x} not in RTC memory")
            }
            Error::PointerTooWide { addr } => {
                write!(f, "wake target {addr:#x} does not fit in 32 bits")
            }
            Error::InsufficientCapacity { required, reserved } => write!(
                f,
                "reserved RTC memory of {reserved} bytes can not hold {required} bytes of trampoline"
            ),
            Error::UnsupportedPin { gpio } => write!(f, "GPIO{gpio} has no RTC IO channel"),
            Error::InvalidConfig => f.write_str("malformed configuration"),
            Error::BufferTooSmall => f.write_str("buffer too small for configuration"),
        }
    }
}

/// Representation of a concrete device with memory mapped registers and memory.
///
/// All accesses are 32-bit wide, as required for the RTC memories and peripheral registers.
pub trait Device {
    /// Read a word from an aligned address.
    fn read_word(&self, addr: u32) -> u32;

    /// Write a word to an aligned address.
    fn write_word(&mut self, addr: u32, value: u32);

    /// Free running CPU cycle counter, wrapping around.
    fn cycle_count(&self) -> u32;

    /// Set the bits in `mask`, leaving the others intact.
    #[inline(always)]
    fn set_bits(&mut self, addr: u32, mask: u32) {
        let value = self.read_word(addr);
        self.write_word(addr, value | mask);
    }

    /// Clear the bits in `mask`, leaving the others intact.
    #[inline(always)]
    fn clear_bits(&mut self, addr: u32, mask: u32) {
        let value = self.read_word(addr);
        self.write_word(addr, value & !mask);
    }
}

impl<D: Device> Device for &mut D {
    fn read_word(&self, addr: u32) -> u32 {
        D::read_word(self, addr)
    }

    fn write_word(&mut self, addr: u32, value: u32) {
        D::write_word(self, addr, value)
    }

    fn cycle_count(&self) -> u32 {
        D::cycle_count(self)
    }
}
