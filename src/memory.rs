//! Memory regions that are usable straight after a reset, before any runtime has been initialised.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Which bus a region is reached through.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegionKind {
    /// Reached through the instruction bus.
    Instruction,
    /// Reached through the data bus, but executable as well.
    Data,
}

/// Half open address range `[low, high)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryRegion {
    pub low: u32,
    pub high: u32,
    pub kind: RegionKind,
}

impl MemoryRegion {
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.low && addr < self.high
    }

    pub const fn len(&self) -> u32 {
        self.high - self.low
    }
}

/// The early memory regions of a specific chip.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MemoryMap {
    pub rtc_iram: MemoryRegion,
    pub rtc_data: MemoryRegion,
}

impl MemoryMap {
    pub const ESP32: MemoryMap = MemoryMap {
        rtc_iram: MemoryRegion {
            low: 0x400C_0000,
            high: 0x400C_2000,
            kind: RegionKind::Instruction,
        },
        rtc_data: MemoryRegion {
            low: 0x5000_0000,
            high: 0x5000_2000,
            kind: RegionKind::Data,
        },
    };

    pub fn regions(&self) -> impl Iterator<Item = &MemoryRegion> {
        [&self.rtc_iram, &self.rtc_data].into_iter()
    }

    /// Check that `addr` can be reached straight after reset, returning the region kind it lives in.
    ///
    /// Does not touch any hardware.
    pub fn validate(&self, addr: u32) -> Result<RegionKind, Error> {
        match self.regions().find(|region| region.contains(addr)) {
            Some(region) => Ok(region.kind),
            None => {
                error!("user_fn ({:#x}) not in RTC memory", addr);
                Err(Error::InvalidArgument { addr })
            }
        }
    }
}
