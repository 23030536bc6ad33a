//! Selection of where the PRO CPU starts executing after the next reset or wake.

use serde::{Deserialize, Serialize};

use crate::{
    Device,
    chip::esp32::{
        ROM_BOOTLOADER_ENTRY, RTC_BOOT_ADDR, RTC_CNTL_PROCPU_STAT_VECTOR_SEL,
        RTC_CNTL_RESET_STATE_REG,
    },
};

/// Reset vector as selected in the always-on reset controller.
///
/// The selection survives deep sleep, so it only takes effect on the next wake.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetVector {
    /// Regular boot through ROM unpacking and SPI boot. Hardware default.
    RomBootloader,
    /// Start executing RTC slow memory, where the trampoline lives.
    RtcTrampoline,
}

impl ResetVector {
    /// Address of the first instruction fetched.
    pub const fn entry(self) -> u32 {
        match self {
            ResetVector::RomBootloader => ROM_BOOTLOADER_ENTRY,
            ResetVector::RtcTrampoline => RTC_BOOT_ADDR,
        }
    }
}

pub fn select(device: &mut impl Device, vector: ResetVector) {
    debug!("Selecting reset vector {:#x}", vector.entry());

    match vector {
        ResetVector::RomBootloader => {
            device.set_bits(RTC_CNTL_RESET_STATE_REG, RTC_CNTL_PROCPU_STAT_VECTOR_SEL)
        }
        ResetVector::RtcTrampoline => {
            device.clear_bits(RTC_CNTL_RESET_STATE_REG, RTC_CNTL_PROCPU_STAT_VECTOR_SEL)
        }
    }
}

pub fn selected(device: &impl Device) -> ResetVector {
    if device.read_word(RTC_CNTL_RESET_STATE_REG) & RTC_CNTL_PROCPU_STAT_VECTOR_SEL != 0 {
        ResetVector::RomBootloader
    } else {
        ResetVector::RtcTrampoline
    }
}
