use serde::{Deserialize, Serialize};

use crate::{
    Device,
    chip::esp32::{
        TIMG_WDT_FLASHBOOT_MOD_EN, TIMG_WDT_WKEY, TIMG_WDTCONFIG0_OFFSET, TIMG_WDTWPROTECT_OFFSET,
        TIMG0_BASE, TIMG1_BASE,
    },
};

/// Timer group hosting a main system watchdog.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerGroup {
    /// Armed in flash boot mode by the ROM on every boot.
    Timg0,
    Timg1,
}

impl TimerGroup {
    #[inline(always)]
    pub const fn base(self) -> u32 {
        match self {
            TimerGroup::Timg0 => TIMG0_BASE,
            TimerGroup::Timg1 => TIMG1_BASE,
        }
    }

    #[inline(always)]
    pub const fn wdtconfig0(self) -> u32 {
        self.base() + TIMG_WDTCONFIG0_OFFSET
    }

    #[inline(always)]
    pub const fn wdtwprotect(self) -> u32 {
        self.base() + TIMG_WDTWPROTECT_OFFSET
    }
}

/// Unlock, clear flash boot mode, lock again.
#[inline(always)]
pub(crate) fn disable_flashboot_mode(device: &mut impl Device, group: TimerGroup) {
    device.write_word(group.wdtwprotect(), TIMG_WDT_WKEY);
    device.clear_bits(group.wdtconfig0(), TIMG_WDT_FLASHBOOT_MOD_EN);
    device.write_word(group.wdtwprotect(), 0);
}
