//! ESP32 register map for the pieces touched before the runtime exists.

/// Start of RTC slow memory, where the CPU starts when the reset vector selects RTC boot.
pub const RTC_BOOT_ADDR: u32 = 0x5000_0000;

/// Entry point of the ROM bootloader during a regular boot.
pub const ROM_BOOTLOADER_ENTRY: u32 = 0x4000_0400;

const DR_REG_RTCCNTL_BASE: u32 = 0x3FF4_8000;
const DR_REG_RTCIO_BASE: u32 = 0x3FF4_8400;

pub const RTC_CNTL_RESET_STATE_REG: u32 = DR_REG_RTCCNTL_BASE + 0x34;
/// Cleared: PRO CPU starts at [`RTC_BOOT_ADDR`]. Set: PRO CPU starts in ROM.
pub const RTC_CNTL_PROCPU_STAT_VECTOR_SEL: u32 = 1 << 13;

pub const RTC_GPIO_OUT_W1TS_REG: u32 = DR_REG_RTCIO_BASE + 0x4;
pub const RTC_GPIO_OUT_W1TC_REG: u32 = DR_REG_RTCIO_BASE + 0x8;
/// Bit position of RTC IO channel 0 within the output data registers.
pub const RTC_GPIO_OUT_DATA_SHIFT: u32 = 14;

pub const TIMG0_BASE: u32 = 0x3FF5_F000;
pub const TIMG1_BASE: u32 = 0x3FF6_0000;
pub const TIMG_WDTCONFIG0_OFFSET: u32 = 0x48;
pub const TIMG_WDTWPROTECT_OFFSET: u32 = 0x64;
pub const TIMG_WDT_FLASHBOOT_MOD_EN: u32 = 1 << 14;
/// Writing this to `WDTWPROTECT` unlocks the watchdog registers, anything else locks them.
pub const TIMG_WDT_WKEY: u32 = 0x50D8_3AA1;

/// Direct memory mapped access to the ESP32.
#[cfg(feature = "xtensa")]
pub struct Esp32 {
    _private: (),
}

#[cfg(feature = "xtensa")]
impl Esp32 {
    /// # Safety
    /// Gives unchecked access to every address, which may be in use by drivers elsewhere.
    #[inline(always)]
    pub const unsafe fn steal() -> Self {
        Self { _private: () }
    }
}

#[cfg(feature = "xtensa")]
impl crate::Device for Esp32 {
    #[inline(always)]
    fn read_word(&self, addr: u32) -> u32 {
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    #[inline(always)]
    fn write_word(&mut self, addr: u32, value: u32) {
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }

    #[cfg(target_arch = "xtensa")]
    #[inline(always)]
    fn cycle_count(&self) -> u32 {
        let count: u32;
        unsafe { core::arch::asm!("rsr.ccount {0}", out(reg) count, options(nomem, nostack)) };
        count
    }

    #[cfg(not(target_arch = "xtensa"))]
    fn cycle_count(&self) -> u32 {
        panic!("Attempting to read CCOUNT on a non-Xtensa platform");
    }
}
