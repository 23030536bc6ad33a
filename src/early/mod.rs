//! Hardware access for the wake function, usable before any runtime has been initialised.
//!
//! Nothing in here allocates, relies on initialised statics, or touches peripherals that need
//! drivers: only plain register writes on always-on hardware.

use core::{marker::PhantomData, num::NonZeroU32};

use crate::{Device, Error, boot::Boot, chip::esp32::ROM_BOOTLOADER_ENTRY};

mod rtcio;
mod watchdog;

pub use rtcio::{GpioNum, Level, RtcioChannel};
pub use watchdog::TimerGroup;

/// CPU cycles per microsecond.
///
/// Not known by the ROM this early, so it has to be provided explicitly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TicksPerMicro(NonZeroU32);

impl TicksPerMicro {
    /// CPU clocked straight from a 40 MHz crystal, as it is right after reset.
    pub const XTAL_40MHZ: TicksPerMicro = TicksPerMicro(NonZeroU32::new(40).unwrap());

    pub const fn new(ticks: NonZeroU32) -> Self {
        Self(ticks)
    }

    #[inline(always)]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

/// Restricted execution context of the wake function.
///
/// Only exposes the operations that are valid before the runtime has been set up.
/// The only way out is [`EarlyContext::continue_to_rom_bootloader`].
///
/// The wake function runs from RTC memory while flash is not mapped yet, so everything reachable
/// from here is `#[inline(always)]` and free of lookup tables. Core helpers such as volatile
/// accesses are only inlined with optimisations enabled, so build the wake function with at least
/// `opt-level = "s"`, also in the dev profile.
pub struct EarlyContext<D: Device, B: Boot> {
    device: D,
    ticks_per_us: TicksPerMicro,
    _boot: PhantomData<B>,
}

#[cfg(feature = "xtensa")]
impl EarlyContext<crate::chip::esp32::Esp32, crate::boot::xtensa::Xtensa> {
    /// Context for the wake function running on the ESP32 itself.
    ///
    /// # Safety
    /// Must only be called from the wake function, while nothing else accesses the hardware.
    #[inline(always)]
    pub unsafe fn take(ticks_per_us: TicksPerMicro) -> Self {
        Self::new(unsafe { crate::chip::esp32::Esp32::steal() }, ticks_per_us)
    }
}

impl<D: Device, B: Boot> EarlyContext<D, B> {
    #[inline(always)]
    pub fn new(device: D, ticks_per_us: TicksPerMicro) -> Self {
        Self {
            device,
            ticks_per_us,
            _boot: PhantomData,
        }
    }

    /// Disable flash boot mode of the watchdog in `group`.
    ///
    /// The ROM arms the TIMG0 watchdog to reset the chip when the flash boot does not finish in time.
    /// Unless the wake function is very short, this must be done first.
    #[inline(always)]
    pub fn disable_flashboot_watchdog(&mut self, group: TimerGroup) {
        watchdog::disable_flashboot_mode(&mut self.device, group);
    }

    /// Drive `gpio` through its RTC IO channel.
    ///
    /// The pin must already have been configured as RTC output before going to sleep.
    #[inline(always)]
    pub fn set_level(&mut self, gpio: GpioNum, level: Level) -> Result<(), Error> {
        rtcio::set_level(&mut self.device, gpio, level)
    }

    /// Busy wait on the cycle counter.
    ///
    /// Saturates at `u32::MAX` cycles, a bit over 107 seconds at 40 MHz.
    #[inline(always)]
    pub fn delay_us(&self, us: u32) {
        let cycles = us.saturating_mul(self.ticks_per_us.get());
        let start = self.device.cycle_count();

        while self.device.cycle_count().wrapping_sub(start) < cycles {}
    }

    /// Continue as a regular boot through the ROM bootloader.
    #[inline(always)]
    pub fn continue_to_rom_bootloader(self) -> ! {
        unsafe { B::boot(ROM_BOOTLOADER_ENTRY) }
    }
}
