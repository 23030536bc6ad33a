//! Driving pins through the RTC IO mux, which works before the GPIO matrix is initialised.

use serde::{Deserialize, Serialize};

use crate::{
    Device, Error,
    chip::esp32::{RTC_GPIO_OUT_DATA_SHIFT, RTC_GPIO_OUT_W1TC_REG, RTC_GPIO_OUT_W1TS_REG},
};

/// Digital GPIO pad number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpioNum(pub u8);

/// Channel of a pad within the RTC IO mux.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtcioChannel(u8);

impl RtcioChannel {
    #[inline(always)]
    pub const fn get(self) -> u8 {
        self.0
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value { Level::High } else { Level::Low }
    }
}

impl GpioNum {
    /// RTC IO channel of the pad, `None` for pads not routed through the RTC IO mux.
    ///
    /// Must not read flash `.rodata`, which is not mapped yet during an RTC boot.
    #[inline(always)]
    pub const fn rtcio_channel(self) -> Option<RtcioChannel> {
        let channel = match self.0 {
            0 => 11,
            2 => 12,
            4 => 10,
            12 => 15,
            13 => 14,
            14 => 16,
            15 => 13,
            25 => 6,
            26 => 7,
            27 => 17,
            32 => 9,
            33 => 8,
            34 => 4,
            35 => 5,
            36 => 0,
            37 => 1,
            38 => 2,
            39 => 3,
            _ => return None,
        };

        Some(RtcioChannel(channel))
    }
}

#[inline(always)]
pub(crate) fn set_level(
    device: &mut impl Device,
    gpio: GpioNum,
    level: Level,
) -> Result<(), Error> {
    let channel = match gpio.rtcio_channel() {
        Some(channel) => channel,
        None => return Err(Error::UnsupportedPin { gpio: gpio.0 }),
    };

    let mask = 1 << (RTC_GPIO_OUT_DATA_SHIFT + channel.0 as u32);
    match level {
        Level::High => device.write_word(RTC_GPIO_OUT_W1TS_REG, mask),
        Level::Low => device.write_word(RTC_GPIO_OUT_W1TC_REG, mask),
    }

    Ok(())
}
