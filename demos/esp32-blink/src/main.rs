//! Blink an LED on GPIO25 straight out of deep sleep, before the ROM bootloader runs.
//!
//! On a cold boot the wake function is installed, after which the chip goes to deep sleep for
//! three seconds. On every wake the LED blinks three times, after which the wake continues as usual
//! through the ROM bootloader and the application.
#![no_std]
#![no_main]

use core::time::Duration;

use esp_backtrace as _;
use esp_hal::{
    Cpu,
    delay::Delay,
    entry,
    macros::ram,
    rtc_cntl::{
        Rtc, SocResetReason, reset_reason,
        sleep::{RtcSleepConfig, TimerWakeupSource},
    },
};
use rtcboot::{
    BootFunction, Config, Device, EarlyContext, GpioNum, Installer, Level, TicksPerMicro,
    TimerGroup,
    chip::esp32::{Esp32, RTC_GPIO_OUT_DATA_SHIFT, RTC_GPIO_OUT_W1TS_REG},
    early::RtcioChannel,
};

const BLINK_GPIO: GpioNum = GpioNum(25);
const BLINK_CHANNEL: RtcioChannel = match BLINK_GPIO.rtcio_channel() {
    Some(channel) => channel,
    None => panic!("LED pin must have an RTC IO channel"),
};

#[ram(rtc_fast)]
extern "C" fn wake() -> ! {
    let mut early = unsafe { EarlyContext::take(TicksPerMicro::XTAL_40MHZ) };

    // Blinking takes long enough for the flash boot watchdog to fire.
    early.disable_flashboot_watchdog(TimerGroup::Timg0);

    for _ in 0..3 {
        if early.set_level(BLINK_GPIO, Level::Low).is_err() {
            break;
        }
        early.delay_us(250_000);
        if early.set_level(BLINK_GPIO, Level::High).is_err() {
            break;
        }
        early.delay_us(250_000);
    }

    early.continue_to_rom_bootloader()
}

/// Hand GPIO25 over to the RTC IO mux as an output, driven high.
fn configure_rtc_output(device: &mut Esp32) {
    const RTC_IO_PAD_DAC1_REG: u32 = 0x3FF4_8484;
    const RTC_IO_PDAC1_MUX_SEL: u32 = 1 << 17;
    const RTC_IO_PDAC1_FUN_SEL: u32 = 0b11 << 15;
    const RTC_GPIO_ENABLE_W1TS_REG: u32 = 0x3FF4_8410;

    let mask = 1 << (RTC_GPIO_OUT_DATA_SHIFT + BLINK_CHANNEL.get() as u32);

    device.write_word(RTC_GPIO_OUT_W1TS_REG, mask);
    device.clear_bits(RTC_IO_PAD_DAC1_REG, RTC_IO_PDAC1_FUN_SEL);
    device.set_bits(RTC_IO_PAD_DAC1_REG, RTC_IO_PDAC1_MUX_SEL);
    device.write_word(RTC_GPIO_ENABLE_W1TS_REG, mask);
}

#[entry]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();

    let peripherals = esp_hal::init(esp_hal::Config::default());
    let mut rtc = Rtc::new(peripherals.LPWR);
    let delay = Delay::new();

    if reset_reason(Cpu::ProCpu) == Some(SocResetReason::CoreDeepSleep) {
        log::info!("Woken");
    } else {
        log::info!("Starting");

        let mut device = unsafe { Esp32::steal() };
        configure_rtc_output(&mut device);

        let mut installer = Installer::new(device, Config::new());
        installer
            .install(BootFunction::from_fn(wake).unwrap())
            .unwrap();
    }

    delay.delay_millis(1000);

    // Keep RTC IO and both RTC memories powered, they hold the LED state, trampoline and wake function.
    let mut config = RtcSleepConfig::deep();
    config.set_rtc_peri_pd_en(false);
    config.set_rtc_slowmem_pd_en(false);
    config.set_rtc_fastmem_pd_en(false);

    let timer = TimerWakeupSource::new(Duration::from_secs(3));
    rtc.sleep(&config, &[&timer]);

    loop {}
}
