use core::cell::Cell;
use std::{collections::BTreeMap, panic::AssertUnwindSafe, vec::Vec};

use crate::{
    Device,
    boot::Boot,
    chip::esp32::{
        RTC_CNTL_RESET_STATE_REG, RTC_GPIO_OUT_W1TC_REG, RTC_GPIO_OUT_W1TS_REG, TIMG_WDT_WKEY,
    },
    early::TimerGroup,
};

/// `RTC_CNTL_RESET_STATE_REG` after a regular boot: both CPUs select the ROM vector.
const RESET_STATE_DEFAULT: u32 = 0x0000_3000;
/// `WDTCONFIG0` as left by the ROM: flash boot mode enabled, reset lengths set.
const WDTCONFIG0_DEFAULT: u32 = 0x0004_C000;

const RTC_GPIO_OUT_REG: u32 = RTC_GPIO_OUT_W1TS_REG - 0x4;

/// Register file and memory of a fake ESP32.
///
/// Unwritten memory reads as zero. Behaves like the hardware where it matters:
/// watchdog configuration ignores writes while locked, and the RTC IO set/clear registers
/// update the RTC IO output register.
#[derive(Debug)]
pub struct MockDevice {
    memory: BTreeMap<u32, u32>,
    writes: Vec<(u32, u32)>,
    cycles: Cell<u32>,
    cycle_step: u32,
}

impl MockDevice {
    pub fn new() -> MockDevice {
        let mut memory = BTreeMap::new();
        memory.insert(RTC_CNTL_RESET_STATE_REG, RESET_STATE_DEFAULT);
        for group in [TimerGroup::Timg0, TimerGroup::Timg1] {
            memory.insert(group.wdtconfig0(), WDTCONFIG0_DEFAULT);
        }

        MockDevice {
            memory,
            writes: Vec::new(),
            cycles: Cell::new(0),
            cycle_step: 1,
        }
    }

    /// Every write since creation, in order.
    pub fn writes(&self) -> &[(u32, u32)] {
        &self.writes
    }

    /// Place `bytes` in memory without recording writes, like a flashed image.
    pub fn load(&mut self, addr: u32, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            let addr = addr + i as u32;
            let mut le = self.read_word(addr & !3).to_le_bytes();
            le[(addr & 3) as usize] = *byte;
            self.memory.insert(addr & !3, u32::from_le_bytes(le));
        }
    }

    pub fn read_byte(&self, addr: u32) -> u8 {
        let word = self.read_word(addr & !3);
        word.to_le_bytes()[(addr & 3) as usize]
    }

    pub fn cycles(&self) -> u32 {
        self.cycles.get()
    }

    pub fn set_cycles(&mut self, cycles: u32) {
        self.cycles.set(cycles);
    }

    /// Cycles passing between two reads of the cycle counter.
    pub fn set_cycle_step(&mut self, step: u32) {
        self.cycle_step = step;
    }

    pub fn wdt_locked(&self, group: TimerGroup) -> bool {
        self.read_word(group.wdtwprotect()) != TIMG_WDT_WKEY
    }

    pub fn rtcio_out(&self) -> u32 {
        self.read_word(RTC_GPIO_OUT_REG)
    }
}

impl Device for MockDevice {
    fn read_word(&self, addr: u32) -> u32 {
        assert_eq!(addr % 4, 0, "unaligned read of {addr:#x}");
        self.memory.get(&addr).copied().unwrap_or(0)
    }

    fn write_word(&mut self, addr: u32, value: u32) {
        assert_eq!(addr % 4, 0, "unaligned write of {addr:#x}");
        self.writes.push((addr, value));

        for group in [TimerGroup::Timg0, TimerGroup::Timg1] {
            if addr == group.wdtconfig0() && self.wdt_locked(group) {
                return;
            }
        }

        match addr {
            RTC_GPIO_OUT_W1TS_REG => {
                let out = self.rtcio_out();
                self.memory.insert(RTC_GPIO_OUT_REG, out | value);
            }
            RTC_GPIO_OUT_W1TC_REG => {
                let out = self.rtcio_out();
                self.memory.insert(RTC_GPIO_OUT_REG, out & !value);
            }
            _ => {
                self.memory.insert(addr, value);
            }
        }
    }

    fn cycle_count(&self) -> u32 {
        let now = self.cycles.get();
        self.cycles.set(now.wrapping_add(self.cycle_step));
        now
    }
}

/// Marker carried by the unwinding panic of [`MockBoot`].
#[derive(Debug)]
pub struct Landed(pub u32);

/// Boot mechanism that unwinds instead of jumping, so tests can observe where it would land.
pub struct MockBoot;

impl Boot for MockBoot {
    unsafe fn boot(addr: u32) -> ! {
        std::panic::panic_any(Landed(addr))
    }
}

/// Run `f`, returning the address it handed off to through [`MockBoot`], if any.
pub fn landing_of(f: impl FnOnce()) -> Option<u32> {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => None,
        Err(payload) => match payload.downcast::<Landed>() {
            Ok(landed) => Some(landed.0),
            Err(payload) => std::panic::resume_unwind(payload),
        },
    }
}
