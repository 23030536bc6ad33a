//! Installing the trampoline and arming the reset vector.

use serde::{Deserialize, Serialize};

use crate::{
    Device, Error,
    chip::esp32::RTC_BOOT_ADDR,
    image::TrampolineImage,
    memory::MemoryMap,
    vector::{self, ResetVector},
};

/// What to do when the memory reserved for the trampoline is known to be too small.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CapacityPolicy {
    /// Refuse to install, leaving memory and reset vector untouched.
    #[default]
    Deny,
    /// Log an error and overwrite whatever follows the reserved memory.
    Warn,
}

/// Installation parameters, typically derived from the linker script of the application.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Bytes at the start of RTC slow memory that are kept free for the trampoline.
    ///
    /// `None` if unknown, in which case installation proceeds with a warning.
    pub reserved_capacity: Option<u32>,
    pub capacity_policy: CapacityPolicy,
    pub stack_top: u32,
    pub processor_state: u32,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            reserved_capacity: None,
            capacity_policy: CapacityPolicy::Deny,
            stack_top: TrampolineImage::DEFAULT_STACK_TOP,
            processor_state: TrampolineImage::DEFAULT_PROCESSOR_STATE,
        }
    }

    pub const fn with_reserved_capacity(mut self, bytes: u32) -> Self {
        self.reserved_capacity = Some(bytes);
        self
    }

    pub const fn with_capacity_policy(mut self, policy: CapacityPolicy) -> Self {
        self.capacity_policy = policy;
        self
    }

    /// The wake function and all it calls must fit in the stack below `stack_top`.
    pub const fn with_stack_top(mut self, stack_top: u32) -> Self {
        self.stack_top = stack_top;
        self
    }

    pub const fn with_processor_state(mut self, processor_state: u32) -> Self {
        self.processor_state = processor_state;
        self
    }

    /// Trampoline without a wake function patched in yet.
    pub const fn image(&self) -> TrampolineImage {
        TrampolineImage {
            processor_state: self.processor_state,
            user_fn: 0,
            stack_top: self.stack_top,
        }
    }

    #[cfg(feature = "postcard")]
    pub fn from_bytes(buffer: &[u8]) -> Result<Self, Error> {
        postcard::from_bytes(buffer).map_err(|e| match e {
            postcard::Error::DeserializeUnexpectedEnd => Error::BufferTooSmall,
            _ => Error::InvalidConfig,
        })
    }

    #[cfg(feature = "postcard")]
    pub fn to_slice<'a>(&self, buffer: &'a mut [u8]) -> Result<&'a mut [u8], Error> {
        postcard::to_slice(self, buffer).map_err(|e| match e {
            postcard::Error::SerializeBufferFull => Error::BufferTooSmall,
            _ => Error::InvalidConfig,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Address of the function the trampoline calls on wake.
///
/// The function takes no arguments and must never return, typically ending with
/// [`EarlyContext::continue_to_rom_bootloader`](crate::EarlyContext::continue_to_rom_bootloader).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootFunction(u32);

impl BootFunction {
    pub const fn from_addr(addr: u32) -> Self {
        Self(addr)
    }

    /// Fails if the function pointer does not fit the 32-bit address space.
    pub fn from_fn(f: extern "C" fn() -> !) -> Result<Self, Error> {
        Self::from_pointer(f as usize)
    }

    fn from_pointer(addr: usize) -> Result<Self, Error> {
        match u32::try_from(addr) {
            Ok(addr) => Ok(Self(addr)),
            Err(_) => {
                error!("user_fn ({:#x}) does not fit in 32 bits", addr);
                Err(Error::PointerTooWide { addr: addr as u64 })
            }
        }
    }

    pub const fn addr(self) -> u32 {
        self.0
    }
}

/// Trampoline as written to RTC memory, ready to run on the next wake.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InstalledTrampoline {
    pub base: u32,
    pub image: TrampolineImage,
}

impl InstalledTrampoline {
    pub const fn user_fn(&self) -> BootFunction {
        BootFunction(self.image.user_fn)
    }

    pub const fn end(&self) -> u32 {
        self.base + TrampolineImage::LEN as u32
    }
}

/// Owner of the RTC boot trampoline memory and the reset vector selection.
pub struct Installer<D: Device> {
    device: D,
    config: Config,
    memory_map: MemoryMap,
}

impl<D: Device> Installer<D> {
    pub fn new(device: D, config: Config) -> Self {
        Self {
            device,
            config,
            memory_map: MemoryMap::ESP32,
        }
    }

    pub fn with_memory_map(mut self, memory_map: MemoryMap) -> Self {
        self.memory_map = memory_map;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Install the trampoline calling `user_fn`, and select it as reset vector.
    ///
    /// Takes effect on the next wake or reset; nothing is executed now.
    /// On error neither memory nor reset vector have been touched.
    pub fn install(&mut self, user_fn: BootFunction) -> Result<InstalledTrampoline, Error> {
        self.memory_map.validate(user_fn.addr())?;
        self.check_capacity()?;

        let image = self.config.image().with_patched_fields(user_fn.addr());
        for (i, word) in image.to_words().into_iter().enumerate() {
            self.device.write_word(RTC_BOOT_ADDR + 4 * i as u32, word);
        }

        vector::select(&mut self.device, ResetVector::RtcTrampoline);

        info!("RTC boot armed, calling {:#x} on wake", user_fn.addr());

        Ok(InstalledTrampoline {
            base: RTC_BOOT_ADDR,
            image,
        })
    }

    /// Read back the trampoline from RTC memory, if any is present.
    pub fn installed(&self) -> Option<InstalledTrampoline> {
        let words: [u32; TrampolineImage::WORDS] = core::array::from_fn(|i| {
            self.device.read_word(RTC_BOOT_ADDR + 4 * i as u32)
        });

        TrampolineImage::from_words(&words).map(|image| InstalledTrampoline {
            base: RTC_BOOT_ADDR,
            image,
        })
    }

    /// Whether the next wake runs the trampoline.
    pub fn is_armed(&self) -> bool {
        vector::selected(&self.device) == ResetVector::RtcTrampoline
    }

    /// Let the next wake go through the ROM bootloader again.
    ///
    /// The trampoline is left in memory, as it is harmless when not selected.
    pub fn disarm(&mut self) {
        vector::select(&mut self.device, ResetVector::RomBootloader);
    }

    pub fn release(self) -> D {
        self.device
    }

    fn check_capacity(&self) -> Result<(), Error> {
        let required = TrampolineImage::LEN as u32;

        match self.config.reserved_capacity {
            None => {
                warn!(
                    "No reserved RTC slow memory, at least {} bytes needed. Continuing anyway...",
                    required
                );
                Ok(())
            }
            Some(reserved) if reserved < required => {
                error!(
                    "Insufficient reserved RTC slow memory: {} bytes, at least {} bytes needed",
                    reserved, required
                );
                match self.config.capacity_policy {
                    CapacityPolicy::Deny => Err(Error::InsufficientCapacity { required, reserved }),
                    CapacityPolicy::Warn => Ok(()),
                }
            }
            Some(_) => Ok(()),
        }
    }
}
