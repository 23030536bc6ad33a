//! The trampoline placed at the start of RTC slow memory.
//!
//! The first instruction jumps over three data words, which the rest of the preamble loads
//! PC-relative with `l32r`:
//!
//! ```text
//! 0x00  j      start
//! 0x04  .word  processor_state
//! 0x08  .word  user_fn
//! 0x0c  .word  stack_top
//! start:
//! 0x10  movi.n a0, 0
//! 0x12  movi.n a1, 1
//! 0x14  l32r   a2, processor_state
//! 0x17  wsr    a1, WINDOWSTART
//! 0x1a  wsr    a0, WINDOWBASE
//! 0x1d  wsr    a2, PS
//! 0x20  rsync
//! 0x23  l32r   a1, stack_top
//! 0x26  l32r   a3, user_fn
//! 0x29  callx4 a3
//! ```
//!
//! After reset only a single register window is marked as live, the processor state is set, and the
//! stack pointer is loaded. `callx4` rotates the window for the user function, which must never
//! return as there is nothing to return to.

/// Layout with all data words zeroed.
const TEMPLATE: [u8; TrampolineImage::LEN] = [
    0x06, 0x03, 0x00, // j start
    0x00, //
    0x00, 0x00, 0x00, 0x00, // processor_state
    0x00, 0x00, 0x00, 0x00, // user_fn
    0x00, 0x00, 0x00, 0x00, // stack_top
    0x0c, 0x00, // movi.n a0, 0
    0x0c, 0x11, // movi.n a1, 1
    0x21, 0xfc, 0xff, // l32r a2, processor_state
    0x10, 0x49, 0x13, // wsr a1, WINDOWSTART
    0x00, 0x48, 0x13, // wsr a0, WINDOWBASE
    0x20, 0xe6, 0x13, // wsr a2, PS
    0x10, 0x20, 0x00, // rsync
    0x11, 0xfa, 0xff, // l32r a1, stack_top
    0x31, 0xf8, 0xff, // l32r a3, user_fn
    0xd0, 0x03, 0x00, // callx4 a3
];

const _: () = assert!(TrampolineImage::LEN % 4 == 0);

/// Structured form of the trampoline, with its three patchable data words.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrampolineImage {
    /// Written to `PS` before the stack pointer is loaded.
    pub processor_state: u32,
    /// Address of the function called by the trampoline.
    pub user_fn: u32,
    /// Initial stack pointer, which must point into otherwise unused memory.
    pub stack_top: u32,
}

impl TrampolineImage {
    pub const LEN: usize = 44;
    pub const WORDS: usize = Self::LEN / 4;

    pub const PROCESSOR_STATE_OFFSET: usize = 4;
    pub const USER_FN_OFFSET: usize = 8;
    pub const STACK_TOP_OFFSET: usize = 12;

    /// `PS.WOE | PS.UM`: window overflow exceptions enabled, user vector mode, interrupt level 0.
    pub const DEFAULT_PROCESSOR_STATE: u32 = 0x0004_0020;

    /// Top of the memory the ROM bootloader uses as its own stack, unused this early.
    pub const DEFAULT_STACK_TOP: u32 = 0x3FFE_3F20;

    pub const fn new() -> Self {
        Self {
            processor_state: Self::DEFAULT_PROCESSOR_STATE,
            user_fn: 0,
            stack_top: Self::DEFAULT_STACK_TOP,
        }
    }

    /// Copy of this image calling `user_fn` instead.
    #[must_use]
    pub const fn with_patched_fields(self, user_fn: u32) -> Self {
        Self { user_fn, ..self }
    }

    pub const fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = TEMPLATE;
        put_word(&mut bytes, Self::PROCESSOR_STATE_OFFSET, self.processor_state);
        put_word(&mut bytes, Self::USER_FN_OFFSET, self.user_fn);
        put_word(&mut bytes, Self::STACK_TOP_OFFSET, self.stack_top);
        bytes
    }

    pub fn to_words(&self) -> [u32; Self::WORDS] {
        let bytes = self.to_bytes();
        core::array::from_fn(|i| get_word(&bytes, i * 4))
    }

    /// Parse an image, returning `None` if the instructions do not match the trampoline.
    pub fn from_bytes(bytes: &[u8; Self::LEN]) -> Option<Self> {
        let image = Self {
            processor_state: get_word(bytes, Self::PROCESSOR_STATE_OFFSET),
            user_fn: get_word(bytes, Self::USER_FN_OFFSET),
            stack_top: get_word(bytes, Self::STACK_TOP_OFFSET),
        };

        (image.to_bytes() == *bytes).then_some(image)
    }

    pub fn from_words(words: &[u32; Self::WORDS]) -> Option<Self> {
        let mut bytes = [0u8; Self::LEN];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Self::from_bytes(&bytes)
    }
}

impl Default for TrampolineImage {
    fn default() -> Self {
        Self::new()
    }
}

const fn put_word(bytes: &mut [u8; TrampolineImage::LEN], offset: usize, value: u32) {
    let le = value.to_le_bytes();
    bytes[offset] = le[0];
    bytes[offset + 1] = le[1];
    bytes[offset + 2] = le[2];
    bytes[offset + 3] = le[3];
}

const fn get_word(bytes: &[u8; TrampolineImage::LEN], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
