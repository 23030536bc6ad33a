use crate::boot::Boot;

/// Plain jump on Xtensa, leaving register windows and stack as they are.
///
/// The ROM bootloader sets these up from scratch, so no state has to be unwound.
pub struct Xtensa;

impl Boot for Xtensa {
    #[cfg(target_arch = "xtensa")]
    #[inline(always)]
    unsafe fn boot(addr: u32) -> ! {
        unsafe { core::arch::asm!("jx {0}", in(reg) addr, options(noreturn)) }
    }

    #[cfg(not(target_arch = "xtensa"))]
    unsafe fn boot(_addr: u32) -> ! {
        panic!("Attempting to jump to ROM on a non-Xtensa platform");
    }
}
