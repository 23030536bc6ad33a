#[cfg(feature = "xtensa")]
pub mod xtensa;

/// Mechanism to hand off execution to code elsewhere, never to return.
pub trait Boot {
    /// Jump to the instruction at `addr`.
    ///
    /// # Safety
    /// `addr` must hold code that is valid to run in the current CPU state.
    unsafe fn boot(addr: u32) -> !;
}
