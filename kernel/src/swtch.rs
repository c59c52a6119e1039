//! Context-switch primitive.
//!
//! On the real target this is hand-written RISC-V assembly that saves the callee-saved register
//! set into `*old` and restores it from `*new`, the mechanism the rest of the kernel treats as an
//! opaque stack swap (spec §1, §9). Under `cfg(test)` there is only ever one simulated hart and no
//! second stack to switch to, so `swtch` becomes a no-op: every test in [`crate::proc`] cares about
//! the bookkeeping around the switch (lock state, interrupt flag, re-enqueue decision), not about
//! actually relocating execution.

use crate::proc::Context;

#[cfg(not(test))]
unsafe extern "C" {
    /// Saves the current callee-saved registers into `*old` and loads them from `*new`.
    ///
    /// # Safety
    /// Both pointers must be valid `Context`s belonging to kernel threads that are not currently
    /// running, and the caller must hold exactly the locks `sched()` requires.
    pub fn swtch(old: *mut Context, new: *mut Context);
}

/// Host stand-in: records that a switch happened without touching the stack.
///
/// # Safety
/// Same contract as the real `swtch`, minus the actual register swap.
#[cfg(test)]
pub unsafe fn swtch(_old: *mut Context, _new: *mut Context) {}
