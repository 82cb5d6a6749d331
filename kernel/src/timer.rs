//! Tick counting and the scheduler quantum.
//!
//! The SP804 timer driver that actually generates the periodic interrupt
//! is out of scope; what lives here is the software side a driver's IRQ
//! handler calls into once it fires — the monotonic tick count and the
//! per-quantum decision to preempt the running thread.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::config::TIMER_TICK_HZ;
use crate::task::scheduler;

static TICKS: AtomicU64 = AtomicU64::new(0);

/// Quantum length in ticks before a thread is preempted in favor of
/// whatever else is runnable at its tier.
const QUANTUM_TICKS: u64 = (TIMER_TICK_HZ / 10) as u64;

/// Called from the timer IRQ handler once per period. Advances the tick
/// count and, once a full quantum has elapsed, asks the scheduler to
/// round-robin the current tier.
pub fn on_tick() {
    let ticks = TICKS.fetch_add(1, Ordering::Relaxed) + 1;
    if ticks % QUANTUM_TICKS == 0 {
        scheduler::yield_now();
    }
}

/// Ticks elapsed since boot.
pub fn ticks() -> u64 {
    TICKS.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_monotonically_increase() {
        let before = ticks();
        TICKS.fetch_add(1, Ordering::Relaxed);
        assert_eq!(ticks(), before + 1);
    }
}
