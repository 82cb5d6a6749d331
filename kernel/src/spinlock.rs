//! Spinlocks that disable interrupts for the lifetime of the critical
//! section and never suspend.
//!
//! Every subsystem lock (buddy allocator, slab caches, pid map, name
//! registry, IRQ handler table) and the global scheduler transaction lock
//! are built on this. Lock order is fixed kernel-wide: a subsystem lock is
//! always acquired before the scheduler lock, never the reverse.

use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use crate::arch_impl::current::{Cpu, CpuOps};

/// A lock that disables IRQs on `lock()` and restores the prior IRQ state
/// on drop. Single-core only: there is no cross-CPU contention to model,
/// just interrupt-handler reentrancy, so the spin loop below only ever
/// backs off against an interrupt handler that is itself spinning on the
/// same lock from a nested context, which cannot happen once IRQs are
/// masked — the `AtomicBool` exists to catch a bug, not real contention.
pub struct SpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let irq_was_enabled = Cpu::interrupts_enabled();
        unsafe { Cpu::disable_interrupts() };

        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            spin_loop();
        }

        SpinLockGuard {
            lock: self,
            irq_was_enabled,
        }
    }

    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        let irq_was_enabled = Cpu::interrupts_enabled();
        unsafe { Cpu::disable_interrupts() };

        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(SpinLockGuard {
                lock: self,
                irq_was_enabled,
            })
        } else {
            if irq_was_enabled {
                unsafe { Cpu::enable_interrupts() };
            }
            None
        }
    }
}

pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    irq_was_enabled: bool,
}

impl<'a, T> Deref for SpinLockGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T> DerefMut for SpinLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<'a, T> Drop for SpinLockGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
        if self.irq_was_enabled {
            unsafe { Cpu::enable_interrupts() };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_access() {
        let lock = SpinLock::new(0u32);
        {
            let mut guard = lock.lock();
            *guard += 1;
        }
        assert_eq!(*lock.lock(), 1);
    }
}
