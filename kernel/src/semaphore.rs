//! Counted, sleeping semaphore.
//!
//! A direct generalization of the original `Semaphore` class: the intrusive
//! `List<Waiter>` becomes a `VecDeque<ThreadId>` behind the same spinlock
//! (see the design note on intrusive lists in `task::scheduler`), since
//! Rust's ownership model makes linking `Thread` nodes directly into two
//! lists at once (the wait list and whatever the thread is later requeued
//! on) awkward without unsafe pointer games the rest of this kernel avoids.

use alloc::collections::VecDeque;

use crate::spinlock::SpinLock;
use crate::task::scheduler;
use crate::task::ThreadId;

struct Inner {
    count: i64,
    waiters: VecDeque<ThreadId>,
}

pub struct Semaphore {
    inner: SpinLock<Inner>,
}

impl Semaphore {
    pub const fn new(initial: i64) -> Self {
        Semaphore {
            inner: SpinLock::new(Inner {
                count: initial,
                waiters: VecDeque::new(),
            }),
        }
    }

    /// Blocks the calling thread until a unit is available.
    pub fn down(&self) {
        loop {
            let mut inner = self.inner.lock();
            if inner.count > 0 {
                inner.count -= 1;
                return;
            }
            inner.waiters.push_back(scheduler::current_thread_id());
            drop(inner);
            // Sleeps until `up()` wakes this thread. Re-check the count on
            // wake rather than trusting we were the one woken for this
            // exact unit: a spurious wake (e.g. signal delivery) must not
            // hand out a unit that isn't there.
            scheduler::block_current_thread();
        }
    }

    /// Releases a unit, waking the longest-waiting blocked thread if any.
    pub fn up(&self) {
        let mut inner = self.inner.lock();
        match inner.waiters.pop_front() {
            Some(waiter) => {
                drop(inner);
                scheduler::wake_thread(waiter);
            }
            None => {
                inner.count += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_consumes_available_unit_without_blocking() {
        let sem = Semaphore::new(1);
        sem.down();
        assert_eq!(sem.inner.lock().count, 0);
    }

    #[test]
    fn up_replenishes_count_when_no_waiters() {
        let sem = Semaphore::new(0);
        sem.up();
        assert_eq!(sem.inner.lock().count, 1);
    }
}
