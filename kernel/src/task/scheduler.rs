//! Two-tier priority runqueue scheduler with priority inheritance.
//!
//! Threads are either `Io` or `Normal` priority (`config::PRIORITY_LEVELS`);
//! the `Io` tier always drains before `Normal` is considered, and a thread
//! blocked sending to a server boosts that server's effective priority to
//! its own for the duration of the call (`inherit_priority`/
//! `revert_priority`), so a high-priority client is never stuck behind a
//! low-priority server being starved by something else entirely.
//!
//! All bookkeeping (runqueues, thread table, "who is running") is behind
//! one lock, acquired and released around each scheduling decision; the
//! actual register swap in `task::context::switch` happens with the lock
//! already released, since nothing else on a single core can touch a
//! thread's saved context while it isn't running.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use core::ptr;

use conquer_once::spin::OnceCell;

use crate::arch_impl::current::{Privilege, PrivilegeLevel};
use crate::collections::OrderedMap;
use crate::config::PRIORITY_LEVELS;
use crate::spinlock::SpinLock;
use crate::task::thread::{CpuContext, Priority, Tcb, ThreadId, ThreadState};

struct Scheduler {
    threads: OrderedMap<ThreadId, Box<Tcb>>,
    runqueues: [VecDeque<ThreadId>; PRIORITY_LEVELS],
    current: ThreadId,
    next_id: u32,
}

impl Scheduler {
    fn tier(priority: Priority) -> usize {
        priority as usize
    }

    fn enqueue(&mut self, id: ThreadId) {
        let priority = self.threads.get(&id).expect("enqueue of unknown thread").effective_priority();
        self.runqueues[Self::tier(priority)].push_back(id);
    }

    /// Highest-tier, longest-waiting ready thread, or `None` if every
    /// runqueue is empty (the idle thread keeps running).
    fn pick_next(&mut self) -> Option<ThreadId> {
        for tier in (0..PRIORITY_LEVELS).rev() {
            if let Some(id) = self.runqueues[tier].pop_front() {
                return Some(id);
            }
        }
        None
    }
}

static SCHEDULER: OnceCell<SpinLock<Scheduler>> = OnceCell::uninit();

const IDLE_THREAD: ThreadId = ThreadId(0);

extern "C" fn idle_entry() -> ! {
    loop {
        crate::arch_impl::current::Cpu::halt();
    }
}

pub fn init() {
    let idle = Tcb::new(IDLE_THREAD, Priority::Normal, Privilege::kernel(), idle_entry);
    let mut threads = OrderedMap::new();
    threads.insert(IDLE_THREAD, idle);
    SCHEDULER.init_once(|| {
        SpinLock::new(Scheduler {
            threads,
            runqueues: core::array::from_fn(|_| VecDeque::new()),
            current: IDLE_THREAD,
            next_id: 1,
        })
    });
}

fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> R) -> R {
    let lock = SCHEDULER.get().expect("scheduler not initialized");
    f(&mut lock.lock())
}

pub fn current_thread_id() -> ThreadId {
    with_scheduler(|s| s.current)
}

/// Creates a new ready thread and returns its id. The thread does not run
/// until the scheduler picks it.
pub fn spawn(priority: Priority, privilege: Privilege, entry: extern "C" fn() -> !) -> ThreadId {
    with_scheduler(|s| {
        let id = ThreadId(s.next_id);
        s.next_id += 1;
        let tcb = Tcb::new(id, priority, privilege, entry);
        s.threads.insert(id, tcb);
        s.enqueue(id);
        id
    })
}

/// Switches away from the current thread to `next`, leaving the current
/// thread in `leave_state`. Returns once something switches back to the
/// caller.
fn switch_to(next: ThreadId, leave_state: ThreadState) {
    let (prev_ctx, next_ctx): (*mut CpuContext, *const CpuContext) = with_scheduler(|s| {
        let prev_id = s.current;
        {
            let prev = s.threads.get_mut(&prev_id).expect("current thread missing");
            prev.state = leave_state;
        }
        s.current = next;
        {
            let next_tcb = s.threads.get_mut(&next).expect("next thread missing");
            next_tcb.state = ThreadState::Running;
        }
        let prev_ptr = &mut s.threads.get_mut(&prev_id).unwrap().context as *mut CpuContext;
        let next_ptr = &s.threads.get(&next).unwrap().context as *const CpuContext;
        (prev_ptr, next_ptr)
    });
    // Safe: both TCBs are heap-boxed and stay in `threads` for as long as
    // either might run, and the scheduler lock above is already released,
    // so no other code path mutates these contexts concurrently on this
    // single core.
    unsafe { crate::task::context::switch(prev_ctx, next_ctx) };
}

/// Voluntarily gives up the CPU. The current thread goes to the back of
/// its priority tier; a no-op if no other thread is ready.
pub fn yield_now() {
    let next = with_scheduler(|s| {
        let current = s.current;
        if current != IDLE_THREAD {
            s.enqueue(current);
        }
        s.pick_next().unwrap_or(IDLE_THREAD)
    });
    if next != current_thread_id() {
        switch_to(next, ThreadState::Ready);
    }
}

/// Blocks the current thread (not re-enqueued) and switches to the next
/// ready thread. Used by `Semaphore::down` and `Receive` with no pending
/// message.
pub fn block_current_thread() {
    let next = with_scheduler(|s| s.pick_next().unwrap_or(IDLE_THREAD));
    switch_to(next, ThreadState::Blocked);
}

/// Moves a blocked thread back onto its runqueue. A no-op if the thread
/// is already ready/running or doesn't exist (it may have exited).
pub fn wake_thread(id: ThreadId) {
    with_scheduler(|s| {
        let should_enqueue = matches!(
            s.threads.get(&id).map(|t| t.state),
            Some(ThreadState::Blocked) | Some(ThreadState::ReceiveBlocked) | Some(ThreadState::ReplyBlocked)
        );
        if should_enqueue {
            s.threads.get_mut(&id).unwrap().state = ThreadState::Ready;
            s.enqueue(id);
        }
    });
}

/// Boosts `id`'s effective priority to at least `priority` for the
/// duration of a synchronous IPC call, so a blocked high-priority client
/// doesn't starve behind a lower-priority server.
pub fn inherit_priority(id: ThreadId, priority: Priority) {
    with_scheduler(|s| {
        if let Some(tcb) = s.threads.get_mut(&id) {
            if tcb.inherited_priority.map_or(true, |p| priority > p) {
                tcb.inherited_priority = Some(priority);
            }
        }
    });
}

/// Clears a priority boost previously applied by `inherit_priority`.
pub fn revert_priority(id: ThreadId) {
    with_scheduler(|s| {
        if let Some(tcb) = s.threads.get_mut(&id) {
            tcb.inherited_priority = None;
        }
    });
}

/// Marks the current thread dead and switches away. Never returns; the
/// dead `Tcb` stays in the thread table until the process manager reaps
/// its exit status (`process::reaper`).
pub fn exit_current() -> ! {
    let next = with_scheduler(|s| s.pick_next().unwrap_or(IDLE_THREAD));
    switch_to(next, ThreadState::Dead);
    unreachable!("exited thread was rescheduled")
}

/// Tears a thread out of the scheduler immediately, whatever state it is
/// in (ready, blocked, reply-blocked). Unlike `exit_current`, this acts
/// on a thread other than the caller: `process::procmgr` calls this on
/// every thread a process still owns once that process's `Exit` has been
/// reaped, so a thread blocked forever on a reply that will never come
/// doesn't linger in the thread table.
pub fn force_exit(id: ThreadId) {
    with_scheduler(|s| {
        s.threads.remove(&id);
        for tier in s.runqueues.iter_mut() {
            tier.retain(|&queued| queued != id);
        }
    });
}

/// The priority `id` is scheduled at right now (its own, or an inherited
/// boost), or `None` if `id` names no live thread.
pub fn effective_priority_of(id: ThreadId) -> Option<Priority> {
    with_scheduler(|s| s.threads.get(&id).map(|t| t.effective_priority()))
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn worker_entry() -> ! {
        loop {}
    }

    fn fresh_scheduler() -> SpinLock<Scheduler> {
        let mut threads = OrderedMap::new();
        threads.insert(IDLE_THREAD, Tcb::new(IDLE_THREAD, Priority::Normal, Privilege::kernel(), idle_entry));
        SpinLock::new(Scheduler {
            threads,
            runqueues: core::array::from_fn(|_| VecDeque::new()),
            current: IDLE_THREAD,
            next_id: 1,
        })
    }

    #[test]
    fn higher_tier_drains_before_lower() {
        let lock = fresh_scheduler();
        let mut s = lock.lock();
        let normal = ThreadId(1);
        let io = ThreadId(2);
        s.threads.insert(normal, Tcb::new(normal, Priority::Normal, Privilege::kernel(), worker_entry));
        s.threads.insert(io, Tcb::new(io, Priority::Io, Privilege::kernel(), worker_entry));
        s.enqueue(normal);
        s.enqueue(io);
        assert_eq!(s.pick_next(), Some(io));
        assert_eq!(s.pick_next(), Some(normal));
        assert_eq!(s.pick_next(), None);
    }

    #[test]
    fn inherited_priority_moves_thread_to_higher_tier() {
        let lock = fresh_scheduler();
        let mut s = lock.lock();
        let server = ThreadId(1);
        s.threads.insert(server, Tcb::new(server, Priority::Normal, Privilege::kernel(), worker_entry));
        s.threads.get_mut(&server).unwrap().inherited_priority = Some(Priority::Io);
        s.enqueue(server);
        assert_eq!(s.runqueues[Scheduler::tier(Priority::Io)].front(), Some(&server));
    }

    #[test]
    fn force_exit_removes_thread_from_table_and_runqueues() {
        let lock = fresh_scheduler();
        let mut s = lock.lock();
        let victim = ThreadId(1);
        s.threads.insert(victim, Tcb::new(victim, Priority::Normal, Privilege::kernel(), worker_entry));
        s.enqueue(victim);
        drop(s);
        force_exit_locked(&lock, victim);
        let s = lock.lock();
        assert!(s.threads.get(&victim).is_none());
        assert!(!s.runqueues[Scheduler::tier(Priority::Normal)].contains(&victim));
    }

    #[test]
    fn effective_priority_of_missing_thread_is_none() {
        let lock = fresh_scheduler();
        let s = lock.lock();
        assert_eq!(s.threads.get(&ThreadId(99)).map(|t| t.effective_priority()), None);
    }

    /// Test-only helper mirroring `force_exit`'s body against a scheduler
    /// that isn't the global singleton.
    fn force_exit_locked(lock: &SpinLock<Scheduler>, id: ThreadId) {
        let mut s = lock.lock();
        s.threads.remove(&id);
        for tier in s.runqueues.iter_mut() {
            tier.retain(|&queued| queued != id);
        }
    }
}
