//! Process table: the pid-indexed registry of running processes, each
//! owning an address space and a set of threads.

use alloc::vec::Vec;

use crate::collections::OrderedMap;
use crate::error::{Error, Result};
use crate::memory::address_space::AddressSpace;
use crate::once::Global;
use crate::task::ThreadId;

pub type Pid = u32;

pub struct Process {
    pub pid: Pid,
    pub parent: Option<Pid>,
    pub threads: Vec<ThreadId>,
    pub address_space: AddressSpace,
}

struct Table {
    processes: OrderedMap<Pid, Process>,
    thread_owner: OrderedMap<ThreadId, Pid>,
    next_pid: Pid,
}

static TABLE: Global<Table> = Global::uninit();

/// The process manager's own pid, fixed rather than allocated so every
/// other process can address it without a lookup.
pub const PROCMGR_PID: Pid = 1;

pub fn init() {
    TABLE.init_once(|| {
        spin::Mutex::new(Table {
            processes: OrderedMap::new(),
            thread_owner: OrderedMap::new(),
            next_pid: PROCMGR_PID,
        })
    });
}

fn with_table<R>(f: impl FnOnce(&mut Table) -> R) -> R {
    let lock = TABLE.get().expect("process table not initialized");
    f(&mut lock.lock())
}

/// Registers a new process with a freshly allocated pid.
pub fn spawn(parent: Option<Pid>, address_space: AddressSpace) -> Pid {
    with_table(|t| {
        let pid = t.next_pid;
        t.next_pid += 1;
        t.processes.insert(pid, Process { pid, parent, threads: Vec::new(), address_space });
        pid
    })
}

pub fn add_thread(pid: Pid, thread: ThreadId) -> Result<()> {
    with_table(|t| {
        let process = t.processes.get_mut(&pid).ok_or(Error::Invalid)?;
        process.threads.push(thread);
        t.thread_owner.insert(thread, pid);
        Ok(())
    })
}

/// The process that owns `thread`, used to resolve `Exit`/`Sbrk`/etc
/// requests to the process table entry they act on.
pub fn owner_of(thread: ThreadId) -> Option<Pid> {
    with_table(|t| t.thread_owner.get(&thread).copied())
}

/// Runs `f` with mutable access to `pid`'s table entry, e.g. to grow its
/// heap (`Sbrk`) or map a physical range into it (`MapPhys`).
pub fn with_process<R>(pid: Pid, f: impl FnOnce(&mut Process) -> R) -> Option<R> {
    with_table(|t| t.processes.get_mut(&pid).map(f))
}

/// Removes `pid`'s table entry and every `thread_owner` entry for its
/// threads, returning the removed process so the caller can finish
/// tearing it down (force-finishing its threads, dropping its address
/// space). Pids are never reused, so the table never needs to reclaim
/// `pid` itself.
pub fn remove(pid: Pid) -> Option<Process> {
    with_table(|t| {
        let process = t.processes.remove(&pid)?;
        for &thread in &process.threads {
            t.thread_owner.remove(&thread);
        }
        Some(process)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_fresh_table<R>(f: impl FnOnce() -> R) -> R {
        crate::memory::page::init(0, 64);
        crate::memory::address_space::init();
        init();
        f()
    }

    #[test]
    fn remove_clears_thread_owner_entries() {
        with_fresh_table(|| {
            let pid = spawn(None, AddressSpace::new());
            add_thread(pid, ThreadId(7)).unwrap();
            assert_eq!(owner_of(ThreadId(7)), Some(pid));
            let removed = remove(pid).unwrap();
            assert_eq!(removed.pid, pid);
            assert_eq!(owner_of(ThreadId(7)), None);
            assert!(remove(pid).is_none());
        });
    }
}
