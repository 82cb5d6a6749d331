//! Process management: the pid table, the process manager's dispatch
//! core, child-exit notification, and the path/channel name registry.

pub mod nameserver;
pub mod process;
pub mod procmgr;
pub mod reaper;

pub use process::{Pid, Process, PROCMGR_PID};

pub fn init() {
    process::init();
    nameserver::init();
    reaper::init();
    procmgr::spawn_kernel_thread();
}
