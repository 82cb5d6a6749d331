//! Child-exit notification (`ChildWaitAttach`/`ChildWaitDetach`/
//! `ChildWaitArm`).
//!
//! Kept entirely separate from `process::process`'s pid table: a child's
//! table entry is removed the moment `Exit` is reaped, so this module
//! can't learn whether a child has exited by asking the table about it
//! later. Instead each parent gets a small record of its own: children it
//! is currently armed to hear about (`armed`), and children that already
//! exited before the parent got around to arming a wait on them
//! (`pending`). A pid is never reused, so presence in one of these sets
//! is all the state a parent's wait needs.

use crate::collections::OrderedMap;
use crate::error::Result;
use crate::ipc::{pulse, ChannelId};
use crate::once::Global;

use super::process::Pid;

struct ParentState {
    channel: Option<ChannelId>,
    armed: OrderedMap<Pid, ()>,
    pending: OrderedMap<Pid, ()>,
}

impl ParentState {
    fn new() -> Self {
        ParentState { channel: None, armed: OrderedMap::new(), pending: OrderedMap::new() }
    }
}

static PARENTS: Global<OrderedMap<Pid, ParentState>> = Global::uninit();

pub fn init() {
    PARENTS.init_once(|| spin::Mutex::new(OrderedMap::new()));
}

fn with_parents<R>(f: impl FnOnce(&mut OrderedMap<Pid, ParentState>) -> R) -> R {
    let lock = PARENTS.get().expect("reaper state not initialized");
    f(&mut lock.lock())
}

/// Records which channel `pid` wants `ChildFinish` pulses delivered on.
pub fn attach(pid: Pid, channel: ChannelId) -> Result<()> {
    with_parents(|p| {
        p.entry(pid).or_insert_with(ParentState::new).channel = Some(channel);
    });
    Ok(())
}

/// Clears `pid`'s notification channel. Armed and pending children are
/// left alone: a wait that already fired is not retracted, and a pulse
/// that arrives after detaching has nowhere to go until a fresh `attach`.
pub fn detach(pid: Pid) {
    with_parents(|p| {
        if let Some(state) = p.get_mut(&pid) {
            state.channel = None;
        }
    });
}

/// Arms `parent`'s wait on `child`. If `child` already exited before this
/// call (recorded in `pending`), delivers the pulse immediately instead
/// of waiting for an exit that already happened.
pub fn arm(parent: Pid, child: Pid) -> Result<()> {
    let fire = with_parents(|p| {
        let state = p.entry(parent).or_insert_with(ParentState::new);
        if state.pending.remove(&child).is_some() {
            state.channel
        } else {
            state.armed.insert(child, ());
            None
        }
    });
    match fire {
        Some(channel) => notify(channel, child),
        None => Ok(()),
    }
}

/// Called once `child`'s process table entry has been reaped: delivers
/// the exit pulse immediately if `parent` had already armed a wait on
/// `child`, otherwise records it as pending for a later `arm`.
pub fn notify_exit(child: Pid, parent: Pid) {
    let fire = with_parents(|p| {
        let state = p.entry(parent).or_insert_with(ParentState::new);
        if state.armed.remove(&child).is_some() {
            state.channel
        } else {
            state.pending.insert(child, ());
            None
        }
    });
    if let Some(channel) = fire {
        let _ = notify(channel, child);
    }
}

fn notify(channel: ChannelId, child: Pid) -> Result<()> {
    pulse::send_child_exit(channel, child)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_fresh_state<R>(f: impl FnOnce() -> R) -> R {
        init();
        with_parents(|p| p.clear());
        f()
    }

    #[test]
    fn arm_before_exit_waits_for_notify() {
        with_fresh_state(|| {
            arm(1, 2).unwrap();
            with_parents(|p| p.get_mut(&1).unwrap().channel = Some(ChannelId(5)));
            // Child 2 hasn't exited yet: nothing pending, still armed.
            assert!(with_parents(|p| p.get(&1).unwrap().armed.contains_key(&2)));
        });
    }

    #[test]
    fn notify_before_arm_is_recorded_pending() {
        with_fresh_state(|| {
            notify_exit(2, 1);
            assert!(with_parents(|p| p.get(&1).unwrap().pending.contains_key(&2)));
            // Arming afterwards consumes the pending record rather than
            // blocking forever on an exit that already happened.
            arm(1, 2).unwrap();
            assert!(with_parents(|p| !p.get(&1).unwrap().pending.contains_key(&2)));
        });
    }

    #[test]
    fn detach_clears_channel_but_keeps_pending() {
        with_fresh_state(|| {
            attach(1, ChannelId(9)).unwrap();
            notify_exit(2, 1);
            detach(1);
            assert!(with_parents(|p| p.get(&1).unwrap().channel.is_none()));
            assert!(with_parents(|p| p.get(&1).unwrap().pending.contains_key(&2)));
        });
    }
}
