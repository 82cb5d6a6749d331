//! Async pulse delivery and the reserved codes the kernel itself emits.
//!
//! Pulses are how the kernel tells a process manager about events it
//! didn't ask a specific thread to block waiting for: a child's exit, or
//! an interrupt a driver thread attached to with `InterruptAttach`.
//! User-assigned codes start at `FIRST_USER_CODE`; negative codes are
//! reserved for the kernel, matching the original's convention of
//! keeping kernel-private event numbering out of user-assignable space.

use crate::error::Result;

use super::channel;
use super::message::{ChannelId, Pulse};

pub const INTERRUPT_CODE: i8 = -1;
pub const CHILD_FINISH_CODE: i8 = -2;
pub const FIRST_USER_CODE: i8 = 0;

pub fn send(channel: ChannelId, code: i8, value: i32) -> Result<()> {
    channel::send_pulse(channel, Pulse { code, value })
}

/// Convenience for `process::reaper`: notifies `channel` that `child` has
/// exited, carrying the child's pid as the pulse's value. There's no exit
/// status to report in this design; the parent learns only that the
/// child named by this pid is gone.
pub fn send_child_exit(channel: ChannelId, child: u32) -> Result<()> {
    send(channel, CHILD_FINISH_CODE, child as i32)
}
