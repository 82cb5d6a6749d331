//! Message and pulse payloads.
//!
//! Messages are plain byte buffers rather than the original's typed
//! `iov_t` scatter-gather arrays at this layer: `MessageSendV`/
//! `MessageReceiveV`/`MessageReadV`/`MessageReplyV` (in `ipc::mod`) handle
//! the vectored scatter-gather framing and flatten it to/from these
//! buffers at the syscall boundary, where the caller's address space is
//! available to copy through.

use alloc::vec::Vec;

use crate::task::ThreadId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChannelId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

/// A synchronous request, still awaiting `Reply`.
#[derive(Debug, Clone)]
pub struct Message {
    pub sender: ThreadId,
    pub data: Vec<u8>,
}

/// A fixed-size asynchronous notification. Pulses never block the
/// sender and never carry a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub code: i8,
    pub value: i32,
}

/// One scatter-gather segment, mirroring the original's `iov_t`: a
/// virtual address and length in the owning process's address space.
#[derive(Debug, Clone, Copy)]
pub struct IoVec {
    pub addr: u32,
    pub len: u32,
}
