//! QNX-style synchronous IPC: channels, connections, messages, and async
//! pulses, plus vectored variants that gather/scatter a request or reply
//! across several regions of the caller's address space in one call.

pub mod channel;
pub mod connection;
pub mod message;
pub mod pulse;

use alloc::vec::Vec;

pub use channel::{Received, ReplySlot};
pub use message::{ChannelId, ConnectionId, IoVec, Message, Pulse};

use crate::error::{Error, Result};
use crate::memory::address_space::AddressSpace;
use crate::task::ThreadId;

pub fn init() {
    channel::init();
    connection::init();
}

/// Creates a channel owned by `owner` (the calling server thread).
pub fn channel_create(owner: ThreadId) -> ChannelId {
    channel::create(owner)
}

/// Tears down a channel, failing every sender still queued on it with
/// `Error::Invalid` rather than leaving them blocked forever.
pub fn channel_destroy(id: ChannelId) {
    channel::destroy(id)
}

/// Opens a connection to `target`, resolving it first if it names a
/// connection rather than a raw channel (connections may be chained
/// through a name-server lookup at the syscall layer; here it is assumed
/// already resolved to a channel).
pub fn connect(target: ChannelId) -> ConnectionId {
    connection::attach(target)
}

/// `MessageSend`: blocks until `Reply`, returning the reply bytes.
pub fn send(connection: ConnectionId, sender: ThreadId, data: Vec<u8>) -> Result<Vec<u8>> {
    let channel = connection::resolve(connection)?;
    channel::send(channel, sender, data)
}

/// `MessageSendV`: gathers `iov` out of `space` into one contiguous
/// request buffer before sending, and scatters the reply back across
/// the same vector.
pub fn send_v(connection: ConnectionId, sender: ThreadId, space: &AddressSpace, iov: &[IoVec]) -> Result<()> {
    let request = gather(space, iov)?;
    let reply = send(connection, sender, request)?;
    scatter(space, iov, &reply)
}

/// `MessageReceive`: blocks until a request or pulse arrives.
pub fn receive(channel: ChannelId) -> Result<Received> {
    channel::receive(channel)
}

/// `MessageReceiveV`: like `receive`, but scatters a `Message`'s bytes
/// into `iov` within `space` rather than handing back an owned `Vec`.
pub fn receive_v(channel: ChannelId, space: &AddressSpace, iov: &[IoVec]) -> Result<Received> {
    match channel::receive(channel)? {
        Received::Message { sender, data, reply } => {
            scatter(space, iov, &data)?;
            Ok(Received::Message { sender, data, reply })
        }
        pulse @ Received::Pulse(_) => Ok(pulse),
    }
}

/// `MessageRead`/`MessageReadV`: copies part of an already-received
/// request out of `space` without completing the rendezvous, for a
/// server that wants to look at more of an oversized message.
pub fn read_v(space: &AddressSpace, iov: &[IoVec], data: &[u8]) -> Result<()> {
    scatter(space, iov, data)
}

/// `MessageReply`: posts `data` and wakes the blocked sender.
pub fn reply(handle: ReplySlot, data: Vec<u8>, sender: ThreadId) {
    channel::reply(handle, data, sender)
}

/// `MessageReplyV`: gathers `iov` out of `space` before replying.
pub fn reply_v(handle: ReplySlot, sender: ThreadId, space: &AddressSpace, iov: &[IoVec]) -> Result<()> {
    let data = gather(space, iov)?;
    channel::reply(handle, data, sender);
    Ok(())
}

pub fn send_pulse(channel: ChannelId, code: i8, value: i32) -> Result<()> {
    pulse::send(channel, code, value)
}

fn gather(space: &AddressSpace, iov: &[IoVec]) -> Result<Vec<u8>> {
    let total: usize = iov.iter().map(|v| v.len as usize).sum();
    let mut buf = alloc::vec![0u8; total];
    let mut offset = 0;
    for v in iov {
        let len = v.len as usize;
        space.copy_out(v.addr, &mut buf[offset..offset + len]).map_err(|_| Error::Fault)?;
        offset += len;
    }
    Ok(buf)
}

fn scatter(space: &AddressSpace, iov: &[IoVec], data: &[u8]) -> Result<()> {
    let mut offset = 0;
    for v in iov {
        let len = (v.len as usize).min(data.len().saturating_sub(offset));
        if len == 0 {
            break;
        }
        space.copy_in(v.addr, &data[offset..offset + len]).map_err(|_| Error::Fault)?;
        offset += len;
    }
    Ok(())
}
