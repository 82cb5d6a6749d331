//! Channels: the server side of synchronous IPC.
//!
//! A channel queues pending `Send`s (each paired with a reply slot the
//! blocked sender is waiting on) and pending pulses. `Receive` drains
//! ordinary sends before pulses, so a server under load always finishes
//! synchronous request/reply work ahead of best-effort notifications.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::collections::OrderedMap;
use crate::error::{Error, Result};
use crate::once::Global;
use crate::spinlock::SpinLock;
use crate::task::{scheduler, thread::Priority, ThreadId};

use super::message::{ChannelId, Pulse};

/// Shared between a blocked sender and the server that will eventually
/// `Reply` to it. `None` until the reply is posted, or until `destroy`
/// fails every sender still queued on a channel that is going away.
pub type ReplySlot = Arc<SpinLock<Option<Result<Vec<u8>>>>>;

struct PendingSend {
    sender: ThreadId,
    data: Vec<u8>,
    reply: ReplySlot,
}

pub struct Channel {
    owner: ThreadId,
    pending_sends: VecDeque<PendingSend>,
    pending_pulses: VecDeque<Pulse>,
    receiver_waiting: bool,
}

struct Registry {
    channels: OrderedMap<ChannelId, Channel>,
    next_id: u32,
}

static REGISTRY: Global<Registry> = Global::uninit();

pub fn init() {
    REGISTRY.init_once(|| {
        spin::Mutex::new(Registry {
            channels: OrderedMap::new(),
            next_id: 1,
        })
    });
}

fn with_registry<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
    let lock = REGISTRY.get().expect("ipc channel registry not initialized");
    f(&mut lock.lock())
}

/// Creates a channel owned by the calling thread, returning its id.
pub fn create(owner: ThreadId) -> ChannelId {
    with_registry(|r| {
        let id = ChannelId(r.next_id);
        r.next_id += 1;
        r.channels.insert(
            id,
            Channel {
                owner,
                pending_sends: VecDeque::new(),
                pending_pulses: VecDeque::new(),
                receiver_waiting: false,
            },
        );
        id
    })
}

/// Tears down a channel: every sender still queued (received or not) is
/// woken with `Error::Invalid` instead of being left blocked forever
/// waiting on a reply that can no longer come.
pub fn destroy(id: ChannelId) {
    let removed = with_registry(|r| r.channels.remove(&id));
    if let Some(ch) = removed {
        for pending in ch.pending_sends {
            *pending.reply.lock() = Some(Err(Error::Invalid));
            scheduler::wake_thread(pending.sender);
        }
    }
}

fn wake_receiver_if_waiting(id: ChannelId, owner: ThreadId) {
    let should_wake = with_registry(|r| match r.channels.get_mut(&id) {
        Some(ch) if ch.receiver_waiting => {
            ch.receiver_waiting = false;
            true
        }
        _ => false,
    });
    if should_wake {
        scheduler::wake_thread(owner);
    }
}

/// Blocking synchronous send: queues `data` on `id` and does not return
/// until the server calls `reply()` or the channel is destroyed out from
/// under it. Boosts the server's effective priority to the sender's own
/// for the duration of the call, so a high-priority client is never
/// stuck behind a lower-priority server.
pub fn send(id: ChannelId, sender: ThreadId, data: Vec<u8>) -> Result<Vec<u8>> {
    let reply: ReplySlot = Arc::new(SpinLock::new(None));
    let owner = with_registry(|r| {
        let ch = r.channels.get_mut(&id).ok_or(Error::Invalid)?;
        let owner = ch.owner;
        ch.pending_sends.push_back(PendingSend {
            sender,
            data,
            reply: reply.clone(),
        });
        Ok::<_, Error>(owner)
    })?;

    let boost = scheduler::effective_priority_of(sender).unwrap_or(Priority::Normal);
    scheduler::inherit_priority(owner, boost);
    wake_receiver_if_waiting(id, owner);

    loop {
        if reply.lock().is_some() {
            break;
        }
        scheduler::block_current_thread();
    }
    scheduler::revert_priority(owner);

    reply.lock().take().expect("reply present")
}

/// Fire-and-forget async notification. Never blocks the sender.
pub fn send_pulse(id: ChannelId, pulse: Pulse) -> Result<()> {
    let owner = with_registry(|r| {
        let ch = r.channels.get_mut(&id).ok_or(Error::Invalid)?;
        ch.pending_pulses.push_back(pulse);
        Ok::<_, Error>(ch.owner)
    })?;
    wake_receiver_if_waiting(id, owner);
    Ok(())
}

/// What `receive()` handed back: either a synchronous request (with a
/// handle the server later passes to `reply()`), or a pulse.
pub enum Received {
    Message { sender: ThreadId, data: Vec<u8>, reply: ReplySlot },
    Pulse(Pulse),
}

/// Blocks until a message or pulse arrives on `id`.
pub fn receive(id: ChannelId) -> Result<Received> {
    loop {
        let outcome = with_registry(|r| {
            let ch = r.channels.get_mut(&id).ok_or(Error::Invalid)?;
            if let Some(pending) = ch.pending_sends.pop_front() {
                return Ok::<_, Error>(Some(Received::Message {
                    sender: pending.sender,
                    data: pending.data,
                    reply: pending.reply,
                }));
            }
            if let Some(pulse) = ch.pending_pulses.pop_front() {
                return Ok(Some(Received::Pulse(pulse)));
            }
            ch.receiver_waiting = true;
            Ok(None)
        })?;
        match outcome {
            Some(received) => return Ok(received),
            None => scheduler::block_current_thread(),
        }
    }
}

/// Posts a reply, waking the blocked sender.
pub fn reply(handle: ReplySlot, data: Vec<u8>, sender: ThreadId) {
    *handle.lock() = Some(Ok(data));
    scheduler::wake_thread(sender);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() {
        REGISTRY.init_once(|| {
            spin::Mutex::new(Registry {
                channels: OrderedMap::new(),
                next_id: 1,
            })
        });
        with_registry(|r| r.channels.clear());
    }

    #[test]
    fn destroy_fails_queued_senders_instead_of_hanging() {
        fresh();
        let owner = ThreadId(1);
        let id = create(owner);
        let reply: ReplySlot = Arc::new(SpinLock::new(None));
        with_registry(|r| {
            r.channels.get_mut(&id).unwrap().pending_sends.push_back(PendingSend {
                sender: ThreadId(2),
                data: alloc::vec![1, 2, 3],
                reply: reply.clone(),
            });
        });
        destroy(id);
        assert_eq!(reply.lock().take(), Some(Err(Error::Invalid)));
    }

    #[test]
    fn send_after_destroy_is_invalid() {
        fresh();
        let id = create(ThreadId(1));
        destroy(id);
        assert_eq!(send(id, ThreadId(2), alloc::vec![]).unwrap_err(), Error::Invalid);
    }
}
