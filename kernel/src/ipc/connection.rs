//! Connections: a client-side handle to a channel, the indirection layer
//! a `ConnectAttach`-style open goes through so a channel can be renamed,
//! relocated, or torn down without every client holding the raw id.

use crate::collections::OrderedMap;
use crate::error::{Error, Result};
use crate::once::Global;

use super::message::{ChannelId, ConnectionId};

static CONNECTIONS: Global<Registry> = Global::uninit();

struct Registry {
    table: OrderedMap<ConnectionId, ChannelId>,
    next_id: u32,
}

pub fn init() {
    CONNECTIONS.init_once(|| {
        spin::Mutex::new(Registry {
            table: OrderedMap::new(),
            next_id: 1,
        })
    });
}

fn with_registry<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
    let lock = CONNECTIONS.get().expect("connection registry not initialized");
    f(&mut lock.lock())
}

/// Opens a connection to `channel`, returning an id clients use for
/// `Send`/`MessagePulse` instead of the channel id directly.
pub fn attach(channel: ChannelId) -> ConnectionId {
    with_registry(|r| {
        let id = ConnectionId(r.next_id);
        r.next_id += 1;
        r.table.insert(id, channel);
        id
    })
}

pub fn detach(id: ConnectionId) {
    with_registry(|r| {
        r.table.remove(&id);
    });
}

pub fn resolve(id: ConnectionId) -> Result<ChannelId> {
    with_registry(|r| r.table.get(&id).copied()).ok_or(Error::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_then_resolve_round_trips() {
        CONNECTIONS.init_once(|| {
            spin::Mutex::new(Registry {
                table: OrderedMap::new(),
                next_id: 1,
            })
        });
        let channel = ChannelId(7);
        let conn = attach(channel);
        assert_eq!(resolve(conn), Ok(channel));
        detach(conn);
        assert_eq!(resolve(conn), Err(Error::Invalid));
    }
}
