//! Syscall entry dispatch: the kernel-level primitives a user thread
//! traps into directly (channel/connection management, the four
//! synchronous IPC verbs, thread creation). Higher-level services
//! (`sbrk`, `spawn`, naming, child-wait) are not separate syscalls; user
//! code reaches them by `MessageSend`ing to the process manager's
//! channel with the opcodes in `numbers`, same as any other server.

pub mod numbers;

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::ipc::{self, ChannelId, ConnectionId};
use crate::task::{scheduler, thread::Priority, ThreadId};

pub const CHANNEL_CREATE: u32 = 0;
pub const CONNECT_ATTACH: u32 = 1;
pub const CONNECT_DETACH: u32 = 2;
pub const MSG_SEND: u32 = 3;
pub const MSG_RECEIVE: u32 = 4;
pub const MSG_REPLY: u32 = 5;
pub const THREAD_CREATE: u32 = 6;

pub fn init() {
    reply_tokens::init();
}

/// Raw syscall arguments as they arrive from the trap frame. `data` is
/// already copied into a kernel buffer by the trap handler (`interrupts`)
/// via `AddressSpace::copy_out` before this is called; `Send`/`Reply`
/// never see user pointers directly.
pub enum Args {
    ChannelCreate,
    ConnectAttach { channel: u32 },
    ConnectDetach { connection: u32 },
    Send { connection: u32, data: Vec<u8> },
    Receive { channel: u32 },
    Reply { reply_token: u64, data: Vec<u8> },
    ThreadCreate { priority: u8, entry: u32 },
}

pub enum Return {
    ChannelId(u32),
    ConnectionId(u32),
    Bytes(Vec<u8>),
    /// A `Receive` that got an ordinary message rather than a pulse:
    /// `reply_token` names the rendezvous a later `Reply` trap resolves
    /// back to the blocked sender.
    Message { reply_token: u64, data: Vec<u8> },
    ThreadId(u32),
    Unit,
}

/// Dispatches one decoded syscall on behalf of `caller`.
pub fn dispatch(caller: ThreadId, args: Args) -> Result<Return> {
    match args {
        Args::ChannelCreate => Ok(Return::ChannelId(ipc::channel_create(caller).0)),
        Args::ConnectAttach { channel } => Ok(Return::ConnectionId(ipc::connect(ChannelId(channel)).0)),
        Args::ConnectDetach { connection } => {
            crate::ipc::connection::detach(ConnectionId(connection));
            Ok(Return::Unit)
        }
        Args::Send { connection, data } => {
            let reply = ipc::send(ConnectionId(connection), caller, data)?;
            Ok(Return::Bytes(reply))
        }
        Args::Receive { channel } => match ipc::receive(ChannelId(channel))? {
            ipc::Received::Message { sender, data, reply } => {
                let reply_token = reply_tokens::register(sender, reply);
                Ok(Return::Message { reply_token, data })
            }
            ipc::Received::Pulse(p) => Ok(Return::Bytes(alloc::vec![p.code as u8])),
        },
        Args::Reply { reply_token, data } => {
            let (sender, reply) = reply_tokens::take(reply_token).ok_or(Error::Invalid)?;
            ipc::reply(reply, data, sender);
            Ok(Return::Unit)
        }
        Args::ThreadCreate { priority, entry } => {
            use crate::arch_impl::current::{Privilege, PrivilegeLevel};
            let priority = if priority == 0 { Priority::Normal } else { Priority::Io };
            let entry: extern "C" fn() -> ! = unsafe { core::mem::transmute(entry as usize) };
            let id = scheduler::spawn(priority, Privilege::user(), entry);
            Ok(Return::ThreadId(id.0))
        }
    }
}

/// Maps the opaque tokens `Receive` hands back to userspace onto the
/// `ReplySlot`/sender pair a later `Reply` trap completes the rendezvous
/// with. Kept separate from `ipc::channel` itself: the token is a
/// syscall-layer concept, meaningless to IPC internals that already
/// identify a rendezvous by its `ReplySlot` handle directly.
mod reply_tokens {
    use crate::collections::OrderedMap;
    use crate::ipc::ReplySlot;
    use crate::once::Global;
    use crate::task::ThreadId;

    struct Registry {
        table: OrderedMap<u64, (ThreadId, ReplySlot)>,
        next_token: u64,
    }

    static REGISTRY: Global<Registry> = Global::uninit();

    pub fn init() {
        REGISTRY.init_once(|| {
            spin::Mutex::new(Registry {
                table: OrderedMap::new(),
                next_token: 1,
            })
        });
    }

    fn with_registry<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
        let lock = REGISTRY.get().expect("reply token registry not initialized");
        f(&mut lock.lock())
    }

    /// Registers `sender`/`reply` against a freshly allocated token.
    pub fn register(sender: ThreadId, reply: ReplySlot) -> u64 {
        with_registry(|r| {
            let token = r.next_token;
            r.next_token += 1;
            r.table.insert(token, (sender, reply));
            token
        })
    }

    /// Resolves and consumes a token. `None` if it names no pending
    /// rendezvous (already replied to, or never issued).
    pub fn take(token: u64) -> Option<(ThreadId, ReplySlot)> {
        with_registry(|r| r.table.remove(&token))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use alloc::sync::Arc;
        use crate::spinlock::SpinLock;

        fn fresh() {
            init();
            with_registry(|r| r.table.clear());
        }

        #[test]
        fn register_then_take_round_trips() {
            fresh();
            let reply: ReplySlot = Arc::new(SpinLock::new(None));
            let token = register(ThreadId(3), reply.clone());
            let (sender, resolved) = take(token).unwrap();
            assert_eq!(sender, ThreadId(3));
            assert!(Arc::ptr_eq(&reply, &resolved));
        }

        #[test]
        fn take_consumes_the_token() {
            fresh();
            let reply: ReplySlot = Arc::new(SpinLock::new(None));
            let token = register(ThreadId(1), reply);
            assert!(take(token).is_some());
            assert!(take(token).is_none());
        }

        #[test]
        fn unknown_token_is_none() {
            fresh();
            assert!(take(9999).is_none());
        }
    }
}
