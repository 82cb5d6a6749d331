//! The process manager: a kernel thread listening on a well-known
//! channel (pid `PROCMGR_PID`, channel id `CHANNEL`) that answers every
//! request a process can't service itself — the kernel-side half of libc
//! calls like `fork`/`sbrk`/`kill` in the original design.
//!
//! Requests are tagged with a one-byte opcode (`syscall::numbers`)
//! followed by an opcode-specific payload; `DISPATCH` is a straight
//! array indexed by opcode rather than a `match`, so adding an opcode
//! never risks an un-updated fallthrough arm.

use alloc::vec::Vec;

use crate::error::Error;
use crate::ipc::{self, ChannelId};
use crate::loader;
use crate::memory::address_space::AddressSpace;
use crate::syscall::numbers;
use crate::task::{scheduler, ThreadId};

use super::process::{self, Pid};
use super::reaper;

pub const CHANNEL: ChannelId = ChannelId(0);

type Handler = fn(ThreadId, &[u8]) -> Result<Vec<u8>, Error>;

static DISPATCH: [Option<Handler>; numbers::OPCODE_COUNT] = {
    let mut table: [Option<Handler>; numbers::OPCODE_COUNT] = [None; numbers::OPCODE_COUNT];
    table[numbers::EXIT as usize] = Some(handle_exit);
    table[numbers::SIGNAL as usize] = Some(handle_signal);
    table[numbers::GET_PID as usize] = Some(handle_get_pid);
    table[numbers::SPAWN as usize] = Some(handle_spawn);
    table[numbers::INTERRUPT_ATTACH as usize] = Some(handle_interrupt_stub);
    table[numbers::INTERRUPT_DETACH as usize] = Some(handle_interrupt_stub);
    table[numbers::INTERRUPT_COMPLETE as usize] = Some(handle_interrupt_stub);
    table[numbers::MAP_PHYS as usize] = Some(handle_map_phys);
    table[numbers::NAME_ATTACH as usize] = Some(handle_name_attach);
    table[numbers::NAME_OPEN as usize] = Some(handle_name_open);
    table[numbers::CHILD_WAIT_ATTACH as usize] = Some(handle_child_wait_attach);
    table[numbers::CHILD_WAIT_DETACH as usize] = Some(handle_child_wait_detach);
    table[numbers::CHILD_WAIT_ARM as usize] = Some(handle_child_wait_arm);
    table[numbers::SBRK as usize] = Some(handle_sbrk);
    table
};

/// Decodes and runs one request, returning the reply payload to post
/// back through `ipc::reply`. `Exit` is the one opcode `run()` never
/// posts this back for: the caller that issued it is torn down before a
/// reply could ever reach it.
pub fn dispatch(sender: ThreadId, data: &[u8]) -> Vec<u8> {
    let (&opcode, payload) = match data.split_first() {
        Some(split) => split,
        None => return encode_error(Error::Invalid),
    };
    match DISPATCH.get(opcode as usize).copied().flatten() {
        Some(handler) => match handler(sender, payload) {
            Ok(reply) => encode_ok(&reply),
            Err(e) => encode_error(e),
        },
        None => encode_error(Error::NoSys),
    }
}

/// Runs the process manager's receive loop. Spawned as a kernel thread
/// at boot; never returns.
pub extern "C" fn run() -> ! {
    loop {
        match ipc::receive(CHANNEL) {
            Ok(ipc::Received::Message { sender, data, reply }) => {
                let opcode = data.first().copied();
                let response = dispatch(sender, &data);
                // `Exit` reaps `sender`'s whole process, including the
                // thread that sent this request; there is no one left to
                // reply to.
                if opcode != Some(numbers::EXIT) {
                    ipc::reply(reply, response, sender);
                }
            }
            Ok(ipc::Received::Pulse(_)) => {}
            Err(_) => {}
        }
    }
}

fn encode_ok(payload: &[u8]) -> Vec<u8> {
    let mut out = alloc::vec![0u8; 4 + payload.len()];
    out[..4].copy_from_slice(&0i32.to_le_bytes());
    out[4..].copy_from_slice(payload);
    out
}

fn encode_error(e: Error) -> Vec<u8> {
    (e as i32).to_le_bytes().to_vec()
}

fn read_u32(payload: &[u8], offset: usize) -> Result<u32, Error> {
    payload
        .get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(Error::Invalid)
}

fn current_pid(sender: ThreadId) -> Result<Pid, Error> {
    process::owner_of(sender).ok_or(Error::Invalid)
}

/// Reaps the exiting process inline: removes its table entry, force-exits
/// every thread it owned (including `sender`), drops its address space,
/// and tells the reaper a child finished. No reply is ever posted for
/// this opcode (`run()` skips it), so the return value here only matters
/// for `dispatch`'s uniform handler signature.
fn handle_exit(sender: ThreadId, _payload: &[u8]) -> Result<Vec<u8>, Error> {
    let pid = current_pid(sender)?;
    if let Some(process) = process::remove(pid) {
        for thread in process.threads {
            scheduler::force_exit(thread);
        }
        if let Some(parent) = process.parent {
            reaper::notify_exit(pid, parent);
        }
        // `process.address_space` drops here, freeing every frame it owned.
    }
    Ok(Vec::new())
}

fn handle_signal(sender: ThreadId, payload: &[u8]) -> Result<Vec<u8>, Error> {
    let _target = read_u32(payload, 0)?;
    let _signum = read_u32(payload, 4)?;
    let _ = sender;
    // Signal *delivery* semantics (default actions, masking, handler
    // frames) belong to userspace's signal library, not this kernel; the
    // kernel side of this call is the queuing point a future signal
    // library would build on.
    Err(Error::NoSys)
}

fn handle_get_pid(sender: ThreadId, _payload: &[u8]) -> Result<Vec<u8>, Error> {
    let pid = current_pid(sender)?;
    Ok(pid.to_le_bytes().to_vec())
}

/// `payload` is the raw image the registered `loader::ProgramLoader`
/// understands (a path into a RAM-fs, an ELF image, or whatever the
/// embedding loader resolves) — `Spawn` itself is agnostic to the format.
fn handle_spawn(sender: ThreadId, payload: &[u8]) -> Result<Vec<u8>, Error> {
    let parent = current_pid(sender)?;
    let mut space = AddressSpace::new();
    // Resolved but not yet handed to a runnable thread: this scheduler
    // has no user-mode thread-launch primitive (exception-return frame,
    // PL0 entry) yet, only the kernel-thread `scheduler::spawn` every
    // existing thread in this kernel uses.
    let _entry = loader::load(payload, &mut space)?;
    let child = process::spawn(Some(parent), space);
    Ok(child.to_le_bytes().to_vec())
}

fn handle_interrupt_stub(_sender: ThreadId, _payload: &[u8]) -> Result<Vec<u8>, Error> {
    // No `InterruptController` is wired up without a concrete PL190
    // driver; the dispatch entry exists so callers get `NoSys`, not
    // `NoSuchChannel`, when they probe for interrupt support.
    Err(Error::NoSys)
}

/// Maps `len` bytes of the physical range starting at `pa` into the
/// caller's address space, replying with the virtual base the kernel
/// chose (the caller never picks its own address for this).
fn handle_map_phys(sender: ThreadId, payload: &[u8]) -> Result<Vec<u8>, Error> {
    let pa = read_u32(payload, 0)?;
    let len = read_u32(payload, 4)?;
    let pid = current_pid(sender)?;
    let virt =
        process::with_process(pid, |p| p.address_space.create_physical(pa, len)).ok_or(Error::Invalid)??;
    Ok(virt.to_le_bytes().to_vec())
}

/// Allocates a channel owned by `sender` and attaches it at `path`,
/// rolling the channel back if the name is already taken.
fn handle_name_attach(sender: ThreadId, payload: &[u8]) -> Result<Vec<u8>, Error> {
    let path = core::str::from_utf8(payload).map_err(|_| Error::Invalid)?;
    let channel = ipc::channel_create(sender);
    if let Err(e) = super::nameserver::attach(path, channel) {
        ipc::channel_destroy(channel);
        return Err(e);
    }
    Ok(channel.0.to_le_bytes().to_vec())
}

fn handle_name_open(_sender: ThreadId, payload: &[u8]) -> Result<Vec<u8>, Error> {
    let path = core::str::from_utf8(payload).map_err(|_| Error::Invalid)?;
    let channel = super::nameserver::open(path)?;
    Ok(channel.0.to_le_bytes().to_vec())
}

fn handle_child_wait_attach(sender: ThreadId, payload: &[u8]) -> Result<Vec<u8>, Error> {
    let channel = read_u32(payload, 0)?;
    let pid = current_pid(sender)?;
    reaper::attach(pid, ChannelId(channel))?;
    Ok(Vec::new())
}

fn handle_child_wait_detach(sender: ThreadId, _payload: &[u8]) -> Result<Vec<u8>, Error> {
    let pid = current_pid(sender)?;
    reaper::detach(pid);
    Ok(Vec::new())
}

fn handle_child_wait_arm(sender: ThreadId, payload: &[u8]) -> Result<Vec<u8>, Error> {
    let child = read_u32(payload, 0)?;
    let pid = current_pid(sender)?;
    reaper::arm(pid, child)?;
    Ok(Vec::new())
}

/// Grows the caller's heap by `increment` bytes (a multiple of the page
/// size), replying with the break's value before the call.
fn handle_sbrk(sender: ThreadId, payload: &[u8]) -> Result<Vec<u8>, Error> {
    let increment = read_u32(payload, 0)?;
    let pid = current_pid(sender)?;
    let (old_break, _new_break) =
        process::with_process(pid, |p| p.address_space.extend_heap(increment)).ok_or(Error::Invalid)??;
    Ok(old_break.to_le_bytes().to_vec())
}

/// Spawns the process manager's own kernel thread at boot.
pub fn spawn_kernel_thread() {
    use crate::arch_impl::current::{Privilege, PrivilegeLevel};
    use crate::task::thread::Priority;
    let tid = scheduler::spawn(Priority::Io, Privilege::kernel(), run);
    let pid = process::spawn(None, AddressSpace::new());
    let _ = process::add_thread(pid, tid);
}
