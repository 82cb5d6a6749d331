//! Interrupt attach/detach bookkeeping.
//!
//! This crate has no concrete `InterruptController` (the PL190 driver is
//! out of scope); what lives here is the registration table a real
//! driver's IRQ dispatch loop would consult — which thread asked to be
//! notified of which IRQ (`InterruptAttach`), and the pending-completion
//! state `InterruptComplete` clears before the controller re-enables
//! that line.

use crate::collections::OrderedMap;
use crate::error::{Error, Result};
use crate::once::Global;
use crate::task::ThreadId;

struct Registrations {
    handlers: OrderedMap<u8, ThreadId>,
}

static REGISTRATIONS: Global<Registrations> = Global::uninit();

pub fn init() {
    REGISTRATIONS.init_once(|| {
        spin::Mutex::new(Registrations {
            handlers: OrderedMap::new(),
        })
    });
}

pub fn attach(irq: u8, thread: ThreadId) -> Result<()> {
    let lock = REGISTRATIONS.get().ok_or(Error::Invalid)?;
    let mut regs = lock.lock();
    if regs.handlers.contains_key(&irq) {
        return Err(Error::Invalid);
    }
    regs.handlers.insert(irq, thread);
    Ok(())
}

pub fn detach(irq: u8) {
    if let Some(lock) = REGISTRATIONS.get() {
        lock.lock().handlers.remove(&irq);
    }
}

/// Looks up which thread, if any, is attached to `irq`. A real driver's
/// dispatch loop calls this to decide who to pulse.
pub fn handler_for(irq: u8) -> Option<ThreadId> {
    REGISTRATIONS.get()?.lock().handlers.get(&irq).copied()
}
