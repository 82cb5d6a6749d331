//! Path -> channel name registry (`NameAttach`/`NameOpen`), one
//! `collections::OrderedMap` behind a single spinlock. No wildcard or
//! prefix matching: a name resolves to exactly the channel that last
//! attached it, matching the original's single-owner-per-path model.

use alloc::string::String;

use crate::collections::OrderedMap;
use crate::error::{Error, Result};
use crate::ipc::ChannelId;
use crate::once::Global;

static NAMES: Global<OrderedMap<String, ChannelId>> = Global::uninit();

pub fn init() {
    NAMES.init_once(|| spin::Mutex::new(OrderedMap::new()));
}

fn with_names<R>(f: impl FnOnce(&mut OrderedMap<String, ChannelId>) -> R) -> R {
    let lock = NAMES.get().expect("name registry not initialized");
    f(&mut lock.lock())
}

/// `NameAttach`: registers `path` as resolving to `channel`. Rejects a
/// path that already has an owner rather than silently replacing it, so
/// a second server can't steal a name out from under the first without
/// it detaching first.
pub fn attach(path: &str, channel: ChannelId) -> Result<()> {
    with_names(|names| {
        if names.contains_key(path) {
            return Err(Error::Invalid);
        }
        names.insert(String::from(path), channel);
        Ok(())
    })
}

pub fn detach(path: &str) {
    with_names(|names| {
        names.remove(path);
    });
}

/// `NameOpen`: resolves `path` to the channel currently attached there.
pub fn open(path: &str) -> Result<ChannelId> {
    with_names(|names| names.get(path).copied()).ok_or(Error::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_then_open_resolves() {
        NAMES.init_once(|| spin::Mutex::new(OrderedMap::new()));
        with_names(|names| names.clear());
        attach("/dev/console", ChannelId(3)).unwrap();
        assert_eq!(open("/dev/console"), Ok(ChannelId(3)));
        detach("/dev/console");
        assert_eq!(open("/dev/console"), Err(Error::Invalid));
    }

    #[test]
    fn attach_rejects_duplicate_path() {
        NAMES.init_once(|| spin::Mutex::new(OrderedMap::new()));
        with_names(|names| names.clear());
        attach("/dev/null", ChannelId(1)).unwrap();
        assert_eq!(attach("/dev/null", ChannelId(2)), Err(Error::Invalid));
        detach("/dev/null");
    }
}
