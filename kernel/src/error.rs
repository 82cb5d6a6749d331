//! The single closed error type used everywhere in the kernel.
//!
//! No subsystem defines its own error enum; every fallible operation, from
//! the buddy allocator up through the syscall dispatcher, returns
//! `Result<T, Error>`. At the syscall boundary an `Err(e)` becomes the
//! negated discriminant, matching the original design's convention of
//! returning small negative integers to userspace.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Error {
    /// Operation completed; never actually constructed as `Err(Error::Ok)`,
    /// kept only so `Ok as i32 == 0` lines up with the syscall ABI.
    Ok = 0,
    /// No such syscall / message type.
    NoSys = 1,
    /// Bad argument: out of range, misaligned, or otherwise malformed.
    Invalid = 2,
    /// Physical or virtual address space exhausted.
    NoMem = 3,
    /// Cross-address-space copy hit an unmapped or inaccessible page.
    Fault = 4,
    /// The target thread or process is exiting and cannot accept the
    /// operation (e.g. `Send` to a channel whose owner already exited).
    Exiting = 5,
}

pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::Ok => "ok",
            Error::NoSys => "no such syscall",
            Error::Invalid => "invalid argument",
            Error::NoMem => "out of memory",
            Error::Fault => "fault",
            Error::Exiting => "target is exiting",
        };
        f.write_str(msg)
    }
}

impl Error {
    /// Negated discriminant, the value a syscall handler places in the
    /// return register on failure.
    pub fn to_syscall_return(self) -> isize {
        -(self as i32 as isize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_matches_abi_convention() {
        assert_eq!(Error::Invalid.to_syscall_return(), -2);
        assert_eq!(Error::Fault.to_syscall_return(), -4);
    }
}
