//! Process-manager message opcodes: the one-byte tag every request to
//! `process::procmgr`'s channel leads with. A separate, much smaller
//! numbering space from `syscall`'s own trap constants — these are
//! ordinary IPC payloads dispatched by `procmgr::dispatch`, not traps.

pub const EXIT: u8 = 0;
pub const SIGNAL: u8 = 1;
pub const GET_PID: u8 = 2;
pub const SPAWN: u8 = 3;
pub const INTERRUPT_ATTACH: u8 = 4;
pub const INTERRUPT_DETACH: u8 = 5;
pub const INTERRUPT_COMPLETE: u8 = 6;
pub const MAP_PHYS: u8 = 7;
pub const NAME_ATTACH: u8 = 8;
pub const NAME_OPEN: u8 = 9;
pub const CHILD_WAIT_ATTACH: u8 = 10;
pub const CHILD_WAIT_DETACH: u8 = 11;
pub const CHILD_WAIT_ARM: u8 = 12;
pub const SBRK: u8 = 13;

pub const OPCODE_COUNT: usize = 14;
