//! Kernel-wide tunables.
//!
//! Kept as one small `Config` rather than scattered constants so the
//! `testing` feature can shrink the heap and timer tick without touching
//! call sites, mirroring the teacher's OOM-injection knobs in
//! `memory::frame_allocator`.

/// Page size for every subsystem (buddy allocator, second-level page
/// tables, stacks). ARMv6 second-level (coarse) page table entries are
/// fixed at 4 KiB.
pub const PAGE_SIZE: usize = 4096;

/// Number of orders the buddy allocator manages: order 0 is one page,
/// order `MAX_ORDER - 1` is the largest contiguous block it will hand out.
pub const BUDDY_MAX_ORDER: usize = 3;

/// The two priority tiers the scheduler's runqueue supports.
pub const PRIORITY_LEVELS: usize = 2;

/// Kernel stack size, excluding the guard page.
pub const KERNEL_STACK_SIZE: usize = 2 * PAGE_SIZE;

/// Base virtual address of the direct physical map used for cross-address
/// -space copies (`P2V`/`V2P`). Everything at or above this address is the
/// kernel's own half of the address space (`TTBR1`).
pub const KERNEL_MODE_OFFSET: u32 = 0x8000_0000;

/// The user half `[0, KERNEL_MODE_OFFSET)` splits into three disjoint
/// arenas: explicit mappings in the bottom quarter, stacks in the next
/// quarter, and the heap in the upper half. Each address space enforces
/// these ranges itself; nothing here prevents overlap, that's
/// `memory::address_space`'s job.
pub const MAPPINGS_BASE: u32 = 0;
pub const MAPPINGS_CEILING: u32 = KERNEL_MODE_OFFSET / 4;
pub const STACKS_BASE: u32 = KERNEL_MODE_OFFSET / 4;
pub const STACKS_CEILING: u32 = KERNEL_MODE_OFFSET / 2;
pub const HEAP_BASE: u32 = KERNEL_MODE_OFFSET / 2;
pub const HEAP_CEILING: u32 = KERNEL_MODE_OFFSET;

/// High exception vector base, fixed by the ARMv6 architecture when the
/// `SCTLR.V` bit is set.
pub const HIGH_VECTORS_BASE: u32 = 0xFFFF_0000;

#[cfg(not(feature = "testing"))]
pub const HEAP_SIZE: usize = 4 * 1024 * 1024;
#[cfg(feature = "testing")]
pub const HEAP_SIZE: usize = 256 * 1024;

#[cfg(not(feature = "testing"))]
pub const TIMER_TICK_HZ: u32 = 100;
#[cfg(feature = "testing")]
pub const TIMER_TICK_HZ: u32 = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
    }
}
