//! Architecture-agnostic traits separating core logic from ARMv6 register
//! access. Only one architecture is implemented (`armv6`), but the split
//! keeps e.g. the scheduler and spinlock code from reaching for `asm!`
//! directly, the way the rest of the kernel never touches `TTBR0` without
//! going through `PageTableOps`.

/// Basic CPU control: interrupt masking and halting.
pub trait CpuOps {
    /// # Safety
    /// Caller must be in a context where unmasking IRQs is correct (not
    /// already holding a lock acquired with them masked for a reason).
    unsafe fn enable_interrupts();

    /// # Safety
    /// Caller must restore the prior state; never leave IRQs masked across
    /// a context switch boundary.
    unsafe fn disable_interrupts();

    fn interrupts_enabled() -> bool;

    /// Halts until the next interrupt (`wfi`).
    fn halt();
}

/// CPU privilege level: EL... no, PL1 (kernel, "supervisor") / PL0 (user)
/// on ARMv6's `CPSR` mode bits.
pub trait PrivilegeLevel: Copy + Eq {
    fn kernel() -> Self;
    fn user() -> Self;
    fn is_kernel(&self) -> bool;
    fn is_user(&self) -> bool;
}

/// Page table entry flags, abstracting the ARM `AP`/`XN`/`C`/`B` bits.
pub trait PageFlags: Copy + Clone + Sized {
    fn kernel_only() -> Self;
    fn user_read_only() -> Self;
    fn user_read_write() -> Self;
    fn no_cache() -> Self;
}

/// Low-level page table root manipulation (`TTBR0`/`TTBR1`, TLB flush).
pub trait PageTableOps {
    /// Reads `TTBR0` (the current user address space root).
    fn read_ttbr0() -> u32;

    /// # Safety
    /// `addr` must be a 16 KiB-aligned physical address of a valid
    /// first-level table, or page faults become undefined.
    unsafe fn write_ttbr0(addr: u32);

    fn flush_tlb_all();
    fn flush_tlb_page(addr: u32);

    const PAGE_SIZE: usize;
    const SECTION_SIZE: usize;
    const FIRST_LEVEL_ENTRIES: usize;
    const SECOND_LEVEL_ENTRIES: usize;
}

/// Generic interrupt controller (PL190 in the reference platform, but this
/// crate only defines the interface it is driven through).
pub trait InterruptController {
    fn init();
    fn enable_irq(irq: u8);
    fn disable_irq(irq: u8);
    fn ack(irq: u8);
}

/// Periodic tick source (SP804 in the reference platform).
pub trait PeriodicTimer {
    fn init(hz: u32);
    fn ack();
}
