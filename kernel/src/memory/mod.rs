//! Virtual memory subsystem: physical page allocation, the kernel heap,
//! object caches, and per-process address spaces.

pub mod address_space;
pub mod mmu;
pub mod page;
pub mod slab;

use linked_list_allocator::LockedHeap;

use crate::config::HEAP_SIZE;

#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Statically reserved kernel heap backing store. Until a boot-time memory
/// map is parsed, this array is itself the kernel's supply of early
/// physical memory, the same role `BootInfoFrameAllocator`'s usable-region
/// walk plays before the allocator takes over.
static mut HEAP: [u8; HEAP_SIZE] = [0; HEAP_SIZE];

/// Total physical frames backing the buddy pool, expressed as a multiple
/// of `config::BUDDY_MAX_ORDER`'s largest block so the pool seeds cleanly.
const PHYSICAL_POOL_FRAMES: u32 = 4096;

pub fn init() {
    unsafe {
        let heap_start = core::ptr::addr_of_mut!(HEAP) as *mut u8;
        ALLOCATOR.lock().init(heap_start, HEAP_SIZE);
    }
    // Frame 0 is reserved for the exception vector page (`HIGH_VECTORS_BASE`
    // is a fixed virtual alias of it, not identity-mapped), so the pool
    // starts counting from frame 1.
    page::init(1, PHYSICAL_POOL_FRAMES - 1);
    address_space::init();
}
