//! Object-cache (slab) allocator for fixed-size kernel objects (TCBs,
//! messages, channel/connection descriptors).
//!
//! Small objects (`size <= PAGE_SIZE / 8`) get one whole page per slab; the
//! free list threads through the unused object storage itself, and a
//! bufctl's owning slab is recovered by masking the pointer down to the
//! page boundary, where a `SlabHeader` lives. Large objects keep their
//! slab metadata out of band, with bufctl -> slab resolved by a
//! `collections::OrderedMap` keyed directly on the bufctl's address, since
//! there's no spare room in a single page to embed both the header and a
//! large object's free list pointers safely. Slabs draw their backing
//! pages from the global allocator rather than the buddy pool directly:
//! the buddy pool hands out physical frame numbers, and nothing below
//! `memory::address_space` has mapped an always-accessible virtual window
//! over all of physical memory yet, whereas the heap already sits on
//! mapped, cacheable memory.
//!
//! `SlabBox<T>` is the owning-pointer wrapper callers use to allocate a
//! single object out of a `Cache` instead of calling `alloc`/`free` by
//! hand; `memory::address_space` is the one real consumer.

use alloc::alloc::{alloc, dealloc, Layout};
use alloc::boxed::Box;
use core::ptr::NonNull;

use crate::collections::OrderedMap;
use crate::config::PAGE_SIZE;
use crate::error::{Error, Result};
use crate::spinlock::SpinLock;

const SMALL_THRESHOLD: usize = PAGE_SIZE / 8;

struct FreeNode {
    next: Option<NonNull<FreeNode>>,
}

/// Lives at the start of every small-object slab page.
struct SlabHeader {
    free: Option<NonNull<FreeNode>>,
    free_count: usize,
    object_size: usize,
}

struct LargeSlab {
    ptr: NonNull<u8>,
    layout: Layout,
}

struct Inner {
    object_size: usize,
    objects_per_page: usize,
    small_pages: alloc::vec::Vec<NonNull<SlabHeader>>,
    /// bufctl address -> owning slab, so `free_large` recovers the
    /// `Layout` to deallocate without a linear scan.
    large_slabs: OrderedMap<usize, LargeSlab>,
}

unsafe impl Send for Inner {}

/// A cache of same-sized objects.
pub struct Cache {
    inner: SpinLock<Inner>,
}

unsafe impl Sync for Cache {}

impl Cache {
    pub fn new(object_size: usize) -> Self {
        let object_size = object_size.max(core::mem::size_of::<FreeNode>());
        let header_size = core::mem::size_of::<SlabHeader>();
        let objects_per_page = if object_size <= SMALL_THRESHOLD {
            (PAGE_SIZE - header_size) / object_size
        } else {
            0
        };
        Cache {
            inner: SpinLock::new(Inner {
                object_size,
                objects_per_page,
                small_pages: alloc::vec::Vec::new(),
                large_slabs: OrderedMap::new(),
            }),
        }
    }

    pub fn alloc(&self) -> Result<NonNull<u8>> {
        let mut inner = self.inner.lock();
        if inner.object_size <= SMALL_THRESHOLD {
            inner.alloc_small()
        } else {
            inner.alloc_large()
        }
    }

    /// # Safety
    /// `ptr` must have come from a prior `alloc()` on this same cache and
    /// not have already been freed.
    pub unsafe fn free(&self, ptr: NonNull<u8>) {
        let mut inner = self.inner.lock();
        if inner.object_size <= SMALL_THRESHOLD {
            inner.free_small(ptr);
        } else {
            inner.free_large(ptr);
        }
    }
}

impl Inner {
    fn alloc_small(&mut self) -> Result<NonNull<u8>> {
        for &page in &self.small_pages {
            let header = unsafe { &mut *page.as_ptr() };
            if let Some(node) = header.free {
                header.free = unsafe { (*node.as_ptr()).next };
                header.free_count -= 1;
                return Ok(node.cast());
            }
        }
        self.grow_small()
    }

    fn grow_small(&mut self) -> Result<NonNull<u8>> {
        let layout = Layout::from_size_align(PAGE_SIZE, PAGE_SIZE).expect("valid page layout");
        let page = unsafe { alloc(layout) };
        let page = NonNull::new(page).ok_or(Error::NoMem)?;

        let header_size = core::mem::size_of::<SlabHeader>();
        let object_size = self.object_size;
        let objects_per_page = self.objects_per_page;

        let mut free_list = None;
        for i in (0..objects_per_page).rev() {
            let offset = header_size + i * object_size;
            let object_ptr = unsafe { page.as_ptr().add(offset) } as *mut FreeNode;
            unsafe {
                (*object_ptr).next = free_list;
            }
            free_list = NonNull::new(object_ptr);
        }

        let header_ptr = page.as_ptr() as *mut SlabHeader;
        unsafe {
            header_ptr.write(SlabHeader {
                free: free_list,
                free_count: objects_per_page,
                object_size,
            });
        }

        let header = unsafe { &mut *header_ptr };
        let object = header.free.ok_or(Error::NoMem)?;
        header.free = unsafe { (*object.as_ptr()).next };
        header.free_count -= 1;

        self.small_pages.push(NonNull::new(header_ptr).unwrap());
        Ok(object.cast())
    }

    unsafe fn free_small(&mut self, ptr: NonNull<u8>) {
        let page_base = (ptr.as_ptr() as usize) & !(PAGE_SIZE - 1);
        let header = &mut *(page_base as *mut SlabHeader);
        let node = ptr.cast::<FreeNode>();
        (*node.as_ptr()).next = header.free;
        header.free = Some(node);
        header.free_count += 1;
    }

    fn alloc_large(&mut self) -> Result<NonNull<u8>> {
        let layout =
            Layout::from_size_align(self.object_size, core::mem::align_of::<usize>()).map_err(|_| Error::Invalid)?;
        let ptr = unsafe { alloc(layout) };
        let ptr = NonNull::new(ptr).ok_or(Error::NoMem)?;
        self.large_slabs.insert(ptr.as_ptr() as usize, LargeSlab { ptr, layout });
        Ok(ptr)
    }

    unsafe fn free_large(&mut self, ptr: NonNull<u8>) {
        if let Some(slab) = self.large_slabs.remove(&(ptr.as_ptr() as usize)) {
            dealloc(slab.ptr.as_ptr(), slab.layout);
        }
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        let layout = Layout::from_size_align(PAGE_SIZE, PAGE_SIZE).expect("valid page layout");
        for page in inner.small_pages.drain(..) {
            unsafe { dealloc(page.as_ptr() as *mut u8, layout) };
        }
        for (_, slab) in core::mem::take(&mut inner.large_slabs) {
            unsafe { dealloc(slab.ptr.as_ptr(), slab.layout) };
        }
    }
}

// `Cache::inner` uses `SpinLock`, which requires `T: Send`; `OrderedMap`
// stores raw `NonNull` inside `LargeSlab`, so give it an explicit impl.
unsafe impl Send for LargeSlab {}

/// An owning pointer to a `T` allocated out of a `Cache`, freeing it back
/// to that cache on drop. `memory::address_space` uses this for its
/// per-arena `Mapping` descriptors instead of `Box`, so those allocations
/// go through the object cache rather than the global allocator directly.
pub struct SlabBox<'a, T> {
    ptr: NonNull<T>,
    cache: &'a Cache,
}

unsafe impl<T: Send> Send for SlabBox<'_, T> {}

impl<'a, T> SlabBox<'a, T> {
    pub fn new(cache: &'a Cache, value: T) -> Result<Self> {
        let raw = cache.alloc()?.cast::<T>();
        unsafe { raw.as_ptr().write(value) };
        Ok(SlabBox { ptr: raw, cache })
    }
}

impl<T> core::ops::Deref for SlabBox<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> core::ops::DerefMut for SlabBox<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for SlabBox<'_, T> {
    fn drop(&mut self) {
        unsafe {
            core::ptr::drop_in_place(self.ptr.as_ptr());
            self.cache.free(self.ptr.cast());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_object_roundtrip() {
        let cache = Cache::new(32);
        let a = cache.alloc().unwrap();
        let b = cache.alloc().unwrap();
        assert_ne!(a, b);
        unsafe {
            cache.free(a);
            cache.free(b);
        }
    }

    #[test]
    fn small_slab_grows_past_one_page() {
        let cache = Cache::new(64);
        let objects_per_page = cache.inner.lock().objects_per_page;
        let mut handles = alloc::vec::Vec::new();
        for _ in 0..(objects_per_page + 1) {
            handles.push(cache.alloc().unwrap());
        }
        assert_eq!(cache.inner.lock().small_pages.len(), 2);
        for h in handles {
            unsafe { cache.free(h) };
        }
    }

    #[test]
    fn large_object_roundtrip() {
        let cache = Cache::new(PAGE_SIZE);
        let a = cache.alloc().unwrap();
        unsafe { cache.free(a) };
        assert!(cache.inner.lock().large_slabs.is_empty());
    }

    #[test]
    fn large_slabs_resolve_independently_by_address() {
        let cache = Cache::new(PAGE_SIZE);
        let a = cache.alloc().unwrap();
        let b = cache.alloc().unwrap();
        assert_eq!(cache.inner.lock().large_slabs.len(), 2);
        unsafe { cache.free(a) };
        assert_eq!(cache.inner.lock().large_slabs.len(), 1);
        unsafe { cache.free(b) };
        assert!(cache.inner.lock().large_slabs.is_empty());
    }

    #[test]
    fn slab_box_allocates_and_frees_through_cache() {
        let cache = Cache::new(16);
        {
            let mut a = SlabBox::new(&cache, 7u32).unwrap();
            assert_eq!(*a, 7);
            *a = 9;
            assert_eq!(*a, 9);
        }
        let b = SlabBox::new(&cache, 1u32).unwrap();
        assert_eq!(*b, 1);
    }
}
