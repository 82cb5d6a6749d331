//! One-time initialization primitive.
//!
//! The global singletons (page allocator, scheduler runqueues, pid map,
//! name registry, IRQ handler tables) are each a
//! `conquer_once::spin::OnceCell<spin::Mutex<T>>`, which is exactly this
//! pattern from the ecosystem crate the rest of the kernel already depends
//! on for `log`-adjacent setup — no hand-rolled `Once` type is needed.

pub use conquer_once::spin::OnceCell;

/// Convenience alias for the shape every subsystem singleton takes:
/// lazily-initialized state behind a spinlock, read through `get()` after
/// `init_once`.
pub type Global<T> = OnceCell<spin::Mutex<T>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_initializes_exactly_once() {
        static COUNTER: Global<u32> = OnceCell::uninit();
        COUNTER.init_once(|| spin::Mutex::new(0));
        COUNTER.init_once(|| spin::Mutex::new(99));
        assert_eq!(*COUNTER.get().unwrap().lock(), 0);
    }
}
