//! Balanced ordered map used for every sparse key-sorted lookup in the
//! kernel (translation-table second-level map, pid table, name registry,
//! large-object slab bufctl map).
//!
//! The original `RawTreeMap`/`TreeMap<K, V>` is a hand-rolled AVL tree
//! templated on `void*` keys and values. `alloc::collections::BTreeMap`
//! already is a balanced ordered map with an idiomatic, safe, generic API,
//! so there is nothing to gain from reimplementing AVL rotations here; this
//! module exists only to give the rest of the kernel one name
//! (`collections::OrderedMap`) to depend on, in case a future tuning pass
//! wants a kernel-tuned B-tree instead of the standard one.

pub use alloc::collections::BTreeMap as OrderedMap;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup_roundtrip() {
        let mut map: OrderedMap<u32, &str> = OrderedMap::new();
        map.insert(3, "three");
        map.insert(1, "one");
        assert_eq!(map.get(&3), Some(&"three"));
        assert_eq!(map.keys().copied().collect::<alloc::vec::Vec<_>>(), alloc::vec![1, 3]);
    }
}
