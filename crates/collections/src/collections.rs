//! Collection types shared across termdock.
//!
//! `FxHashMap`/`FxHashSet` back the host-side lookup tables (small integer keys),
//! `BTreeMap` backs the terminal registry where ordered scans matter, and
//! `IndexMap` keeps insertion order for anything listed back to the user.

pub use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
pub use std::collections::*;

/// Insertion-ordered hash map with FxHash.
pub type IndexMap<K, V> = indexmap::IndexMap<K, V, FxBuildHasher>;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn btree_map_iterates_keys_in_order() {
        let mut map = BTreeMap::new();
        map.insert(3, "c");
        map.insert(1, "a");
        map.insert(2, "b");
        let keys: Vec<_> = map.keys().rev().copied().collect();
        assert_eq!(keys, vec![3, 2, 1]);
    }

    #[test]
    fn index_map_keeps_insertion_order() {
        let mut map: IndexMap<&str, u32> = IndexMap::default();
        map.insert("second", 2);
        map.insert("first", 1);
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, vec!["second", "first"]);
    }
}
