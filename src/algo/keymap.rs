//! Key → position maps over a sub-range of a list.
//!
//! Built lazily by the reconciler once the pointer scan stalls, then used
//! for O(1) identity lookups.
//!
//! # Duplicate keys
//!
//! The last occurrence in the range wins. Earlier duplicates are simply not
//! reachable through the map.

use std::hash::Hash;
use std::ops::Range;

use rustc_hash::FxHashMap;

use crate::key::Key;
use crate::part::KeyedPart;
use crate::result::RenderResult;

/// Mapping from key to index in the full (unsliced) list.
#[derive(Debug, Clone)]
pub struct KeyIndexMap<K> {
    map: FxHashMap<Key<K>, usize>,
}

impl<K: Hash + Eq + Clone> KeyIndexMap<K> {
    fn build<'a>(entries: impl Iterator<Item = (usize, &'a Key<K>)>, capacity: usize) -> Self
    where
        K: 'a,
    {
        let mut map = FxHashMap::default();
        map.reserve(capacity);
        for (index, key) in entries {
            map.insert(key.clone(), index);
        }
        Self { map }
    }

    /// Map the still-unconsumed parts in `range`. Empty slots are skipped.
    pub fn from_parts<F>(parts: &[Option<KeyedPart<K, F>>], range: Range<usize>) -> Self {
        let capacity = range.len();
        let start = range.start;
        let entries = parts[range]
            .iter()
            .enumerate()
            .filter_map(move |(offset, slot)| slot.as_ref().map(|part| (start + offset, &part.key)));
        Self::build(entries, capacity)
    }

    /// Map the results in `range`.
    pub fn from_results<C>(results: &[RenderResult<K, C>], range: Range<usize>) -> Self {
        let capacity = range.len();
        let start = range.start;
        let entries = results[range]
            .iter()
            .enumerate()
            .map(move |(offset, result)| (start + offset, &result.key));
        Self::build(entries, capacity)
    }
}

impl<K: Hash + Eq> KeyIndexMap<K> {
    /// Index of `key`, if present
    #[inline]
    pub fn get(&self, key: &Key<K>) -> Option<usize> {
        self.map.get(key).copied()
    }

    /// Check if `key` is present
    #[inline]
    pub fn contains_key(&self, key: &Key<K>) -> bool {
        self.map.contains_key(key)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
