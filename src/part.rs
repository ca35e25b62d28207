//! Keyed fragments.
//!
//! A [`KeyedPart`] is the reconciler's view of one live fragment: the
//! container handle plus the key it currently represents. Parts are created
//! once and then updated, moved, pooled, or removed across passes.

use crate::key::Key;

/// A live fragment tagged with its current key.
#[derive(Debug)]
pub struct KeyedPart<K, F> {
    pub(crate) key: Key<K>,
    pub(crate) fragment: F,
    /// Output has been detached from the container (pooled across passes)
    pub(crate) detached: bool,
}

/// Ordered fragments for one binding site, as committed by the last pass.
pub type PartList<K, F> = Vec<KeyedPart<K, F>>;

impl<K, F> KeyedPart<K, F> {
    pub(crate) fn new(key: Key<K>, fragment: F) -> Self {
        Self {
            key,
            fragment,
            detached: false,
        }
    }

    /// Key of the result this fragment currently represents
    #[inline]
    pub fn key(&self) -> &Key<K> {
        &self.key
    }

    /// Container handle
    #[inline]
    pub fn fragment(&self) -> &F {
        &self.fragment
    }

    /// Whether the fragment's output is currently detached
    #[inline]
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Consume the part, returning the container handle
    #[inline]
    pub fn into_fragment(self) -> F {
        self.fragment
    }
}
