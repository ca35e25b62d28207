//! Item identity across passes.
//!
//! Every render result is tagged with a [`Key`]. When the caller supplies a
//! key function, keys are [`Key::Item`]; otherwise the item's position is
//! used ([`Key::Index`]). Positional keys never produce wrong output, but
//! any reorder turns into in-place content updates from the first
//! divergence onward.
//!
//! Keys must be unique within one pass. See [`crate::algo::KeyIndexMap`]
//! for what happens when they are not.

use std::fmt;

/// Identity of an item for one pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key<K> {
    /// Positional identity (no key function given)
    Index(usize),
    /// Caller-supplied identity
    Item(K),
}

impl<K> Key<K> {
    /// Get the caller key, if this is not a positional key
    #[inline]
    pub fn item(&self) -> Option<&K> {
        match self {
            Self::Item(k) => Some(k),
            Self::Index(_) => None,
        }
    }

    /// Check if this key is positional
    #[inline]
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }
}

impl<K> From<K> for Key<K> {
    fn from(key: K) -> Self {
        Self::Item(key)
    }
}

impl<K: fmt::Display> fmt::Display for Key<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{}", i),
            Self::Item(k) => write!(f, "{}", k),
        }
    }
}
