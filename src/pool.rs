//! Reuse pool for removed fragments.
//!
//! Instead of destroying a fragment whose key left the list, the reconciler
//! can park it here. Its output is detached from the container at the end of
//! the pass but kept alive, so a later request for the same key (or, with
//! arbitrary reuse, any key) reattaches it rather than building new output.
//!
//! # Lifetimes
//!
//! - **Transient**: created by the directive for one pass; whatever is left
//!   over is removed from the container after the pass.
//! - **Persistent**: owned by the caller and passed to every pass of one
//!   binding site. The first pass binds the pool to that site; using it for
//!   another site is rejected, since overlapping keys would hand one site's
//!   fragments to another.
//!
//! Entries are kept in insertion order, so arbitrary reuse always hands out
//! the oldest pooled fragment.

use std::hash::Hash;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::container::Container;
use crate::error::{RepeatError, RepeatResult};
use crate::id::SiteId;
use crate::key::Key;
use crate::part::KeyedPart;

/// How a pooled fragment matched a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolHit {
    /// Pooled under the requested key
    Exact,
    /// Pooled under another key and re-keyed
    Arbitrary,
}

/// Detached fragments keyed by the key they were removed under.
#[derive(Debug)]
pub struct ReusePool<K, F> {
    parts: IndexMap<Key<K>, KeyedPart<K, F>, FxBuildHasher>,
    owner: Option<SiteId>,
}

impl<K, F> Default for ReusePool<K, F> {
    fn default() -> Self {
        Self {
            parts: IndexMap::with_hasher(FxBuildHasher),
            owner: None,
        }
    }
}

impl<K, F> ReusePool<K, F>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty, unbound pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pooled fragments
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Check if a fragment is pooled under `key`
    pub fn contains(&self, key: &Key<K>) -> bool {
        self.parts.contains_key(key)
    }

    /// Site this pool is bound to, if it has been used
    pub fn owner(&self) -> Option<SiteId> {
        self.owner
    }

    /// Bind the pool to `site`, or check that it already is.
    pub(crate) fn bind(&mut self, site: SiteId) -> RepeatResult<()> {
        match self.owner {
            Some(owner) if owner != site => Err(RepeatError::PoolOwnership { owner, site }),
            Some(_) => Ok(()),
            None => {
                self.owner = Some(site);
                Ok(())
            }
        }
    }

    /// Park a part under its key.
    ///
    /// A part already pooled under the same key is displaced and removed
    /// from the container.
    pub(crate) fn put<C>(&mut self, container: &mut C, part: KeyedPart<K, F>)
    where
        C: Container<Fragment = F>,
    {
        let key = part.key.clone();
        if let Some(displaced) = self.parts.insert(key, part) {
            log::trace!("pool: displaced fragment removed");
            container.remove_fragment(displaced.fragment);
        }
    }

    /// Take a part for `key`: exact match first, then (if `arbitrary`) the
    /// oldest pooled part, re-keyed to `key`.
    pub(crate) fn take(&mut self, key: &Key<K>, arbitrary: bool) -> Option<(KeyedPart<K, F>, PoolHit)> {
        if let Some(part) = self.parts.shift_remove(key) {
            return Some((part, PoolHit::Exact));
        }
        if !arbitrary {
            return None;
        }
        let (_, mut part) = self.parts.shift_remove_index(0)?;
        part.key = key.clone();
        Some((part, PoolHit::Arbitrary))
    }

    /// Detach the output of every pooled part still in the container.
    ///
    /// Returns the number of parts detached.
    pub(crate) fn park<C>(&mut self, container: &mut C) -> usize
    where
        C: Container<Fragment = F>,
    {
        let mut detached = 0;
        for part in self.parts.values_mut().filter(|p| !p.detached) {
            container.detach_fragment(&mut part.fragment);
            part.detached = true;
            detached += 1;
        }
        detached
    }

    /// Remove every pooled fragment from the container and empty the pool.
    ///
    /// The pool stays bound to its site.
    pub fn clear<C>(&mut self, container: &mut C)
    where
        C: Container<Fragment = F>,
    {
        for (_, part) in self.parts.drain(..) {
            container.remove_fragment(part.fragment);
        }
    }
}
