//! Binding-site cache.
//!
//! Holds the fragment list each binding site committed on its last pass.
//! An entry is read once at the start of a pass and replaced wholesale at
//! the end, so a site never holds more than one list.
//!
//! Entries are not reclaimed implicitly: when a binding site is torn down,
//! the caller must call [`SiteCache::teardown`] (removes the fragments from
//! the container) or [`SiteCache::forget`] (when the container region is
//! being destroyed anyway).

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::container::Container;
use crate::error::{RepeatError, RepeatResult};
use crate::id::SiteId;
use crate::part::{KeyedPart, PartList};

// =============================================================================
// Site Cache
// =============================================================================

/// Non-thread-safe binding-site cache.
#[derive(Debug)]
pub struct SiteCache<K, F> {
    entries: FxHashMap<SiteId, PartList<K, F>>,
}

impl<K, F> Default for SiteCache<K, F> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }
}

impl<K, F> SiteCache<K, F> {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fragments committed by the site's last pass
    pub fn get(&self, site: SiteId) -> Option<&[KeyedPart<K, F>]> {
        self.entries.get(&site).map(Vec::as_slice)
    }

    /// Check if the cache holds an entry for `site`.
    pub fn contains(&self, site: SiteId) -> bool {
        self.entries.contains_key(&site)
    }

    /// Get the number of sites in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take the site's list out for a pass (empty for a first render).
    pub fn take(&mut self, site: SiteId) -> PartList<K, F> {
        self.entries.remove(&site).unwrap_or_default()
    }

    /// Store the list a pass committed, replacing any previous entry.
    pub fn store(&mut self, site: SiteId, parts: PartList<K, F>) {
        self.entries.insert(site, parts);
    }

    /// Drop the site's entry without touching the container.
    pub fn forget(&mut self, site: SiteId) -> Option<PartList<K, F>> {
        self.entries.remove(&site)
    }

    /// Remove every fragment of `site` from the container and drop its entry.
    ///
    /// Returns the number of fragments removed (0 for an unknown site).
    pub fn teardown<C>(&mut self, site: SiteId, container: &mut C) -> usize
    where
        C: Container<Fragment = F>,
    {
        self.try_teardown(site, container).unwrap_or(0)
    }

    /// Like [`teardown`](Self::teardown), but reports an unknown site.
    pub fn try_teardown<C>(&mut self, site: SiteId, container: &mut C) -> RepeatResult<usize>
    where
        C: Container<Fragment = F>,
    {
        let parts = self.entries.remove(&site).ok_or(RepeatError::UnknownSite(site))?;
        let count = parts.len();
        for part in parts {
            container.remove_fragment(part.into_fragment());
        }
        log::debug!("tore down {} ({} fragment(s))", site, count);
        Ok(count)
    }
}

// =============================================================================
// Shared Site Cache
// =============================================================================

/// Thread-safe shared binding-site cache.
///
/// Uses `parking_lot::RwLock` for better performance under contention.
/// Passes for one site must still be sequential; run them inside
/// [`with_write`](Self::with_write).
#[derive(Debug)]
pub struct SharedSiteCache<K, F> {
    inner: Arc<RwLock<SiteCache<K, F>>>,
}

impl<K, F> Clone for SharedSiteCache<K, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, F> Default for SharedSiteCache<K, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, F> SharedSiteCache<K, F> {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SiteCache::new())),
        }
    }

    /// Execute a closure with read access to the cache.
    pub fn with_read<R>(&self, f: impl FnOnce(&SiteCache<K, F>) -> R) -> R {
        let guard = self.inner.read();
        f(&guard)
    }

    /// Execute a closure with write access to the cache.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut SiteCache<K, F>) -> R) -> R {
        let mut guard = self.inner.write();
        f(&mut guard)
    }

    /// Check if the cache holds an entry for `site`.
    pub fn contains(&self, site: SiteId) -> bool {
        self.with_read(|c| c.contains(site))
    }

    /// Get the number of sites in the cache.
    pub fn len(&self) -> usize {
        self.with_read(|c| c.len())
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the site's entry without touching the container.
    pub fn forget(&self, site: SiteId) -> Option<PartList<K, F>> {
        self.with_write(|c| c.forget(site))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Anchor;
    use crate::key::Key;
    use crate::memory::{FragmentId, MemoryContainer};

    fn parts(container: &mut MemoryContainer, n: usize) -> PartList<usize, FragmentId> {
        (0..n)
            .map(|i| KeyedPart::new(Key::Index(i), container.create_fragment(Anchor::End)))
            .collect()
    }

    #[test]
    fn test_take_and_store() {
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let site = SiteId::from_raw(1);

        assert!(cache.take(site).is_empty());
        cache.store(site, parts(&mut container, 2));
        assert_eq!(cache.get(site).map(<[_]>::len), Some(2));

        let taken = cache.take(site);
        assert_eq!(taken.len(), 2);
        assert!(!cache.contains(site));
    }

    #[test]
    fn test_store_replaces_entry() {
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let site = SiteId::from_raw(1);

        cache.store(site, parts(&mut container, 3));
        cache.store(site, parts(&mut container, 1));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(site).map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_teardown() {
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let a = SiteId::from_raw(1);
        let b = SiteId::from_raw(2);
        cache.store(a, parts(&mut container, 2));
        cache.store(b, parts(&mut container, 1));

        assert_eq!(cache.teardown(a, &mut container), 2);
        assert_eq!(container.len(), 1);
        assert_eq!(cache.teardown(a, &mut container), 0);
        assert_eq!(cache.try_teardown(a, &mut container), Err(RepeatError::UnknownSite(a)));
        assert_eq!(cache.try_teardown(b, &mut container), Ok(1));
        assert!(cache.is_empty());
        assert!(container.is_empty());
    }

    #[test]
    fn test_forget_keeps_container() {
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let site = SiteId::from_raw(1);
        cache.store(site, parts(&mut container, 2));

        assert_eq!(cache.forget(site).map(|p| p.len()), Some(2));
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn test_shared_cache() {
        let mut container = MemoryContainer::new();
        let cache: SharedSiteCache<usize, FragmentId> = SharedSiteCache::new();
        let site = SiteId::from_raw(9);
        let list = parts(&mut container, 2);

        cache.with_write(|c| c.store(site, list));
        assert!(cache.contains(site));
        assert_eq!(cache.clone().len(), 1);

        cache.forget(site);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_shared_cache_is_send_sync() {
        static_assertions::assert_impl_all!(SharedSiteCache<String, FragmentId>: Send, Sync);
    }
}
