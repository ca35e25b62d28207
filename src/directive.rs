//! The `repeat` directive.
//!
//! Entry point tying the pieces together. One call to [`RepeatDirective::apply`]
//! is one pass for one binding site:
//!
//! ```text
//! items --build_results--> results ─┐
//! cache.take(site) ---------> old ──┼─> reconcile ─> parts ─> cache.store(site)
//! pool (optional) ──────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use compact_str::CompactString;
//! use tola_repeat::memory::MemoryContainer;
//! use tola_repeat::{Repeat, RepeatConfig, SiteCache, SiteId};
//!
//! type Row = (u32, &'static str);
//!
//! let rows = Repeat::new(|row: &Row, _| CompactString::new(row.1))
//!     .with_key(|row: &Row, _| row.0)
//!     .with_config(RepeatConfig::minimal_moves());
//!
//! let mut container = MemoryContainer::new();
//! let mut cache = SiteCache::new();
//! let site = SiteId::next();
//!
//! rows.render([(1, "one"), (2, "two")], site, &mut cache, &mut container).unwrap();
//! let stats = rows.render([(2, "two"), (1, "uno")], site, &mut cache, &mut container).unwrap();
//! assert_eq!(container.contents(), ["two", "uno"]);
//! assert_eq!(stats.created, 0);
//! ```

use std::hash::Hash;

use crate::algo::{reconcile, ReconcileOptions, ReconcileStats};
use crate::cache::SiteCache;
use crate::container::Container;
use crate::error::RepeatResult;
use crate::id::SiteId;
use crate::pool::ReusePool;
use crate::result::{build_results, ensure_unique_keys, RenderResult};

// =============================================================================
// Configuration
// =============================================================================

/// Options for a repeat directive.
///
/// All off by default: no pooling, plain moves, duplicate keys tolerated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepeatConfig {
    /// Pool removed fragments for the duration of one pass
    pub pool: bool,
    /// Pool, and hand out any pooled fragment when no key matches
    /// (implies `pool`). A reused fragment silently takes on the new key.
    pub reuse: bool,
    /// Minimize moves with a longest increasing subsequence
    pub lis: bool,
    /// Reject duplicate keys with [`RepeatError::DuplicateKey`](crate::RepeatError::DuplicateKey)
    pub strict_keys: bool,
}

impl RepeatConfig {
    /// Create the default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Config that minimizes move operations.
    pub fn minimal_moves() -> Self {
        Self {
            lis: true,
            ..Self::default()
        }
    }

    /// Config that recycles fragments as aggressively as possible.
    pub fn recycling() -> Self {
        Self {
            pool: true,
            reuse: true,
            lis: true,
            strict_keys: false,
        }
    }

    /// Set whether removed fragments are pooled for the pass.
    pub fn with_pool(mut self, pool: bool) -> Self {
        self.pool = pool;
        self
    }

    /// Set whether any pooled fragment may serve an unmatched key.
    pub fn with_reuse(mut self, reuse: bool) -> Self {
        self.reuse = reuse;
        self
    }

    /// Set whether moves are minimized with a longest increasing subsequence.
    pub fn with_lis(mut self, lis: bool) -> Self {
        self.lis = lis;
        self
    }

    /// Set whether duplicate keys are rejected.
    pub fn with_strict_keys(mut self, strict_keys: bool) -> Self {
        self.strict_keys = strict_keys;
        self
    }

    /// Whether removed fragments go to a pool
    #[inline]
    pub fn pooling(&self) -> bool {
        self.pool || self.reuse
    }

    fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            lis: self.lis,
            reuse: self.reuse,
        }
    }
}

// =============================================================================
// Directive
// =============================================================================

/// A prepared pass: results built, waiting for a binding site.
#[derive(Debug)]
#[must_use]
pub struct RepeatDirective<K, C> {
    results: Vec<RenderResult<K, C>>,
    config: RepeatConfig,
}

/// Build a directive for `items`.
///
/// Keys come from `key_fn`, or default to each item's index when it is
/// `None`. Results are built immediately; the container is only touched by
/// [`RepeatDirective::apply`].
pub fn repeat<I, K, C>(
    items: impl IntoIterator<Item = I>,
    key_fn: Option<&dyn Fn(&I, usize) -> K>,
    template: &dyn Fn(&I, usize) -> C,
    config: RepeatConfig,
) -> RepeatDirective<K, C> {
    RepeatDirective {
        results: build_results(items, key_fn, template),
        config,
    }
}

impl<K, C> RepeatDirective<K, C>
where
    K: Hash + Eq + Clone,
{
    /// Results this directive will commit
    pub fn results(&self) -> &[RenderResult<K, C>] {
        &self.results
    }

    /// Run the pass for `site`.
    ///
    /// Uses a transient pool when the config asks for pooling; leftover
    /// pooled fragments are removed from the container afterwards.
    pub fn apply<X>(self, site: SiteId, cache: &mut SiteCache<K, X::Fragment>, container: &mut X) -> RepeatResult<ReconcileStats>
    where
        X: Container<Content = C>,
    {
        self.check()?;
        let options = self.config.reconcile_options();
        let old = cache.take(site);

        let out = if self.config.pooling() {
            let mut pool = ReusePool::new();
            let out = reconcile(container, old, &self.results, Some(&mut pool), options);
            pool.clear(container);
            out
        } else {
            reconcile(container, old, &self.results, None, options)
        };

        cache.store(site, out.parts);
        Ok(out.stats)
    }

    /// Run the pass for `site` with a caller-owned pool kept across passes.
    ///
    /// The pool is bound to `site` on first use. Pooled fragments stay alive
    /// (detached) until a later pass reuses them or the caller clears the pool.
    pub fn apply_with_pool<X>(
        self,
        site: SiteId,
        cache: &mut SiteCache<K, X::Fragment>,
        container: &mut X,
        pool: &mut ReusePool<K, X::Fragment>,
    ) -> RepeatResult<ReconcileStats>
    where
        X: Container<Content = C>,
    {
        self.check()?;
        pool.bind(site)?;
        let old = cache.take(site);
        let out = reconcile(container, old, &self.results, Some(pool), self.config.reconcile_options());
        cache.store(site, out.parts);
        Ok(out.stats)
    }

    fn check(&self) -> RepeatResult<()> {
        if self.config.strict_keys {
            ensure_unique_keys(&self.results)?;
        }
        Ok(())
    }
}

// =============================================================================
// Reusable builder
// =============================================================================

type KeyFn<'f, I, K> = Box<dyn Fn(&I, usize) -> K + 'f>;
type TemplateFn<'f, I, C> = Box<dyn Fn(&I, usize) -> C + 'f>;

/// A repeat directive definition that can be rendered on every pass.
pub struct Repeat<'f, I, K, C> {
    key_fn: Option<KeyFn<'f, I, K>>,
    template: TemplateFn<'f, I, C>,
    config: RepeatConfig,
}

impl<'f, I, K, C> Repeat<'f, I, K, C> {
    /// Create a definition keyed by item index.
    pub fn new(template: impl Fn(&I, usize) -> C + 'f) -> Self {
        Self {
            key_fn: None,
            template: Box::new(template),
            config: RepeatConfig::default(),
        }
    }

    /// Key items with `key_fn` instead of by index.
    pub fn with_key(mut self, key_fn: impl Fn(&I, usize) -> K + 'f) -> Self {
        self.key_fn = Some(Box::new(key_fn));
        self
    }

    /// Replace the config used for every pass.
    pub fn with_config(mut self, config: RepeatConfig) -> Self {
        self.config = config;
        self
    }

    /// Config used for every pass
    pub fn config(&self) -> RepeatConfig {
        self.config
    }

    /// Prepare a pass over `items`.
    pub fn directive(&self, items: impl IntoIterator<Item = I>) -> RepeatDirective<K, C> {
        repeat(items, self.key_fn.as_deref(), &*self.template, self.config)
    }

    /// Prepare and run a pass over `items` for `site`.
    pub fn render<X>(
        &self,
        items: impl IntoIterator<Item = I>,
        site: SiteId,
        cache: &mut SiteCache<K, X::Fragment>,
        container: &mut X,
    ) -> RepeatResult<ReconcileStats>
    where
        K: Hash + Eq + Clone,
        X: Container<Content = C>,
    {
        self.directive(items).apply(site, cache, container)
    }
}

impl<I, K, C> std::fmt::Debug for Repeat<'_, I, K, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repeat")
            .field("keyed", &self.key_fn.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use compact_str::{format_compact, CompactString};
    use quickcheck::TestResult;

    use super::*;
    use crate::cache::SharedSiteCache;
    use crate::error::RepeatError;
    use crate::memory::{ContainerOp, FragmentId, MemoryContainer};

    type Row = (u32, &'static str);

    fn rows(config: RepeatConfig) -> Repeat<'static, Row, u32, CompactString> {
        Repeat::new(|row: &Row, _| CompactString::new(row.1))
            .with_key(|row: &Row, _| row.0)
            .with_config(config)
    }

    fn labels(keys: &[u32]) -> Vec<Row> {
        const NAMES: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];
        keys.iter().map(|&k| (k, NAMES[k as usize % NAMES.len()])).collect()
    }

    fn fragment_of(cache: &SiteCache<u32, FragmentId>, site: SiteId, key: u32) -> Option<FragmentId> {
        cache
            .get(site)?
            .iter()
            .find(|p| p.key().item() == Some(&key))
            .map(|p| *p.fragment())
    }

    #[test]
    fn test_repeat_without_key_fn_uses_index() {
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let site = SiteId::from_raw(1);
        let template: &dyn Fn(&&'static str, usize) -> CompactString = &|s, i| format_compact!("{}{}", s, i);

        repeat::<_, u32, _>(["x", "y"], None, template, RepeatConfig::default())
            .apply(site, &mut cache, &mut container)
            .unwrap();
        assert_eq!(container.contents(), ["x0", "y1"]);

        // Index keys: swapping items rewrites content in place
        container.clear_ops();
        let stats = repeat::<_, u32, _>(["y", "x"], None, template, RepeatConfig::default())
            .apply(site, &mut cache, &mut container)
            .unwrap();
        assert!(stats.is_update_only());
        assert_eq!(container.contents(), ["y0", "x1"]);
    }

    #[test]
    fn test_identity_kept_across_passes() {
        let rows = rows(RepeatConfig::default());
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let site = SiteId::from_raw(1);

        rows.render(labels(&[1, 2, 3]), site, &mut cache, &mut container).unwrap();
        let two = fragment_of(&cache, site, 2);

        rows.render(labels(&[3, 2, 1, 4]), site, &mut cache, &mut container).unwrap();
        assert_eq!(fragment_of(&cache, site, 2), two);
        assert_eq!(container.contents(), ["d", "c", "b", "e"]);
    }

    #[test]
    fn test_sites_do_not_interfere() {
        let rows = rows(RepeatConfig::default());
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let a = SiteId::from_path("/a");
        let b = SiteId::from_path("/b");

        rows.render(labels(&[1, 2]), a, &mut cache, &mut container).unwrap();
        rows.render(labels(&[3]), b, &mut cache, &mut container).unwrap();
        assert_eq!(cache.len(), 2);

        let stats = rows.render(labels(&[1, 2]), a, &mut cache, &mut container).unwrap();
        assert!(stats.is_update_only());
        assert_eq!(cache.get(b).map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_strict_keys_rejects_duplicates_before_mutation() {
        let rows = rows(RepeatConfig::new().with_strict_keys(true));
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let site = SiteId::from_raw(1);

        rows.render(labels(&[1, 2]), site, &mut cache, &mut container).unwrap();
        container.clear_ops();

        let err = rows.render(labels(&[1, 3, 1]), site, &mut cache, &mut container);
        assert_eq!(err, Err(RepeatError::DuplicateKey { first: 0, second: 2 }));
        assert!(container.ops().is_empty());
        assert_eq!(cache.get(site).map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_transient_pool_discards_leftovers() {
        let rows = rows(RepeatConfig::new().with_pool(true));
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let site = SiteId::from_raw(1);

        rows.render(labels(&[1, 2, 3]), site, &mut cache, &mut container).unwrap();
        let stats = rows.render(labels(&[1]), site, &mut cache, &mut container).unwrap();
        assert_eq!(stats.pooled, 2);
        assert_eq!(container.live_fragments(), 1);

        // Nothing survives a transient pool
        let stats = rows.render(labels(&[1, 2]), site, &mut cache, &mut container).unwrap();
        assert_eq!(stats.created, 1);
    }

    #[test]
    fn test_transient_reuse_recycles_within_pass() {
        let rows = rows(RepeatConfig::new().with_reuse(true));
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let site = SiteId::from_raw(1);

        rows.render(labels(&[1, 2, 3]), site, &mut cache, &mut container).unwrap();
        let two = fragment_of(&cache, site, 2);
        container.clear_ops();

        let stats = rows.render(labels(&[1, 7, 3]), site, &mut cache, &mut container).unwrap();
        assert_eq!((stats.created, stats.reused_arbitrary), (0, 1));
        assert_eq!(fragment_of(&cache, site, 7), two);
        assert_eq!(container.count(|op| matches!(op, ContainerOp::Create { .. })), 0);
        assert_eq!(container.contents(), ["b", "h", "d"]);
    }

    #[test]
    fn test_persistent_pool_revives_key() {
        let rows = rows(RepeatConfig::default());
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let mut pool = ReusePool::new();
        let site = SiteId::from_raw(1);

        rows.directive(labels(&[1, 2, 3]))
            .apply_with_pool(site, &mut cache, &mut container, &mut pool)
            .unwrap();
        let two = fragment_of(&cache, site, 2);

        rows.directive(labels(&[1, 3]))
            .apply_with_pool(site, &mut cache, &mut container, &mut pool)
            .unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(container.contents(), ["b", "d"]);

        rows.directive(labels(&[1, 3]))
            .apply_with_pool(site, &mut cache, &mut container, &mut pool)
            .unwrap();
        assert_eq!(pool.len(), 1);

        let stats = rows
            .directive(labels(&[2, 1, 3]))
            .apply_with_pool(site, &mut cache, &mut container, &mut pool)
            .unwrap();
        assert_eq!((stats.created, stats.reused_exact), (0, 1));
        assert_eq!(fragment_of(&cache, site, 2), two);
        assert_eq!(container.contents(), ["c", "b", "d"]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_without_pool_reintroduction_creates() {
        let rows = rows(RepeatConfig::default());
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let site = SiteId::from_raw(1);

        rows.render(labels(&[1, 2]), site, &mut cache, &mut container).unwrap();
        let two = fragment_of(&cache, site, 2);
        rows.render(labels(&[1]), site, &mut cache, &mut container).unwrap();
        let stats = rows.render(labels(&[1, 2]), site, &mut cache, &mut container).unwrap();
        assert_eq!(stats.created, 1);
        assert_ne!(fragment_of(&cache, site, 2), two);
    }

    #[test]
    fn test_persistent_pool_bound_to_one_site() {
        let rows = rows(RepeatConfig::default());
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let mut pool = ReusePool::new();
        let a = SiteId::from_raw(1);
        let b = SiteId::from_raw(2);

        rows.directive(labels(&[1]))
            .apply_with_pool(a, &mut cache, &mut container, &mut pool)
            .unwrap();
        let err = rows
            .directive(labels(&[1]))
            .apply_with_pool(b, &mut cache, &mut container, &mut pool);
        assert_eq!(err, Err(RepeatError::PoolOwnership { owner: a, site: b }));
        assert!(!cache.contains(b));
    }

    #[test]
    fn test_shared_cache_pass() {
        let rows = rows(RepeatConfig::minimal_moves());
        let mut container = MemoryContainer::new();
        let cache = SharedSiteCache::new();
        let site = SiteId::next();

        cache
            .with_write(|c| rows.render(labels(&[1, 2, 3]), site, c, &mut container))
            .unwrap();
        let stats = cache
            .with_write(|c| rows.render(labels(&[3, 1, 2]), site, c, &mut container))
            .unwrap();
        assert_eq!(stats.moved, 1);
        assert_eq!(container.contents(), ["d", "b", "c"]);
    }

    #[test]
    fn test_config_presets() {
        assert!(!RepeatConfig::default().pooling());
        assert!(RepeatConfig::new().with_reuse(true).pooling());
        assert!(RepeatConfig::minimal_moves().lis);
        let recycling = RepeatConfig::recycling();
        assert!(recycling.pooling() && recycling.reuse && recycling.lis);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Turn arbitrary bytes into a list of unique keys.
    fn unique(raw: Vec<u8>) -> Vec<u32> {
        let mut seen = rustc_hash::FxHashSet::default();
        raw.into_iter()
            .map(|b| u32::from(b % 24))
            .filter(|k| seen.insert(*k))
            .collect()
    }

    /// Turn arbitrary bytes into a short list of keys drawn from a small set.
    fn repeating(raw: Vec<u8>) -> Vec<u32> {
        raw.into_iter().take(12).map(|b| u32::from(b % 6)).collect()
    }

    fn keyed(config: RepeatConfig) -> Repeat<'static, u32, u32, CompactString> {
        Repeat::new(|k: &u32, _| format_compact!("{}", k))
            .with_key(|k: &u32, _| *k)
            .with_config(config)
    }

    fn expected(keys: &[u32]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn order_holds(config: RepeatConfig, passes: Vec<Vec<u8>>, keys_of: fn(Vec<u8>) -> Vec<u32>) -> TestResult {
        let repeat = keyed(config);
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let site = SiteId::from_raw(1);

        for raw in passes {
            let keys = keys_of(raw);
            if repeat.render(keys.clone(), site, &mut cache, &mut container).is_err() {
                return TestResult::failed();
            }
            if container.contents() != expected(&keys) || container.live_fragments() != keys.len() {
                return TestResult::failed();
            }
        }
        TestResult::passed()
    }

    fn identity_holds(lis: bool, old: Vec<u8>, new: Vec<u8>) -> TestResult {
        let repeat = keyed(RepeatConfig::new().with_lis(lis));
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let site = SiteId::from_raw(1);
        let (old, new) = (unique(old), unique(new));

        if repeat.render(old.clone(), site, &mut cache, &mut container).is_err() {
            return TestResult::failed();
        }
        let before: Vec<(u32, Option<FragmentId>)> =
            old.iter().map(|&k| (k, fragment_of(&cache, site, k))).collect();
        if repeat.render(new.clone(), site, &mut cache, &mut container).is_err() {
            return TestResult::failed();
        }
        let kept = before
            .into_iter()
            .filter(|(k, _)| new.contains(k))
            .all(|(k, id)| fragment_of(&cache, site, k) == id);
        TestResult::from_bool(kept && container.contents() == expected(&new))
    }

    fn pooled_order_holds(passes: Vec<Vec<u8>>) -> TestResult {
        let repeat = keyed(RepeatConfig::recycling());
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let mut pool = ReusePool::new();
        let site = SiteId::from_raw(1);

        for raw in passes {
            let keys = repeating(raw);
            let applied = repeat
                .directive(keys.clone())
                .apply_with_pool(site, &mut cache, &mut container, &mut pool);
            if applied.is_err()
                || container.contents() != expected(&keys)
                || container.live_fragments() != keys.len() + pool.len()
            {
                return TestResult::failed();
            }
        }
        TestResult::passed()
    }

    quickcheck::quickcheck! {
        fn prop_order_plain(passes: Vec<Vec<u8>>) -> TestResult {
            order_holds(RepeatConfig::default(), passes, unique)
        }

        fn prop_order_lis(passes: Vec<Vec<u8>>) -> TestResult {
            order_holds(RepeatConfig::minimal_moves(), passes, unique)
        }

        fn prop_order_recycling(passes: Vec<Vec<u8>>) -> TestResult {
            order_holds(RepeatConfig::recycling(), passes, unique)
        }

        fn prop_order_duplicates_plain(passes: Vec<Vec<u8>>) -> TestResult {
            order_holds(RepeatConfig::default(), passes, repeating)
        }

        fn prop_order_duplicates_lis(passes: Vec<Vec<u8>>) -> TestResult {
            order_holds(RepeatConfig::minimal_moves(), passes, repeating)
        }

        fn prop_order_duplicates_recycling(passes: Vec<Vec<u8>>) -> TestResult {
            order_holds(RepeatConfig::recycling(), passes, repeating)
        }

        fn prop_order_duplicates_persistent_pool(passes: Vec<Vec<u8>>) -> TestResult {
            pooled_order_holds(passes)
        }

        fn prop_identity_plain(old: Vec<u8>, new: Vec<u8>) -> TestResult {
            identity_holds(false, old, new)
        }

        fn prop_identity_lis(old: Vec<u8>, new: Vec<u8>) -> TestResult {
            identity_holds(true, old, new)
        }
    }

    #[test]
    fn test_order_with_persistent_pool_over_many_passes() {
        let repeat = keyed(RepeatConfig::new().with_reuse(true).with_lis(true));
        let mut container = MemoryContainer::new();
        let mut cache = SiteCache::new();
        let mut pool = ReusePool::new();
        let site = SiteId::from_raw(1);

        let passes: [&[u32]; 6] = [
            &[1, 2, 3, 4, 5],
            &[5, 4, 9],
            &[],
            &[2, 7, 1],
            &[1, 2, 3, 4, 5, 6, 7],
            &[7, 3, 5, 1],
        ];
        for keys in passes {
            repeat
                .directive(keys.iter().copied())
                .apply_with_pool(site, &mut cache, &mut container, &mut pool)
                .unwrap();
            assert_eq!(container.contents(), expected(keys));
            assert_eq!(container.live_fragments(), keys.len() + pool.len());
        }
    }
}
