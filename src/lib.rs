//! tola-repeat - Keyed list reconciliation for the `repeat` directive
//!
//! ## Core Concepts
//!
//! A `repeat` binding site renders a list of items into an ordered
//! container. On every pass each item becomes a [`RenderResult`] tagged
//! with a [`Key`]; the reconciler then brings the fragments committed by
//! the previous pass in line with the new results, reusing the fragment of
//! every key that survives and issuing as few create / move / remove
//! operations as it can.
//!
//! ## Modules
//! - `directive`: [`repeat`], [`Repeat`] and [`RepeatConfig`], the public entry point
//! - `algo`: the reconciler, key index map and LIS
//! - `container`: the [`Container`] trait the reconciler drives
//! - `pool`: reuse pool for removed fragments
//! - `cache`: per-binding-site fragment lists
//! - `memory`: an in-memory container for tests and tooling
//!
//! ## Usage
//!
//! ```
//! use compact_str::CompactString;
//! use tola_repeat::memory::MemoryContainer;
//! use tola_repeat::{Repeat, RepeatConfig, SiteCache, SiteId};
//!
//! let list = Repeat::new(|s: &&'static str, _| CompactString::new(*s))
//!     .with_key(|s: &&'static str, _| s.to_string())
//!     .with_config(RepeatConfig::minimal_moves());
//!
//! let mut container = MemoryContainer::new();
//! let mut cache = SiteCache::new();
//! let site = SiteId::from_path("/todo");
//!
//! list.render(["a", "b", "c"], site, &mut cache, &mut container).unwrap();
//! let stats = list.render(["c", "a", "b"], site, &mut cache, &mut container).unwrap();
//!
//! assert_eq!(container.contents(), ["c", "a", "b"]);
//! assert_eq!((stats.created, stats.moved), (0, 1));
//! ```

// =============================================================================
// Core modules
// =============================================================================

/// Item keys
pub mod key;

/// Render results and key checks
pub mod result;

/// Container abstraction: Container, Anchor
pub mod container;

/// Committed fragments
pub mod part;

/// Reuse pool for removed fragments
pub mod pool;

/// Algorithms: reconcile, key map, LIS
pub mod algo;

/// Binding-site cache
pub mod cache;

/// Binding-site identity
pub mod id;

/// The repeat directive
pub mod directive;

/// In-memory container
pub mod memory;

/// Error types
pub mod error;

/// Prelude for common imports
pub mod prelude;

// =============================================================================
// Re-exports
// =============================================================================

// Keys and results
pub use key::Key;
pub use result::{build_results, ensure_unique_keys, RenderResult};

// Container
pub use container::{Anchor, Container};

// Fragments and pooling
pub use part::{KeyedPart, PartList};
pub use pool::{PoolHit, ReusePool};

// Algorithms
pub use algo::{
    longest_increasing_subsequence, reconcile, KeyIndexMap, ReconcileOptions, ReconcileStats,
    Reconciled,
};

// Cache and identity
pub use cache::{SharedSiteCache, SiteCache};
pub use id::SiteId;

// Directive
pub use directive::{repeat, Repeat, RepeatConfig, RepeatDirective};

// Error types
pub use error::{RepeatError, RepeatResult};
