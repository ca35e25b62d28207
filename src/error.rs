//! Error types for tola-repeat.
//!
//! Reconciliation itself cannot fail. These errors report broken caller
//! contracts, and they are always raised before the container is touched.

use thiserror::Error;

use crate::id::SiteId;

/// Errors that can occur when driving a repeat directive.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepeatError {
    /// Two items produced the same key in one pass (only with `strict_keys`)
    #[error("duplicate key: items {first} and {second} share a key")]
    DuplicateKey {
        /// Index of the first item carrying the key
        first: usize,
        /// Index of the later item carrying the same key
        second: usize,
    },

    /// A persistent pool bound to one binding site was used for another
    #[error("reuse pool belongs to site {owner}, cannot be used for site {site}")]
    PoolOwnership {
        /// Site the pool was first used with
        owner: SiteId,
        /// Site the pass was run for
        site: SiteId,
    },

    /// The binding site holds no cached fragment list
    #[error("unknown binding site: {0}")]
    UnknownSite(SiteId),
}

/// Result type alias for repeat operations.
pub type RepeatResult<T> = Result<T, RepeatError>;
