//! Binding-site identity.
//!
//! A binding site is the place in rendered output where one keyed list is
//! anchored. The cache addresses fragment lists by [`SiteId`], an opaque
//! `u64` handle that stays stable for as long as the site lives.
//!
//! Two ways to obtain one:
//! - [`SiteId::from_path`]: deterministic, derived from a caller-chosen path
//!   (for example the site's position in a render tree)
//! - [`SiteId::next`]: process-unique, allocated from a counter

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for [`SiteId::next`]. Starts high so allocated ids are unlikely
/// to collide with small hand-written raw ids used in tests.
static NEXT_SITE: AtomicU64 = AtomicU64::new(1 << 48);

/// Stable handle for a binding site.
///
/// # Memory Layout
///
/// - 8 bytes (u64)
/// - Copy, no heap allocation
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct SiteId(u64);

impl SiteId {
    /// Create a SiteId from a raw u64 value.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw u64 representation
    #[inline]
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// Derive a SiteId from a path
    ///
    /// The same path always yields the same id, across processes.
    ///
    /// ```
    /// use tola_repeat::SiteId;
    ///
    /// let a = SiteId::from_path("/app/todos");
    /// assert_eq!(a, SiteId::from_path("/app/todos"));
    /// assert_ne!(a, SiteId::from_path("/app/done"));
    /// ```
    pub fn from_path(path: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"__site__");
        hasher.update(path.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        Self(u64::from_le_bytes(bytes))
    }

    /// Allocate a fresh, process-unique SiteId
    pub fn next() -> Self {
        Self(NEXT_SITE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SiteId({:x})", self.0)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site#{:x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_is_deterministic() {
        let a = SiteId::from_path("/blog/post");
        let b = SiteId::from_path("/blog/post");
        assert_eq!(a, b);
        assert_ne!(a, SiteId::from_path("/blog/other"));
    }

    #[test]
    fn test_next_is_unique() {
        let a = SiteId::next();
        let b = SiteId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_and_debug() {
        let id = SiteId::from_raw(255);
        assert_eq!(id.to_string(), "site#ff");
        assert_eq!(format!("{:?}", id), "SiteId(ff)");
        assert_eq!(id.as_raw(), 255);
    }
}
