//! Prelude module for common imports.
//!
//! ```
//! use tola_repeat::prelude::*;
//! ```

// Directive
pub use crate::directive::{repeat, Repeat, RepeatConfig, RepeatDirective};

// Keys and results
pub use crate::key::Key;
pub use crate::result::RenderResult;

// Container
pub use crate::container::{Anchor, Container};

// Fragments and pooling
pub use crate::part::KeyedPart;
pub use crate::pool::ReusePool;

// Algorithms
pub use crate::algo::{reconcile, ReconcileOptions, ReconcileStats};

// Cache and identity
pub use crate::cache::{SharedSiteCache, SiteCache};
pub use crate::id::SiteId;

// Error
pub use crate::error::{RepeatError, RepeatResult};
