//! Algorithm implementations for keyed reconciliation.
//!
//! - `reconcile`: four-pointer scan with key map fallback
//! - `keymap`: key → old index lookup for the fallback
//! - `lis`: longest increasing subsequence for move minimization

mod keymap;
mod lis;
mod reconcile;

pub use keymap::KeyIndexMap;
pub use lis::longest_increasing_subsequence;
pub use reconcile::{reconcile, ReconcileOptions, ReconcileStats, Reconciled};
