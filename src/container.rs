//! The ordered container that fragments live in.
//!
//! This is the only point of contact between the reconciler and live output.
//! An implementation owns the actual rendered runs (DOM ranges, terminal
//! cells, scene nodes...) and hands out `Fragment` handles for them. The
//! reconciler never inspects a handle; it only passes it back.
//!
//! # Contract
//!
//! - A fragment owns one contiguous run of output between its own markers.
//! - `move_fragment` relocates that whole run.
//! - `detach_fragment` takes the run out of the visible sequence but keeps
//!   it alive; `reattach_fragment` puts it back.
//! - `remove_fragment` discards a fragment, whether attached or detached.
//!
//! Violations (e.g. a handle no longer attached where expected) are bugs in
//! the implementation; the reconciler does not try to recover from them.

/// Where to place a fragment.
#[derive(Debug)]
pub enum Anchor<'a, F> {
    /// Immediately before this fragment's start marker
    Before(&'a F),
    /// At the end of the binding site's range
    End,
}

impl<F> Clone for Anchor<'_, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for Anchor<'_, F> {}

impl<'a, F> Anchor<'a, F> {
    /// Anchor before `fragment`, or at the end when there is none.
    #[inline]
    pub fn before(fragment: Option<&'a F>) -> Self {
        match fragment {
            Some(f) => Self::Before(f),
            None => Self::End,
        }
    }

    /// Get the fragment this anchor refers to
    #[inline]
    pub fn target(&self) -> Option<&'a F> {
        match self {
            Self::Before(f) => Some(f),
            Self::End => None,
        }
    }
}

/// Ordered container primitives consumed by the reconciler.
pub trait Container {
    /// Handle to a live run of output
    type Fragment;
    /// Materialized template output committed into a fragment
    type Content;

    /// Create an empty fragment at `at` and return its handle.
    fn create_fragment(&mut self, at: Anchor<'_, Self::Fragment>) -> Self::Fragment;

    /// Replace the fragment's content in place, keeping its identity.
    fn update_fragment(&mut self, fragment: &mut Self::Fragment, content: &Self::Content);

    /// Relocate the fragment's whole run to `to`.
    fn move_fragment(&mut self, fragment: &Self::Fragment, to: Anchor<'_, Self::Fragment>);

    /// Discard the fragment and its output.
    fn remove_fragment(&mut self, fragment: Self::Fragment);

    /// Take the fragment's output out of the container, keeping it alive.
    fn detach_fragment(&mut self, fragment: &mut Self::Fragment);

    /// Put previously detached output back at `at`.
    fn reattach_fragment(&mut self, fragment: &mut Self::Fragment, at: Anchor<'_, Self::Fragment>);
}
