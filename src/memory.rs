//! In-memory ordered container.
//!
//! A reference [`Container`] that keeps fragments as string slots in a
//! vector and records every primitive it receives. Useful for testing code
//! built on the reconciler, and for checking order / identity properties
//! without a real output tree.
//!
//! # Example
//!
//! ```
//! use tola_repeat::memory::MemoryContainer;
//! use tola_repeat::{repeat, RepeatConfig, SiteCache, SiteId};
//!
//! let mut container = MemoryContainer::new();
//! let mut cache = SiteCache::new();
//! let site = SiteId::from_path("/list");
//! let key: &dyn Fn(&&'static str, usize) -> String = &|s, _| s.to_string();
//! let template: &dyn Fn(&&'static str, usize) -> compact_str::CompactString =
//!     &|s, _| compact_str::CompactString::new(s);
//!
//! repeat(["a", "b"], Some(key), template, RepeatConfig::default())
//!     .apply(site, &mut cache, &mut container)
//!     .unwrap();
//! assert_eq!(container.contents(), ["a", "b"]);
//! ```

use std::fmt;

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::container::{Anchor, Container};

/// Handle to a fragment in a [`MemoryContainer`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(u32);

impl FragmentId {
    /// Get the raw u32 value
    #[inline]
    pub const fn as_raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// A primitive received by the container, in call order.
///
/// Positions are given as the fragment the operation was anchored before
/// (`None` = end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerOp {
    /// Fragment `id` created before `before`
    Create { id: FragmentId, before: Option<FragmentId> },
    /// Content of `id` replaced in place
    Update { id: FragmentId },
    /// Fragment `id` relocated before `before` (no-op moves are not recorded)
    Move { id: FragmentId, before: Option<FragmentId> },
    /// Fragment `id` discarded
    Remove { id: FragmentId },
    /// Output of `id` taken out of the visible order
    Detach { id: FragmentId },
    /// Detached fragment `id` put back before `before`
    Reattach { id: FragmentId, before: Option<FragmentId> },
}

#[derive(Debug, Default)]
struct Slot {
    content: CompactString,
    attached: bool,
}

/// Ordered in-memory container with an operation log.
///
/// # Panics
///
/// Operations panic when handed an anchor or fragment that is not where the
/// container contract says it must be (e.g. anchoring before a detached
/// fragment). Those are reconciler bugs, and failing loudly is the point.
#[derive(Debug, Default)]
pub struct MemoryContainer {
    order: Vec<FragmentId>,
    slots: FxHashMap<FragmentId, Slot>,
    ops: Vec<ContainerOp>,
    noop_moves: usize,
    next_id: u32,
}

impl MemoryContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of visible fragments
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if no fragment is visible
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of fragments alive, attached or detached
    pub fn live_fragments(&self) -> usize {
        self.slots.len()
    }

    /// Visible fragments in order
    pub fn order(&self) -> &[FragmentId] {
        &self.order
    }

    /// Visible contents in order
    pub fn contents(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|id| self.slots.get(id))
            .map(|slot| slot.content.as_str())
            .collect()
    }

    /// Content of a live fragment
    pub fn content(&self, id: FragmentId) -> Option<&str> {
        self.slots.get(&id).map(|slot| slot.content.as_str())
    }

    /// Check if a fragment is alive and attached
    pub fn is_attached(&self, id: FragmentId) -> bool {
        self.slots.get(&id).is_some_and(|slot| slot.attached)
    }

    /// Operations received since the last [`clear_ops`](Self::clear_ops)
    pub fn ops(&self) -> &[ContainerOp] {
        &self.ops
    }

    /// Count recorded operations matching `pred`
    pub fn count(&self, pred: impl Fn(&ContainerOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    /// Moves that found the fragment already in place
    pub fn noop_moves(&self) -> usize {
        self.noop_moves
    }

    /// Forget recorded operations
    pub fn clear_ops(&mut self) {
        self.ops.clear();
        self.noop_moves = 0;
    }

    fn position(&self, id: FragmentId) -> Option<usize> {
        self.order.iter().position(|&f| f == id)
    }

    /// Insertion index for `at`.
    fn resolve(&self, at: Anchor<'_, FragmentId>) -> usize {
        match at {
            Anchor::End => self.order.len(),
            Anchor::Before(&target) => self
                .position(target)
                .unwrap_or_else(|| panic!("anchor {:?} is not attached", target)),
        }
    }

    fn slot_mut(&mut self, id: FragmentId) -> &mut Slot {
        self.slots
            .get_mut(&id)
            .unwrap_or_else(|| panic!("fragment {:?} is not alive", id))
    }
}

impl Container for MemoryContainer {
    type Fragment = FragmentId;
    type Content = CompactString;

    fn create_fragment(&mut self, at: Anchor<'_, FragmentId>) -> FragmentId {
        let id = FragmentId(self.next_id);
        self.next_id += 1;
        let index = self.resolve(at);
        self.order.insert(index, id);
        self.slots.insert(id, Slot { content: CompactString::default(), attached: true });
        self.ops.push(ContainerOp::Create { id, before: at.target().copied() });
        id
    }

    fn update_fragment(&mut self, fragment: &mut FragmentId, content: &CompactString) {
        let id = *fragment;
        self.slot_mut(id).content = content.clone();
        self.ops.push(ContainerOp::Update { id });
    }

    fn move_fragment(&mut self, fragment: &FragmentId, to: Anchor<'_, FragmentId>) {
        let id = *fragment;
        let from = self
            .position(id)
            .unwrap_or_else(|| panic!("moved fragment {:?} is not attached", id));
        let already_there = match to {
            Anchor::End => from + 1 == self.order.len(),
            Anchor::Before(&target) => self.order.get(from + 1) == Some(&target),
        };
        if already_there {
            self.noop_moves += 1;
            return;
        }
        self.order.remove(from);
        let index = self.resolve(to);
        self.order.insert(index, id);
        self.ops.push(ContainerOp::Move { id, before: to.target().copied() });
    }

    fn remove_fragment(&mut self, fragment: FragmentId) {
        if let Some(index) = self.position(fragment) {
            self.order.remove(index);
        }
        self.slots.remove(&fragment);
        self.ops.push(ContainerOp::Remove { id: fragment });
    }

    fn detach_fragment(&mut self, fragment: &mut FragmentId) {
        let id = *fragment;
        if let Some(index) = self.position(id) {
            self.order.remove(index);
        }
        self.slot_mut(id).attached = false;
        self.ops.push(ContainerOp::Detach { id });
    }

    fn reattach_fragment(&mut self, fragment: &mut FragmentId, at: Anchor<'_, FragmentId>) {
        let id = *fragment;
        let index = self.resolve(at);
        self.order.insert(index, id);
        self.slot_mut(id).attached = true;
        self.ops.push(ContainerOp::Reattach { id, before: at.target().copied() });
    }
}
