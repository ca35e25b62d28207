//! Keyed list reconciliation.
//!
//! Transforms the live fragments committed by the previous pass so that the
//! container matches a new list of render results, reusing the fragment of
//! every key present in both lists.
//!
//! # Algorithm
//!
//! Four pointers bound the unconsumed old range and the unprocessed new
//! range. Each step tries, in this fixed order:
//!
//! 1. skip an already consumed old head / old tail slot
//! 2. old head == new head: update in place
//! 3. old tail == new tail: update in place
//! 4. old head == new tail: update, move to the new tail
//! 5. old tail == new head: update, move to the new head
//! 6. otherwise fall back to a key → index map of the old range
//!
//! The first time step 6 is reached, old fragments whose key no longer
//! appears in the new range are removed (or pooled) eagerly; if anything
//! was removed the scan restarts, since removal often re-enables the fast
//! paths. After that, step 6 walks the new range from its end, creating or
//! reusing fragments and placing each one before its committed successor.
//!
//! Prepend, append, removal, reversal and adjacent swaps never build the
//! map. Arbitrary permutations are O(n), or O(n log n) with the LIS
//! optimization, which leaves the fragments on a longest increasing run of
//! old indices in place.
//!
//! # Invariants
//!
//! - Every old fragment is consumed at most once: slots are taken, never
//!   copied, so no fragment can end up twice in the output.
//! - Every old fragment is either reused, removed, or pooled by the end of
//!   the pass; none is orphaned.
//! - After the pass the container order equals the result order.

use std::hash::Hash;
use std::ops::Range;

use rustc_hash::FxHashSet;

use crate::container::{Anchor, Container};
use crate::part::{KeyedPart, PartList};
use crate::pool::{PoolHit, ReusePool};
use crate::result::RenderResult;

use super::keymap::KeyIndexMap;
use super::lis::longest_increasing_subsequence;

// =============================================================================
// Public Types
// =============================================================================

/// Knobs for one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Skip moving fragments that are already in correct relative order
    pub lis: bool,
    /// Hand out any pooled fragment when no pooled key matches
    pub reuse: bool,
}

/// Statistics from one pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct ReconcileStats {
    /// Fragments created from scratch
    pub created: usize,
    /// Old fragments updated in place for their new result
    pub updated: usize,
    /// Move operations issued
    pub moved: usize,
    /// Fragments removed from the container
    pub removed: usize,
    /// Fragments handed to the reuse pool
    pub pooled: usize,
    /// Pooled fragments reused under their own key
    pub reused_exact: usize,
    /// Pooled fragments reused under another key
    pub reused_arbitrary: usize,
    /// Reused fragments left in place thanks to the LIS
    pub lis_kept: usize,
    /// Whether the key → index fallback was needed
    pub used_key_map: bool,
}

impl ReconcileStats {
    /// Operations that changed container structure (everything but updates)
    pub fn structural_ops(&self) -> usize {
        self.created + self.moved + self.removed + self.pooled + self.reused_exact + self.reused_arbitrary
    }

    /// Check if the pass only updated fragments in place
    pub fn is_update_only(&self) -> bool {
        self.structural_ops() == 0
    }
}

/// Output of a pass: the fragment list to cache for the next pass.
#[derive(Debug)]
#[must_use]
pub struct Reconciled<K, F> {
    /// Fragments in result order
    pub parts: PartList<K, F>,
    /// Statistics about the pass
    pub stats: ReconcileStats,
}

// =============================================================================
// Public API
// =============================================================================

/// Reconcile `old_parts` against `results`, mutating `container` in place.
///
/// With a `pool`, fragments leaving the list are parked instead of removed,
/// new keys are served from the pool first, and whatever is still pooled at
/// the end of the pass has its output detached.
pub fn reconcile<K, C>(
    container: &mut C,
    old_parts: PartList<K, C::Fragment>,
    results: &[RenderResult<K, C::Content>],
    pool: Option<&mut ReusePool<K, C::Fragment>>,
    options: ReconcileOptions,
) -> Reconciled<K, C::Fragment>
where
    K: Hash + Eq + Clone,
    C: Container,
{
    let mut ctx = Reconciler {
        container,
        pool,
        options,
        stats: ReconcileStats::default(),
    };
    let parts = ctx.run(old_parts, results);

    if let Some(pool) = ctx.pool.as_deref_mut() {
        let parked = pool.park(ctx.container);
        if parked > 0 {
            log::trace!("pool: detached {} fragment(s)", parked);
        }
    }

    log::debug!(
        "reconciled {} result(s): created={} updated={} moved={} removed={} pooled={} reused={}+{} lis_kept={} key_map={}",
        results.len(),
        ctx.stats.created,
        ctx.stats.updated,
        ctx.stats.moved,
        ctx.stats.removed,
        ctx.stats.pooled,
        ctx.stats.reused_exact,
        ctx.stats.reused_arbitrary,
        ctx.stats.lis_kept,
        ctx.stats.used_key_map,
    );

    Reconciled {
        parts,
        stats: ctx.stats,
    }
}

// =============================================================================
// Internal Context
// =============================================================================

type Slots<K, F> = Vec<Option<KeyedPart<K, F>>>;

/// Branch chosen by one step of the pointer scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    SkipOldHead,
    SkipOldTail,
    HeadHead,
    TailTail,
    HeadToTail,
    TailToHead,
    Fallback,
}

struct Reconciler<'a, K, C: Container> {
    container: &'a mut C,
    pool: Option<&'a mut ReusePool<K, C::Fragment>>,
    options: ReconcileOptions,
    stats: ReconcileStats,
}

impl<K, C> Reconciler<'_, K, C>
where
    K: Hash + Eq + Clone,
    C: Container,
{
    fn run(
        &mut self,
        old_parts: PartList<K, C::Fragment>,
        results: &[RenderResult<K, C::Content>],
    ) -> PartList<K, C::Fragment> {
        let mut old: Slots<K, C::Fragment> = old_parts.into_iter().map(Some).collect();
        let mut new: Slots<K, C::Fragment> = std::iter::repeat_with(|| None).take(results.len()).collect();

        // Half-open ranges: old[old_start..old_end], results[new_start..new_end]
        let (mut old_start, mut old_end) = (0, old.len());
        let (mut new_start, mut new_end) = (0, results.len());

        let mut old_keys: Option<KeyIndexMap<K>> = None;
        let mut lis: Option<FxHashSet<usize>> = None;

        while old_start < old_end && new_start < new_end {
            match classify(&old, old_start..old_end, results, new_start..new_end) {
                Step::SkipOldHead => old_start += 1,
                Step::SkipOldTail => old_end -= 1,
                Step::HeadHead => {
                    log::trace!("heads match at old {}", old_start);
                    if let Some(mut part) = old[old_start].take() {
                        self.update(&mut part, &results[new_start]);
                        new[new_start] = Some(part);
                    }
                    old_start += 1;
                    new_start += 1;
                }
                Step::TailTail => {
                    log::trace!("tails match at old {}", old_end - 1);
                    if let Some(mut part) = old[old_end - 1].take() {
                        self.update(&mut part, &results[new_end - 1]);
                        new[new_end - 1] = Some(part);
                    }
                    old_end -= 1;
                    new_end -= 1;
                }
                Step::HeadToTail => {
                    log::trace!("old head {} moves to new tail {}", old_start, new_end - 1);
                    if let Some(mut part) = old[old_start].take() {
                        self.update(&mut part, &results[new_end - 1]);
                        self.relocate(&part, successor(&new, new_end));
                        new[new_end - 1] = Some(part);
                    }
                    old_start += 1;
                    new_end -= 1;
                }
                Step::TailToHead => {
                    log::trace!("old tail {} moves to new head {}", old_end - 1, new_start);
                    if let Some(mut part) = old[old_end - 1].take() {
                        self.update(&mut part, &results[new_start]);
                        let head = old[old_start].as_ref().map(|p| &p.fragment);
                        self.relocate(&part, Anchor::before(head));
                        new[new_start] = Some(part);
                    }
                    old_end -= 1;
                    new_start += 1;
                }
                Step::Fallback => {
                    if old_keys.is_none() {
                        log::trace!("building key map over old {}..{}", old_start, old_end);
                        self.stats.used_key_map = true;
                        let keys = KeyIndexMap::from_parts(&old, old_start..old_end);
                        let removed = self.remove_unused(&mut old, old_start..old_end, results, new_start..new_end);
                        old_keys = Some(keys);
                        if removed > 0 {
                            log::trace!("removed {} unused fragment(s), rescanning", removed);
                            continue;
                        }
                    }
                    if let Some(keys) = &old_keys {
                        new_end = self.place_from_map(keys, &mut old, &mut new, results, new_start..new_end, &mut lis);
                    }
                }
            }
        }

        // Old range exhausted: everything left is new, inserted before the
        // first committed result after it
        for index in new_start..new_end {
            log::trace!("new result at {}", index);
            let part = self.create(&results[index], successor(&new, new_end));
            new[index] = Some(part);
        }

        // New range exhausted: whatever old fragment is left is unused
        for slot in &mut old[old_start..old_end] {
            if let Some(part) = slot.take() {
                self.discard(part);
            }
        }

        let parts: PartList<K, C::Fragment> = new.into_iter().flatten().collect();
        debug_assert_eq!(parts.len(), results.len(), "every result must own exactly one fragment");
        parts
    }

    /// Walk the pending new range backwards using the old key map.
    ///
    /// Handles one result, or (once the LIS exists) the whole range. Returns
    /// the new exclusive end of the pending range.
    fn place_from_map(
        &mut self,
        keys: &KeyIndexMap<K>,
        old: &mut Slots<K, C::Fragment>,
        new: &mut Slots<K, C::Fragment>,
        results: &[RenderResult<K, C::Content>],
        pending: Range<usize>,
        lis: &mut Option<FxHashSet<usize>>,
    ) -> usize {
        let new_start = pending.start;
        let mut new_end = pending.end;

        while new_start < new_end {
            let index = new_end - 1;
            let result = &results[index];
            let old_index = keys.get(&result.key).filter(|&i| old[i].is_some());

            match old_index {
                None => {
                    log::trace!("new result at {}", index);
                    let part = self.create(result, successor(new, new_end));
                    new[index] = Some(part);
                }
                Some(old_index) => {
                    if self.options.lis && lis.is_none() {
                        *lis = Some(ordered_positions(keys, old, results, new_start..new_end));
                    }
                    if let Some(mut part) = old[old_index].take() {
                        self.update(&mut part, result);
                        let in_place = lis.as_ref().is_some_and(|set| set.contains(&index));
                        if in_place {
                            log::trace!("old {} already in order, kept", old_index);
                            self.stats.lis_kept += 1;
                        } else {
                            log::trace!("old {} moves to new {}", old_index, index);
                            self.relocate(&part, successor(new, new_end));
                        }
                        new[index] = Some(part);
                    }
                }
            }
            new_end -= 1;

            // Without the LIS, go back to the fast paths after every result
            if lis.is_none() {
                break;
            }
        }
        new_end
    }

    /// Remove or pool old fragments in `range` whose key is not pending.
    fn remove_unused(
        &mut self,
        old: &mut Slots<K, C::Fragment>,
        range: Range<usize>,
        results: &[RenderResult<K, C::Content>],
        pending: Range<usize>,
    ) -> usize {
        let wanted = KeyIndexMap::from_results(results, pending);
        let mut removed = 0;
        for slot in &mut old[range] {
            if let Some(part) = slot.take_if(|part| !wanted.contains_key(&part.key)) {
                self.discard(part);
                removed += 1;
            }
        }
        removed
    }

    fn update(&mut self, part: &mut KeyedPart<K, C::Fragment>, result: &RenderResult<K, C::Content>) {
        self.container.update_fragment(&mut part.fragment, &result.content);
        self.stats.updated += 1;
    }

    fn relocate(&mut self, part: &KeyedPart<K, C::Fragment>, to: Anchor<'_, C::Fragment>) {
        self.container.move_fragment(&part.fragment, to);
        self.stats.moved += 1;
    }

    /// Produce a fragment for `result` at `at`, from the pool if possible.
    fn create(
        &mut self,
        result: &RenderResult<K, C::Content>,
        at: Anchor<'_, C::Fragment>,
    ) -> KeyedPart<K, C::Fragment> {
        let reuse = self.options.reuse;
        let pooled = self.pool.as_deref_mut().and_then(|pool| pool.take(&result.key, reuse));

        let mut part = match pooled {
            Some((mut part, hit)) => {
                if part.detached {
                    self.container.reattach_fragment(&mut part.fragment, at);
                    part.detached = false;
                } else {
                    self.container.move_fragment(&part.fragment, at);
                }
                match hit {
                    PoolHit::Exact => self.stats.reused_exact += 1,
                    PoolHit::Arbitrary => self.stats.reused_arbitrary += 1,
                }
                log::trace!("reused pooled fragment ({:?})", hit);
                part
            }
            None => {
                self.stats.created += 1;
                KeyedPart::new(result.key.clone(), self.container.create_fragment(at))
            }
        };
        self.container.update_fragment(&mut part.fragment, &result.content);
        part
    }

    /// Pool `part` if a pool is present, remove it otherwise.
    fn discard(&mut self, part: KeyedPart<K, C::Fragment>) {
        match self.pool.as_deref_mut() {
            Some(pool) => {
                pool.put(self.container, part);
                self.stats.pooled += 1;
            }
            None => {
                self.container.remove_fragment(part.fragment);
                self.stats.removed += 1;
            }
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Pick the scan branch for the current pointers. Both ranges are non-empty.
fn classify<K: Eq, F, C>(
    old: &[Option<KeyedPart<K, F>>],
    old_range: Range<usize>,
    results: &[RenderResult<K, C>],
    new_range: Range<usize>,
) -> Step {
    let Some(old_head) = &old[old_range.start] else {
        return Step::SkipOldHead;
    };
    let Some(old_tail) = &old[old_range.end - 1] else {
        return Step::SkipOldTail;
    };
    let new_head = &results[new_range.start].key;
    let new_tail = &results[new_range.end - 1].key;

    if old_head.key == *new_head {
        Step::HeadHead
    } else if old_tail.key == *new_tail {
        Step::TailTail
    } else if old_head.key == *new_tail {
        Step::HeadToTail
    } else if old_tail.key == *new_head {
        Step::TailToHead
    } else {
        Step::Fallback
    }
}

/// Anchor before the fragment committed at `index`, or the end.
fn successor<K, F>(new: &[Option<KeyedPart<K, F>>], index: usize) -> Anchor<'_, F> {
    Anchor::before(new.get(index).and_then(Option::as_ref).map(|part| &part.fragment))
}

/// New positions in `pending` whose old fragment is already in order.
///
/// The backward walk hands an old fragment to the last pending result
/// carrying its key, so only that occurrence is mapped to its old index.
fn ordered_positions<K, F, C>(
    keys: &KeyIndexMap<K>,
    old: &[Option<KeyedPart<K, F>>],
    results: &[RenderResult<K, C>],
    pending: Range<usize>,
) -> FxHashSet<usize>
where
    K: Hash + Eq,
{
    let mut claimed = FxHashSet::default();
    let mut old_indices: Vec<Option<usize>> = vec![None; pending.len()];
    for (offset, result) in results[pending.clone()].iter().enumerate().rev() {
        old_indices[offset] = keys
            .get(&result.key)
            .filter(|&i| old[i].is_some() && claimed.insert(i));
    }
    longest_increasing_subsequence(&old_indices)
        .into_iter()
        .map(|offset| pending.start + offset)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
