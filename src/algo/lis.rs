//! Longest increasing subsequence for move minimization.
//!
//! Given, for each pending new position, the old index of the fragment that
//! will be reused there, the positions on a longest strictly increasing run
//! of old indices already hold their fragments in the right relative order.
//! The reconciler leaves those where they are and only moves the rest.
//!
//! Patience sorting: keep the smallest tail of every subsequence length seen
//! so far, binary-search where each value goes, and link each value to its
//! predecessor to rebuild the sequence at the end.
//!
//! - Time: O(n log n)
//! - Space: O(n)

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Positions in `old_indices` forming a longest strictly increasing
/// subsequence of its values.
///
/// `None` entries (results with no old fragment) are ignored.
pub fn longest_increasing_subsequence(old_indices: &[Option<usize>]) -> FxHashSet<usize> {
    // (position in `old_indices`, value) of the smallest tail per length
    let mut tails: SmallVec<[(usize, usize); 16]> = SmallVec::new();
    let mut prev: Vec<Option<usize>> = vec![None; old_indices.len()];

    for (pos, value) in old_indices.iter().enumerate() {
        let Some(value) = *value else { continue };
        let at = tails.partition_point(|&(_, tail)| tail < value);
        if at > 0 {
            prev[pos] = Some(tails[at - 1].0);
        }
        if at == tails.len() {
            tails.push((pos, value));
        } else {
            tails[at] = (pos, value);
        }
    }

    let mut lis = FxHashSet::default();
    lis.reserve(tails.len());
    let mut cursor = tails.last().map(|&(pos, _)| pos);
    while let Some(pos) = cursor {
        lis.insert(pos);
        cursor = prev[pos];
    }
    lis
}
