// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Broad-phase interfaces: a per-tick BVH and the brute-force oracle.
//!
//! Determinism contract (applies to every implementation here):
//! - Pair identity is canonicalized as `(min_index, max_index)`.
//! - The emitted pair list is strictly sorted lexicographically by that tuple.
//! - Overlap is inclusive on edges (touching AABBs are considered overlapping).
//! - Structures are rebuilt from scratch every tick; nothing is updated
//!   incrementally.

use crate::types::aabb::Aabb;

#[doc = "O(n^2) all-pairs comparator used as fallback and as the verification oracle."]
pub mod brute;
#[doc = "Median-split BVH: build, single-shape query, dual-tree self-query."]
pub mod bvh;
#[doc = "Traversal observers and the recorded step log for single-shape queries."]
pub mod trace;
#[doc = "Pair-set and rebuild-determinism checks."]
pub mod verify;

/// Unordered pair of shape indices in canonical `(min, max)` form.
pub type Pair = (usize, usize);

/// Returns `(i, j)` ordered so the smaller index comes first.
#[inline]
pub const fn canonical_pair(i: usize, j: usize) -> Pair {
    if i <= j {
        (i, j)
    } else {
        (j, i)
    }
}

/// Broad-phase interface for per-tick rebuilds and overlapping-pair queries.
///
/// Implementations must return pairs deterministically: each pair is
/// canonical (`a < b`), appears once, and the list is sorted ascending.
pub trait BroadPhase {
    /// Discards previous state and indexes `aabbs` (index `i` is shape `i`).
    fn rebuild(&mut self, aabbs: &[Aabb]);

    /// Clears `out` and fills it with every overlapping pair.
    fn pairs_into(&self, out: &mut Vec<Pair>);

    /// Returns a canonical, deterministically ordered list of overlapping pairs.
    fn pairs(&self) -> Vec<Pair> {
        let mut out = Vec::new();
        self.pairs_into(&mut out);
        out
    }
}
