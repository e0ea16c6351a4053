// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::broad::{BroadPhase, Pair};
use crate::types::aabb::Aabb;

/// Tests every pair `i < j` directly and appends overlapping ones to `out`.
///
/// `out` is cleared first. The result is already canonical and sorted
/// because the loops visit pairs in lexicographic order.
pub fn brute_force_pairs_into(aabbs: &[Aabb], out: &mut Vec<Pair>) {
    out.clear();
    for (i, a) in aabbs.iter().enumerate() {
        for (j, b) in aabbs.iter().enumerate().skip(i + 1) {
            if a.overlaps(b) {
                out.push((i, j));
            }
        }
    }
}

/// Allocating convenience wrapper over [`brute_force_pairs_into`].
pub fn brute_force_pairs(aabbs: &[Aabb]) -> Vec<Pair> {
    let mut out = Vec::new();
    brute_force_pairs_into(aabbs, &mut out);
    out
}

/// An `O(n^2)` all-pairs broad phase.
///
/// Why this exists:
/// - Fallback mode when the scene is tiny or when isolating BVH issues.
/// - The oracle the BVH self-query is verified against: both must produce
///   the identical pair list for every input.
#[derive(Debug, Default, Clone)]
pub struct BruteForce {
    aabbs: Vec<Aabb>,
}

impl BruteForce {
    /// Creates an empty comparator.
    #[must_use]
    pub fn new() -> Self {
        Self { aabbs: Vec::new() }
    }

    /// Boxes indexed by the last rebuild.
    pub fn aabbs(&self) -> &[Aabb] {
        &self.aabbs
    }
}

impl BroadPhase for BruteForce {
    fn rebuild(&mut self, aabbs: &[Aabb]) {
        self.aabbs.clear();
        self.aabbs.extend_from_slice(aabbs);
    }

    fn pairs_into(&self, out: &mut Vec<Pair>) {
        brute_force_pairs_into(&self.aabbs, out);
    }
}
