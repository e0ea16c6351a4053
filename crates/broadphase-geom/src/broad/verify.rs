// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use std::collections::BTreeSet;

use thiserror::Error;

use crate::broad::bvh::{Bvh, BvhNode};
use crate::broad::Pair;
use crate::types::aabb::Aabb;

/// Broad-phase verification failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// A pair referenced the same shape twice.
    #[error("self-pair ({0}, {0}) in candidate list")]
    SelfPair(usize),
    /// A pair appeared more than once.
    #[error("duplicate pair {0:?} in candidate list")]
    DuplicatePair(Pair),
    /// A pair was not in `(min, max)` order.
    #[error("non-canonical pair {0:?} in candidate list")]
    NonCanonicalPair(Pair),
    /// Candidate and oracle disagree as sets.
    #[error("pair set mismatch: {} missing, {} extra", .missing.len(), .extra.len())]
    PairMismatch {
        /// Pairs the oracle reports but the candidate lacks (sorted).
        missing: Vec<Pair>,
        /// Pairs the candidate reports but the oracle lacks (sorted).
        extra: Vec<Pair>,
    },
    /// Two builds over the same input diverged.
    #[error("rebuild diverged at node {node}")]
    NonDeterministicBuild {
        /// First node position whose contents differ.
        node: usize,
    },
}

/// Checks a broad-phase pair list against a trusted oracle.
///
/// The candidate must contain no self-pairs, no duplicates and only
/// canonical pairs, and must equal `oracle` as a set. Ordering is not
/// checked here.
///
/// # Errors
/// Returns the first structural defect found in `candidate`, or
/// [`VerifyError::PairMismatch`] listing the set difference both ways.
pub fn verify_pair_set(candidate: &[Pair], oracle: &[Pair]) -> Result<(), VerifyError> {
    let mut seen = BTreeSet::new();
    for &(a, b) in candidate {
        if a == b {
            return Err(VerifyError::SelfPair(a));
        }
        if a > b {
            return Err(VerifyError::NonCanonicalPair((a, b)));
        }
        if !seen.insert((a, b)) {
            return Err(VerifyError::DuplicatePair((a, b)));
        }
    }

    let expected: BTreeSet<Pair> = oracle.iter().copied().collect();
    let missing: Vec<Pair> = expected.difference(&seen).copied().collect();
    let extra: Vec<Pair> = seen.difference(&expected).copied().collect();
    if missing.is_empty() && extra.is_empty() {
        Ok(())
    } else {
        Err(VerifyError::PairMismatch { missing, extra })
    }
}

/// Builds two trees over `aabbs` and compares them node by node.
///
/// Bounds are compared by bit pattern, so `-0.0` vs `0.0` counts as a
/// divergence.
///
/// # Errors
/// Returns [`VerifyError::NonDeterministicBuild`] with the first differing node.
pub fn verify_rebuild_determinism(aabbs: &[Aabb]) -> Result<(), VerifyError> {
    let first = Bvh::build(aabbs);
    let second = Bvh::build(aabbs);
    let (a, b) = (first.nodes(), second.nodes());

    if let Some(node) = a.iter().zip(b).position(|(x, y)| !same_node_bits(x, y)) {
        return Err(VerifyError::NonDeterministicBuild { node });
    }
    if a.len() != b.len() {
        return Err(VerifyError::NonDeterministicBuild {
            node: a.len().min(b.len()),
        });
    }
    Ok(())
}

fn same_node_bits(x: &BvhNode, y: &BvhNode) -> bool {
    let bits = |aabb: Aabb| {
        let (lo, hi) = (aabb.min(), aabb.max());
        [lo.x(), lo.y(), hi.x(), hi.y()].map(f32::to_bits)
    };
    bits(x.bounds()) == bits(y.bounds())
        && x.kind() == y.kind()
        && x.depth() == y.depth()
        && x.subtree_size() == y.subtree_size()
}
