// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Narrow phase: exact SAT classification of broad-phase candidate pairs.
//!
//! Every candidate is either a confirmed collision or a false positive
//! (AABBs overlap, shapes do not). Classification keeps candidate order.

#[doc = "Separating-axis tests for circles and convex polygons."]
pub mod sat;

pub use sat::shapes_intersect;

use crate::broad::Pair;
use crate::types::shape::Shape;

/// Outcome of the exact test for one candidate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PairClass {
    /// Shapes intersect.
    Confirmed,
    /// AABBs overlap but the shapes are disjoint.
    FalsePositive,
}

/// A candidate pair with its classification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassifiedPair {
    /// Canonical shape index pair.
    pub pair: Pair,
    /// Test outcome.
    pub class: PairClass,
}

/// Classification of a whole candidate list, in candidate order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NarrowPhaseReport {
    pairs: Vec<ClassifiedPair>,
}

impl NarrowPhaseReport {
    /// Every classified candidate.
    pub fn pairs(&self) -> &[ClassifiedPair] {
        &self.pairs
    }

    /// Number of candidates tested.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if no candidate was tested.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Confirmed collisions, in candidate order.
    pub fn confirmed(&self) -> impl Iterator<Item = Pair> + '_ {
        self.with_class(PairClass::Confirmed)
    }

    /// False positives, in candidate order.
    pub fn false_positives(&self) -> impl Iterator<Item = Pair> + '_ {
        self.with_class(PairClass::FalsePositive)
    }

    /// Number of confirmed collisions.
    pub fn confirmed_count(&self) -> usize {
        self.confirmed().count()
    }

    /// Number of false positives.
    pub fn false_positive_count(&self) -> usize {
        self.false_positives().count()
    }

    /// Classification of `pair` (either index order), if it was a candidate.
    pub fn class_of(&self, pair: Pair) -> Option<PairClass> {
        let key = crate::broad::canonical_pair(pair.0, pair.1);
        self.pairs.iter().find(|c| c.pair == key).map(|c| c.class)
    }

    fn with_class(&self, class: PairClass) -> impl Iterator<Item = Pair> + '_ {
        self.pairs
            .iter()
            .filter(move |c| c.class == class)
            .map(|c| c.pair)
    }
}

/// Runs the exact test on every candidate.
///
/// # Panics
/// Panics if a candidate references an index outside `shapes`.
pub fn classify_pairs(shapes: &[Shape], candidates: &[Pair]) -> NarrowPhaseReport {
    let mut report = NarrowPhaseReport::default();
    classify_pairs_into(shapes, candidates, &mut report);
    report
}

/// Like [`classify_pairs`] but reuses `report`'s buffer (cleared first).
pub fn classify_pairs_into(shapes: &[Shape], candidates: &[Pair], report: &mut NarrowPhaseReport) {
    report.pairs.clear();
    report.pairs.extend(candidates.iter().map(|&(i, j)| {
        let class = if shapes_intersect(&shapes[i], &shapes[j]) {
            PairClass::Confirmed
        } else {
            PairClass::FalsePositive
        };
        ClassifiedPair { pair: (i, j), class }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;

    #[test]
    fn report_splits_candidates_by_class() {
        let shapes = vec![
            Shape::circle(Vec2::ZERO, 10.0),
            Shape::circle(Vec2::new(15.0, 0.0), 10.0),
            // AABB corner overlaps shape 0's AABB, circles stay apart.
            Shape::circle(Vec2::new(18.0, 18.0), 10.0),
        ];
        let report = classify_pairs(&shapes, &[(0, 1), (0, 2)]);
        assert_eq!(report.len(), 2);
        assert_eq!(report.confirmed().collect::<Vec<_>>(), vec![(0, 1)]);
        assert_eq!(report.false_positives().collect::<Vec<_>>(), vec![(0, 2)]);
        assert_eq!(report.confirmed_count(), 1);
        assert_eq!(report.false_positive_count(), 1);
        assert_eq!(report.class_of((2, 0)), Some(PairClass::FalsePositive));
        assert_eq!(report.class_of((1, 2)), None);
    }

    #[test]
    fn classify_into_clears_previous_frame() {
        let shapes = vec![Shape::circle(Vec2::ZERO, 1.0), Shape::circle(Vec2::ZERO, 1.0)];
        let mut report = classify_pairs(&shapes, &[(0, 1)]);
        classify_pairs_into(&shapes, &[], &mut report);
        assert!(report.is_empty());
    }
}
