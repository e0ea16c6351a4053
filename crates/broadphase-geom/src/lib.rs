// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![doc = r"2D collision core.

This crate provides:
- Axis-aligned bounding boxes (`Aabb`) and closed shape kinds (`Shape`:
  circles and convex polygons).
- A median-split BVH rebuilt from scratch every tick, with a single-shape
  query, an instrumented query that records traversal steps, and a
  dual-tree self-query that finds every overlapping pair.
- A brute-force all-pairs comparator used as fallback and as the oracle the
  BVH is verified against.
- A separating-axis narrow phase that splits candidates into confirmed
  collisions and false positives.
- `CollisionPipeline`, which runs the whole per-tick pass over caller-owned
  buffers.

Design notes:
- Deterministic: no ambient RNG; centroid ties break by index; pair lists
  are canonical and sorted.
- Float32 throughout; overlap tests are inclusive on boundaries.
- Invariant violations (bad indices, inverted boxes) panic; there are no
  recoverable errors outside verification.
"]

/// Broad-phase structures and checks.
pub mod broad;
/// Vectors, epsilon and a seedable PRNG.
pub mod math;
/// Exact pair classification.
pub mod narrow;
/// Per-tick orchestration.
pub mod pipeline;
/// Foundational geometric types.
pub mod types;

pub use broad::brute::{brute_force_pairs, BruteForce};
pub use broad::bvh::{Bvh, BvhNode, BvhNodeKind, BvhStats};
pub use broad::trace::{QueryTrace, TraversalAction, TraversalObserver, TraversalStep};
pub use broad::{BroadPhase, Pair};
pub use math::Vec2;
pub use narrow::{classify_pairs, shapes_intersect, NarrowPhaseReport, PairClass};
pub use pipeline::{BroadPhaseMode, CollisionPipeline, FrameStats, PipelineConfig};
pub use types::aabb::Aabb;
pub use types::shape::{Shape, ShapeKind};
