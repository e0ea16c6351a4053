// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Per-tick collision pass: bounds, BVH, broad phase, narrow phase.
//!
//! A [`CollisionPipeline`] owns every per-tick buffer and reuses them across
//! calls to [`CollisionPipeline::step`]. Nothing carries over between ticks
//! except allocations.

use tracing::{debug, warn};

use crate::broad::brute::brute_force_pairs_into;
use crate::broad::bvh::Bvh;
use crate::broad::trace::QueryTrace;
use crate::broad::verify::verify_pair_set;
use crate::broad::Pair;
use crate::narrow::{classify_pairs_into, NarrowPhaseReport};
use crate::types::aabb::Aabb;
use crate::types::shape::Shape;

/// Which structure produces the broad-phase candidate list.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum BroadPhaseMode {
    /// Dual-tree self-query over the BVH.
    #[default]
    Bvh,
    /// All-pairs comparison.
    BruteForce,
}

/// Knobs for one [`CollisionPipeline`].
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct PipelineConfig {
    /// Candidate source.
    pub mode: BroadPhaseMode,
    /// Also run the other broad phase and flag any pair-set difference.
    pub compare_brute_force: bool,
    /// Uniform padding added to every shape AABB (non-negative).
    pub aabb_margin: f32,
    /// Shape whose single-shape query is recorded each tick.
    ///
    /// Indices at or past the current shape count are ignored for that tick.
    pub traced_shape: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: BroadPhaseMode::Bvh,
            compare_brute_force: false,
            aabb_margin: 0.0,
            traced_shape: None,
        }
    }
}

/// Counters for one tick.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameStats {
    /// Shapes in the input list.
    pub shape_count: usize,
    /// BVH node count (`2n - 1`, or 0).
    pub bvh_node_count: usize,
    /// BVH height.
    pub bvh_max_depth: usize,
    /// Candidates from the active broad phase.
    pub broad_phase_pairs: usize,
    /// Brute-force pair count, when it was computed this tick.
    pub brute_force_pairs: Option<usize>,
    /// Exact tests run (one per candidate).
    pub narrow_phase_tests: usize,
    /// Confirmed collisions.
    pub actual_collisions: usize,
    /// Candidates rejected by SAT.
    pub false_positives: usize,
    /// BVH and brute force disagreed on a comparison tick.
    pub bvh_mismatch: bool,
}

/// Caller-owned collision pass with reusable buffers.
#[derive(Debug, Clone, Default)]
pub struct CollisionPipeline {
    config: PipelineConfig,
    aabbs: Vec<Aabb>,
    bvh: Bvh,
    bvh_pairs: Vec<Pair>,
    brute_pairs: Vec<Pair>,
    brute_valid: bool,
    narrow: NarrowPhaseReport,
    trace: QueryTrace,
    traced: bool,
    stats: FrameStats,
}

impl CollisionPipeline {
    /// Creates a pipeline with empty buffers.
    ///
    /// # Panics
    /// Panics if `config.aabb_margin` is negative or NaN.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        assert_margin(config.aabb_margin);
        Self {
            config,
            ..Self::default()
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Replaces the configuration; takes effect on the next [`Self::step`].
    ///
    /// # Panics
    /// Panics if `config.aabb_margin` is negative or NaN.
    pub fn set_config(&mut self, config: PipelineConfig) {
        assert_margin(config.aabb_margin);
        self.config = config;
    }

    /// Runs one full collision pass over `shapes` (index `i` is shape `i`).
    ///
    /// Polygon world vertices must already reflect the current pose.
    pub fn step(&mut self, shapes: &[Shape]) -> &FrameStats {
        let cfg = self.config;

        self.aabbs.clear();
        self.aabbs.extend(
            shapes
                .iter()
                .map(|s| s.compute_aabb().expanded(cfg.aabb_margin)),
        );

        // The tree is rebuilt in both modes so its structure stays inspectable.
        self.bvh.rebuild(&self.aabbs);

        let need_bvh = cfg.mode == BroadPhaseMode::Bvh || cfg.compare_brute_force;
        let need_brute = cfg.mode == BroadPhaseMode::BruteForce || cfg.compare_brute_force;
        if need_bvh {
            self.bvh.find_all_pairs_into(&mut self.bvh_pairs);
        } else {
            self.bvh_pairs.clear();
        }
        if need_brute {
            brute_force_pairs_into(&self.aabbs, &mut self.brute_pairs);
        } else {
            self.brute_pairs.clear();
        }
        self.brute_valid = need_brute;

        let mut mismatch = false;
        if cfg.compare_brute_force {
            if let Err(err) = verify_pair_set(&self.bvh_pairs, &self.brute_pairs) {
                warn!(shapes = shapes.len(), error = %err, "bvh pair set differs from brute force");
                mismatch = true;
            }
        }

        let broad = match cfg.mode {
            BroadPhaseMode::Bvh => &self.bvh_pairs,
            BroadPhaseMode::BruteForce => &self.brute_pairs,
        };
        classify_pairs_into(shapes, broad, &mut self.narrow);

        self.trace.clear();
        self.traced = false;
        if let Some(t) = cfg.traced_shape.filter(|&t| t < shapes.len()) {
            self.bvh.query_traced_into(&self.aabbs[t], Some(t), &mut self.trace);
            self.traced = true;
        }

        self.stats = FrameStats {
            shape_count: shapes.len(),
            bvh_node_count: self.bvh.len(),
            bvh_max_depth: self.bvh.max_depth(),
            broad_phase_pairs: broad.len(),
            brute_force_pairs: need_brute.then_some(self.brute_pairs.len()),
            narrow_phase_tests: self.narrow.len(),
            actual_collisions: self.narrow.confirmed_count(),
            false_positives: self.narrow.false_positive_count(),
            bvh_mismatch: mismatch,
        };
        debug!(
            shapes = self.stats.shape_count,
            nodes = self.stats.bvh_node_count,
            candidates = self.stats.broad_phase_pairs,
            collisions = self.stats.actual_collisions,
            false_positives = self.stats.false_positives,
            "collision step"
        );
        &self.stats
    }

    /// Shape bounds from the last step (margin applied).
    pub fn aabbs(&self) -> &[Aabb] {
        &self.aabbs
    }

    /// Tree from the last step.
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Candidates from the active broad phase, sorted canonical pairs.
    pub fn broad_pairs(&self) -> &[Pair] {
        match self.config.mode {
            BroadPhaseMode::Bvh => &self.bvh_pairs,
            BroadPhaseMode::BruteForce => &self.brute_pairs,
        }
    }

    /// Brute-force pairs, if they were computed on the last step.
    pub fn brute_pairs(&self) -> Option<&[Pair]> {
        self.brute_valid.then_some(self.brute_pairs.as_slice())
    }

    /// Narrow-phase classification of the last step's candidates.
    pub fn narrow(&self) -> &NarrowPhaseReport {
        &self.narrow
    }

    /// Recorded query for the traced shape, if one ran on the last step.
    pub fn trace(&self) -> Option<&QueryTrace> {
        self.traced.then_some(&self.trace)
    }

    /// Counters from the last step.
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }
}

fn assert_margin(margin: f32) {
    assert!(margin >= 0.0, "aabb margin must be non-negative, got {margin}");
}
