// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use tracing::debug;

use crate::broad::trace::{QueryTrace, StepRecorder, TraversalObserver};
use crate::broad::{canonical_pair, BroadPhase, Pair};
use crate::math::Vec2;
use crate::types::aabb::Aabb;

/// Leaf-or-internal payload of a [`BvhNode`].
///
/// Exactly one of the two holds for every node, so the "leaf xor internal"
/// invariant is carried by the type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BvhNodeKind {
    /// Holds one shape index into the caller's AABB list.
    Leaf {
        /// Index into the AABB list the tree was built from.
        shape_index: usize,
    },
    /// Holds the node-array positions of both children.
    Internal {
        /// Left child (lower centroids along the split axis).
        left: usize,
        /// Right child.
        right: usize,
    },
}

/// One entry of the flat node arena.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BvhNode {
    bounds: Aabb,
    kind: BvhNodeKind,
    depth: usize,
    subtree_size: usize,
}

impl BvhNode {
    /// Bounds of every leaf below this node (the merge of both children for internal nodes).
    pub const fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Leaf or internal payload.
    pub const fn kind(&self) -> BvhNodeKind {
        self.kind
    }

    /// Distance from the root (root is 0).
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Number of leaves in the subtree rooted here (1 for a leaf).
    pub const fn subtree_size(&self) -> usize {
        self.subtree_size
    }

    /// Returns `true` for leaves.
    pub const fn is_leaf(&self) -> bool {
        matches!(self.kind, BvhNodeKind::Leaf { .. })
    }

    /// Shape index for leaves, `None` for internal nodes.
    pub const fn shape_index(&self) -> Option<usize> {
        match self.kind {
            BvhNodeKind::Leaf { shape_index } => Some(shape_index),
            BvhNodeKind::Internal { .. } => None,
        }
    }

    /// `(left, right)` child positions for internal nodes, `None` for leaves.
    pub const fn children(&self) -> Option<(usize, usize)> {
        match self.kind {
            BvhNodeKind::Leaf { .. } => None,
            BvhNodeKind::Internal { left, right } => Some((left, right)),
        }
    }
}

/// Shape summary of a built tree.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BvhStats {
    /// Total number of nodes.
    pub node_count: usize,
    /// Number of leaves (equals the input AABB count).
    pub leaf_count: usize,
    /// Number of internal nodes (`leaf_count - 1` when non-empty).
    pub internal_count: usize,
    /// Depth of the deepest node.
    pub max_depth: usize,
}

/// Bounding volume hierarchy rebuilt from scratch every tick.
///
/// Layout:
/// - Flat, index-addressed node array; the root is node 0 when non-empty.
/// - Nodes are emitted in pre-order: a parent precedes its left subtree,
///   which precedes its right subtree.
/// - The tree owns no shape data, only indices into the AABB list it was
///   built from.
///
/// Determinism:
/// - Split axis is the wider extent of the subset bounds (ties pick X).
/// - Subsets are ordered by centroid along that axis with `f32::total_cmp`,
///   ties broken by original index, then split at the midpoint.
/// - Identical input lists therefore produce identical node arrays.
///
/// The median split halves the leaf count at every level, so the height is
/// `ceil(log2 n)`. Boxes sharing one centroid still split (by index order),
/// but such subtrees overlap completely and queries lose their pruning.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    max_depth: usize,
    // Per-build scratch, kept to reuse allocations across ticks.
    order: Vec<usize>,
    centroids: Vec<Vec2>,
}

impl Bvh {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree over `aabbs`; leaf `shape_index` values index into `aabbs`.
    #[must_use]
    pub fn build(aabbs: &[Aabb]) -> Self {
        let mut bvh = Self::new();
        bvh.rebuild(aabbs);
        bvh
    }

    /// Discards the current tree and builds a new one over `aabbs`,
    /// reusing previously allocated buffers.
    pub fn rebuild(&mut self, aabbs: &[Aabb]) {
        self.rebuild_nodes(aabbs);
    }

    /// Removes every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.max_depth = 0;
    }

    /// The node arena, root first.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Root position, `None` for an empty tree.
    pub fn root(&self) -> Option<usize> {
        (!self.nodes.is_empty()).then_some(0)
    }

    /// Number of nodes (`2n - 1` for `n` leaves).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when built from an empty list.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of leaves; the root's `subtree_size`.
    pub fn leaf_count(&self) -> usize {
        self.nodes.first().map_or(0, BvhNode::subtree_size)
    }

    /// Depth of the deepest node (0 for empty and single-leaf trees).
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Node and depth counts.
    pub fn stats(&self) -> BvhStats {
        let leaf_count = self.nodes.iter().filter(|n| n.is_leaf()).count();
        BvhStats {
            node_count: self.nodes.len(),
            leaf_count,
            internal_count: self.nodes.len() - leaf_count,
            max_depth: self.max_depth,
        }
    }

    fn rebuild_nodes(&mut self, aabbs: &[Aabb]) {
        self.clear();
        if aabbs.is_empty() {
            debug!(leaves = 0, "bvh rebuilt (empty)");
            return;
        }

        self.centroids.clear();
        self.centroids.extend(aabbs.iter().map(Aabb::center));
        self.nodes.reserve(2 * aabbs.len() - 1);

        let mut order = std::mem::take(&mut self.order);
        order.clear();
        order.extend(0..aabbs.len());
        self.build_recursive(&mut order, aabbs, 0);
        self.order = order;

        debug!(
            leaves = aabbs.len(),
            nodes = self.nodes.len(),
            max_depth = self.max_depth,
            "bvh rebuilt"
        );
    }

    fn build_recursive(&mut self, indices: &mut [usize], aabbs: &[Aabb], depth: usize) -> usize {
        self.max_depth = self.max_depth.max(depth);
        let node_index = self.nodes.len();

        let bounds = indices[1..]
            .iter()
            .fold(aabbs[indices[0]], |acc, &i| acc.merged(&aabbs[i]));

        if indices.len() == 1 {
            self.nodes.push(BvhNode {
                bounds,
                kind: BvhNodeKind::Leaf {
                    shape_index: indices[0],
                },
                depth,
                subtree_size: 1,
            });
            return node_index;
        }

        // Placeholder so the parent keeps its pre-order slot; patched below.
        self.nodes.push(BvhNode {
            bounds,
            kind: BvhNodeKind::Leaf {
                shape_index: indices[0],
            },
            depth,
            subtree_size: indices.len(),
        });

        let split_x = bounds.width() >= bounds.height();
        let centroids = &self.centroids;
        indices.sort_by(|&a, &b| {
            let (ka, kb) = if split_x {
                (centroids[a].x(), centroids[b].x())
            } else {
                (centroids[a].y(), centroids[b].y())
            };
            ka.total_cmp(&kb).then(a.cmp(&b))
        });

        let mid = indices.len() / 2;
        let (lower, upper) = indices.split_at_mut(mid);
        let left = self.build_recursive(lower, aabbs, depth + 1);
        let right = self.build_recursive(upper, aabbs, depth + 1);

        let subtree_size = self.nodes[left].subtree_size + self.nodes[right].subtree_size;
        let node = &mut self.nodes[node_index];
        node.kind = BvhNodeKind::Internal { left, right };
        node.subtree_size = subtree_size;
        node_index
    }

    /// Returns every shape whose box overlaps `query`, skipping `exclude`.
    ///
    /// Results follow a left-subtree-before-right-subtree depth-first order.
    ///
    /// # Panics
    /// On a non-empty tree, panics if `exclude` is not a valid shape index.
    pub fn query(&self, query: &Aabb, exclude: Option<usize>) -> Vec<usize> {
        let mut out = Vec::new();
        self.query_into(query, exclude, &mut out);
        out
    }

    /// Like [`Bvh::query`] but writes into a caller-owned buffer (cleared first).
    pub fn query_into(&self, query: &Aabb, exclude: Option<usize>, out: &mut Vec<usize>) {
        out.clear();
        self.traverse(query, exclude, out, &mut ());
    }

    /// Like [`Bvh::query_into`] but reports every traversal event to `observer`.
    pub fn query_observed<O>(
        &self,
        query: &Aabb,
        exclude: Option<usize>,
        out: &mut Vec<usize>,
        observer: &mut O,
    ) where
        O: TraversalObserver,
    {
        out.clear();
        self.traverse(query, exclude, out, observer);
    }

    /// Instrumented query: the same candidates as [`Bvh::query`] plus the
    /// ordered visit/prune/leaf-test log.
    pub fn query_traced(&self, query: &Aabb, exclude: Option<usize>) -> QueryTrace {
        let mut trace = QueryTrace::default();
        self.query_traced_into(query, exclude, &mut trace);
        trace
    }

    /// Like [`Bvh::query_traced`] but reuses `trace`'s buffers.
    pub fn query_traced_into(&self, query: &Aabb, exclude: Option<usize>, trace: &mut QueryTrace) {
        trace.clear();
        let QueryTrace { candidates, steps } = trace;
        let mut recorder = StepRecorder::new(exclude, steps);
        self.traverse(query, exclude, candidates, &mut recorder);
    }

    fn traverse<O>(&self, query: &Aabb, exclude: Option<usize>, out: &mut Vec<usize>, observer: &mut O)
    where
        O: TraversalObserver,
    {
        if self.nodes.is_empty() {
            return;
        }
        if let Some(ex) = exclude {
            let leaves = self.leaf_count();
            assert!(ex < leaves, "exclude index {ex} out of range for {leaves} shapes");
        }

        // A pre-order DFS never holds more than one pending sibling per level.
        let mut stack = Vec::with_capacity(self.max_depth + 2);
        stack.push(0usize);
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.bounds.overlaps(query) {
                observer.prune(idx);
                continue;
            }
            match node.kind {
                BvhNodeKind::Leaf { shape_index } => {
                    if Some(shape_index) != exclude {
                        observer.leaf_test(idx, shape_index);
                        out.push(shape_index);
                    }
                }
                BvhNodeKind::Internal { left, right } => {
                    observer.visit(idx);
                    // Right first so the left subtree pops first.
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
    }

    /// Every overlapping leaf pair, found by a dual-tree self-query from the root.
    ///
    /// Each pair is canonical `(min, max)`, appears once, and the list is
    /// sorted ascending, so it compares directly against
    /// [`crate::broad::brute::brute_force_pairs`].
    pub fn find_all_pairs(&self) -> Vec<Pair> {
        let mut out = Vec::new();
        self.find_all_pairs_into(&mut out);
        out
    }

    /// Like [`Bvh::find_all_pairs`] but writes into a caller-owned buffer (cleared first).
    pub fn find_all_pairs_into(&self, out: &mut Vec<Pair>) {
        out.clear();
        if let Some(root) = self.root() {
            self.self_query(root, root, out);
        }
        out.sort_unstable();
    }

    /// Emits overlapping leaf pairs between the subtrees rooted at `a` and `b`.
    ///
    /// For `a == b` only `(left, left)`, `(right, right)` and `(left, right)`
    /// are explored, so no cross pair is produced twice. When both nodes are
    /// internal the one with more leaves is descended (ties descend `a`).
    fn self_query(&self, a: usize, b: usize, out: &mut Vec<Pair>) {
        let na = &self.nodes[a];
        let nb = &self.nodes[b];
        if !na.bounds.overlaps(&nb.bounds) {
            return;
        }

        match (na.kind, nb.kind) {
            (BvhNodeKind::Leaf { shape_index: i }, BvhNodeKind::Leaf { shape_index: j }) => {
                if i != j {
                    out.push(canonical_pair(i, j));
                }
            }
            (BvhNodeKind::Internal { left, right }, _) if a == b => {
                self.self_query(left, left, out);
                self.self_query(right, right, out);
                self.self_query(left, right, out);
            }
            (BvhNodeKind::Leaf { .. }, BvhNodeKind::Internal { left, right }) => {
                self.self_query(a, left, out);
                self.self_query(a, right, out);
            }
            (BvhNodeKind::Internal { left, right }, BvhNodeKind::Leaf { .. }) => {
                self.self_query(left, b, out);
                self.self_query(right, b, out);
            }
            (
                BvhNodeKind::Internal {
                    left: a_left,
                    right: a_right,
                },
                BvhNodeKind::Internal {
                    left: b_left,
                    right: b_right,
                },
            ) => {
                if na.subtree_size >= nb.subtree_size {
                    self.self_query(a_left, b, out);
                    self.self_query(a_right, b, out);
                } else {
                    self.self_query(a, b_left, out);
                    self.self_query(a, b_right, out);
                }
            }
        }
    }
}

impl BroadPhase for Bvh {
    fn rebuild(&mut self, aabbs: &[Aabb]) {
        self.rebuild_nodes(aabbs);
    }

    fn pairs_into(&self, out: &mut Vec<Pair>) {
        self.find_all_pairs_into(out);
    }
}
