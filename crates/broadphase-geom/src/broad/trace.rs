// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

/// What the single-shape traversal did at a node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TraversalAction {
    /// Internal node whose bounds overlap the query; children were pushed.
    Visit,
    /// Bounds did not overlap the query; the whole subtree was skipped.
    Prune,
    /// Overlapping leaf holding a shape other than the excluded one.
    LeafTest,
}

/// One entry of the ordered traversal log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraversalStep {
    /// Node-array position of the node this step concerns.
    pub node_index: usize,
    /// Action taken at the node.
    pub action: TraversalAction,
    /// Shape whose query produced the step (the excluded index), if any.
    pub query_shape: Option<usize>,
    /// Leaf shape reached by a [`TraversalAction::LeafTest`].
    pub partner_shape: Option<usize>,
}

/// Hook points of the explicit-stack single-shape traversal.
///
/// The traversal is generic over the observer; the unit type `()` ignores
/// every event and compiles away, so the plain query pays nothing.
pub trait TraversalObserver {
    /// Internal node overlapped the query and its children were pushed.
    fn visit(&mut self, _node: usize) {}
    /// Node bounds missed the query; its subtree is skipped.
    fn prune(&mut self, _node: usize) {}
    /// Overlapping leaf with a non-excluded shape was reported.
    fn leaf_test(&mut self, _node: usize, _shape: usize) {}
}

impl TraversalObserver for () {}

/// Observer that appends one [`TraversalStep`] per event to a caller-owned log.
#[derive(Debug)]
pub struct StepRecorder<'a> {
    query_shape: Option<usize>,
    steps: &'a mut Vec<TraversalStep>,
}

impl<'a> StepRecorder<'a> {
    /// Records into `steps`, tagging each step with `query_shape`.
    pub fn new(query_shape: Option<usize>, steps: &'a mut Vec<TraversalStep>) -> Self {
        Self { query_shape, steps }
    }

    fn push(&mut self, node_index: usize, action: TraversalAction, partner_shape: Option<usize>) {
        self.steps.push(TraversalStep {
            node_index,
            action,
            query_shape: self.query_shape,
            partner_shape,
        });
    }
}

impl TraversalObserver for StepRecorder<'_> {
    fn visit(&mut self, node: usize) {
        self.push(node, TraversalAction::Visit, None);
    }

    fn prune(&mut self, node: usize) {
        self.push(node, TraversalAction::Prune, None);
    }

    fn leaf_test(&mut self, node: usize, shape: usize) {
        self.push(node, TraversalAction::LeafTest, Some(shape));
    }
}

/// Result of an instrumented single-shape query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueryTrace {
    /// Candidate shape indices, identical to the plain query's output.
    pub candidates: Vec<usize>,
    /// Ordered traversal log.
    pub steps: Vec<TraversalStep>,
}

impl QueryTrace {
    /// Empties both buffers, keeping their allocations.
    pub fn clear(&mut self) {
        self.candidates.clear();
        self.steps.clear();
    }

    /// Number of subtrees skipped by the overlap test.
    pub fn prune_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.action == TraversalAction::Prune)
            .count()
    }
}
