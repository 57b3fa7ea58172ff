use nonmax::NonMaxU32;
use rustc_hash::FxHashMap;

use crate::float_cost::Distance;
use crate::model::NodeId;
use crate::model::RoadGraph;
use crate::path::RouteNode;
use crate::path::RoutePath;

/// A reference to a `SearchNode` in a `SearchTable`.
///
/// `Option<SearchNodeIndex>` is as wide as the index itself, which keeps
/// parent links cheap.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SearchNodeIndex(NonMaxU32);

impl SearchNodeIndex {
    #[inline(always)]
    fn new(index: usize) -> Self {
        // Tables hold at most one entry per graph node, and those are `u32`s.
        debug_assert!(index < u32::MAX as usize);
        Self(NonMaxU32::new(index as u32).unwrap())
    }

    #[inline(always)]
    pub fn as_usize(&self) -> usize {
        self.0.get() as usize
    }
}

/// Search bookkeeping for a graph node.
///
/// Graph nodes are never mutated, all of this lives here instead and is
/// discarded with the search.
#[derive(Clone, Debug)]
pub struct SearchNode {
    pub(crate) node: NodeId,
    pub(crate) parent: Option<SearchNodeIndex>,
    /// Best known distance from the start.
    pub(crate) g: Distance,
    /// Estimated distance to the goal.
    pub(crate) h: Distance,
    /// Position of this node in the open list, while it is there.
    pub(crate) heap_index: usize,
    /// Expanded already.
    pub(crate) closed: bool,
}

impl SearchNode {
    pub fn new(
        heap_index: usize,
        node: NodeId,
        parent: Option<SearchNodeIndex>,
        g: Distance,
        h: Distance,
    ) -> Self {
        Self {
            node,
            parent,
            g,
            h,
            heap_index,
            closed: false,
        }
    }

    /// Gives this node a better path through a new parent.
    pub fn reach(&mut self, new_parent: SearchNodeIndex, g: Distance) {
        debug_assert!(g < self.g);
        debug_assert!(!self.closed);
        self.parent = Some(new_parent);
        self.g = g;
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
    pub fn parent(&self) -> Option<SearchNodeIndex> {
        self.parent
    }
    pub fn g(&self) -> Distance {
        self.g
    }
    pub fn h(&self) -> Distance {
        self.h
    }
    pub fn f(&self) -> Distance {
        self.g + self.h
    }
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Every node a search has discovered.
///
/// Parents are indices into the same table, so the nodes naturally form a
/// search tree rooted at the start.
#[derive(Default)]
pub(crate) struct SearchTable {
    nodes: Vec<SearchNode>,
    /// Finds existing search nodes from their graph node. Being here is what
    /// makes a node visited.
    node_map: FxHashMap<NodeId, SearchNodeIndex>,
}

impl SearchTable {
    #[must_use]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            node_map: FxHashMap::default(),
        }
    }

    pub(crate) fn push(&mut self, node: SearchNode) -> SearchNodeIndex {
        debug_assert!(!self.node_map.contains_key(&node.node));

        let index = SearchNodeIndex::new(self.nodes.len());
        self.node_map.insert(node.node, index);
        self.nodes.push(node);
        index
    }

    #[inline(always)]
    pub(crate) fn find(&self, node: NodeId) -> Option<SearchNodeIndex> {
        self.node_map.get(&node).copied()
    }

    #[inline(always)]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn capacity(&self) -> (usize, usize) {
        (self.nodes.capacity(), self.node_map.capacity())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &SearchNode> {
        self.nodes.iter()
    }

    /// Walks parent links back from `end`.
    ///
    /// Each hop is measured again on the graph, so the distance is the real
    /// length of the returned route.
    #[must_use]
    pub(crate) fn path<G: RoadGraph>(&self, graph: &G, end: SearchNodeIndex) -> RoutePath {
        #[cfg(feature = "coz_profile")]
        coz::scope!("PathReconstruction");

        let mut node_index = end;
        let mut path = RoutePath::new_from_end(RouteNode::from_graph(graph, self[end].node));

        while let Some(parent_index) = self[node_index].parent {
            debug_assert!(node_index != parent_index);
            let node = self[node_index].node;
            let parent = self[parent_index].node;

            path.prepend_reversed(
                RouteNode::from_graph(graph, parent),
                graph.distance(node, parent),
            );
            node_index = parent_index;
        }

        path.finish(graph.metric_scale());
        path
    }
}

impl std::ops::Index<SearchNodeIndex> for SearchTable {
    type Output = SearchNode;

    #[inline(always)]
    fn index(&self, index: SearchNodeIndex) -> &Self::Output {
        &self.nodes[index.as_usize()]
    }
}

impl std::ops::IndexMut<SearchNodeIndex> for SearchTable {
    #[inline(always)]
    fn index_mut(&mut self, index: SearchNodeIndex) -> &mut SearchNode {
        &mut self.nodes[index.as_usize()]
    }
}

impl std::fmt::Debug for SearchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "SearchTable{{({} nodes)}}", self.len())
    }
}
