//! Road networks the planner can search.
//!
//! The planner only talks to a [`RoadGraph`], which hands out node lookups by
//! coordinate, neighbour discovery, pairwise distances and the factor that
//! turns native graph units into metres. [`RouteModel`] is the in-memory
//! implementation of it.

use derive_more::Display;

use crate::float_cost::Distance;

pub mod generate;
pub mod route_model;

pub use route_model::RoadType;
pub use route_model::RouteModel;
pub use route_model::RouteModelBuilder;
pub use route_model::RouteModelError;

/// A dense index to a node of a graph.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
#[display("#{_0}")]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline(always)]
    pub fn new(index: u32) -> Self {
        Self(index)
    }
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A point in the normalized coordinate space of a graph.
#[derive(Copy, Clone, Debug, Default, Display, PartialEq)]
#[display("({x:.4},{y:.4})")]
pub struct Coordinate {
    pub x: f32,
    pub y: f32,
}

impl Coordinate {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Lifts a coordinate given in percent (0-100) of the graph extent.
    ///
    /// ```
    /// use route_planner::model::Coordinate;
    /// assert_eq!(Coordinate::from_percent(50.0, 10.0), Coordinate::new(0.5, 0.1));
    /// ```
    pub fn from_percent(x: f32, y: f32) -> Self {
        Self {
            x: x / 100.0,
            y: y / 100.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Straight-line distance.
    ///
    /// ```
    /// use route_planner::model::Coordinate;
    /// let a = Coordinate::new(0.0, 0.0);
    /// let b = Coordinate::new(3.0, 4.0);
    /// assert_eq!(a.distance(&b), 5.0);
    /// ```
    #[inline(always)]
    pub fn distance(&self, other: &Coordinate) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub(crate) fn as_point(&self) -> [f32; 2] {
        [self.x, self.y]
    }
}

/// The graph a search runs over.
///
/// Graphs are read-only for the planner. All search bookkeeping (costs,
/// parents, visited marks) lives in the planner, so a single graph can back
/// many searches, even concurrent ones.
pub trait RoadGraph: std::fmt::Debug {
    /// Number of nodes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The node nearest to `c` that can be used as a route endpoint.
    ///
    /// Only `None` when the graph has no eligible node.
    fn closest_node(&self, c: &Coordinate) -> Option<NodeId>;

    fn coordinate(&self, n: NodeId) -> Coordinate;

    /// Symmetric distance between two nodes in native graph units.
    fn distance(&self, a: NodeId, b: NodeId) -> Distance {
        Distance::new(self.coordinate(a).distance(&self.coordinate(b)))
    }

    /// Nodes directly reachable from `n`.
    fn neighbours(&self, n: NodeId) -> &[NodeId];

    /// Metres per native graph unit.
    fn metric_scale(&self) -> f32;
}
