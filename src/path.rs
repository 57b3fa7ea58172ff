use derive_more::Display;

use crate::float_cost::Distance;
use crate::model::Coordinate;
use crate::model::NodeId;
use crate::model::RoadGraph;

const MAX_ELEMENTS_DISPLAYED: usize = 20;

/// A copy of a graph node as it was when the route was planned.
#[derive(Copy, Clone, Debug, Display, PartialEq)]
#[display("{id}@{coordinate}")]
pub struct RouteNode {
    pub id: NodeId,
    pub coordinate: Coordinate,
}

impl RouteNode {
    pub fn from_graph<G: RoadGraph>(graph: &G, id: NodeId) -> Self {
        Self {
            id,
            coordinate: graph.coordinate(id),
        }
    }
}

/// A planned route.
///
/// `raw_distance` is in native graph units, `distance` in metres.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutePath {
    pub nodes: Vec<RouteNode>,
    pub raw_distance: Distance,
    pub distance: f32,
}

impl RoutePath {
    /// Starts a route that is built backwards, from its last node.
    pub(crate) fn new_from_end(end: RouteNode) -> Self {
        Self {
            nodes: vec![end],
            raw_distance: Distance::new(0.0f32),
            distance: 0.0f32,
        }
    }

    /// Extends a backwards route with the node before the current first one.
    pub(crate) fn prepend_reversed(&mut self, previous: RouteNode, step: Distance) {
        self.nodes.push(previous);
        self.raw_distance += step;
    }

    /// Puts the nodes back in travel order and converts the distance to metres.
    pub(crate) fn finish(&mut self, metric_scale: f32) {
        self.nodes.reverse();
        self.distance = self.raw_distance.scaled(metric_scale);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn start(&self) -> Option<&RouteNode> {
        self.nodes.first()
    }

    pub fn end(&self) -> Option<&RouteNode> {
        self.nodes.last()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    /// Sums the length of every hop again, in native units.
    pub fn recompute_raw_distance<G: RoadGraph>(&self, graph: &G) -> Distance {
        let mut total = Distance::new(0.0f32);
        for hop in self.nodes.windows(2) {
            total += graph.distance(hop[0].id, hop[1].id);
        }
        total
    }

    /// Whether every hop follows an edge of `graph`.
    pub fn follows<G: RoadGraph>(&self, graph: &G) -> bool {
        self.nodes
            .windows(2)
            .all(|hop| graph.neighbours(hop[0].id).contains(&hop[1].id))
    }
}

impl std::fmt::Display for RoutePath {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => {
                write!(
                    f,
                    "Path({:.1}m, {}:{:?}:{})",
                    self.distance,
                    start,
                    self.nodes
                        .iter()
                        .take(MAX_ELEMENTS_DISPLAYED)
                        .map(|n| n.id)
                        .collect::<Vec<_>>(),
                    end
                )
            }
            _ => write!(f, "Path()"),
        }
    }
}
