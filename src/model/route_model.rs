//! In-memory road network.
//!
//! Roads are polylines over shared nodes. Consecutive nodes of a drivable road
//! are connected both ways, and the cost of moving between them is their
//! straight-line distance, which keeps the straight-line heuristic consistent.
//! Footways are kept for completeness but cannot be driven.
use derive_more::Display;
use log::info;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use smallvec::SmallVec;
use thiserror::Error;
use thousands::Separable;

use crate::model::Coordinate;
use crate::model::NodeId;
use crate::model::RoadGraph;
use crate::path::RoutePath;

/// Most intersections join a handful of segments.
type Adjacency = SmallVec<[NodeId; 4]>;
type EndpointTree = RTree<GeomWithData<[f32; 2], NodeId>>;

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
pub enum RoadType {
    #[display("motorway")]
    Motorway,
    #[display("trunk")]
    Trunk,
    #[display("primary")]
    Primary,
    #[display("secondary")]
    Secondary,
    #[display("tertiary")]
    Tertiary,
    #[display("residential")]
    Residential,
    #[display("service")]
    Service,
    #[display("unclassified")]
    Unclassified,
    #[display("footway")]
    Footway,
}

impl RoadType {
    pub fn drivable(&self) -> bool {
        *self != RoadType::Footway
    }
}

#[derive(Clone, Debug, Display, PartialEq)]
#[display("Road({kind}, {} nodes)", nodes.len())]
pub struct Road {
    pub kind: RoadType,
    pub nodes: Vec<NodeId>,
}

#[derive(Debug, Error, PartialEq)]
pub enum RouteModelError {
    #[error("Unknown node {0} referenced by a road")]
    UnknownNode(NodeId),
    #[error("Road with {0} nodes. Roads need at least 2 nodes")]
    RoadTooShort(usize),
    #[error("Non-finite coordinate {0}")]
    NonFiniteCoordinate(Coordinate),
    #[error("Invalid metric scale {0}. It must be finite and positive")]
    InvalidMetricScale(f32),
}

/// Collects nodes and roads before indexing them into a [`RouteModel`].
#[derive(Clone, Debug)]
pub struct RouteModelBuilder {
    coordinates: Vec<Coordinate>,
    roads: Vec<Road>,
    metric_scale: f32,
}

impl RouteModelBuilder {
    pub fn new() -> Self {
        Self {
            coordinates: vec![],
            roads: vec![],
            metric_scale: 1.0f32,
        }
    }

    pub fn add_node(&mut self, c: Coordinate) -> Result<NodeId, RouteModelError> {
        if !c.is_finite() {
            return Err(RouteModelError::NonFiniteCoordinate(c));
        }
        let id = NodeId::new(self.coordinates.len() as u32);
        self.coordinates.push(c);
        Ok(id)
    }

    pub fn add_road(&mut self, kind: RoadType, nodes: &[NodeId]) -> Result<(), RouteModelError> {
        if nodes.len() < 2 {
            return Err(RouteModelError::RoadTooShort(nodes.len()));
        }
        if let Some(unknown) = nodes.iter().find(|n| n.index() >= self.coordinates.len()) {
            return Err(RouteModelError::UnknownNode(*unknown));
        }
        self.roads.push(Road {
            kind,
            nodes: nodes.to_vec(),
        });
        Ok(())
    }

    /// Sets how many metres a native unit spans.
    pub fn metric_scale(&mut self, scale: f32) -> &mut Self {
        self.metric_scale = scale;
        self
    }

    pub fn build(self) -> Result<RouteModel, RouteModelError> {
        if !self.metric_scale.is_finite() || self.metric_scale <= 0.0f32 {
            return Err(RouteModelError::InvalidMetricScale(self.metric_scale));
        }

        let len = self.coordinates.len();
        let mut adjacency = vec![Adjacency::new(); len];
        let mut drivable = vec![false; len];
        let mut on_footway = vec![false; len];

        let mut num_edges = 0usize;
        for road in &self.roads {
            if !road.kind.drivable() {
                for n in &road.nodes {
                    on_footway[n.index()] = true;
                }
                continue;
            }

            for n in &road.nodes {
                drivable[n.index()] = true;
            }
            for segment in road.nodes.windows(2) {
                let (a, b) = (segment[0], segment[1]);
                if a == b || adjacency[a.index()].contains(&b) {
                    continue;
                }
                adjacency[a.index()].push(b);
                adjacency[b.index()].push(a);
                num_edges += 1;
            }
        }

        // Nodes only reachable on foot can't be where a route starts or ends.
        let endpoints = EndpointTree::bulk_load(
            self.coordinates
                .iter()
                .enumerate()
                .filter(|(i, _)| drivable[*i] || !on_footway[*i])
                .map(|(i, c)| GeomWithData::new(c.as_point(), NodeId::new(i as u32)))
                .collect(),
        );
        info!(
            "Indexed road network: {} nodes ({} endpoints), {} roads, {} edges",
            len.separate_with_commas(),
            endpoints.size().separate_with_commas(),
            self.roads.len().separate_with_commas(),
            num_edges.separate_with_commas(),
        );

        Ok(RouteModel {
            coordinates: self.coordinates,
            roads: self.roads,
            adjacency,
            endpoints,
            num_edges,
            metric_scale: self.metric_scale,
            path: None,
        })
    }
}

impl Default for RouteModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct RouteModel {
    coordinates: Vec<Coordinate>,
    roads: Vec<Road>,
    adjacency: Vec<Adjacency>,
    endpoints: EndpointTree,
    num_edges: usize,
    metric_scale: f32,

    /// The last route planned over this model.
    path: Option<RoutePath>,
}

impl RouteModel {
    pub fn builder() -> RouteModelBuilder {
        RouteModelBuilder::new()
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn path(&self) -> Option<&RoutePath> {
        self.path.as_ref()
    }

    /// Records (or clears) the planned route.
    pub fn set_path(&mut self, path: Option<RoutePath>) {
        self.path = path;
    }
}

impl RoadGraph for RouteModel {
    fn len(&self) -> usize {
        self.coordinates.len()
    }

    fn closest_node(&self, c: &Coordinate) -> Option<NodeId> {
        self.endpoints.nearest_neighbor(&c.as_point()).map(|e| e.data)
    }

    #[inline(always)]
    fn coordinate(&self, n: NodeId) -> Coordinate {
        self.coordinates[n.index()]
    }

    #[inline(always)]
    fn neighbours(&self, n: NodeId) -> &[NodeId] {
        &self.adjacency[n.index()]
    }

    fn metric_scale(&self) -> f32 {
        self.metric_scale
    }
}

impl std::fmt::Display for RouteModel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "RouteModel({} nodes; {} roads; {} edges; {}m/unit)",
            self.coordinates.len().separate_with_commas(),
            self.roads.len().separate_with_commas(),
            self.num_edges.separate_with_commas(),
            self.metric_scale,
        )
    }
}

impl std::fmt::Debug for RouteModel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "RouteModel({}; {}; {})",
            self.coordinates.len().separate_with_commas(),
            self.roads.len().separate_with_commas(),
            self.num_edges.separate_with_commas(),
        )
    }
}
