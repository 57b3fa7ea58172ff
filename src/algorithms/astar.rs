use derive_more::Display;
use log::debug;
use log::trace;
use log::warn;
use num_traits::Zero;
use thiserror::Error;

use crate::config::ExpansionPolicy;
use crate::config::PlannerConfig;
use crate::data_structures::open_list::AStarRank;
use crate::data_structures::open_list::OpenEntry;
use crate::data_structures::open_list::OpenList;
use crate::float_cost::Distance;
use crate::model::Coordinate;
use crate::model::NodeId;
use crate::model::RoadGraph;
use crate::path::RoutePath;
use crate::search::SearchNode;
use crate::search::SearchNodeIndex;
use crate::search::SearchTable;

#[derive(Debug, Error, PartialEq)]
pub enum PlannerError {
    #[error("The road graph has no node that can start or end a route")]
    EmptyGraph,
    #[error("Non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate { x: f32, y: f32 },
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum SearchStatus {
    /// Endpoints resolved, no search ran yet.
    #[display("ready")]
    Ready,
    #[display("running")]
    Running,
    /// The goal was reached.
    #[display("done")]
    Done,
    /// Every reachable node was expanded without reaching the goal.
    #[display("exhausted")]
    Exhausted,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchOutcome {
    Found(RoutePath),
    /// There's no route between the endpoints.
    Exhausted,
}

impl SearchOutcome {
    pub fn path(&self) -> Option<&RoutePath> {
        match self {
            SearchOutcome::Found(path) => Some(path),
            SearchOutcome::Exhausted => None,
        }
    }
}

/// A* between the graph nodes nearest to two coordinates.
///
/// The graph is only borrowed. Costs, parents and visited marks live in a
/// per-search table owned by the planner, so several planners can share a
/// graph and re-running a search needs no cleanup.
pub struct RoutePlanner<'g, G>
where
    G: RoadGraph,
{
    graph: &'g G,
    config: PlannerConfig,

    start: NodeId,
    end: NodeId,

    /// All the Search Nodes. Parent links make it a Search Tree rooted at
    /// `start`.
    search_table: SearchTable,

    /// The candidates, ranked by `(f, h)`.
    ///
    /// ```pseudocode
    /// for (i, e) in self.open.enumerate():
    ///   assert_eq(self.search_table[e.node].heap_index, i)
    /// ```
    open: OpenList<Distance>,

    status: SearchStatus,
    expanded: usize,
    path: Option<RoutePath>,
}

impl<'g, G> RoutePlanner<'g, G>
where
    G: RoadGraph,
{
    /// Resolves both endpoints from percent coordinates (0-100 of the graph
    /// extent).
    pub fn new(
        graph: &'g G,
        start: (f32, f32),
        end: (f32, f32),
        config: PlannerConfig,
    ) -> Result<Self, PlannerError> {
        Self::from_normalized(
            graph,
            Coordinate::from_percent(start.0, start.1),
            Coordinate::from_percent(end.0, end.1),
            config,
        )
    }

    /// Resolves both endpoints from coordinates already in graph units.
    pub fn from_normalized(
        graph: &'g G,
        start: Coordinate,
        end: Coordinate,
        config: PlannerConfig,
    ) -> Result<Self, PlannerError> {
        let start_node = Self::resolve(graph, &start)?;
        let end_node = Self::resolve(graph, &end)?;
        debug!("Resolved endpoints {start} -> {start_node}, {end} -> {end_node}");
        if start_node == end_node {
            warn!("Both endpoints resolve to {start_node}");
        }

        Ok(Self {
            graph,
            config,
            start: start_node,
            end: end_node,
            search_table: SearchTable::with_capacity(config.open_capacity),
            open: OpenList::with_capacity(config.open_capacity),
            status: SearchStatus::Ready,
            expanded: 0,
            path: None,
        })
    }

    fn resolve(graph: &G, c: &Coordinate) -> Result<NodeId, PlannerError> {
        if !c.is_finite() {
            return Err(PlannerError::NonFiniteCoordinate { x: c.x, y: c.y });
        }
        graph.closest_node(c).ok_or(PlannerError::EmptyGraph)
    }

    /// Runs A* to completion.
    ///
    /// Stops as soon as the goal is selected for expansion. Running it again
    /// starts from scratch and gives the same result.
    pub fn run_search(&mut self) -> SearchOutcome {
        #[cfg(feature = "coz_profile")]
        coz::scope!("RunSearch");

        self.reset();
        self.status = SearchStatus::Running;

        let h = self.heuristic(self.start);
        self.push_new(self.start, None, Distance::zero(), h);

        while let Some(current) = self.next_node() {
            if self.search_table[current].node == self.end {
                let path = self.construct_final_path(current);
                debug!(
                    "Found {path} after expanding {} nodes ({})",
                    self.expanded, self.config.policy
                );
                self.status = SearchStatus::Done;
                self.path = Some(path.clone());
                return SearchOutcome::Found(path);
            }

            self.add_neighbours(current);
        }

        debug!(
            "No route from {} to {} after expanding {} nodes",
            self.start, self.end, self.expanded
        );
        self.status = SearchStatus::Exhausted;
        SearchOutcome::Exhausted
    }

    fn reset(&mut self) {
        if self.search_table.len() == 0 && self.open.is_empty() {
            return;
        }
        self.search_table = SearchTable::with_capacity(self.config.open_capacity);
        self.open = OpenList::with_capacity(self.config.open_capacity);
        self.expanded = 0;
        self.path = None;
    }

    /// Straight-line distance to the goal.
    ///
    /// Never overestimates since moving along a road costs at least the
    /// straight-line distance between its ends.
    #[inline(always)]
    #[must_use]
    pub fn heuristic(&self, node: NodeId) -> Distance {
        self.graph.distance(node, self.end)
    }

    /// Removes the best candidate from the open list and closes it.
    #[inline(always)]
    fn next_node(&mut self) -> Option<SearchNodeIndex> {
        let current = self.open.pop(&mut self.search_table)?;
        debug_assert!(!self.search_table[current].closed);
        self.search_table[current].closed = true;
        Some(current)
    }

    /// Discovers the neighbours of `current` and registers them as
    /// candidates.
    fn add_neighbours(&mut self, current: SearchNodeIndex) {
        #[cfg(feature = "coz_profile")]
        coz::scope!("NodeExpansion");

        let graph = self.graph;
        let node = self.search_table[current].node;
        let g = self.search_table[current].g;
        self.expanded += 1;
        trace!("Expanding {node} (g={g}, h={})", self.search_table[current].h);

        for &neighbour in graph.neighbours(node) {
            let new_g = g + graph.distance(node, neighbour);

            // Have we seen this node?
            let Some(neighbour_index) = self.search_table.find(neighbour) else {
                // No, let's create a search node for it.
                let h = self.heuristic(neighbour);
                self.push_new(neighbour, Some(current), new_g, h);
                continue;
            };

            let known = &mut self.search_table[neighbour_index];
            if known.closed {
                // Already expanded, and a consistent heuristic means it was
                // through its best path.
                continue;
            }
            match self.config.policy {
                ExpansionPolicy::FirstDiscovery => continue,
                ExpansionPolicy::Relaxation => {
                    if new_g < known.g {
                        trace!("Found better path to {neighbour} ({} > {new_g})", known.g);
                        known.reach(current, new_g);
                        let heap_index = known.heap_index;
                        self.open
                            .improve(heap_index, new_g, &mut self.search_table);
                    }
                }
            }
        }
    }

    fn push_new(
        &mut self,
        node: NodeId,
        parent: Option<SearchNodeIndex>,
        g: Distance,
        h: Distance,
    ) {
        let node_index = self
            .search_table
            .push(SearchNode::new(self.open.len(), node, parent, g, h));
        self.open.push(
            OpenEntry {
                rank: AStarRank::new(g, h),
                node: node_index,
            },
            &mut self.search_table,
        );
    }

    fn construct_final_path(&self, goal: SearchNodeIndex) -> RoutePath {
        self.search_table.path(self.graph, goal)
    }

    pub fn start(&self) -> NodeId {
        self.start
    }
    pub fn end(&self) -> NodeId {
        self.end
    }
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }
    pub fn status(&self) -> SearchStatus {
        self.status
    }
    /// Nodes expanded by the last search.
    pub fn expanded(&self) -> usize {
        self.expanded
    }
    /// Nodes discovered by the last search.
    pub fn discovered(&self) -> usize {
        self.search_table.len()
    }
    pub fn search_nodes(&self) -> impl Iterator<Item = &SearchNode> {
        self.search_table.iter()
    }

    /// The route found by the last search.
    pub fn path(&self) -> Option<&RoutePath> {
        self.path.as_ref()
    }
    /// Length in metres of the route found by the last search.
    pub fn distance(&self) -> Option<f32> {
        self.path.as_ref().map(|p| p.distance)
    }

    pub fn write_memory_stats<W: std::io::Write>(&self, mut out: W) -> std::io::Result<()> {
        use size::Size;
        use std::mem::size_of;
        use thousands::Separable;

        writeln!(out, "RoutePlanner Stats:")?;
        let s = size_of::<SearchNode>();
        let l = self.search_table.len();
        writeln!(
            out,
            "  - |Nodes|:   {} ({})",
            l.separate_with_commas(),
            Size::from_bytes(l * s)
        )?;

        let s = size_of::<OpenEntry<Distance>>();
        let l = self.open.len();
        let c = self.open.capacity();
        writeln!(
            out,
            "  - |Open|:   {} ({})",
            l.separate_with_commas(),
            Size::from_bytes(l * s)
        )?;
        writeln!(
            out,
            "  - |Open|*:  {} ({})",
            c.separate_with_commas(),
            Size::from_bytes(c * s)
        )?;

        let s = size_of::<(NodeId, SearchNodeIndex)>();
        let (_, c) = self.search_table.capacity();
        writeln!(
            out,
            "  - |Index|*: {} ({})",
            c.separate_with_commas(),
            Size::from_bytes(c * s)
        )?;

        writeln!(
            out,
            "  - Expanded nodes: {}",
            self.expanded.separate_with_commas()
        )?;

        Ok(())
    }
    pub fn print_memory_stats(&self) -> std::io::Result<()> {
        self.write_memory_stats(std::io::stdout().lock())
    }
}

impl<G> std::fmt::Debug for RoutePlanner<'_, G>
where
    G: RoadGraph,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("RoutePlanner")
            .field("graph", self.graph)
            .field("policy", &self.config.policy)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("status", &self.status)
            .field("search_table", &self.search_table)
            .field("open", &self.open.len())
            .field("expanded", &self.expanded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    use ordered_float::OrderedFloat;
    use rand::Rng;
    use rand_chacha::ChaCha8Rng;
    use rand_chacha::rand_core::SeedableRng;

    use super::*;
    use crate::model::RoadType;
    use crate::model::RouteModel;
    use crate::model::generate::GridNetworkConfig;
    use crate::model::generate::grid;

    const TOLERANCE: f32 = 1e-4;

    /// A(0,0) - B(1,0) - C(2,0), and D(5,5) on its own.
    fn line_with_island() -> (RouteModel, [NodeId; 4]) {
        let mut b = RouteModel::builder();
        let a = b.add_node(Coordinate::new(0.0, 0.0)).unwrap();
        let bb = b.add_node(Coordinate::new(1.0, 0.0)).unwrap();
        let c = b.add_node(Coordinate::new(2.0, 0.0)).unwrap();
        let d = b.add_node(Coordinate::new(5.0, 5.0)).unwrap();
        b.add_road(RoadType::Residential, &[a, bb]).unwrap();
        b.add_road(RoadType::Residential, &[bb, c]).unwrap();
        (b.build().unwrap(), [a, bb, c, d])
    }

    /// Reaching `x` through `p1` is discovered first, but through `p2` is
    /// shorter.
    ///
    /// ```text
    ///     p2        p1
    ///  s      x  g
    /// ```
    fn late_shortcut() -> (RouteModel, [NodeId; 5]) {
        let mut b = RouteModel::builder();
        let s = b.add_node(Coordinate::new(0.0, 0.0)).unwrap();
        let p1 = b.add_node(Coordinate::new(3.5, 0.2)).unwrap();
        let p2 = b.add_node(Coordinate::new(1.5, 0.35)).unwrap();
        let x = b.add_node(Coordinate::new(3.0, 0.0)).unwrap();
        let g = b.add_node(Coordinate::new(4.0, 0.0)).unwrap();
        for road in [[s, p1], [p1, x], [s, p2], [p2, x], [x, g]] {
            b.add_road(RoadType::Secondary, &road).unwrap();
        }
        (b.build().unwrap(), [s, p1, p2, x, g])
    }

    /// Exhaustive shortest distances from `start`, in native units.
    fn dijkstra<G: RoadGraph>(graph: &G, start: NodeId) -> Vec<Option<f32>> {
        let mut best: Vec<Option<f32>> = vec![None; graph.len()];
        let mut frontier = BinaryHeap::new();
        frontier.push(Reverse((OrderedFloat(0.0f32), start)));

        while let Some(Reverse((OrderedFloat(d), n))) = frontier.pop() {
            if best[n.index()].is_some() {
                continue;
            }
            best[n.index()] = Some(d);
            for &m in graph.neighbours(n) {
                if best[m.index()].is_none() {
                    let step = graph.distance(n, m).get();
                    frontier.push(Reverse((OrderedFloat(d + step), m)));
                }
            }
        }
        best
    }

    fn plan(
        model: &RouteModel,
        start: (f32, f32),
        end: (f32, f32),
        policy: ExpansionPolicy,
    ) -> (RoutePlanner<'_, RouteModel>, SearchOutcome) {
        let mut planner =
            RoutePlanner::new(model, start, end, PlannerConfig::with_policy(policy)).unwrap();
        let outcome = planner.run_search();
        (planner, outcome)
    }

    #[test]
    fn straight_line() {
        let (model, [a, b, c, _]) = line_with_island();
        let (planner, outcome) = plan(&model, (0.0, 0.0), (200.0, 0.0), Default::default());

        assert_eq!(planner.start(), a);
        assert_eq!(planner.end(), c);
        assert_eq!(planner.status(), SearchStatus::Done);

        let path = outcome.path().unwrap();
        assert_eq!(path.node_ids().collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(path.distance, 2.0);
        assert_eq!(planner.distance(), Some(2.0));
        assert_eq!(planner.path(), Some(path));
    }

    #[test]
    fn percent_coordinates_snap_to_nearest_nodes() {
        let (model, [a, _, c, _]) = line_with_island();
        let (planner, _) = plan(&model, (-30.0, 40.0), (260.0, -10.0), Default::default());

        assert_eq!(planner.start(), a);
        assert_eq!(planner.end(), c);
    }

    #[test]
    fn unreachable_goal() {
        let (model, [a, _, _, d]) = line_with_island();

        for policy in [ExpansionPolicy::Relaxation, ExpansionPolicy::FirstDiscovery] {
            let (planner, outcome) = plan(&model, (0.0, 0.0), (500.0, 500.0), policy);

            assert_eq!(planner.start(), a);
            assert_eq!(planner.end(), d);
            assert_eq!(outcome, SearchOutcome::Exhausted);
            assert_eq!(planner.status(), SearchStatus::Exhausted);
            assert_eq!(planner.path(), None);
            assert_eq!(planner.distance(), None);
            // A, B and C were all expanded.
            assert_eq!(planner.expanded(), 3);
        }
    }

    #[test]
    fn isolated_start() {
        let (model, [_, _, c, d]) = line_with_island();
        let (planner, outcome) = plan(&model, (500.0, 500.0), (200.0, 0.0), Default::default());

        assert_eq!(planner.start(), d);
        assert_eq!(planner.end(), c);
        assert_eq!(outcome, SearchOutcome::Exhausted);
        assert_eq!(planner.expanded(), 1);
    }

    #[test]
    fn same_endpoints() {
        let (model, [_, b, _, _]) = line_with_island();
        let (planner, outcome) = plan(&model, (90.0, 5.0), (110.0, -5.0), Default::default());

        let path = outcome.path().unwrap();
        assert_eq!(path.node_ids().collect::<Vec<_>>(), vec![b]);
        assert_eq!(path.distance, 0.0);
        assert_eq!(planner.expanded(), 0);
    }

    #[test]
    fn empty_graph() {
        let model = RouteModel::builder().build().unwrap();
        let planner = RoutePlanner::new(&model, (0.0, 0.0), (1.0, 1.0), Default::default());
        assert_eq!(planner.err(), Some(PlannerError::EmptyGraph));
    }

    #[test]
    fn non_finite_coordinates() {
        let (model, _) = line_with_island();
        let planner = RoutePlanner::new(
            &model,
            (0.0, 0.0),
            (f32::INFINITY, 1.0),
            Default::default(),
        );
        assert!(matches!(
            planner.err(),
            Some(PlannerError::NonFiniteCoordinate { .. })
        ));
    }

    #[test]
    fn relaxation_takes_the_late_shortcut() {
        let (model, [s, _, p2, x, g]) = late_shortcut();
        let (planner, outcome) = plan(&model, (0.0, 0.0), (400.0, 0.0), ExpansionPolicy::Relaxation);

        let path = outcome.path().unwrap();
        assert_eq!(path.node_ids().collect::<Vec<_>>(), vec![s, p2, x, g]);
        assert!((path.distance - 4.080_584).abs() < TOLERANCE, "{path}");

        let optimum = dijkstra(&model, s)[g.index()].unwrap();
        assert!((path.distance - optimum).abs() < TOLERANCE);
        // Every discovered node is kept exactly once.
        assert_eq!(planner.discovered(), 5);
    }

    #[test]
    fn first_discovery_keeps_the_first_parent() {
        let (model, [s, p1, _, x, g]) = late_shortcut();
        let (planner, outcome) = plan(
            &model,
            (0.0, 0.0),
            (400.0, 0.0),
            ExpansionPolicy::FirstDiscovery,
        );

        let path = outcome.path().unwrap();
        assert_eq!(path.node_ids().collect::<Vec<_>>(), vec![s, p1, x, g]);
        assert!((path.distance - 5.044_226).abs() < TOLERANCE, "{path}");
        assert_eq!(planner.discovered(), 5);
    }

    #[test]
    fn reruns_are_idempotent() {
        let (model, _) = late_shortcut();
        let mut planner =
            RoutePlanner::new(&model, (0.0, 0.0), (400.0, 0.0), Default::default()).unwrap();

        let first = planner.run_search();
        let expanded = planner.expanded();
        let second = planner.run_search();
        assert_eq!(first, second);
        assert_eq!(planner.expanded(), expanded);
    }

    #[test]
    fn planners_share_a_graph() {
        let model = grid(
            &mut ChaCha8Rng::seed_from_u64(3),
            &GridNetworkConfig::default(),
        )
        .unwrap();

        let mut one = RoutePlanner::new(&model, (5.0, 5.0), (95.0, 90.0), Default::default())
            .unwrap();
        let mut other = RoutePlanner::new(&model, (5.0, 5.0), (95.0, 90.0), Default::default())
            .unwrap();
        let mut unrelated =
            RoutePlanner::new(&model, (50.0, 0.0), (0.0, 50.0), Default::default()).unwrap();

        let a = one.run_search();
        let _ = unrelated.run_search();
        let b = other.run_search();
        assert_eq!(a, b);
    }

    #[test]
    fn search_tree_invariants() {
        let model = grid(
            &mut ChaCha8Rng::seed_from_u64(11),
            &GridNetworkConfig::default(),
        )
        .unwrap();
        let (planner, _) = plan(&model, (0.0, 0.0), (100.0, 100.0), Default::default());

        let nodes: Vec<&SearchNode> = planner.search_nodes().collect();
        let mut ids: Vec<NodeId> = nodes.iter().map(|n| n.node()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), nodes.len(), "A node was discovered twice");

        // Only the start has no parent, and following parents always ends there.
        assert_eq!(nodes.iter().filter(|n| n.parent().is_none()).count(), 1);
        for node in &nodes {
            let mut hops = 0;
            let mut current = *node;
            while let Some(parent) = current.parent() {
                current = nodes[parent.as_usize()];
                hops += 1;
                assert!(hops <= nodes.len(), "Cycle in the search tree");
            }
            assert_eq!(current.node(), planner.start());
            assert!(node.g().get() >= 0.0);
        }
    }

    #[test]
    fn random_grids_match_dijkstra() {
        for seed in 0..8u64 {
            let mut r = ChaCha8Rng::seed_from_u64(seed);
            let config = GridNetworkConfig {
                width: 12,
                height: 9,
                missing_segment_probability: 0.25,
                footway_probability: 0.1,
                ..Default::default()
            };
            let model = grid(&mut r, &config).unwrap();

            for _ in 0..10 {
                let start = (r.random_range(0.0..100.0), r.random_range(0.0..100.0));
                let end = (r.random_range(0.0..100.0), r.random_range(0.0..100.0));

                let (planner, outcome) = plan(&model, start, end, ExpansionPolicy::Relaxation);
                let (legacy, legacy_outcome) =
                    plan(&model, start, end, ExpansionPolicy::FirstDiscovery);
                let optimum = dijkstra(&model, planner.start())[planner.end().index()];

                assert_eq!(
                    planner.start(),
                    model
                        .closest_node(&Coordinate::from_percent(start.0, start.1))
                        .unwrap()
                );
                assert_eq!(legacy.start(), planner.start());
                assert_eq!(legacy.end(), planner.end());

                match (optimum, &outcome, &legacy_outcome) {
                    (None, SearchOutcome::Exhausted, SearchOutcome::Exhausted) => {}
                    (Some(optimum), SearchOutcome::Found(path), SearchOutcome::Found(legacy)) => {
                        for p in [path, legacy] {
                            assert_eq!(p.start().map(|n| n.id), Some(planner.start()));
                            assert_eq!(p.end().map(|n| n.id), Some(planner.end()));
                            assert!(p.follows(&model), "{p} jumps between nodes");

                            let recomputed = p.recompute_raw_distance(&model);
                            assert!((recomputed.get() - p.raw_distance.get()).abs() < TOLERANCE);
                            let metres = recomputed.get() * model.metric_scale();
                            assert!((metres - p.distance).abs() < TOLERANCE * metres.max(1.0));
                        }

                        let scale = config.metric_scale;
                        assert!(
                            (path.raw_distance.get() - optimum).abs() < TOLERANCE,
                            "seed {seed}: {} != {optimum}",
                            path.raw_distance
                        );
                        assert!(legacy.raw_distance.get() >= optimum - TOLERANCE);
                        assert!(legacy.distance + TOLERANCE * scale >= path.distance);
                    }
                    (optimum, outcome, legacy) => {
                        panic!("seed {seed}: {optimum:?} vs {outcome:?} vs {legacy:?}")
                    }
                }
            }
        }
    }

    #[test]
    fn route_is_stored_on_the_model() {
        let (mut model, [a, b, c, _]) = line_with_island();

        let (_, outcome) = plan(&model, (0.0, 0.0), (200.0, 0.0), Default::default());
        model.set_path(outcome.path().cloned());
        let stored = model.path().unwrap();
        assert_eq!(stored.node_ids().collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(stored.distance, 2.0);

        let (_, outcome) = plan(&model, (0.0, 0.0), (500.0, 500.0), Default::default());
        model.set_path(outcome.path().cloned());
        assert_eq!(model.path(), None);
    }

    #[test]
    fn debug_output() {
        let (model, _) = line_with_island();
        let (planner, _) = plan(&model, (0.0, 0.0), (200.0, 0.0), Default::default());

        let expected = format!(
            "RoutePlanner {{ graph: {model:?}, policy: Relaxation, start: NodeId(0), \
             end: NodeId(2), status: Done, search_table: SearchTable{{(3 nodes)}}, \
             open: 0, expanded: 2 }}"
        );
        assert_eq!(format!("{planner:?}"), expected);

        let mut stats = Vec::<u8>::new();
        planner.write_memory_stats(&mut stats).unwrap();
        let stats = String::from_utf8(stats).unwrap();
        assert!(stats.starts_with("RoutePlanner Stats:"));
        assert!(stats.contains("Expanded nodes: 2"));
    }
}
