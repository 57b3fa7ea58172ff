//! Route planning algorithms.
//!
//! These work on any [`RoadGraph`](crate::model::RoadGraph).

pub mod astar;
