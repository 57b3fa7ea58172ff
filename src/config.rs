//! Planner settings.

use derive_more::Display;

/// What to do when a node that is still waiting in the open list is reached
/// again through another parent.
#[derive(Copy, Clone, Debug, Default, Display, PartialEq, Eq, clap::ValueEnum)]
pub enum ExpansionPolicy {
    /// Keep the cheaper of both paths, re-ranking the node if needed.
    ///
    /// Always finds a shortest route.
    #[default]
    #[display("relaxation")]
    Relaxation,
    /// The first parent to discover a node keeps it.
    ///
    /// Each node is ranked only once, but routes may be longer than needed.
    #[display("first-discovery")]
    FirstDiscovery,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlannerConfig {
    pub policy: ExpansionPolicy,
    /// Initial room for discovered nodes and candidates.
    pub open_capacity: usize,
}

impl PlannerConfig {
    pub fn with_policy(policy: ExpansionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            policy: ExpansionPolicy::default(),
            open_capacity: 2048,
        }
    }
}
