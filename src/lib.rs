use shadow_rs::shadow;

shadow!(build);

// Costs
// -----
pub mod cost;
pub mod float_cost;

// Road networks and routes
// ------------------------
pub mod model;
pub mod path;

// Search internals
// ----------------
pub mod data_structures;
pub mod search;

// Algorithms
// ----------
pub mod algorithms;
pub mod config;
