//! delivery-planner core
//!
//! Next-day delivery planning: load derivation, travel matrices and
//! capacity-constrained routing of jobs onto a fleet.

pub mod allocator;
pub mod config;
pub mod error;
pub mod haversine;
pub mod jobs;
pub mod load_rules;
pub mod logging;
pub mod matrix;
pub mod matrix_cache;
pub mod model;
pub mod osrm;
pub mod planner;
pub mod sequencer;
pub mod traits;
