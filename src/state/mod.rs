//! State module for tracking node and run lifecycles
//!
//! This module defines the per-URL node states of the crawl graph and the
//! run-level states of the crawl engine.

mod node_state;
mod run_status;

pub use node_state::{NodeKind, NodeStatus};
pub use run_status::RunStatus;
