//! Telemetry module
//!
//! Advisory logging that never affects how a query runs.

mod advisor;

pub use advisor::ChunkSizeAdvisor;
