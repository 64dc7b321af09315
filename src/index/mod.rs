//! Index usage module
//!
//! Pages report which indexes the service consulted while executing them.
//! Indexes flagged "use only if required" are forwarded to an
//! [`IndexUsageSink`] so operators can see which query shapes depend on them.
//!
//! # Overview
//!
//! - `Index` / `QueryShape` / `IndexInfo` - what a page reports
//! - `IndexUsageSink` - injectable, append-only destination
//! - `IndexUsageRecorder` - in-memory aggregation keyed by (index set, query shape)

mod recorder;
mod types;

pub use recorder::{IndexUsage, IndexUsageRecorder, IndexUsageSink};
pub use types::{Index, IndexInfo, QueryShape};

#[cfg(test)]
mod tests;
