// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # pagestream
//!
//! Client-side cursor pagination with prefetch for remote queries.
//!
//! A remote query service returns results one page at a time. The engine
//! turns "give me more records" into continuation calls: it satisfies the
//! query offset, delivers whole pages with a resume cursor per record, and
//! keeps exactly one request for the next page in flight between calls.
//!
//! ## Features
//!
//! - **Prefetch**: the next page is requested before the caller asks for it
//! - **Offsets and Counts**: skip leading results, ask for "at least n"
//! - **Cursors**: per-record resume cursors plus a start position
//! - **Stall Detection**: a continuation that makes no progress fails fast
//! - **Index Usage**: "use if required" indexes are aggregated process-wide
//! - **HTTP Client**: a ready `RemoteQueryClient` over JSON endpoints
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pagestream::http::{HttpClient, HttpClientConfig, HttpQueryClient};
//! use pagestream::QueryOptions;
//!
//! #[tokio::main]
//! async fn main() -> pagestream::Result<()> {
//!     let http = HttpClient::with_config(
//!         HttpClientConfig::builder().base_url("https://query.example.com/v1").build(),
//!     )?;
//!     let options = QueryOptions::new().with_chunk_size(100);
//!     let mut results = HttpQueryClient::new(http)
//!         .query_results(serde_json::json!({"kind": "Task"}), options)?;
//!
//!     while let Some(record) = results.next().await? {
//!         println!("{record}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │          QueryResults  next() / cursor() / into_stream()        │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   QueryResultsSource  load_more() / get_index_list() / cancel() │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────────┬──────────────┴─┬───────────────┬───────────────┐
//! │     Page      │     Hooks      │     Index     │   Telemetry   │
//! ├───────────────┼────────────────┼───────────────┼───────────────┤
//! │ PageAdapter   │ PostLoadHook   │ Recorder      │ Chunk-size    │
//! │ PendingPage   │                │ (global)      │ advisory      │
//! │ CursorBuffer  │                │               │               │
//! └───────────────┴────────────────┴───────────────┴───────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  RemoteQueryClient  ◄──  HttpQueryClient (retry, rate limit)    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Query options and advisory configuration
pub mod config;

/// Token bucket rate limiting
pub mod rate_limit;

/// Pages, page requests and cursor output
pub mod page;

/// Index usage aggregation
pub mod index;

/// Post-load hooks
pub mod hooks;

/// Advisory logging
pub mod telemetry;

/// Pagination engine
pub mod engine;

/// Record-at-a-time results
pub mod results;

/// HTTP client and query service client
pub mod http;

#[cfg(test)]
pub(crate) mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{AdvisorConfig, QueryOptions};
pub use engine::{CancelHandle, FetchHint, QueryResultsSource, RemoteQueryClient};
pub use error::{Error, Result};
pub use hooks::{NoopHook, PostLoadHook};
pub use page::{CursorBuffer, Page, PageAdapter, PendingPage, StartPosition};
pub use results::QueryResults;
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
