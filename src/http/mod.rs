//! HTTP module
//!
//! HTTP transport and the query service client built on it.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Query Client**: `RemoteQueryClient` over `query:run` / `query:next`

mod client;
mod remote;
mod wire;

pub use client::{BackoffType, HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use remote::{ContinuationTemplate, HttpQueryClient, JsonPage, NEXT_BATCH_PATH, RUN_QUERY_PATH};
pub use wire::{NextBatchRequest, QueryBatch, RunQueryRequest};

#[cfg(test)]
mod tests;
