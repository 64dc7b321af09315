//! JSON bodies exchanged with the query service

use crate::config::QueryOptions;
use crate::index::IndexInfo;
use crate::page::Page;
use crate::types::{Cursor, JsonValue, TransactionContext};
use serde::{Deserialize, Serialize};

/// Body of `POST {base}/query:run`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunQueryRequest {
    /// Service-specific query definition
    pub query: JsonValue,
    /// Records to skip before results begin
    #[serde(default)]
    pub offset: usize,
    /// Size of the first batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Resume position for the first batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<Cursor>,
    /// Position past which no results are returned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_cursor: Option<Cursor>,
    /// Properties to return
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projection: Vec<String>,
    /// Ask the service for a compiled (resumable) query
    #[serde(default)]
    pub compile: bool,
    /// Transaction the query reads in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
}

impl RunQueryRequest {
    /// Build the initial request for `query`
    pub fn new(query: JsonValue, options: &QueryOptions, txn: &TransactionContext) -> Self {
        Self {
            query,
            offset: options.offset,
            count: options.prefetch_size.or(options.chunk_size),
            start_cursor: options.start_cursor.clone(),
            end_cursor: options.end_cursor.clone(),
            projection: options.projection.clone(),
            compile: options.require_compiled_query,
            transaction: txn.transaction_id.clone(),
        }
    }
}

/// Body of `POST {base}/query:next`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextBatchRequest {
    /// Continuation handle from the initial batch
    pub handle: String,
    /// End cursor of the previous batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
    /// Preferred batch size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Records still to skip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    /// Ask for a compiled query
    #[serde(default)]
    pub compile: bool,
}

/// One batch of results, from either endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryBatch {
    /// Records in this batch
    pub results: Vec<JsonValue>,
    /// One cursor per result
    pub result_cursors: Vec<Cursor>,
    /// Position after the whole batch
    pub end_cursor: Option<Cursor>,
    /// Position after the skipped records
    pub skipped_results_cursor: Option<Cursor>,
    /// Records skipped to satisfy the offset
    pub skipped_results: usize,
    /// Whether the service holds more results
    pub more_results: bool,
    /// Continuation handle; only the initial batch carries one
    pub handle: Option<String>,
    /// Indexes the service consulted
    pub indexes: Vec<IndexInfo>,
}

impl From<QueryBatch> for Page<JsonValue, Cursor> {
    // Built field by field so a cursor count mismatch reaches the engine.
    fn from(batch: QueryBatch) -> Self {
        Page {
            entities: batch.results,
            result_cursors: batch.result_cursors,
            end_cursor: batch.end_cursor,
            skipped_results_cursor: batch.skipped_results_cursor,
            num_skipped: batch.skipped_results,
            has_more: batch.more_results,
            indexes: batch.indexes,
        }
    }
}
