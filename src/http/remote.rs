//! Query service client

use super::client::HttpClient;
use super::wire::{NextBatchRequest, QueryBatch, RunQueryRequest};
use crate::config::QueryOptions;
use crate::engine::{FetchHint, QueryResultsSource, RemoteQueryClient};
use crate::error::{Error, Result};
use crate::page::{Page, PendingPage};
use crate::results::QueryResults;
use crate::types::{Cursor, JsonValue, TransactionContext};
use tracing::debug;

/// Initial query endpoint, relative to the base URL
pub const RUN_QUERY_PATH: &str = "query:run";
/// Continuation endpoint, relative to the base URL
pub const NEXT_BATCH_PATH: &str = "query:next";

/// Page type produced by [`HttpQueryClient`]
pub type JsonPage = Page<JsonValue, Cursor>;

/// Continuation template taken from the initial batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationTemplate {
    /// Service handle for the running query
    pub handle: Option<String>,
    /// Whether continuations ask for a compiled query
    pub compile: bool,
}

/// Pages through a query service over HTTP
///
/// Every request is spawned on the tokio runtime as soon as it is issued.
#[derive(Debug, Clone)]
pub struct HttpQueryClient {
    http: HttpClient,
    txn: TransactionContext,
}

impl HttpQueryClient {
    /// Create a query client over `http`
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            txn: TransactionContext::none(),
        }
    }

    /// Run queries inside `txn`
    #[must_use]
    pub fn with_transaction(mut self, txn: TransactionContext) -> Self {
        self.txn = txn;
        self
    }

    /// Underlying HTTP client
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Start the initial query
    pub fn run_query(&self, query: JsonValue, options: &QueryOptions) -> PendingPage<QueryBatch> {
        let request = RunQueryRequest::new(query, options, &self.txn);
        debug!(
            offset = request.offset,
            count = ?request.count,
            compile = request.compile,
            "Running query"
        );
        let http = self.http.clone();
        PendingPage::spawn(async move { http.post_json(RUN_QUERY_PATH, &request).await })
    }

    /// Start `query` and return the engine paging through it
    pub fn query(self, query: JsonValue, options: QueryOptions) -> Result<QueryResultsSource<Self>> {
        options.validate()?;
        let initial = self.run_query(query, &options);
        let txn = self.txn.clone();
        Ok(QueryResultsSource::new(self, options, initial).with_transaction(txn))
    }

    /// Start `query` and return a record-at-a-time view
    pub fn query_results(
        self,
        query: JsonValue,
        options: QueryOptions,
    ) -> Result<QueryResults<Self>> {
        self.query(query, options).map(QueryResults::new)
    }
}

impl RemoteQueryClient for HttpQueryClient {
    type Seed = QueryBatch;
    type Continuation = QueryBatch;
    type Prototype = ContinuationTemplate;
    type Page = JsonPage;

    fn wrap_initial(&self, seed: QueryBatch) -> JsonPage {
        seed.into()
    }

    fn wrap_continuation(&self, raw: QueryBatch) -> JsonPage {
        raw.into()
    }

    fn build_continuation_prototype(
        &self,
        seed: &QueryBatch,
        options: &QueryOptions,
    ) -> ContinuationTemplate {
        ContinuationTemplate {
            handle: seed.handle.clone(),
            compile: options.require_compiled_query,
        }
    }

    fn fetch_next(
        &self,
        prototype: &ContinuationTemplate,
        last: &JsonPage,
        hint: FetchHint,
    ) -> PendingPage<QueryBatch> {
        let Some(handle) = prototype.handle.clone() else {
            return PendingPage::ready(Err(Error::backend(
                "service reported more results without a continuation handle",
            )));
        };
        let request = NextBatchRequest {
            handle,
            cursor: last.end_cursor.clone(),
            count: hint.count,
            offset: hint.offset,
            compile: prototype.compile,
        };
        let http = self.http.clone();
        PendingPage::spawn(async move { http.post_json(NEXT_BATCH_PATH, &request).await })
    }
}
