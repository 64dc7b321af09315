//! Pagination engine
//!
//! Drives a remote query page by page on behalf of a caller that asks for
//! "more records".
//!
//! # Overview
//!
//! The engine module provides:
//! - `QueryResultsSource` - per-query pagination state machine
//! - `RemoteQueryClient` - the boundary to the service being paged through
//! - `PaginationState` / `FetchHint` - offset and count bookkeeping
//! - `CancelHandle` - cancels a query from any task
//!
//! At the end of every load call that leaves results outstanding, the
//! engine issues one continuation request so the next page is already on
//! its way when the caller asks again.

mod cancel;
mod client;
mod types;

pub use cancel::CancelHandle;
pub use client::RemoteQueryClient;
pub use types::{FetchHint, PaginationState};

use crate::config::QueryOptions;
use crate::error::{Error, Result};
use crate::hooks::{NoopHook, PostLoadHook};
use crate::index::{Index, IndexInfo, IndexUsageRecorder, IndexUsageSink};
use crate::page::{CursorBuffer, PageAdapter, PageMark, PendingPage, StartPosition};
use crate::telemetry::ChunkSizeAdvisor;
use crate::types::{FetchCount, TransactionContext};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Record type produced by a client's pages
pub type RecordOf<Q> = <<Q as RemoteQueryClient>::Page as PageAdapter>::Record;
/// Cursor type produced by a client's pages
pub type CursorOf<Q> = <<Q as RemoteQueryClient>::Page as PageAdapter>::Cursor;

/// A page the engine has read, with its progress mark taken before its
/// records were moved out
struct Consumed<Q: RemoteQueryClient> {
    page: Q::Page,
    mark: PageMark<CursorOf<Q>>,
}

/// The single outstanding continuation request
struct InFlight<Q: RemoteQueryClient> {
    request: PendingPage<Q::Continuation>,
    origin: Consumed<Q>,
}

/// Why the engine stopped for good
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    Stalled { skipped: usize, entity_count: usize },
    Cancelled,
    Aborted,
}

impl Halt {
    fn error(self) -> Error {
        match self {
            Halt::Stalled {
                skipped,
                entity_count,
            } => Error::stalled(skipped, entity_count),
            Halt::Cancelled => Error::Cancelled,
            Halt::Aborted => Error::QueryAborted,
        }
    }
}

/// Pagination state machine for one query
///
/// Not meant to be shared between tasks; every operation takes `&mut self`.
/// Clone the [`CancelHandle`] to cancel from elsewhere.
pub struct QueryResultsSource<Q: RemoteQueryClient> {
    client: Q,
    options: QueryOptions,
    state: PaginationState,

    /// Initial query, until it resolves
    initial: Option<PendingPage<Q::Seed>>,
    /// Initial page resolved ahead of the first load by `get_index_list`
    initial_page: Option<Q::Page>,
    prototype: Option<Q::Prototype>,
    in_flight: Option<InFlight<Q>>,
    /// Page whose continuation failed; the next load asks again
    resume_from: Option<Consumed<Q>>,
    halted: Option<Halt>,
    resume_cursor: Option<CursorOf<Q>>,

    initial_indexes: Option<(BTreeSet<Index>, Vec<IndexInfo>)>,
    index_list: Option<BTreeSet<Index>>,

    txn: TransactionContext,
    hook: Arc<dyn PostLoadHook<RecordOf<Q>>>,
    index_sink: Arc<dyn IndexUsageSink>,
    advisor: Arc<ChunkSizeAdvisor>,
    cancel: CancelHandle,
}

impl<Q: RemoteQueryClient> QueryResultsSource<Q> {
    /// Create an engine around an initial query request
    pub fn new(client: Q, options: QueryOptions, initial: PendingPage<Q::Seed>) -> Self {
        let state = PaginationState::new(&options);
        Self {
            client,
            options,
            state,
            initial: Some(initial),
            initial_page: None,
            prototype: None,
            in_flight: None,
            resume_from: None,
            halted: None,
            resume_cursor: None,
            initial_indexes: None,
            index_list: None,
            txn: TransactionContext::none(),
            hook: Arc::new(NoopHook),
            index_sink: IndexUsageRecorder::global(),
            advisor: ChunkSizeAdvisor::global(),
            cancel: CancelHandle::new(),
        }
    }

    /// Run `hook` on every record before it is delivered
    #[must_use]
    pub fn with_post_load_hook(mut self, hook: impl PostLoadHook<RecordOf<Q>> + 'static) -> Self {
        self.hook = Arc::new(hook);
        self
    }

    /// Transaction passed to the post-load hook
    #[must_use]
    pub fn with_transaction(mut self, txn: TransactionContext) -> Self {
        self.txn = txn;
        self
    }

    /// Report observed indexes to `sink` instead of the process-wide recorder
    #[must_use]
    pub fn with_index_usage_sink(mut self, sink: Arc<dyn IndexUsageSink>) -> Self {
        self.index_sink = sink;
        self
    }

    /// Use `advisor` instead of the process-wide chunk-size advisor
    #[must_use]
    pub fn with_chunk_size_advisor(mut self, advisor: Arc<ChunkSizeAdvisor>) -> Self {
        self.advisor = advisor;
        self
    }

    /// Query options
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Pagination counters
    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    /// Remote client
    pub fn client(&self) -> &Q {
        &self.client
    }

    /// Records the service skipped so far
    pub fn num_skipped(&self) -> usize {
        self.state.skipped_so_far
    }

    /// End cursor of the most recently consumed page
    pub fn resume_cursor(&self) -> Option<&CursorOf<Q>> {
        self.resume_cursor.as_ref()
    }

    /// Handle that cancels this query from any task
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancel the query and abort outstanding requests
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.halt_cancelled();
    }

    /// Whether any results may remain
    ///
    /// True until the initial query resolved and a page reported no more
    /// results. A query that stopped on an error stays "not exhausted".
    pub fn has_more_entities(&self) -> bool {
        self.prototype.is_none()
            || self.initial_page.is_some()
            || self.in_flight.is_some()
            || self.resume_from.is_some()
            || self.halted.is_some()
    }

    /// Whether the query completed
    pub fn is_exhausted(&self) -> bool {
        !self.has_more_entities()
    }

    /// Load at least one record, unless the query is exhausted
    pub async fn load_more_entities(
        &mut self,
        buffer: &mut Vec<RecordOf<Q>>,
        cursors: &mut CursorBuffer<CursorOf<Q>>,
    ) -> Result<Option<CursorOf<Q>>> {
        self.load_more(FetchCount::Unbounded, buffer, cursors).await
    }

    /// Append records to `buffer` and their cursors to `cursors`
    ///
    /// Records are appended a whole page at a time, so `Exactly(n)` may
    /// deliver more than `n`; it delivers fewer only once the query is
    /// exhausted. `Exactly(0)` with the offset already satisfied performs
    /// no I/O. Returns the end cursor of the last consumed page.
    pub async fn load_more(
        &mut self,
        count: FetchCount,
        buffer: &mut Vec<RecordOf<Q>>,
        cursors: &mut CursorBuffer<CursorOf<Q>>,
    ) -> Result<Option<CursorOf<Q>>> {
        self.check_halted()?;
        if !self.has_more_entities() {
            return Ok(self.resume_cursor.clone());
        }

        if count.is_zero() && self.state.offset_satisfied() {
            if !self.state.skip_cursor_added {
                cursors.set_start(StartPosition::Unspecified);
                self.state.skip_cursor_added = true;
            }
            return Ok(self.resume_cursor.clone());
        }

        if let Some(origin) = self.resume_from.take() {
            let hint = self.state.continuation_hint(count, 0);
            debug!(
                count = ?hint.count,
                offset = ?hint.offset,
                "Retrying continuation after failed request"
            );
            self.issue_continuation(origin, hint)?;
        }

        let start = buffer.len();
        loop {
            let mut page = self.next_page().await?;
            let mark = page.mark();

            if let Err(e) = self.consume(&mut page, buffer, cursors) {
                if page.has_more_results() {
                    self.resume_from = Some(Consumed { page, mark });
                }
                return Err(e);
            }
            if let Some(end) = page.end_cursor() {
                self.resume_cursor = Some(end);
            }

            if !page.has_more_results() {
                debug!(
                    total_emitted = self.state.total_emitted,
                    skipped = self.state.skipped_so_far,
                    "Query exhausted"
                );
                break;
            }

            let origin = Consumed { page, mark };
            let fetched = buffer.len() - start;
            if self.state.needs_more(count, fetched) {
                let hint = self.state.continuation_hint(count, fetched);
                self.issue_continuation(origin, hint)?;
                continue;
            }

            let hint = self.state.prefetch_hint();
            self.issue_continuation(origin, hint)?;
            debug!(fetched, "Load complete, next page prefetching");
            break;
        }

        self.maybe_advise();
        Ok(self.resume_cursor.clone())
    }

    /// Indexes the query used
    ///
    /// Resolves the initial page if no load has happened yet. Observed
    /// "use if required" indexes are forwarded to the usage sink on the
    /// first call only; later calls return the memoized set.
    pub async fn get_index_list(&mut self) -> Result<BTreeSet<Index>> {
        if let Some(list) = &self.index_list {
            return Ok(list.clone());
        }
        if self.prototype.is_none() {
            self.check_halted()?;
            let page = self.resolve_initial().await?;
            self.initial_page = Some(page);
        }

        let (used, observed) = self.initial_indexes.take().unwrap_or_default();
        if !observed.is_empty() {
            self.index_sink.record(&observed);
        }
        self.index_list = Some(used.clone());
        Ok(used)
    }

    // ========================================================================
    // Page resolution
    // ========================================================================

    async fn next_page(&mut self) -> Result<Q::Page> {
        if self.prototype.is_none() {
            return self.resolve_initial().await;
        }
        if let Some(page) = self.initial_page.take() {
            return Ok(page);
        }
        self.resolve_in_flight().await
    }

    async fn resolve_initial(&mut self) -> Result<Q::Page> {
        // The request stays in its slot while awaited, so a dropped load
        // call leaves it to be awaited again.
        let outcome = match self.initial.as_mut() {
            Some(request) => resolve(&self.cancel, request).await,
            None => Err(Error::QueryAborted),
        };
        self.initial = None;

        match outcome {
            Ok(seed) => {
                let prototype = self.client.build_continuation_prototype(&seed, &self.options);
                let page = self.client.wrap_initial(seed);
                let mut observed = Vec::new();
                let used = page.indexes_used(&mut observed);
                debug!(
                    entities = page.entity_count(),
                    skipped = page.num_skipped_results(),
                    more = page.has_more_results(),
                    "Initial page received"
                );
                self.initial_indexes = Some((used, observed));
                self.prototype = Some(prototype);
                Ok(page)
            }
            Err(e) => {
                self.halted = Some(match e {
                    Error::Cancelled => Halt::Cancelled,
                    _ => Halt::Aborted,
                });
                Err(e)
            }
        }
    }

    async fn resolve_in_flight(&mut self) -> Result<Q::Page> {
        debug_assert!(self.in_flight.is_some(), "no page request outstanding");
        let outcome = match self.in_flight.as_mut() {
            Some(flight) => resolve(&self.cancel, &mut flight.request).await,
            None => return Err(Error::Other("no page request outstanding".to_string())),
        };
        let origin = self.in_flight.take().map(|flight| flight.origin);

        match outcome {
            Ok(raw) => {
                let page = self.client.wrap_continuation(raw);
                if let Some(origin) = &origin {
                    if !page.made_progress(&origin.mark) {
                        let halt = Halt::Stalled {
                            skipped: self.state.skipped_so_far,
                            entity_count: page.entity_count(),
                        };
                        warn!(
                            skipped = self.state.skipped_so_far,
                            end_cursor = ?page.end_cursor(),
                            "Continuation made no progress, abandoning query"
                        );
                        self.halted = Some(halt);
                        return Err(halt.error());
                    }
                }
                Ok(page)
            }
            Err(Error::Cancelled) => {
                self.halted = Some(Halt::Cancelled);
                Err(Error::Cancelled)
            }
            Err(e) => {
                warn!(error = %e, "Continuation request failed");
                self.resume_from = origin;
                Err(e)
            }
        }
    }

    fn issue_continuation(&mut self, origin: Consumed<Q>, hint: FetchHint) -> Result<()> {
        debug_assert!(
            self.prototype.is_some(),
            "continuation requested before the initial page"
        );
        let prototype = self.prototype.as_ref().ok_or_else(|| {
            Error::Other("continuation requested before the initial page".to_string())
        })?;
        debug!(count = ?hint.count, offset = ?hint.offset, "Requesting next page");
        let request = self.client.fetch_next(prototype, &origin.page, hint);
        self.in_flight = Some(InFlight { request, origin });
        Ok(())
    }

    // ========================================================================
    // Delivery
    // ========================================================================

    fn consume(
        &mut self,
        page: &mut Q::Page,
        buffer: &mut Vec<RecordOf<Q>>,
        cursors: &mut CursorBuffer<CursorOf<Q>>,
    ) -> Result<()> {
        if self.state.record_skipped(page.num_skipped_results()) {
            cursors.set_start(StartPosition::from(page.skipped_results_cursor()));
            debug!(skipped = self.state.skipped_so_far, "Offset satisfied");
        }

        let records = page.entities(&self.options.projection);
        let result_cursors = page.result_cursors();
        if records.len() != result_cursors.len() {
            return Err(Error::MalformedPage {
                entities: records.len(),
                cursors: result_cursors.len(),
            });
        }

        for (record, cursor) in records.into_iter().zip(result_cursors) {
            trace!(position = self.state.total_emitted, "Running post-load hook");
            self.hook
                .on_record_loaded(&self.txn, &record)
                .map_err(Error::Callback)?;
            buffer.push(record);
            cursors.push(cursor);
            self.state.total_emitted += 1;
        }
        Ok(())
    }

    fn maybe_advise(&mut self) {
        if self.state.chunk_advice_checked {
            return;
        }
        if self
            .advisor
            .applies(self.state.chunk_size, self.state.total_emitted)
        {
            self.state.chunk_advice_checked = true;
            self.advisor.advise(self.state.total_emitted);
        }
    }

    // ========================================================================
    // Halting
    // ========================================================================

    fn check_halted(&mut self) -> Result<()> {
        if self.halted.is_none() && self.cancel.is_cancelled() {
            self.halt_cancelled();
        }
        match self.halted {
            Some(halt) => Err(halt.error()),
            None => Ok(()),
        }
    }

    fn halt_cancelled(&mut self) {
        if let Some(request) = self.initial.as_mut() {
            request.abort();
        }
        if let Some(mut flight) = self.in_flight.take() {
            flight.request.abort();
        }
        self.resume_from = None;
        if !matches!(self.halted, Some(Halt::Stalled { .. })) {
            self.halted = Some(Halt::Cancelled);
        }
        debug!("Query cancelled");
    }
}

impl<Q: RemoteQueryClient> fmt::Debug for QueryResultsSource<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResultsSource")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("initial_pending", &self.initial.is_some())
            .field("in_flight", &self.in_flight.is_some())
            .field("halted", &self.halted)
            .field("resume_cursor", &self.resume_cursor)
            .finish_non_exhaustive()
    }
}

/// Await `request` unless the query is cancelled first
async fn resolve<T>(cancel: &CancelHandle, request: &mut PendingPage<T>) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            request.abort();
            Err(Error::Cancelled)
        }
        result = &mut *request => result,
    }
}
