//! Record-at-a-time view over a query
//!
//! `QueryResults` owns the caller-side buffers the engine fills, applies
//! the result limit, and tracks the cursor after the last yielded record.

use crate::engine::{CancelHandle, CursorOf, QueryResultsSource, RecordOf, RemoteQueryClient};
use crate::error::{Error, Result};
use crate::index::Index;
use crate::page::{CursorBuffer, StartPosition};
use crate::types::FetchCount;
use futures::Stream;
use std::collections::{BTreeSet, VecDeque};

/// Iterator-style access to a query's records
pub struct QueryResults<Q: RemoteQueryClient> {
    source: QueryResultsSource<Q>,
    records: VecDeque<RecordOf<Q>>,
    cursors: VecDeque<CursorOf<Q>>,
    start: Option<StartPosition<CursorOf<Q>>>,
    last_cursor: Option<CursorOf<Q>>,
    remaining: Option<usize>,
}

impl<Q: RemoteQueryClient> QueryResults<Q> {
    /// Wrap an engine
    pub fn new(source: QueryResultsSource<Q>) -> Self {
        let remaining = source.options().limit;
        Self {
            source,
            records: VecDeque::new(),
            cursors: VecDeque::new(),
            start: None,
            last_cursor: None,
            remaining,
        }
    }

    /// Next record, or `None` once the query or the limit is exhausted
    pub async fn next(&mut self) -> Result<Option<RecordOf<Q>>> {
        if self.remaining == Some(0) || !self.refill().await? {
            return Ok(None);
        }
        let Some(record) = self.records.pop_front() else {
            return Ok(None);
        };
        if let Some(cursor) = self.cursors.pop_front() {
            self.last_cursor = Some(cursor);
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Ok(Some(record))
    }

    /// Cursor just after the last yielded record
    ///
    /// Before the first record this is the start position, if known.
    pub fn cursor(&self) -> Option<&CursorOf<Q>> {
        self.last_cursor
            .as_ref()
            .or_else(|| self.start.as_ref().and_then(StartPosition::cursor))
    }

    /// Cursor just after the skipped offset, without yielding records
    pub async fn start_cursor(&mut self) -> Result<Option<CursorOf<Q>>> {
        // Once the engine has handed out the start position it never
        // reports it again.
        while self.start.is_none()
            && !self.source.state().skip_cursor_added
            && self.source.has_more_entities()
        {
            self.load(FetchCount::Exactly(0)).await?;
        }
        Ok(self.start.as_ref().and_then(StartPosition::cursor).cloned())
    }

    /// Records the service skipped so far
    pub fn num_skipped(&self) -> usize {
        self.source.num_skipped()
    }

    /// End cursor of the most recently consumed page
    pub fn resume_cursor(&self) -> Option<&CursorOf<Q>> {
        self.source.resume_cursor()
    }

    /// Indexes the query used
    pub async fn get_index_list(&mut self) -> Result<BTreeSet<Index>> {
        self.source.get_index_list().await
    }

    /// Handle that cancels the underlying query
    pub fn cancel_handle(&self) -> CancelHandle {
        self.source.cancel_handle()
    }

    /// Underlying engine
    pub fn source(&self) -> &QueryResultsSource<Q> {
        &self.source
    }

    /// Give back the engine; buffered records are discarded
    pub fn into_source(self) -> QueryResultsSource<Q> {
        self.source
    }

    /// Stream of the remaining records
    pub fn into_stream(self) -> impl Stream<Item = Result<RecordOf<Q>>> {
        futures::stream::try_unfold(self, |mut results| async move {
            let next = results.next().await?;
            Ok::<_, Error>(next.map(|record| (record, results)))
        })
    }

    fn next_count(&self) -> FetchCount {
        match (self.source.options().fetch_count(), self.remaining) {
            (FetchCount::Exactly(chunk), Some(remaining)) => {
                FetchCount::Exactly(chunk.min(remaining))
            }
            (count, _) => count,
        }
    }

    /// Fill the record queue; false once nothing is left
    async fn refill(&mut self) -> Result<bool> {
        while self.records.is_empty() {
            if !self.source.has_more_entities() {
                return Ok(false);
            }
            self.load(self.next_count()).await?;
        }
        Ok(true)
    }

    /// Run one engine load into the local queues
    ///
    /// Records and the start position delivered before a failure are kept;
    /// the engine does not hand them out twice.
    async fn load(&mut self, count: FetchCount) -> Result<()> {
        let mut records = Vec::new();
        let mut cursors = CursorBuffer::new();
        let outcome = self.source.load_more(count, &mut records, &mut cursors).await;

        let (start, cursors) = cursors.into_parts();
        if self.start.is_none() {
            self.start = start;
        }
        self.records.extend(records);
        self.cursors.extend(cursors);
        outcome.map(|_| ())
    }
}
