//! Page types and the page adapter capability

use crate::index::{Index, IndexInfo};
use crate::types::Projectable;
use std::collections::BTreeSet;
use std::fmt::Debug;

/// Uniform view over one page of results
///
/// Remote clients build this from both initial and continuation responses;
/// the two must behave identically.
pub trait PageAdapter: Send + 'static {
    /// Record type delivered to the caller
    type Record: Send + 'static;
    /// Cursor type for resume positions
    type Cursor: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Resume position after the whole page
    fn end_cursor(&self) -> Option<Self::Cursor>;

    /// Move the page's records out, applying the projection
    fn entities(&mut self, projection: &[String]) -> Vec<Self::Record>;

    /// Move the per-record resume cursors out
    fn result_cursors(&mut self) -> Vec<Self::Cursor>;

    /// Position just after the records skipped to satisfy the offset
    fn skipped_results_cursor(&self) -> Option<Self::Cursor>;

    /// Whether the service has more results after this page
    fn has_more_results(&self) -> bool;

    /// Records the service skipped to satisfy the offset
    fn num_skipped_results(&self) -> usize;

    /// Records on this page not yet moved out
    fn entity_count(&self) -> usize;

    /// Indexes the page's execution touched
    ///
    /// "Use if required" indexes are also pushed onto `observed`.
    fn indexes_used(&self, observed: &mut Vec<IndexInfo>) -> BTreeSet<Index>;

    /// Progress summary; take it before moving records out
    fn mark(&self) -> PageMark<Self::Cursor> {
        PageMark {
            end_cursor: self.end_cursor(),
            num_skipped: self.num_skipped_results(),
            entity_count: self.entity_count(),
        }
    }

    /// Whether this page moved past the page summarized by `previous`
    fn made_progress(&self, previous: &PageMark<Self::Cursor>) -> bool {
        self.mark() != *previous
    }
}

/// Progress-relevant summary of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMark<C> {
    /// Page end cursor
    pub end_cursor: Option<C>,
    /// Records skipped by the page
    pub num_skipped: usize,
    /// Records on the page
    pub entity_count: usize,
}

// ============================================================================
// Page
// ============================================================================

/// Stock page representation
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R, C> {
    /// Records, in result order
    pub entities: Vec<R>,
    /// Resume cursor after each record
    pub result_cursors: Vec<C>,
    /// Resume cursor after the page
    pub end_cursor: Option<C>,
    /// Position after the skipped records
    pub skipped_results_cursor: Option<C>,
    /// Records skipped for the offset
    pub num_skipped: usize,
    /// More results available
    pub has_more: bool,
    /// Indexes the page's execution touched
    pub indexes: Vec<IndexInfo>,
}

impl<R, C> Default for Page<R, C> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            result_cursors: Vec::new(),
            end_cursor: None,
            skipped_results_cursor: None,
            num_skipped: 0,
            has_more: false,
            indexes: Vec::new(),
        }
    }
}

impl<R, C> Page<R, C> {
    /// Create an empty, final page
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records with their resume cursors
    #[must_use]
    pub fn with_results(mut self, results: impl IntoIterator<Item = (R, C)>) -> Self {
        for (record, cursor) in results {
            self.entities.push(record);
            self.result_cursors.push(cursor);
        }
        self
    }

    /// Set the end cursor
    #[must_use]
    pub fn with_end_cursor(mut self, cursor: C) -> Self {
        self.end_cursor = Some(cursor);
        self
    }

    /// Report `count` skipped records ending at `cursor`
    #[must_use]
    pub fn with_skipped(mut self, count: usize, cursor: Option<C>) -> Self {
        self.num_skipped = count;
        self.skipped_results_cursor = cursor;
        self
    }

    /// Mark whether more results follow
    #[must_use]
    pub fn with_more(mut self, has_more: bool) -> Self {
        self.has_more = has_more;
        self
    }

    /// Report an index the page used
    #[must_use]
    pub fn with_index(mut self, info: IndexInfo) -> Self {
        self.indexes.push(info);
        self
    }
}

impl<R, C> PageAdapter for Page<R, C>
where
    R: Projectable + Send + 'static,
    C: Clone + PartialEq + Debug + Send + Sync + 'static,
{
    type Record = R;
    type Cursor = C;

    fn end_cursor(&self) -> Option<C> {
        self.end_cursor.clone()
    }

    fn entities(&mut self, projection: &[String]) -> Vec<R> {
        std::mem::take(&mut self.entities)
            .into_iter()
            .map(|record| record.project(projection))
            .collect()
    }

    fn result_cursors(&mut self) -> Vec<C> {
        std::mem::take(&mut self.result_cursors)
    }

    fn skipped_results_cursor(&self) -> Option<C> {
        self.skipped_results_cursor.clone()
    }

    fn has_more_results(&self) -> bool {
        self.has_more
    }

    fn num_skipped_results(&self) -> usize {
        self.num_skipped
    }

    fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn indexes_used(&self, observed: &mut Vec<IndexInfo>) -> BTreeSet<Index> {
        observed.extend(
            self.indexes
                .iter()
                .filter(|info| info.only_use_if_required)
                .cloned(),
        );
        self.indexes.iter().map(|info| info.index.clone()).collect()
    }
}

// ============================================================================
// Cursor Buffer
// ============================================================================

/// Position before the first delivered record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPosition<C> {
    /// The service did not report a position; resume from the query start
    Unspecified,
    /// Resume at this cursor
    At(C),
}

impl<C> StartPosition<C> {
    /// The cursor, if one was reported
    pub fn cursor(&self) -> Option<&C> {
        match self {
            StartPosition::Unspecified => None,
            StartPosition::At(cursor) => Some(cursor),
        }
    }
}

impl<C> From<Option<C>> for StartPosition<C> {
    fn from(cursor: Option<C>) -> Self {
        cursor.map_or(StartPosition::Unspecified, StartPosition::At)
    }
}

/// Caller-owned cursor output of a pagination engine
///
/// Per-record cursors grow in lock-step with the record buffer; the start
/// slot receives the skip cursor once.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorBuffer<C> {
    start: Option<StartPosition<C>>,
    cursors: Vec<C>,
}

impl<C> Default for CursorBuffer<C> {
    fn default() -> Self {
        Self {
            start: None,
            cursors: Vec::new(),
        }
    }
}

impl<C> CursorBuffer<C> {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the cursor for the next record
    pub fn push(&mut self, cursor: C) {
        self.cursors.push(cursor);
    }

    /// Number of per-record cursors
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    /// True if no per-record cursor was added
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Cursor after record `index`
    pub fn get(&self, index: usize) -> Option<&C> {
        self.cursors.get(index)
    }

    /// Cursor after the most recent record
    pub fn last(&self) -> Option<&C> {
        self.cursors.last()
    }

    /// All per-record cursors
    pub fn cursors(&self) -> &[C] {
        &self.cursors
    }

    /// The start position, once placed
    pub fn start(&self) -> Option<&StartPosition<C>> {
        self.start.as_ref()
    }

    /// Place the start position; later calls are ignored
    ///
    /// Returns whether the position was placed.
    pub fn set_start(&mut self, position: StartPosition<C>) -> bool {
        if self.start.is_some() {
            return false;
        }
        self.start = Some(position);
        true
    }

    /// Split into the start position and per-record cursors
    pub fn into_parts(self) -> (Option<StartPosition<C>>, Vec<C>) {
        (self.start, self.cursors)
    }
}
