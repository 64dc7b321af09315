//! Engine types
//!
//! Pagination bookkeeping and the hints sent with continuation requests.

use crate::config::QueryOptions;
use crate::types::FetchCount;

/// Hints attached to a continuation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchHint {
    /// Number of records to return, if the engine has a preference
    pub count: Option<usize>,
    /// Records still to be skipped before results begin
    pub offset: Option<usize>,
}

impl FetchHint {
    /// Create a hint
    pub fn new(count: Option<usize>, offset: Option<usize>) -> Self {
        Self { count, offset }
    }
}

/// Per-query pagination counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
    /// Configured chunk size
    pub chunk_size: Option<usize>,
    /// Records to skip before results begin
    pub offset: usize,
    /// Records the service reported skipping so far
    pub skipped_so_far: usize,
    /// Records delivered to the caller so far
    pub total_emitted: u64,
    /// Whether the skip cursor has been placed
    pub skip_cursor_added: bool,
    /// Whether the chunk-size advisory was considered for this query
    pub chunk_advice_checked: bool,
}

impl PaginationState {
    /// Fresh state for a query
    pub fn new(options: &QueryOptions) -> Self {
        Self {
            chunk_size: options.chunk_size,
            offset: options.offset,
            ..Self::default()
        }
    }

    /// Whether the service has skipped at least `offset` records
    pub fn offset_satisfied(&self) -> bool {
        self.skipped_so_far >= self.offset
    }

    /// Records still to be skipped, if any
    pub fn remaining_offset(&self) -> Option<usize> {
        self.offset
            .checked_sub(self.skipped_so_far)
            .filter(|remaining| *remaining > 0)
    }

    /// Account for skipped records
    ///
    /// Returns true exactly once: on the call that satisfies the offset.
    pub fn record_skipped(&mut self, skipped: usize) -> bool {
        self.skipped_so_far += skipped;
        if self.offset_satisfied() && !self.skip_cursor_added {
            self.skip_cursor_added = true;
            return true;
        }
        false
    }

    /// Whether a load that has appended `fetched` records must keep going
    pub fn needs_more(&self, count: FetchCount, fetched: usize) -> bool {
        !self.offset_satisfied() || fetched < count.minimum()
    }

    /// Hint for a continuation issued while a load is still filling up
    pub fn continuation_hint(&self, count: FetchCount, fetched: usize) -> FetchHint {
        let count_hint = match count {
            FetchCount::Exactly(n) if n > 0 => {
                let wanted = n.saturating_sub(fetched);
                Some(self.chunk_size.map_or(wanted, |chunk| chunk.max(wanted)))
                    .filter(|c| *c > 0)
            }
            _ => self.chunk_size,
        };
        FetchHint::new(count_hint, self.remaining_offset())
    }

    /// Hint for the prefetch issued at the end of a load
    pub fn prefetch_hint(&self) -> FetchHint {
        FetchHint::new(self.chunk_size, None)
    }
}
