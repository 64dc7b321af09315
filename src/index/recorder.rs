//! Index usage aggregation

use super::types::{Index, IndexInfo, QueryShape};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Destination for observed "use if required" indexes
///
/// Writes are append-only; implementations must tolerate the same
/// observation being recorded by many engines at once.
pub trait IndexUsageSink: Send + Sync {
    /// Record indexes consulted while executing one query
    fn record(&self, observed: &[IndexInfo]);
}

/// Aggregated usage of one index set by one query shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexUsage {
    /// Indexes consulted together
    pub indexes: BTreeSet<Index>,
    /// Query shape they served
    pub shape: QueryShape,
    /// Number of queries that reported this combination
    pub count: u64,
    /// First time it was reported
    pub first_seen: DateTime<Utc>,
    /// Most recent time it was reported
    pub last_seen: DateTime<Utc>,
}

type UsageKey = (BTreeSet<Index>, QueryShape);

#[derive(Debug, Clone)]
struct UsageEntry {
    count: u64,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

static GLOBAL: Lazy<Arc<IndexUsageRecorder>> = Lazy::new(|| Arc::new(IndexUsageRecorder::new()));

/// In-memory index usage recorder
#[derive(Debug, Default)]
pub struct IndexUsageRecorder {
    entries: Mutex<HashMap<UsageKey, UsageEntry>>,
}

impl IndexUsageRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide recorder engines report to by default
    pub fn global() -> Arc<IndexUsageRecorder> {
        Arc::clone(&GLOBAL)
    }

    /// All recorded combinations, ordered by shape then index set
    pub fn snapshot(&self) -> Vec<IndexUsage> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut usages: Vec<IndexUsage> = entries
            .iter()
            .map(|((indexes, shape), entry)| IndexUsage {
                indexes: indexes.clone(),
                shape: shape.clone(),
                count: entry.count,
                first_seen: entry.first_seen,
                last_seen: entry.last_seen,
            })
            .collect();
        usages.sort_by(|a, b| (&a.shape, &a.indexes).cmp(&(&b.shape, &b.indexes)));
        usages
    }

    /// Number of distinct (index set, shape) combinations
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IndexUsageSink for IndexUsageRecorder {
    fn record(&self, observed: &[IndexInfo]) {
        // Group by shape: every shape gets one key holding all its indexes.
        let mut by_shape: BTreeMap<&QueryShape, BTreeSet<Index>> = BTreeMap::new();
        for info in observed.iter().filter(|info| info.only_use_if_required) {
            by_shape
                .entry(&info.shape)
                .or_default()
                .insert(info.index.clone());
        }
        if by_shape.is_empty() {
            return;
        }

        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for (shape, indexes) in by_shape {
            debug!(kind = %shape.kind, indexes = indexes.len(), "Recording index usage");
            entries
                .entry((indexes, shape.clone()))
                .and_modify(|entry| {
                    entry.count += 1;
                    entry.last_seen = now;
                })
                .or_insert(UsageEntry {
                    count: 1,
                    first_seen: now,
                    last_seen: now,
                });
        }
    }
}
