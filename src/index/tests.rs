//! Tests for index usage module

use super::*;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;

fn by_owner() -> Index {
    Index::new(1, "Task", ["owner", "-created"])
}

fn by_status() -> Index {
    Index::new(2, "Task", ["status"])
}

fn owner_shape() -> QueryShape {
    QueryShape::kind("Task").filter("owner").order("created")
}

// ============================================================================
// Type Tests
// ============================================================================

#[test]
fn test_query_shape_builder() {
    let shape = owner_shape();
    assert_eq!(shape.kind, "Task");
    assert_eq!(shape.filters, vec!["owner".to_string()]);
    assert_eq!(shape.orders, vec!["created".to_string()]);
}

#[test]
fn test_index_info_constructors() {
    assert!(!IndexInfo::used(by_owner(), owner_shape()).only_use_if_required);
    assert!(IndexInfo::required(by_owner(), owner_shape()).only_use_if_required);
}

#[test]
fn test_index_info_deserialize() {
    let info: IndexInfo = serde_json::from_value(serde_json::json!({
        "index": {"id": 9, "kind": "Task", "properties": ["a"]},
        "shape": {"kind": "Task", "filters": ["a"]}
    }))
    .unwrap();
    assert_eq!(info.index.id, 9);
    assert!(info.shape.orders.is_empty());
    assert!(!info.only_use_if_required);
}

// ============================================================================
// Recorder Tests
// ============================================================================

#[test]
fn test_recorder_starts_empty() {
    let recorder = IndexUsageRecorder::new();
    assert!(recorder.is_empty());
    assert!(recorder.snapshot().is_empty());
}

#[test]
fn test_recorder_ignores_regular_indexes() {
    let recorder = IndexUsageRecorder::new();
    recorder.record(&[IndexInfo::used(by_owner(), owner_shape())]);
    assert!(recorder.is_empty());
}

#[test]
fn test_recorder_groups_indexes_by_shape() {
    let recorder = IndexUsageRecorder::new();
    recorder.record(&[
        IndexInfo::required(by_owner(), owner_shape()),
        IndexInfo::required(by_status(), owner_shape()),
        IndexInfo::required(by_status(), QueryShape::kind("Task").filter("status")),
    ]);

    let usages = recorder.snapshot();
    assert_eq!(usages.len(), 2);

    let owner = usages
        .iter()
        .find(|usage| usage.shape == owner_shape())
        .unwrap();
    let expected: BTreeSet<Index> = [by_owner(), by_status()].into_iter().collect();
    assert_eq!(owner.indexes, expected);
    assert_eq!(owner.count, 1);
}

#[test]
fn test_recorder_counts_repeats() {
    let recorder = IndexUsageRecorder::new();
    let observed = [IndexInfo::required(by_owner(), owner_shape())];

    recorder.record(&observed);
    recorder.record(&observed);
    recorder.record(&observed);

    let usages = recorder.snapshot();
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].count, 3);
    assert!(usages[0].last_seen >= usages[0].first_seen);
}

#[test]
fn test_recorder_concurrent_appends() {
    let recorder = Arc::new(IndexUsageRecorder::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let recorder = Arc::clone(&recorder);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    recorder.record(&[IndexInfo::required(by_owner(), owner_shape())]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(recorder.snapshot()[0].count, 200);
}

#[test]
fn test_global_recorder_is_shared() {
    let a = IndexUsageRecorder::global();
    let b = IndexUsageRecorder::global();
    assert!(Arc::ptr_eq(&a, &b));
}
