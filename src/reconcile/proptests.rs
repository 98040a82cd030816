//! Property-based tests for delta reconciliation

use super::DeltaReconciler;
use proptest::prelude::*;

/// Snapshots where each one extends the previous
fn arb_growing_snapshots() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-zA-Z0-9 ,.é東]{0,8}", 1..12).prop_map(|pieces| {
        let mut current = String::new();
        pieces
            .into_iter()
            .map(|piece| {
                current.push_str(&piece);
                current.clone()
            })
            .collect()
    })
}

/// Arbitrary snapshots with no extension guarantee
fn arb_any_snapshots() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-c ]{0,6}", 1..12)
}

proptest! {
    #[test]
    fn prop_chunks_concatenate_to_final(snapshots in arb_growing_snapshots()) {
        let mut reconciler = DeltaReconciler::new();
        let mut output = String::new();
        for snapshot in &snapshots {
            if let Some(chunk) = reconciler.push(snapshot) {
                output.push_str(&chunk);
            }
        }

        let last = snapshots.last().cloned().unwrap_or_default();
        prop_assert_eq!(&output, &last);
        prop_assert_eq!(reconciler.fallbacks(), 0);
        prop_assert_eq!(reconciler.finish(), last);
    }

    #[test]
    fn prop_final_content_is_last_snapshot(snapshots in arb_any_snapshots()) {
        let mut reconciler = DeltaReconciler::new();
        for snapshot in &snapshots {
            if let Some(chunk) = reconciler.push(snapshot) {
                prop_assert!(!chunk.is_empty());
            }
        }
        let last = snapshots.last().cloned().unwrap_or_default();
        prop_assert_eq!(reconciler.finish(), last);
    }

    #[test]
    fn prop_output_always_ends_with_last_nonempty_snapshot(snapshots in arb_any_snapshots()) {
        let mut reconciler = DeltaReconciler::new();
        let mut output = String::new();
        for snapshot in &snapshots {
            if let Some(chunk) = reconciler.push(snapshot) {
                output.push_str(&chunk);
            }
        }
        let last = snapshots.last().cloned().unwrap_or_default();
        prop_assert!(output.ends_with(&last));
    }
}
