//! Change detection between feed snapshots.
//!
//! A refresh only commits when the parsed records differ from what is already
//! held. Equality is exact and order-sensitive: a reordered sheet is a change.

use crate::models::{CouponRecord, Snapshot};

/// Decides whether a candidate snapshot carries anything new.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn new() -> Self {
        Self
    }

    /// `true` when `candidate` holds exactly the records of `previous`, in order.
    ///
    /// With no previous snapshot the candidate is always a change.
    pub fn is_unchanged(&self, previous: Option<&Snapshot>, candidate: &Snapshot) -> bool {
        match previous {
            Some(previous) => previous.records() == candidate.records(),
            None => false,
        }
    }

    /// Row-level summary of what moved, for diagnostics.
    pub fn summarize(&self, previous: Option<&Snapshot>, candidate: &Snapshot) -> SnapshotDiff {
        let empty: &[CouponRecord] = &[];
        let before = previous.map_or(empty, Snapshot::records);
        let after = candidate.records();

        let changed_rows = before
            .iter()
            .zip(after)
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect();

        SnapshotDiff {
            previous_count: before.len(),
            current_count: after.len(),
            changed_rows,
        }
    }
}

/// Diagnostic summary of a snapshot change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub previous_count: usize,
    pub current_count: usize,
    /// Positions present in both snapshots whose record differs
    pub changed_rows: Vec<usize>,
}

impl SnapshotDiff {
    /// Rows added (positive) or removed (negative) at the tail.
    pub fn row_delta(&self) -> isize {
        self.current_count as isize - self.previous_count as isize
    }
}

/// Convenience function for the default detector.
pub fn is_unchanged(previous: Option<&Snapshot>, candidate: &Snapshot) -> bool {
    ChangeDetector::new().is_unchanged(previous, candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_coupon(store: &str, code: &str) -> CouponRecord {
        [("nome da loja", store), ("cupom", code)].into_iter().collect()
    }

    fn snapshot(records: Vec<CouponRecord>) -> Snapshot {
        Snapshot::ingested(records, "raw", Utc::now())
    }

    #[test]
    fn test_no_previous_is_change() {
        let candidate = snapshot(vec![]);
        assert!(!is_unchanged(None, &candidate));
    }

    #[test]
    fn test_identical_records_unchanged() {
        let prev = snapshot(vec![make_coupon("A", "X1"), make_coupon("B", "Y2")]);
        let curr = snapshot(vec![make_coupon("A", "X1"), make_coupon("B", "Y2")]);
        assert!(is_unchanged(Some(&prev), &curr));
    }

    #[test]
    fn test_metadata_is_ignored() {
        let records = vec![make_coupon("A", "X1")];
        let prev = Snapshot::ingested(records.clone(), "first body", Utc::now());
        let curr = Snapshot::ingested(records, "second body", Utc::now());
        assert_ne!(prev.fingerprint(), curr.fingerprint());
        assert!(is_unchanged(Some(&prev), &curr));
    }

    #[test]
    fn test_reorder_is_change() {
        let prev = snapshot(vec![make_coupon("A", "X1"), make_coupon("B", "Y2")]);
        let curr = snapshot(vec![make_coupon("B", "Y2"), make_coupon("A", "X1")]);
        assert!(!is_unchanged(Some(&prev), &curr));
    }

    #[test]
    fn test_case_and_whitespace_are_not_normalized() {
        let prev = snapshot(vec![make_coupon("Acme", "X1")]);
        let curr = snapshot(vec![make_coupon("ACME", "X1")]);
        assert!(!is_unchanged(Some(&prev), &curr));
    }

    #[test]
    fn test_summary_counts() {
        let prev = snapshot(vec![make_coupon("A", "X1"), make_coupon("B", "Y2")]);
        let curr = snapshot(vec![
            make_coupon("A", "X1"),
            make_coupon("B", "CHANGED"),
            make_coupon("C", "Z3"),
        ]);

        let diff = ChangeDetector::new().summarize(Some(&prev), &curr);
        assert_eq!(diff.changed_rows, vec![1]);
        assert_eq!(diff.row_delta(), 1);
    }

    #[test]
    fn test_summary_from_nothing() {
        let curr = snapshot(vec![make_coupon("A", "X1")]);
        let diff = ChangeDetector::new().summarize(None, &curr);
        assert_eq!(diff.previous_count, 0);
        assert_eq!(diff.current_count, 1);
        assert!(diff.changed_rows.is_empty());
    }
}
