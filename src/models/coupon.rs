//! Coupon records, snapshots, and the persisted cache entry.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::utils::hash::fingerprint;

/// One spreadsheet row, keyed by header name in header order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponRecord(IndexMap<String, String>);

impl CouponRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. A repeated header keeps its first position and takes the new value.
    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        self.0.insert(header.into(), value.into());
    }

    /// Field value for a header, if the header exists.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.0.get(header).map(String::as_str)
    }

    /// Field value for a header, or an empty string when absent.
    pub fn field(&self, header: &str) -> &str {
        self.get(header).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// Column order is part of a record's identity, so compare entry by entry.
impl PartialEq for CouponRecord {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().eq(other.0.iter())
    }
}

impl Eq for CouponRecord {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CouponRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// An immutable, ordered set of records plus ingestion metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    records: Vec<CouponRecord>,
    last_updated: DateTime<Utc>,
    fingerprint: String,
}

impl Snapshot {
    /// Build a snapshot from freshly parsed records and the raw body they came from.
    pub fn ingested(records: Vec<CouponRecord>, raw: &str, at: DateTime<Utc>) -> Self {
        Self {
            records,
            last_updated: at,
            fingerprint: fingerprint(raw),
        }
    }

    pub fn from_parts(
        records: Vec<CouponRecord>,
        last_updated: DateTime<Utc>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            records,
            last_updated,
            fingerprint: fingerprint.into(),
        }
    }

    /// Snapshot with no records, used to present an explicit empty state.
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self::from_parts(Vec::new(), at, "")
    }

    pub fn records(&self) -> &[CouponRecord] {
        &self.records
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the snapshot is younger than `max_age` at `now`.
    ///
    /// A timestamp in the future (clock skew) counts as fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match now.signed_duration_since(self.last_updated).to_std() {
            Ok(age) => age < max_age,
            Err(_) => true,
        }
    }

    /// Unique, non-empty values of `field`, sorted.
    pub fn categories(&self, field: &str) -> Vec<String> {
        categories(&self.records, field)
    }
}

/// Unique, non-empty (after trimming) values of `field`, sorted.
pub fn categories(records: &[CouponRecord], field: &str) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.get(field))
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Persisted form of the last-known-good snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    #[serde(default)]
    pub data: Option<Vec<CouponRecord>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

impl CacheEntry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Turn the entry back into a snapshot. Returns `None` when it holds no data.
    ///
    /// A missing timestamp becomes the Unix epoch so the snapshot is always stale.
    pub fn to_snapshot(&self) -> Option<Snapshot> {
        let records = self.data.clone()?;
        Some(Snapshot::from_parts(
            records,
            self.last_updated.unwrap_or(DateTime::UNIX_EPOCH),
            self.fingerprint.clone().unwrap_or_default(),
        ))
    }
}

impl From<&Snapshot> for CacheEntry {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            data: Some(snapshot.records.clone()),
            last_updated: Some(snapshot.last_updated),
            fingerprint: Some(snapshot.fingerprint.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn coupon(store: &str, category: &str) -> CouponRecord {
        [("nome da loja", store), ("Categoria", category)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_duplicate_header_keeps_position() {
        let mut record = CouponRecord::new();
        record.insert("a", "1");
        record.insert("b", "2");
        record.insert("a", "3");

        let entries: Vec<_> = record.iter().collect();
        assert_eq!(entries, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_column_order_matters() {
        let ab: CouponRecord = [("a", "1"), ("b", "2")].into_iter().collect();
        let ba: CouponRecord = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_categories_sorted_unique() {
        let records = vec![
            coupon("Loja A", "Moda"),
            coupon("Loja B", "Eletrônicos"),
            coupon("Loja C", "Moda"),
            coupon("Loja D", "  "),
            coupon("Loja E", ""),
        ];
        assert_eq!(categories(&records, "Categoria"), vec!["Eletrônicos", "Moda"]);
    }

    #[test]
    fn test_freshness_window() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let snapshot = Snapshot::ingested(vec![], "h\n", at);
        let max_age = Duration::from_secs(60);

        assert!(snapshot.is_fresh(at + chrono::Duration::seconds(59), max_age));
        assert!(!snapshot.is_fresh(at + chrono::Duration::seconds(60), max_age));
        assert!(snapshot.is_fresh(at - chrono::Duration::seconds(5), max_age));
    }

    #[test]
    fn test_cache_entry_json_shape() {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let snapshot = Snapshot::ingested(vec![coupon("Acme", "Moda")], "raw", at);
        let entry = CacheEntry::from(&snapshot);

        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("lastUpdated").is_some());
        assert_eq!(json["data"][0]["nome da loja"], "Acme");

        let back: CacheEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back.to_snapshot(), Some(snapshot));
    }

    #[test]
    fn test_empty_entry_has_no_snapshot() {
        let entry: CacheEntry = serde_json::from_str("{}").unwrap();
        assert_eq!(entry, CacheEntry::empty());
        assert!(entry.to_snapshot().is_none());
    }

    #[test]
    fn test_entry_without_timestamp_is_stale() {
        let entry = CacheEntry {
            data: Some(vec![coupon("Acme", "Moda")]),
            last_updated: None,
            fingerprint: None,
        };
        let snapshot = entry.to_snapshot().unwrap();
        assert!(!snapshot.is_fresh(Utc::now(), Duration::from_secs(3600)));
    }
}
