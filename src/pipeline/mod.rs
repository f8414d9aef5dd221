//! Ingestion pipeline stages.
//!
//! - `parse`: CSV text to ordered records
//! - `diff`: record-level change detection
//! - `ingest`: the fetch / compare / persist / fallback cycle
//! - `scheduler`: periodic refresh loop

mod diff;
mod ingest;
mod parse;
mod scheduler;

pub use diff::{ChangeDetector, SnapshotDiff, is_unchanged};
pub use ingest::{IngestionPipeline, RefreshOutcome};
pub use parse::{CsvParser, parse_csv};
pub use scheduler::Scheduler;
