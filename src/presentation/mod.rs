//! Presentation boundary.
//!
//! The pipeline only talks to a [`Presenter`]. Everything here works on
//! plain data so it can be driven from a terminal, a web view, or a test.

mod card;
mod filter;

use std::sync::Mutex;

pub use card::{BadgePicker, CouponCard, DEFAULT_BADGE_THRESHOLD, NO_RESULTS, render_cards};
pub use filter::{ALL, CategoryFilter};

use crate::models::{FieldNames, Snapshot};

/// Receiver of pipeline output.
pub trait Presenter: Send + Sync {
    /// A snapshot is ready to show (fresh, cached, or fallback).
    fn on_snapshot_ready(&self, snapshot: &Snapshot);

    /// The category set may have changed.
    fn on_categories_ready(&self, categories: &[String]);
}

struct ConsoleState {
    filter: CategoryFilter,
    badges: BadgePicker,
}

/// Prints the card list to stdout.
pub struct ConsolePresenter {
    fields: FieldNames,
    preferred: Option<String>,
    state: Mutex<ConsoleState>,
}

impl ConsolePresenter {
    pub fn new(fields: FieldNames) -> Self {
        Self {
            fields,
            preferred: None,
            state: Mutex::new(ConsoleState {
                filter: CategoryFilter::new(),
                badges: BadgePicker::disabled(),
            }),
        }
    }

    /// Category to select once it is offered.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.preferred = Some(category.into());
        self
    }

    pub fn with_badges(self, badges: BadgePicker) -> Self {
        self.lock().badges = badges;
        self
    }

    /// Render a snapshot with the current filter.
    pub fn render(&self, snapshot: &Snapshot) -> String {
        let mut state = self.lock();
        let ConsoleState { filter, badges } = &mut *state;
        render_cards(snapshot.records(), filter, &self.fields, badges)
    }

    /// Summary line printed above the cards.
    pub fn header(&self, snapshot: &Snapshot) -> String {
        if snapshot.is_empty() {
            return "── no coupons available ──".to_string();
        }
        let state = self.lock();
        let options = state
            .filter
            .options()
            .map(|option| {
                if option == state.filter.selected() {
                    format!("[{}]", option)
                } else {
                    option.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" | ");
        format!(
            "── {} coupon(s) · {} · updated {} ──",
            snapshot.len(),
            options,
            snapshot.last_updated().format("%Y-%m-%d %H:%M:%S UTC")
        )
    }

    /// Currently selected category.
    pub fn selected(&self) -> String {
        self.lock().filter.selected().to_string()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Presenter for ConsolePresenter {
    fn on_snapshot_ready(&self, snapshot: &Snapshot) {
        println!("{}", self.header(snapshot));
        print!("{}", self.render(snapshot));
    }

    fn on_categories_ready(&self, categories: &[String]) {
        let mut state = self.lock();
        state.filter.set_categories(categories);
        if let Some(preferred) = &self.preferred {
            if state.filter.selected() == ALL && !state.filter.select(preferred) {
                log::debug!("Category '{}' not in feed yet", preferred);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::Presenter;
    use crate::models::{CouponRecord, Snapshot};

    /// Presenter that records every notification.
    #[derive(Default)]
    pub(crate) struct RecordingPresenter {
        snapshots: Mutex<Vec<Vec<CouponRecord>>>,
        categories: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingPresenter {
        pub(crate) fn snapshot_calls(&self) -> usize {
            self.snapshots.lock().unwrap().len()
        }

        pub(crate) fn category_calls(&self) -> usize {
            self.categories.lock().unwrap().len()
        }

        pub(crate) fn last_records(&self) -> Option<Vec<CouponRecord>> {
            self.snapshots.lock().unwrap().last().cloned()
        }

        pub(crate) fn last_categories(&self) -> Option<Vec<String>> {
            self.categories.lock().unwrap().last().cloned()
        }
    }

    impl Presenter for RecordingPresenter {
        fn on_snapshot_ready(&self, snapshot: &Snapshot) {
            self.snapshots
                .lock()
                .unwrap()
                .push(snapshot.records().to_vec());
        }

        fn on_categories_ready(&self, categories: &[String]) {
            self.categories.lock().unwrap().push(categories.to_vec());
        }
    }
}
