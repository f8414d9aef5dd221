//! Category filter state.
//!
//! The filter is plain data: the option list is replaced whenever categories
//! change, and the current selection survives as long as it is still offered.

use crate::models::CouponRecord;

/// Option that matches every record.
pub const ALL: &str = "All";

#[derive(Debug, Clone)]
pub struct CategoryFilter {
    options: Vec<String>,
    selected: String,
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self {
            options: Vec::new(),
            selected: ALL.to_string(),
        }
    }
}

impl CategoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the offered categories. A selection that disappeared falls back to [`ALL`].
    pub fn set_categories(&mut self, categories: &[String]) {
        self.options = categories.to_vec();
        if !self.is_offered(&self.selected) {
            log::debug!(
                "Category '{}' no longer offered, showing all",
                self.selected
            );
            self.selected = ALL.to_string();
        }
    }

    /// Select a category. Returns `false` (and keeps the old selection) when it is not offered.
    pub fn select(&mut self, category: &str) -> bool {
        if !self.is_offered(category) {
            return false;
        }
        self.selected = category.to_string();
        true
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// All options, [`ALL`] first.
    pub fn options(&self) -> impl Iterator<Item = &str> {
        std::iter::once(ALL).chain(self.options.iter().map(String::as_str))
    }

    /// Whether a record's category passes the filter.
    pub fn matches(&self, category: &str) -> bool {
        self.selected == ALL || self.selected == category
    }

    /// Records passing the filter, in order.
    pub fn apply<'a>(
        &self,
        records: &'a [CouponRecord],
        category_field: &str,
    ) -> Vec<&'a CouponRecord> {
        records
            .iter()
            .filter(|r| self.matches(r.field(category_field)))
            .collect()
    }

    fn is_offered(&self, category: &str) -> bool {
        category == ALL || self.options.iter().any(|c| c == category)
    }
}
