//! Coupon card view model and text rendering.

use std::fmt::Write;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{CouponRecord, FieldNames};
use crate::presentation::CategoryFilter;

/// Shown in place of cards when nothing passes the filter.
pub const NO_RESULTS: &str = "No coupons found for this category.";

/// Default badge threshold: roughly 30% of cards get a badge.
pub const DEFAULT_BADGE_THRESHOLD: f64 = 0.7;

/// Decides which cards carry the "exclusive" badge.
///
/// A card gets the badge when a draw in `[0, 1)` exceeds the threshold.
#[derive(Debug, Clone)]
pub struct BadgePicker {
    threshold: f64,
    rng: StdRng,
}

impl BadgePicker {
    /// Deterministic picker.
    pub fn seeded(threshold: f64, seed: u64) -> Self {
        Self {
            threshold,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Picker that never awards a badge.
    pub fn disabled() -> Self {
        Self::seeded(1.0, 0)
    }

    pub fn pick(&mut self) -> bool {
        self.rng.r#gen::<f64>() > self.threshold
    }
}

impl Default for BadgePicker {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Display fields of one coupon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponCard<'a> {
    pub store: &'a str,
    pub discount: &'a str,
    pub category: &'a str,
    pub validity: &'a str,
    pub code: &'a str,
    pub link: &'a str,
    pub exclusive: bool,
}

impl<'a> CouponCard<'a> {
    pub fn from_record(
        record: &'a CouponRecord,
        fields: &'a FieldNames,
        exclusive: bool,
    ) -> Self {
        let validity = match record.field(&fields.validity) {
            "" => fields.validity_fallback.as_str(),
            v => v,
        };
        Self {
            store: record.field(&fields.store),
            discount: record.field(&fields.discount),
            category: record.field(&fields.category),
            validity,
            code: record.field(&fields.code),
            link: record.field(&fields.link),
            exclusive,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.exclusive {
            out.push_str("[EXCLUSIVE]\n");
        }
        let _ = writeln!(out, "{}", self.store);
        let _ = writeln!(out, "  Discount: {}", self.discount);
        let _ = writeln!(out, "  Category: {}", self.category);
        let _ = writeln!(out, "  Valid:    {}", self.validity);
        let _ = writeln!(out, "  Code:     {}", self.code);
        if !self.link.is_empty() {
            let _ = writeln!(out, "  Offer:    {}", self.link);
        }
        out
    }
}

/// Render the filtered card list, or [`NO_RESULTS`] when it is empty.
pub fn render_cards(
    records: &[CouponRecord],
    filter: &CategoryFilter,
    fields: &FieldNames,
    badges: &mut BadgePicker,
) -> String {
    let visible = filter.apply(records, &fields.category);
    if visible.is_empty() {
        return format!("{}\n", NO_RESULTS);
    }

    visible
        .into_iter()
        .map(|record| CouponCard::from_record(record, fields, badges.pick()).render())
        .collect::<Vec<_>>()
        .join("\n")
}
