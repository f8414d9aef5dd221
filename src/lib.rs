// src/lib.rs

//! Coupon feed library
//!
//! Fetches a published coupon spreadsheet as CSV, keeps the last good copy
//! on disk, and hands snapshots to a presentation layer.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod presentation;
pub mod services;
pub mod storage;
pub mod utils;
