//! # Meter Tracker Analytics Engine
//!
//! This crate turns a snapshot of meter readings into the views the rest of the
//! system presents: the newest-first history table with per-row deltas, the
//! per-meter consumption statistics and the spreadsheet export.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** This crate has no knowledge of external systems. It depends
//!   only on `core-types`.
//! - **Stateless Calculation:** The `AnalyticsEngine` never owns readings. Every
//!   call borrows an immutable snapshot and returns freshly built values, so
//!   concurrent callers with different snapshots cannot affect each other.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: history view, statistics and export.
//! - `HistoryRow`, `MeterStatistics`, `StatisticsReport`: the output shapes.
//! - `EXPORT_DELIMITER`, `export_file_name`: the fixed export conventions.
//! - `AnalyticsError`: the specific error types that can be returned from this crate.

pub mod engine;
pub mod error;
pub mod export;
pub mod report;

pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use export::{EXPORT_DELIMITER, export_file_name};
pub use report::{HistoryRow, MeterStatistics, StatisticsReport};
