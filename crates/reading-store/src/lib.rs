//! # Meter Tracker Reading Store
//!
//! The single owner of the canonical reading collection. Presentation layers read
//! snapshots and derived views from it and send it commands; they never hold the
//! collection themselves.
//!
//! ## Public API
//!
//! - `ReadingStore`: the collection plus the record/update/delete commands and the
//!   history, statistics and export views.
//! - `StoreError`: validation, missing id and duplicate id failures.

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::ReadingStore;
