//! # Meter Tracker Core Types
//!
//! The foundational data structures shared by every other crate in the workspace.
//! This crate has no knowledge of HTTP, storage or analytics; it only knows what a
//! meter reading is and which raw inputs are acceptable for building one.

pub mod error;
pub mod structs;
pub mod validation;

// Re-export the core types to provide a clean public API.
pub use error::CoreError;
pub use structs::{NewReading, Reading};
pub use validation::{validate_meter_number, validate_reading_value};
