//! # Meter Tracker Events
//!
//! This crate defines the change events the reading store publishes to its
//! subscribers: the WebSocket clients of the web server and the Telegram alerter.
//!
//! It depends only on `core-types` and is the definitive language for real-time
//! state synchronization.

pub mod error;
pub mod messages;

pub use error::EventsError;
pub use messages::WsMessage;
