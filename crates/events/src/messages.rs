use crate::error::EventsError;
use chrono::{DateTime, Utc};
use core_types::Reading;
use serde::{Deserialize, Serialize};

/// The top-level event enum.
/// Every notification from the store to a subscriber is one of these variants.
///
/// Serialized with `#[serde(tag = "type", content = "payload")]`, so a new
/// reading travels as
/// `{ "type": "ReadingAdded", "payload": { "id": "...", "meterNumber": "...", ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WsMessage {
    /// A reading was recorded, either manually or through recognition.
    ReadingAdded(Reading),
    /// A reading's value or meter number was corrected.
    ReadingUpdated(Reading),
    /// A reading was removed.
    ReadingDeleted { id: String },
    /// The whole collection was replaced, for example after a reload from persistence.
    SnapshotReplaced { count: usize, at: DateTime<Utc> },
    /// Confirms to a new client that its WebSocket connection is active.
    Connected,
}

impl WsMessage {
    pub fn to_json(&self) -> Result<String, EventsError> {
        Ok(serde_json::to_string(self)?)
    }
}
