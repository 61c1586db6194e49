use crate::error::StoreError;
use analytics::{AnalyticsEngine, EXPORT_DELIMITER, HistoryRow, StatisticsReport};
use chrono::{DateTime, Utc};
use core_types::{NewReading, Reading, validate_meter_number, validate_reading_value};
use events::WsMessage;
use std::collections::HashSet;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Owns the canonical collection of readings and publishes every change.
///
/// The collection keeps the most recently added reading first, matching the
/// order a user entered them. That order only matters for readings sharing a
/// timestamp, which the history view keeps in collection order.
#[derive(Debug)]
pub struct ReadingStore {
    readings: Vec<Reading>,
    engine: AnalyticsEngine,
    events: broadcast::Sender<WsMessage>,
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new(AnalyticsEngine::default())
    }
}

impl ReadingStore {
    /// Creates an empty store that derives its views with `engine`.
    pub fn new(engine: AnalyticsEngine) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            readings: Vec::new(),
            engine,
            events,
        }
    }

    /// Subscribes to change events. Only events sent after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.events.subscribe()
    }

    /// The current snapshot, in collection order.
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Reading> {
        self.readings.iter().find(|r| r.id == id)
    }

    /// Stores a validated reading under a fresh id, stamped with the current time.
    pub fn record(&mut self, new: NewReading) -> Reading {
        self.record_at(new, Utc::now())
    }

    /// Same as [`record`](Self::record) with an explicit capture time.
    pub fn record_at(&mut self, new: NewReading, timestamp: DateTime<Utc>) -> Reading {
        let reading = Reading::from_new(new, timestamp);
        self.push_front(reading.clone());
        reading
    }

    /// Stores a reading that already carries an id, e.g. one returned by persistence.
    pub fn insert(&mut self, reading: Reading) -> Result<Reading, StoreError> {
        if self.get(&reading.id).is_some() {
            return Err(StoreError::DuplicateId(reading.id));
        }
        self.push_front(reading.clone());
        Ok(reading)
    }

    /// Replaces a reading's value and meter number, keeping id, timestamp and photo.
    ///
    /// Both inputs are validated before anything is looked up or changed, so a
    /// failed call leaves the collection exactly as it was.
    pub fn update_reading(
        &mut self,
        id: &str,
        new_value: f64,
        new_meter_number: &str,
    ) -> Result<Reading, StoreError> {
        let value = validate_reading_value(new_value)?;
        let meter_number = validate_meter_number(new_meter_number)?;

        let slot = self
            .readings
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let updated = Reading {
            value,
            meter_number,
            ..slot.clone()
        };
        *slot = updated.clone();

        tracing::info!(id, value, meter = %updated.meter_number, "Reading updated.");
        self.publish(WsMessage::ReadingUpdated(updated.clone()));
        Ok(updated)
    }

    /// Removes the reading with `id`. A missing id is reported, not ignored.
    pub fn delete_reading(&mut self, id: &str) -> Result<Reading, StoreError> {
        let index = self
            .readings
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let removed = self.readings.remove(index);
        tracing::info!(id, meter = %removed.meter_number, "Reading deleted.");
        self.publish(WsMessage::ReadingDeleted { id: removed.id.clone() });
        Ok(removed)
    }

    /// Swaps in a fresh snapshot. Later duplicates of an id are dropped.
    ///
    /// Returns the number of readings kept.
    pub fn replace_all(&mut self, readings: Vec<Reading>) -> usize {
        let mut seen = HashSet::with_capacity(readings.len());
        let mut kept = Vec::with_capacity(readings.len());
        for reading in readings {
            if seen.insert(reading.id.clone()) {
                kept.push(reading);
            } else {
                tracing::warn!(id = %reading.id, "Dropping reading with duplicate id from snapshot.");
            }
        }

        self.readings = kept;
        let count = self.readings.len();
        tracing::info!(count, "Reading snapshot replaced.");
        self.publish(WsMessage::SnapshotReplaced { count, at: Utc::now() });
        count
    }

    pub fn history_view(&self) -> Vec<HistoryRow> {
        self.engine.derive_history_view(&self.readings)
    }

    pub fn statistics(&self) -> StatisticsReport {
        self.engine.compute_statistics(&self.readings)
    }

    /// Exports the collection with the fixed `;` delimiter.
    pub fn export(&self) -> Result<String, StoreError> {
        Ok(self
            .engine
            .export_to_delimited_text(&self.readings, EXPORT_DELIMITER)?)
    }

    fn push_front(&mut self, reading: Reading) {
        tracing::info!(
            id = %reading.id,
            meter = %reading.meter_number,
            value = reading.value,
            "Reading recorded."
        );
        self.readings.insert(0, reading.clone());
        self.publish(WsMessage::ReadingAdded(reading));
    }

    fn publish(&self, event: WsMessage) {
        // An error only means nobody is subscribed right now.
        if self.events.send(event).is_err() {
            tracing::trace!("No subscribers for store event.");
        }
    }
}
