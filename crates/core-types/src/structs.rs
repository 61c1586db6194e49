use crate::error::CoreError;
use crate::validation::{validate_meter_number, validate_reading_value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single timestamped energy-counter observation for one meter.
///
/// Readings are values: the store replaces a reading wholesale when it is
/// edited and never hands out mutable references to a stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Unique across the whole collection, independent of the meter.
    pub id: String,
    /// Groups readings belonging to the same physical meter. Compared byte for byte.
    pub meter_number: String,
    /// Cumulative counter value in kWh.
    #[serde(rename = "reading")]
    pub value: u64,
    pub timestamp: DateTime<Utc>,
    /// Opaque reference to the source photo, never interpreted.
    #[serde(rename = "photoUrl", default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl Reading {
    /// Builds a stored reading from a validated `NewReading`, assigning a fresh id.
    pub fn from_new(new: NewReading, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            meter_number: new.meter_number,
            value: new.value,
            timestamp,
            photo: new.photo,
        }
    }
}

/// A validated reading that has not been assigned an id or timestamp yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReading {
    pub meter_number: String,
    #[serde(rename = "reading")]
    pub value: u64,
    #[serde(rename = "photoUrl", skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl NewReading {
    /// Validates raw input. The meter number is stored trimmed.
    pub fn new(meter_number: &str, raw_value: f64, photo: Option<String>) -> Result<Self, CoreError> {
        let meter_number = validate_meter_number(meter_number)?;
        let value = validate_reading_value(raw_value)?;
        Ok(Self {
            meter_number,
            value,
            photo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reading_uses_persistence_field_names() {
        let reading = Reading {
            id: "1".to_string(),
            meter_number: "EM-2024-001".to_string(),
            value: 12340,
            timestamp: Utc.with_ymd_and_hms(2024, 10, 1, 10, 0, 0).unwrap(),
            photo: None,
        };

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["meterNumber"], "EM-2024-001");
        assert_eq!(json["reading"], 12340);
        assert_eq!(json["timestamp"], "2024-10-01T10:00:00Z");
        assert!(json.get("photoUrl").is_none());
    }

    #[test]
    fn new_reading_validates_before_construction() {
        assert!(NewReading::new("EM-1", -1.0, None).is_err());
        assert!(NewReading::new("   ", 10.0, None).is_err());

        let new = NewReading::new(" EM-1 ", 10.0, Some("photo.jpg".into())).unwrap();
        assert_eq!(new.meter_number, "EM-1");
        assert_eq!(new.value, 10);
    }

    #[test]
    fn from_new_assigns_distinct_ids() {
        let new = NewReading::new("EM-1", 10.0, None).unwrap();
        let now = Utc::now();
        let a = Reading::from_new(new.clone(), now);
        let b = Reading::from_new(new, now);
        assert_ne!(a.id, b.id);
        assert_eq!(a.timestamp, now);
    }
}
