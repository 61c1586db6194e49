use crate::error::ApiError;
use chrono::{DateTime, NaiveDateTime, Utc};
use core_types::{CoreError, NewReading, Reading, validate_meter_number, validate_reading_value};
use serde::{Deserialize, Serialize};

// Using `#[serde(rename_all = "camelCase")]` to automatically map from JSON camelCase to Rust snake_case.

/// The response from the recognition service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    pub meter_number: String,
    pub reading: f64,
}

impl RecognitionResult {
    /// Validates the recognized values before they become a reading.
    pub fn into_new_reading(self, photo: Option<String>) -> Result<NewReading, CoreError> {
        NewReading::new(&self.meter_number, self.reading, photo)
    }
}

/// A reading as the persistence service stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRecord {
    pub id: String,
    pub meter_number: String,
    pub reading: f64,
    pub timestamp: Option<String>,
    pub photo_url: Option<String>,
}

impl TryFrom<ReadingRecord> for Reading {
    type Error = ApiError;

    fn try_from(record: ReadingRecord) -> Result<Self, Self::Error> {
        let invalid = |e: CoreError| ApiError::InvalidData(format!("record {}: {e}", record.id));

        let meter_number = validate_meter_number(&record.meter_number).map_err(invalid)?;
        let value = validate_reading_value(record.reading).map_err(invalid)?;
        let timestamp = record
            .timestamp
            .as_deref()
            .ok_or_else(|| ApiError::InvalidData(format!("record {} has no timestamp", record.id)))
            .and_then(parse_timestamp)?;

        Ok(Reading {
            id: record.id,
            meter_number,
            value,
            timestamp,
            photo: record.photo_url,
        })
    }
}

/// `GET` response of the persistence service.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingListResponse {
    pub readings: Vec<ReadingRecord>,
}

/// `POST` response of the persistence service.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedReadingResponse {
    pub reading: ReadingRecord,
}

/// The `POST` body understood by the persistence service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReadingRequest<'a> {
    pub meter_number: &'a str,
    pub reading: u64,
    pub photo_url: Option<&'a str>,
    pub user_id: &'a str,
}

/// The error body both services return on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Parses an ISO-8601 timestamp.
///
/// RFC 3339 strings keep their offset. Strings without an offset, as produced
/// by a naive `isoformat()`, are taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| ApiError::InvalidData(format!("invalid timestamp {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(reading: f64, timestamp: Option<&str>) -> ReadingRecord {
        ReadingRecord {
            id: "17".into(),
            meter_number: "EM-2024-001".into(),
            reading,
            timestamp: timestamp.map(str::to_string),
            photo_url: Some("https://cdn/p.jpg".into()),
        }
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_timestamp("2024-10-15T12:30:00+03:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 10, 15, 9, 30, 0).unwrap());
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let parsed = parse_timestamp("2024-10-15T09:30:00.123456").unwrap();
        assert_eq!(parsed.timestamp(), Utc.with_ymd_and_hms(2024, 10, 15, 9, 30, 0).unwrap().timestamp());
        assert_eq!(parsed.timestamp_subsec_micros(), 123456);

        assert!(parse_timestamp("2024-10-15T09:30:00").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn record_converts_to_reading() {
        let reading = Reading::try_from(record(12850.0, Some("2024-10-15T09:30:00Z"))).unwrap();

        assert_eq!(reading.id, "17");
        assert_eq!(reading.value, 12850);
        assert_eq!(reading.photo.as_deref(), Some("https://cdn/p.jpg"));
    }

    #[test]
    fn record_without_timestamp_is_invalid() {
        assert!(matches!(
            Reading::try_from(record(1.0, None)),
            Err(ApiError::InvalidData(_))
        ));
    }

    #[test]
    fn record_with_negative_value_is_invalid() {
        assert!(matches!(
            Reading::try_from(record(-3.0, Some("2024-10-15T09:30:00Z"))),
            Err(ApiError::InvalidData(_))
        ));
    }

    #[test]
    fn recognition_result_is_validated() {
        let ok = RecognitionResult { meter_number: "AM123V".into(), reading: 4821.0 };
        assert_eq!(ok.into_new_reading(None).unwrap().value, 4821);

        let empty = RecognitionResult { meter_number: " ".into(), reading: 4821.0 };
        assert!(empty.into_new_reading(None).is_err());

        let negative = RecognitionResult { meter_number: "AM123V".into(), reading: -1.0 };
        assert!(negative.into_new_reading(None).is_err());
    }
}
