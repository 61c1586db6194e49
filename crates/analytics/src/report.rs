use chrono::{DateTime, Utc};
use core_types::Reading;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of the history table: a reading plus its change against the row below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    #[serde(flatten)]
    pub reading: Reading,
    /// `None` when the next older row belongs to another meter or there is no older row.
    /// Negative values signal a counter rollback or a bad reading.
    pub delta: Option<i64>,
}

/// Consumption figures for a single meter over the observed period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterStatistics {
    pub meter_number: String,
    /// Last value minus first value, by time. Negative on rollback.
    pub total_consumption: i64,
    pub elapsed_days: Decimal,
    /// Zero whenever `elapsed_days` is not positive.
    pub average_per_day: Decimal,
    pub readings_count: usize,
    pub last_value: u64,
    pub first_timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
    /// `total_consumption` relative to the report's `max_consumption`, clamped to `[0, 1]`.
    pub share_of_max: Decimal,
}

/// Per-meter statistics plus the aggregate totals shown in the summary cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReport {
    /// Sorted by meter number.
    pub meters: Vec<MeterStatistics>,
    pub total_readings: usize,
    pub meter_count: usize,
    pub total_consumption: i64,
    /// The largest per-meter consumption, never below 1.
    pub max_consumption: i64,
}

impl StatisticsReport {
    /// Creates an empty report. This is the result for an empty snapshot.
    pub fn new() -> Self {
        Self {
            meters: Vec::new(),
            total_readings: 0,
            meter_count: 0,
            total_consumption: 0,
            max_consumption: 1,
        }
    }

    pub fn meter(&self, meter_number: &str) -> Option<&MeterStatistics> {
        self.meters.iter().find(|m| m.meter_number == meter_number)
    }
}

impl Default for StatisticsReport {
    fn default() -> Self {
        Self::new()
    }
}
