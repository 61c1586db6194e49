use crate::report::{HistoryRow, MeterStatistics, StatisticsReport};
use chrono::{FixedOffset, Offset, Utc};
use core_types::Reading;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// A stateless calculator for deriving history and consumption views from readings.
///
/// The only setting it carries is the offset used when rendering wall-clock
/// dates for export; the calculations themselves are offset independent.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsEngine {
    display_offset: FixedOffset,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self {
            display_offset: Utc.fix(),
        }
    }
}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine that renders export dates and times in `offset`.
    pub fn with_display_offset(offset: FixedOffset) -> Self {
        Self {
            display_offset: offset,
        }
    }

    pub fn display_offset(&self) -> FixedOffset {
        self.display_offset
    }

    /// Orders readings newest first and annotates each row with its delta.
    ///
    /// The sort is stable, so readings with equal timestamps keep their input
    /// order. A row's delta is taken against the row directly below it and only
    /// when that row belongs to the same meter. There is deliberately no search
    /// further back: when meters interleave in time, a row can get `None` even
    /// though an older reading of its meter exists.
    ///
    /// # Arguments
    ///
    /// * `readings` - A snapshot of readings in any order. It is not modified.
    pub fn derive_history_view(&self, readings: &[Reading]) -> Vec<HistoryRow> {
        let mut sorted: Vec<&Reading> = readings.iter().collect();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        sorted
            .iter()
            .enumerate()
            .map(|(index, reading)| {
                let delta = sorted
                    .get(index + 1)
                    .filter(|older| older.meter_number == reading.meter_number)
                    .map(|older| value_delta(reading.value, older.value));

                HistoryRow {
                    reading: (*reading).clone(),
                    delta,
                }
            })
            .collect()
    }

    /// Computes per-meter consumption statistics and the aggregate totals.
    ///
    /// Readings are grouped by exact meter number and each group is ordered by
    /// ascending timestamp (stable). Meters appear in ascending meter-number
    /// order. An empty snapshot yields an empty report.
    pub fn compute_statistics(&self, readings: &[Reading]) -> StatisticsReport {
        let mut report = StatisticsReport::new();
        report.total_readings = readings.len();

        let mut by_meter: BTreeMap<&str, Vec<&Reading>> = BTreeMap::new();
        for reading in readings {
            by_meter
                .entry(reading.meter_number.as_str())
                .or_default()
                .push(reading);
        }

        for (meter_number, mut group) in by_meter {
            group.sort_by_key(|r| r.timestamp);
            // Groups are only ever created with at least one reading.
            let (Some(first), Some(last)) = (group.first(), group.last()) else {
                continue;
            };

            let total_consumption = value_delta(last.value, first.value);
            let elapsed_millis = (last.timestamp - first.timestamp).num_milliseconds();
            let elapsed_days = Decimal::from(elapsed_millis) / Decimal::from(MILLIS_PER_DAY);
            let average_per_day = if elapsed_days > Decimal::ZERO {
                Decimal::from(total_consumption) / elapsed_days
            } else {
                Decimal::ZERO
            };

            report.meters.push(MeterStatistics {
                meter_number: meter_number.to_string(),
                total_consumption,
                elapsed_days,
                average_per_day,
                readings_count: group.len(),
                last_value: last.value,
                first_timestamp: first.timestamp,
                last_timestamp: last.timestamp,
                share_of_max: Decimal::ZERO,
            });
        }

        report.meter_count = report.meters.len();
        report.total_consumption = report
            .meters
            .iter()
            .map(|m| m.total_consumption)
            .fold(0i64, i64::saturating_add);
        report.max_consumption = report
            .meters
            .iter()
            .map(|m| m.total_consumption)
            .max()
            .unwrap_or(0)
            .max(1);

        let max = Decimal::from(report.max_consumption);
        for meter in &mut report.meters {
            meter.share_of_max = (Decimal::from(meter.total_consumption) / max)
                .clamp(Decimal::ZERO, Decimal::ONE);
        }

        tracing::debug!(
            readings = report.total_readings,
            meters = report.meter_count,
            "Computed consumption statistics."
        );

        report
    }
}

/// Signed difference `current - previous`, saturating at the `i64` bounds.
fn value_delta(current: u64, previous: u64) -> i64 {
    let diff = i128::from(current) - i128::from(previous);
    diff.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
