use crate::engine::AnalyticsEngine;
use crate::error::AnalyticsError;
use chrono::NaiveDate;
use core_types::Reading;

/// The delimiter used for every export. `;` keeps spreadsheets in decimal-comma
/// locales from splitting numbers.
pub const EXPORT_DELIMITER: u8 = b';';

/// Byte-order mark that makes spreadsheet tools read the file as UTF-8.
const BOM: char = '\u{FEFF}';

const HEADER: [&str; 4] = ["Date", "Time", "Meter number", "Reading (kWh)"];

/// The download name for an export produced on `date`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("meter_readings_{}.csv", date.format("%Y-%m-%d"))
}

impl AnalyticsEngine {
    /// Renders readings as spreadsheet-compatible delimited text.
    ///
    /// Rows follow the history view order (newest first). Each row holds the
    /// date (`dd.mm.yyyy`), the time (`HH:MM:SS`), the meter number and the
    /// value. Dates and times are rendered in the engine's display offset.
    /// Fields containing the delimiter, quotes or line breaks are quoted, so
    /// meter numbers survive a parse back. The text starts with a byte-order
    /// mark and rows are joined by `\n` with no trailing newline.
    pub fn export_to_delimited_text(
        &self,
        readings: &[Reading],
        delimiter: u8,
    ) -> Result<String, AnalyticsError> {
        if matches!(delimiter, b'"' | b'\n' | b'\r') || !delimiter.is_ascii() {
            return Err(AnalyticsError::InvalidDelimiter(char::from(delimiter)));
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer.write_record(HEADER)?;

        for row in self.derive_history_view(readings) {
            let local = row.reading.timestamp.with_timezone(&self.display_offset());
            writer.write_record([
                local.format("%d.%m.%Y").to_string(),
                local.format("%H:%M:%S").to_string(),
                row.reading.meter_number,
                row.reading.value.to_string(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AnalyticsError::InternalError(e.to_string()))?;
        let body = String::from_utf8(bytes)
            .map_err(|e| AnalyticsError::InternalError(e.to_string()))?;

        let mut text = String::with_capacity(body.len() + BOM.len_utf8());
        text.push(BOM);
        text.push_str(body.strip_suffix('\n').unwrap_or(&body));
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone, Utc};

    fn reading(id: &str, meter: &str, value: u64, timestamp: DateTime<Utc>) -> Reading {
        Reading {
            id: id.to_string(),
            meter_number: meter.to_string(),
            value,
            timestamp,
            photo: None,
        }
    }

    fn parse(text: &str) -> Vec<Vec<String>> {
        let body = text.strip_prefix(BOM).expect("export must start with a BOM");
        csv::ReaderBuilder::new()
            .delimiter(EXPORT_DELIMITER)
            .has_headers(false)
            .from_reader(body.as_bytes())
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn export_starts_with_bom_and_header() {
        let text = AnalyticsEngine::new()
            .export_to_delimited_text(&[], EXPORT_DELIMITER)
            .unwrap();

        assert_eq!(text, "\u{FEFF}Date;Time;Meter number;Reading (kWh)");
    }

    #[test]
    fn export_rows_are_newest_first_without_trailing_newline() {
        let readings = vec![
            reading("1", "EM-2024-001", 12340, Utc.with_ymd_and_hms(2024, 10, 1, 10, 0, 0).unwrap()),
            reading("2", "EM-2024-001", 12850, Utc.with_ymd_and_hms(2024, 10, 15, 9, 30, 5).unwrap()),
        ];

        let text = AnalyticsEngine::new()
            .export_to_delimited_text(&readings, EXPORT_DELIMITER)
            .unwrap();

        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "15.10.2024;09:30:05;EM-2024-001;12850");
        assert_eq!(lines[2], "01.10.2024;10:00:00;EM-2024-001;12340");
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn export_round_trips_meter_number_and_value() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let readings = vec![
            reading("1", "plain", 1, t),
            reading("2", "semi;colon", 22, t + chrono::Duration::minutes(1)),
            reading("3", "with \"quotes\"", 333, t + chrono::Duration::minutes(2)),
            reading("4", "Счётчик №4", 4444, t + chrono::Duration::minutes(3)),
        ];

        let text = AnalyticsEngine::new()
            .export_to_delimited_text(&readings, EXPORT_DELIMITER)
            .unwrap();
        let records = parse(&text);

        assert_eq!(records.len(), readings.len() + 1);
        for record in &records[1..] {
            let original = readings
                .iter()
                .find(|r| r.meter_number == record[2])
                .expect("meter number must round-trip");
            assert_eq!(record[3], original.value.to_string());
        }
    }

    #[test]
    fn export_uses_display_offset_for_wall_clock_fields() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let readings = vec![reading(
            "1",
            "A",
            1,
            Utc.with_ymd_and_hms(2024, 12, 31, 22, 15, 0).unwrap(),
        )];

        let text = AnalyticsEngine::with_display_offset(offset)
            .export_to_delimited_text(&readings, EXPORT_DELIMITER)
            .unwrap();

        assert!(text.ends_with("01.01.2025;01:15:00;A;1"));
    }

    #[test]
    fn export_rejects_quote_delimiter() {
        let result = AnalyticsEngine::new().export_to_delimited_text(&[], b'"');
        assert!(matches!(result, Err(AnalyticsError::InvalidDelimiter('"'))));
    }

    #[test]
    fn file_name_embeds_date() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 15).unwrap();
        assert_eq!(export_file_name(date), "meter_readings_2024-10-15.csv");
    }
}
