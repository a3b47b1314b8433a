//! CSV Import
//!
//! Loads observation logs exported from hive scales, counters and weather
//! stations. The header row picks the columns: the first one named like a
//! date or time holds the timestamp, environmental columns go to
//! `Observation::environmental` and everything else is a metric.

use crate::store::{Observation, HUMIDITY, RAINFALL, TEMPERATURE, WATER_DISTANCE};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::io::Read;
use std::path::Path;

/// Most errors kept per import
const MAX_REPORTED_ERRORS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No timestamp column (date, time or timestamp) in header")]
    NoTimestampColumn,
}

/// Result of a CSV import operation
#[derive(Debug)]
pub struct CsvImportResult {
    pub observations: Vec<Observation>,
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub errors: Vec<String>,
}

impl CsvImportResult {
    /// Latest timestamp among the imported observations
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.observations.iter().map(|obs| obs.timestamp).max()
    }
}

/// Reads one user's observations from CSV
pub struct ObservationCsvImporter {
    user_id: String,
    /// Preferred format, tried before the common ones
    timestamp_format: Option<String>,
    environmental_columns: Vec<String>,
}

/// Where a column's values go
#[derive(Debug, Clone, PartialEq)]
enum Column {
    Timestamp,
    Metric(String),
    Environmental(String),
}

impl ObservationCsvImporter {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            timestamp_format: None,
            environmental_columns: [TEMPERATURE, HUMIDITY, RAINFALL, WATER_DISTANCE]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Set the timestamp format string
    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        self.timestamp_format = Some(format.to_string());
        self
    }

    /// Treat another column as an environmental reading
    pub fn with_environmental_column(mut self, name: &str) -> Self {
        self.environmental_columns.push(name.to_lowercase());
        self
    }

    /// Import data from a CSV file
    pub fn import(&self, path: &Path) -> Result<CsvImportResult, ImportError> {
        let reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        self.read_all(reader)
    }

    /// Import from a CSV string
    pub fn import_str(&self, csv_data: &str) -> Result<CsvImportResult, ImportError> {
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(csv_data.as_bytes());
        self.read_all(reader)
    }

    fn read_all<R: Read>(&self, mut reader: csv::Reader<R>) -> Result<CsvImportResult, ImportError> {
        let columns = self.detect_columns(reader.headers()?);
        let timestamp_column = columns
            .iter()
            .position(|c| *c == Column::Timestamp)
            .ok_or(ImportError::NoTimestampColumn)?;

        let mut observations = Vec::new();
        let mut rows_failed = 0;
        let mut errors = Vec::new();

        for (line_num, result) in reader.records().enumerate() {
            let line = line_num + 2;

            let row = result
                .map_err(|e| e.to_string())
                .and_then(|record| self.parse_row(&record, &columns, timestamp_column));

            match row {
                Ok(Some(observation)) => observations.push(observation),
                Ok(None) => {}
                Err(e) => {
                    errors.push(format!("Line {}: {}", line, e));
                    rows_failed += 1;
                }
            }
        }

        if errors.len() > MAX_REPORTED_ERRORS {
            let total = errors.len();
            errors.truncate(MAX_REPORTED_ERRORS);
            errors.push(format!("... and {} more errors", total - MAX_REPORTED_ERRORS));
        }

        tracing::info!(
            user_id = %self.user_id,
            rows = observations.len(),
            failed = rows_failed,
            "CSV import finished"
        );

        Ok(CsvImportResult {
            rows_processed: observations.len(),
            observations,
            rows_failed,
            errors,
        })
    }

    fn detect_columns(&self, headers: &csv::StringRecord) -> Vec<Column> {
        let mut has_timestamp = false;

        headers
            .iter()
            .map(|header| {
                let name = header.trim().to_lowercase().replace(' ', "_");
                let is_time = name.contains("date") || name.contains("time");

                if is_time && !has_timestamp {
                    has_timestamp = true;
                    Column::Timestamp
                } else if self.environmental_columns.contains(&name) {
                    Column::Environmental(name)
                } else {
                    Column::Metric(name)
                }
            })
            .collect()
    }

    /// One observation per row; `None` for a row with no values
    fn parse_row(
        &self,
        record: &csv::StringRecord,
        columns: &[Column],
        timestamp_column: usize,
    ) -> Result<Option<Observation>, String> {
        let ts_str = record
            .get(timestamp_column)
            .map(str::trim)
            .ok_or_else(|| "missing timestamp column".to_string())?;
        let timestamp = self
            .parse_timestamp(ts_str)
            .ok_or_else(|| format!("Could not parse timestamp: {}", ts_str))?;

        let mut observation = Observation::new(self.user_id.clone(), timestamp);
        for (column, value_str) in columns.iter().zip(record.iter()) {
            let value_str = value_str.trim();
            if value_str.is_empty() {
                continue;
            }

            let (name, target) = match column {
                Column::Timestamp => continue,
                Column::Metric(name) => (name, &mut observation.metrics),
                Column::Environmental(name) => (name, &mut observation.environmental),
            };

            let value = value_str
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("column '{}' is not a number: {}", name, value_str))?;
            target.insert(name.clone(), value);
        }

        if observation.metrics.is_empty() && observation.environmental.is_empty() {
            return Ok(None);
        }
        Ok(Some(observation))
    }

    /// Parse a timestamp, trying the configured format then the common ones
    fn parse_timestamp(&self, ts_str: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(ts_str) {
            return Some(dt.with_timezone(&Utc));
        }

        let formats = [
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d",
            "%m/%d/%Y",
            "%d/%m/%Y",
            "%Y/%m/%d",
        ];

        self.timestamp_format
            .as_deref()
            .into_iter()
            .chain(formats)
            .find_map(|fmt| {
                NaiveDateTime::parse_from_str(ts_str, fmt)
                    .ok()
                    // Dates alone are taken as midday
                    .or_else(|| {
                        NaiveDate::parse_from_str(ts_str, fmt)
                            .ok()
                            .and_then(|date| date.and_hms_opt(12, 0, 0))
                    })
                    .map(|dt| dt.and_utc())
            })
    }
}
