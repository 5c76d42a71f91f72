//! Medication and temperature records.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MedilogError, MedilogResult};

/// Point in time of a record, expressed in the household offset.
pub type Timestamp = DateTime<FixedOffset>;

/// Formats accepted for timestamps without an explicit offset.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse an ISO-8601 timestamp and express it in `offset`.
///
/// Strings without an offset are read as household local time.
pub fn parse_timestamp(value: &str, offset: FixedOffset) -> MedilogResult<Timestamp> {
    let value = value.trim();
    let rfc3339_err = match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => return Ok(dt.with_timezone(&offset)),
        Err(e) => e,
    };

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            let utc = naive - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
            return Ok(DateTime::from_naive_utc_and_offset(utc, offset));
        }
    }

    Err(MedilogError::Timestamp {
        value: value.to_string(),
        source: rfc3339_err,
    })
}

/// Render a timestamp the way the backend expects it (UTC, millisecond precision).
pub fn to_wire_datetime(timestamp: &Timestamp) -> String {
    timestamp
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Record as sent by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordRaw {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// ISO-8601 timestamp
    pub datetime: String,
    /// Body temperature in °C; the backend sends `null` for "not measured"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A single log entry: a temperature reading, a medication dose, or both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Server-assigned id; `None` for a record not yet saved
    pub id: Option<String>,
    pub datetime: Timestamp,
    /// Body temperature in °C
    pub temperature: Option<f64>,
    pub medication_id: Option<String>,
    pub medication_amount: Option<f64>,
    pub note: Option<String>,
}

impl Record {
    /// Create an unsaved, empty record at the given time.
    pub fn new(datetime: Timestamp) -> Self {
        Self {
            id: None,
            datetime,
            temperature: None,
            medication_id: None,
            medication_amount: None,
            note: None,
        }
    }

    /// Attach a medication, defaulting the amount to 1 when none is given.
    pub fn with_medication(mut self, medication_id: impl Into<String>, amount: Option<f64>) -> Self {
        self.medication_id = Some(medication_id.into());
        self.medication_amount = Some(amount.unwrap_or(1.0));
        self
    }

    /// Attach a temperature reading.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Convert a backend record.
    ///
    /// A missing `medication_amount` becomes 1 regardless of whether a
    /// medication is set.
    pub fn from_raw(raw: &RecordRaw, offset: FixedOffset) -> MedilogResult<Self> {
        Ok(Self {
            id: raw.id.clone(),
            datetime: parse_timestamp(&raw.datetime, offset)?,
            temperature: raw.temperature,
            medication_id: raw.medication_id.clone(),
            medication_amount: Some(raw.medication_amount.unwrap_or(1.0)),
            note: raw.note.clone(),
        })
    }

    /// Whether this record refers to a medication.
    pub fn has_medication(&self) -> bool {
        self.medication_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// A contiguous run of records with no multi-day gap.
///
/// `records` is newest first; `None` entries mark a change of day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordsGroupByTime {
    /// Oldest record time in the group
    pub from: Option<Timestamp>,
    /// Newest record time in the group
    pub to: Timestamp,
    pub records: Vec<Option<Arc<Record>>>,
}

impl RecordsGroupByTime {
    /// Iterate over the real records, skipping day separators.
    pub fn iter_records(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.records.iter().flatten()
    }

    /// Number of real records in the group.
    pub fn record_count(&self) -> usize {
        self.iter_records().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_parse_rfc3339_into_offset() {
        let prague = FixedOffset::east_opt(3600).unwrap();
        let ts = parse_timestamp("2024-01-01T23:30:00Z", prague).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-02T00:30:00+01:00");
    }

    #[test]
    fn test_parse_naive_as_household_time() {
        let prague = FixedOffset::east_opt(3600).unwrap();
        let ts = parse_timestamp("2024-01-01T10:00:00", prague).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-01T10:00:00+01:00");
        assert_eq!(to_wire_datetime(&ts), "2024-01-01T09:00:00.000Z");
    }

    #[test]
    fn test_parse_invalid() {
        let result = parse_timestamp("yesterday", utc());
        assert!(matches!(result, Err(MedilogError::Timestamp { .. })));
    }

    #[test]
    fn test_from_raw_defaults() {
        let raw: RecordRaw =
            serde_json::from_str(r#"{"id": "r1", "datetime": "2024-03-01T08:00:00Z", "temperature": null}"#)
                .unwrap();
        let record = Record::from_raw(&raw, utc()).unwrap();

        assert_eq!(record.temperature, None);
        assert_eq!(record.medication_id, None);
        // Defaulted even without a medication
        assert_eq!(record.medication_amount, Some(1.0));
    }

    #[test]
    fn test_with_medication_defaults_amount() {
        let ts = parse_timestamp("2024-03-01T08:00:00Z", utc()).unwrap();
        let record = Record::new(ts).with_medication("med-1", None);
        assert_eq!(record.medication_amount, Some(1.0));
        assert!(record.has_medication());

        let record = Record::new(ts).with_temperature(38.2);
        assert_eq!(record.medication_amount, None);
        assert!(!record.has_medication());
    }

    #[test]
    fn test_raw_serialization_omits_absent() {
        let raw = RecordRaw {
            id: None,
            datetime: "2024-03-01T08:00:00.000Z".into(),
            temperature: Some(37.5),
            medication_id: None,
            medication_amount: None,
            note: None,
        };
        let json = serde_json::to_string(&raw).unwrap();
        assert_eq!(json, r#"{"datetime":"2024-03-01T08:00:00.000Z","temperature":37.5}"#);
    }
}
