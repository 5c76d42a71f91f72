//! Temperature presentation data.

use std::sync::Arc;

use medilog_core::{MedicationNames, Record};
use serde::Serialize;

/// Lower edge of the temperature bar scale, °C.
pub const BAR_MIN: f64 = 36.5;
/// Upper edge of the temperature bar scale, °C.
pub const BAR_MAX: f64 = 40.0;
/// Smallest bar drawn for any reading.
pub const BAR_FLOOR: f64 = 0.03;

/// Label used for medication markers whose medication is unknown.
pub const UNKNOWN_MEDICATION: &str = "Medication";

/// Colour band of a body temperature reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureBand {
    /// Below 37 °C
    Normal,
    /// 37 to 38 °C
    Elevated,
    /// 38 to 39 °C
    High,
    /// 39 °C and above
    VeryHigh,
}

impl TemperatureBand {
    pub fn of(temperature: f64) -> Self {
        if temperature < 37.0 {
            Self::Normal
        } else if temperature < 38.0 {
            Self::Elevated
        } else if temperature < 39.0 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }
}

/// Width of the temperature bar as a fraction of the full scale.
pub fn bar_fraction(temperature: f64) -> f64 {
    let clamped = temperature.clamp(BAR_MIN, BAR_MAX);
    ((clamped - BAR_MIN) / (BAR_MAX - BAR_MIN)).max(BAR_FLOOR)
}

/// A medication marker on the chart's time axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicationMarker {
    /// Milliseconds since the Unix epoch
    pub at_ms: i64,
    pub label: String,
}

/// Series for the temperature chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    /// `(epoch ms, °C)` for every record with a non-zero temperature
    pub temperatures: Vec<(i64, f64)>,
    pub medications: Vec<MedicationMarker>,
}

/// Extract chart data from records, keeping their order.
pub fn chart_series(records: &[Arc<Record>], names: &impl MedicationNames) -> ChartSeries {
    let temperatures = records
        .iter()
        .filter_map(|r| {
            r.temperature
                .filter(|t| *t != 0.0)
                .map(|t| (r.datetime.timestamp_millis(), t))
        })
        .collect();

    let medications = records
        .iter()
        .filter(|r| r.has_medication())
        .map(|r| {
            let name = names.medication_name(r.medication_id.as_deref());
            MedicationMarker {
                at_ms: r.datetime.timestamp_millis(),
                label: if name.is_empty() {
                    UNKNOWN_MEDICATION.to_string()
                } else {
                    name
                },
            }
        })
        .collect();

    ChartSeries {
        temperatures,
        medications,
    }
}
