//! MediLog Insights
//!
//! Pure derivations over the snapshots held by `medilog-core`. Nothing in
//! this crate talks to the backend: callers pass records and medications
//! taken from the stores and get presentation-ready data back.
//!
//! ```text
//!  PersonRecordStore::all() ──┬──► UsageAggregator ──► UsageView
//!                             ├──► chart_series    ──► ChartSeries
//!                             └──► order_for_picker ──► PickerEntry
//!  MedicationCatalog::all() ──┴──► MedicationFilter / validate_medication
//! ```
//!
//! # Modules
//!
//! - [`usage`]: Year/month/day/hour drill-down of medication counts
//! - [`picker`]: Medication picker ordering and filtering
//! - [`filter`]: Medication manager column filters and usage counts
//! - [`temperature`]: Temperature bands, bar widths and chart series
//! - [`validation`]: Medication form validation

pub mod filter;
pub mod picker;
pub mod temperature;
pub mod usage;
pub mod validation;

pub use filter::{usage_counts, MedicationFilter};
pub use picker::{confirm, filter_entries, find_by_name, order_for_picker, PickerAction, PickerEntry};
pub use temperature::{bar_fraction, chart_series, ChartSeries, MedicationMarker, TemperatureBand};
pub use usage::{
    Breadcrumb, Column, Crumb, DrillDownLevel, DrillDownState, MedicationStats, NavigationHistory,
    UsageAggregator, UsageView,
};
pub use validation::{validate_medication, ValidationError, ValidationResult};
