//! Drill-down statistics of medication usage.
//!
//! A person's records are counted per medication name over time buckets.
//! The view starts at years and narrows one level at a time:
//!
//! ```text
//! Year ──► Month (of a year) ──► Day (of a month) ──► Hour (of a day)
//! ```
//!
//! Every transition is reported to an optional [`NavigationHistory`] so a
//! UI can offer back/forward navigation and later [`restore`] a state.
//!
//! [`restore`]: UsageAggregator::restore

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Timelike};
use medilog_core::{locale_cmp, MedicationNames, Record, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Granularity of the usage table columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrillDownLevel {
    #[default]
    Year,
    Month,
    Day,
    Hour,
}

impl DrillDownLevel {
    /// The next finer level, if any.
    pub fn finer(self) -> Option<Self> {
        match self {
            Self::Year => Some(Self::Month),
            Self::Month => Some(Self::Day),
            Self::Day => Some(Self::Hour),
            Self::Hour => None,
        }
    }
}

/// Current level and the coarser periods selected to reach it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillDownState {
    pub level: DrillDownLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl DrillDownState {
    pub fn years() -> Self {
        Self::default()
    }

    pub fn months_of(year: i32) -> Self {
        Self {
            level: DrillDownLevel::Month,
            year: Some(year),
            ..Self::default()
        }
    }

    pub fn days_of(year: i32, month: u32) -> Self {
        Self {
            level: DrillDownLevel::Day,
            year: Some(year),
            month: Some(month),
            day: None,
        }
    }

    pub fn hours_of(year: i32, month: u32, day: u32) -> Self {
        Self {
            level: DrillDownLevel::Hour,
            year: Some(year),
            month: Some(month),
            day: Some(day),
        }
    }

    /// Whether exactly the periods required by `level` are set and valid.
    pub fn is_valid(&self) -> bool {
        match (self.level, self.year, self.month, self.day) {
            (DrillDownLevel::Year, None, None, None) => true,
            (DrillDownLevel::Month, Some(_), None, None) => true,
            (DrillDownLevel::Day, Some(_), Some(m), None) => (1..=12).contains(&m),
            (DrillDownLevel::Hour, Some(y), Some(m), Some(d)) => {
                days_in_month(y, m).is_some_and(|days| (1..=days).contains(&d))
            }
            _ => false,
        }
    }

    /// Whether `at` falls inside the selected periods.
    pub fn contains(&self, at: &Timestamp) -> bool {
        self.year.map_or(true, |y| at.year() == y)
            && self.month.map_or(true, |m| at.month() == m)
            && self.day.map_or(true, |d| at.day() == d)
    }

    /// Column key of `at` at the current level.
    fn key_of(&self, at: &Timestamp) -> i32 {
        match self.level {
            DrillDownLevel::Year => at.year(),
            DrillDownLevel::Month => at.month() as i32,
            DrillDownLevel::Day => at.day() as i32,
            DrillDownLevel::Hour => at.hour() as i32,
        }
    }

    /// The state one level finer, selecting `key` at the current level.
    ///
    /// `None` at the hour level or when `key` is not a column of this level.
    pub fn drill(&self, key: i32) -> Option<Self> {
        let next = match self.level {
            DrillDownLevel::Year => Self::months_of(key),
            DrillDownLevel::Month => Self::days_of(self.year?, u32::try_from(key).ok()?),
            DrillDownLevel::Day => {
                Self::hours_of(self.year?, self.month?, u32::try_from(key).ok()?)
            }
            DrillDownLevel::Hour => return None,
        };
        next.is_valid().then_some(next)
    }

    /// The state one level coarser. `None` at the year level.
    pub fn back(&self) -> Option<Self> {
        match self.level {
            DrillDownLevel::Year => None,
            DrillDownLevel::Month => Some(Self::years()),
            DrillDownLevel::Day => self.year.map(Self::months_of),
            DrillDownLevel::Hour => Some(Self::days_of(self.year?, self.month?)),
        }
    }
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from((next - first).num_days()).ok()
}

/// Receives every drill-down transition.
pub trait NavigationHistory {
    fn push(&mut self, state: &DrillDownState);
}

/// No history.
impl NavigationHistory for () {
    fn push(&mut self, _state: &DrillDownState) {}
}

impl NavigationHistory for Vec<DrillDownState> {
    fn push(&mut self, state: &DrillDownState) {
        Vec::push(self, state.clone());
    }
}

/// A column of the usage table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub key: i32,
    pub label: String,
}

/// Counts of one medication per column key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MedicationStats {
    /// Medication name; empty for records whose medication is unknown
    pub medication: String,
    pub counts: BTreeMap<i32, usize>,
}

impl MedicationStats {
    pub fn count(&self, key: i32) -> usize {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// The usage table for the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageView {
    pub state: DrillDownState,
    /// Rows sorted by medication name
    pub stats: Vec<MedicationStats>,
    pub columns: Vec<Column>,
    /// Largest single cell count
    pub max_count: usize,
}

impl UsageView {
    /// Cell intensity relative to the fullest cell, 0 when the view is empty.
    pub fn heat(&self, count: usize) -> f64 {
        if self.max_count == 0 {
            0.0
        } else {
            count as f64 / self.max_count as f64
        }
    }
}

/// One step of the breadcrumb trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crumb {
    AllYears,
    Year(i32),
    Month(u32),
    Day(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub crumb: Crumb,
    /// State to navigate to when the crumb is chosen
    pub target: DrillDownState,
    /// Whether this crumb is the current level
    pub current: bool,
}

/// Drill-down state and medication selection of the usage view.
///
/// Records are passed to each query rather than held, so the view always
/// reflects the caller's latest snapshot. Medication names are resolved at
/// query time.
#[derive(Debug, Default)]
pub struct UsageAggregator<H = ()> {
    state: DrillDownState,
    /// Selected medication names in selection order
    selected: Vec<String>,
    history: H,
}

impl UsageAggregator<()> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H: NavigationHistory> UsageAggregator<H> {
    /// Start at the year level, reporting transitions to `history`.
    pub fn with_history(history: H) -> Self {
        Self {
            state: DrillDownState::default(),
            selected: Vec::new(),
            history,
        }
    }

    pub fn state(&self) -> &DrillDownState {
        &self.state
    }

    pub fn level(&self) -> DrillDownLevel {
        self.state.level
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Selected medication names in selection order.
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Return to a state taken from the navigation history.
    ///
    /// `None` or an invalid state resets to the year level. Nothing is
    /// pushed to the history.
    pub fn restore(&mut self, state: Option<DrillDownState>) {
        self.state = state.filter(DrillDownState::is_valid).unwrap_or_default();
    }

    /// Build the usage table for `records`.
    pub fn view(&self, records: &[Arc<Record>], names: &impl MedicationNames) -> UsageView {
        let mut rows: BTreeMap<String, BTreeMap<i32, usize>> = BTreeMap::new();
        for record in records {
            if !record.has_medication() || !self.state.contains(&record.datetime) {
                continue;
            }
            let name = names.medication_name(record.medication_id.as_deref());
            *rows
                .entry(name)
                .or_default()
                .entry(self.state.key_of(&record.datetime))
                .or_insert(0) += 1;
        }

        let mut stats: Vec<MedicationStats> = rows
            .into_iter()
            .map(|(medication, counts)| MedicationStats { medication, counts })
            .collect();
        stats.sort_by(|a, b| locale_cmp(&a.medication, &b.medication));

        let max_count = stats
            .iter()
            .flat_map(|s| s.counts.values())
            .copied()
            .max()
            .unwrap_or(0);

        UsageView {
            state: self.state.clone(),
            columns: self.columns(records),
            stats,
            max_count,
        }
    }

    /// Columns at the current level.
    ///
    /// Years are the distinct years of all `records`; the finer levels are
    /// dense ranges.
    pub fn columns(&self, records: &[Arc<Record>]) -> Vec<Column> {
        let keys: Vec<i32> = match self.state.level {
            DrillDownLevel::Year => {
                let mut years: Vec<i32> = records.iter().map(|r| r.datetime.year()).collect();
                years.sort_unstable();
                years.dedup();
                years
            }
            DrillDownLevel::Month => (1..=12).collect(),
            DrillDownLevel::Day => match (self.state.year, self.state.month) {
                (Some(y), Some(m)) => (1..=days_in_month(y, m).unwrap_or(0) as i32).collect(),
                _ => Vec::new(),
            },
            DrillDownLevel::Hour => (0..24).collect(),
        };

        let year_level = self.state.level == DrillDownLevel::Year;
        keys.into_iter()
            .map(|key| Column {
                key,
                label: if year_level {
                    format!("{:02}", key.rem_euclid(100))
                } else {
                    key.to_string()
                },
            })
            .collect()
    }

    /// Narrow to the period `key` of the current level.
    ///
    /// Returns `false` at the hour level or for a key that is not a column.
    pub fn drill_down(&mut self, key: i32) -> bool {
        match self.state.drill(key) {
            Some(next) => {
                self.transition(next);
                true
            }
            None => false,
        }
    }

    /// Go one level coarser. Returns `false` at the year level.
    pub fn go_back(&mut self) -> bool {
        match self.state.back() {
            Some(previous) => {
                self.transition(previous);
                true
            }
            None => false,
        }
    }

    /// Jump to any valid state, typically a breadcrumb target.
    pub fn navigate_to(&mut self, state: DrillDownState) -> bool {
        if !state.is_valid() || state == self.state {
            return false;
        }
        self.transition(state);
        true
    }

    fn transition(&mut self, state: DrillDownState) {
        debug!(from = ?self.state.level, to = ?state.level, "Usage drill-down");
        self.state = state;
        self.history.push(&self.state);
    }

    /// Trail from "all years" to the current level.
    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let DrillDownState {
            level,
            year,
            month,
            day,
        } = self.state;

        let mut trail = vec![Breadcrumb {
            crumb: Crumb::AllYears,
            target: DrillDownState::years(),
            current: level == DrillDownLevel::Year,
        }];
        if let Some(y) = year {
            trail.push(Breadcrumb {
                crumb: Crumb::Year(y),
                target: DrillDownState::months_of(y),
                current: level == DrillDownLevel::Month,
            });
            if let Some(m) = month {
                trail.push(Breadcrumb {
                    crumb: Crumb::Month(m),
                    target: DrillDownState::days_of(y, m),
                    current: level == DrillDownLevel::Day,
                });
                if let Some(d) = day {
                    trail.push(Breadcrumb {
                        crumb: Crumb::Day(d),
                        target: DrillDownState::hours_of(y, m, d),
                        current: level == DrillDownLevel::Hour,
                    });
                }
            }
        }
        trail
    }

    /// Select a medication row.
    ///
    /// With `multi` the row is toggled and other selections stay. Without
    /// it the row becomes the only selection, or the selection is cleared
    /// when it already was.
    pub fn toggle_medication(&mut self, medication: &str, multi: bool) {
        let position = self.selected.iter().position(|m| m == medication);
        if multi {
            match position {
                Some(i) => {
                    self.selected.remove(i);
                }
                None => self.selected.push(medication.to_string()),
            }
        } else if self.selected.len() == 1 && position.is_some() {
            self.selected.clear();
        } else {
            self.selected = vec![medication.to_string()];
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Select only `medication` and narrow to the clicked cell's period.
    pub fn select_cell(&mut self, key: i32, medication: &str) -> bool {
        self.selected = vec![medication.to_string()];
        self.drill_down(key)
    }

    /// Narrow via a column header, keeping selected medications that still
    /// have records in the narrowed view.
    pub fn drill_down_all(
        &mut self,
        key: i32,
        records: &[Arc<Record>],
        names: &impl MedicationNames,
    ) -> bool {
        if !self.drill_down(key) {
            return false;
        }
        let selected = std::mem::take(&mut self.selected);
        self.selected = selected
            .into_iter()
            .filter(|m| !self.records_for_medication(records, names, m).is_empty())
            .collect();
        true
    }

    /// Records of `medication` inside the current periods, in input order.
    pub fn records_for_medication(
        &self,
        records: &[Arc<Record>],
        names: &impl MedicationNames,
        medication: &str,
    ) -> Vec<Arc<Record>> {
        records
            .iter()
            .filter(|r| {
                r.has_medication()
                    && self.state.contains(&r.datetime)
                    && names.medication_name(r.medication_id.as_deref()) == medication
            })
            .cloned()
            .collect()
    }

    /// Records of all selected medications inside the current periods,
    /// newest first.
    pub fn selected_records(
        &self,
        records: &[Arc<Record>],
        names: &impl MedicationNames,
    ) -> Vec<Arc<Record>> {
        let mut matching: Vec<Arc<Record>> = self
            .selected
            .iter()
            .flat_map(|m| self.records_for_medication(records, names, m))
            .collect();
        matching.sort_by(|a, b| b.datetime.cmp(&a.datetime));
        matching
    }
}
