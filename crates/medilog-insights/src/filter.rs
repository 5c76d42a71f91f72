//! Medication manager filtering and usage counts.

use std::collections::HashMap;
use std::sync::Arc;

use medilog_core::{locale_cmp, Medication, Record};

/// Per-column filters of the medication manager.
///
/// Text filters match case-insensitive substrings; blank text matches
/// everything. A text filter on an optional column never matches a
/// medication that leaves that column unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicationFilter {
    pub name: String,
    pub units: String,
    pub active_ingredient: String,
    /// Keep only (non-)antipyretics
    pub antipyretic: Option<bool>,
}

impl MedicationFilter {
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty()
            && self.units.trim().is_empty()
            && self.active_ingredient.trim().is_empty()
            && self.antipyretic.is_none()
    }

    pub fn matches(&self, medication: &Medication) -> bool {
        text_matches(&self.name, Some(medication.name.as_str()))
            && text_matches(&self.units, medication.units.as_deref())
            && text_matches(&self.active_ingredient, medication.active_ingredient.as_deref())
            && self
                .antipyretic
                .map_or(true, |wanted| wanted == medication.is_antipyretic)
    }

    /// Matching medications, sorted by name.
    pub fn apply(&self, medications: &[Arc<Medication>]) -> Vec<Arc<Medication>> {
        let mut matching: Vec<Arc<Medication>> = medications
            .iter()
            .filter(|m| self.matches(m))
            .cloned()
            .collect();
        matching.sort_by(|a, b| locale_cmp(&a.name, &b.name));
        matching
    }
}

fn text_matches(filter: &str, value: Option<&str>) -> bool {
    if filter.trim().is_empty() {
        return true;
    }
    value.is_some_and(|v| v.to_lowercase().contains(&filter.to_lowercase()))
}

/// Number of records using each medication.
///
/// Every catalog medication gets an entry, unused ones with zero. Records
/// referencing unknown medications are not counted.
pub fn usage_counts<'a>(
    medications: &[Arc<Medication>],
    records: impl IntoIterator<Item = &'a Arc<Record>>,
) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> =
        medications.iter().map(|m| (m.id.clone(), 0)).collect();
    for record in records {
        if let Some(count) = record
            .medication_id
            .as_deref()
            .and_then(|id| counts.get_mut(id))
        {
            *count += 1;
        }
    }
    counts
}
