//! Medication picker ordering.

use std::collections::HashMap;
use std::sync::Arc;

use medilog_core::{locale_cmp, Medication, Record, Timestamp};

/// A medication offered by the picker.
#[derive(Debug, Clone, PartialEq)]
pub struct PickerEntry {
    pub medication: Arc<Medication>,
    /// Most recent use by the person, if any
    pub last_taken: Option<Timestamp>,
}

/// What confirming the picker's filter text should do.
#[derive(Debug, Clone, PartialEq)]
pub enum PickerAction {
    /// Exactly one entry matches
    Select(Arc<Medication>),
    /// Create a medication named after the trimmed filter text
    AddNew(String),
}

/// Order medications for a person's picker.
///
/// Medications the person has taken come first, most recently taken first.
/// The rest follow alphabetically.
pub fn order_for_picker(medications: &[Arc<Medication>], records: &[Arc<Record>]) -> Vec<PickerEntry> {
    let mut last_use: HashMap<&str, Timestamp> = HashMap::new();
    for record in records {
        let Some(id) = record.medication_id.as_deref().filter(|id| !id.is_empty()) else {
            continue;
        };
        last_use
            .entry(id)
            .and_modify(|at| {
                if record.datetime > *at {
                    *at = record.datetime;
                }
            })
            .or_insert(record.datetime);
    }

    let (mut used, mut unused): (Vec<PickerEntry>, Vec<PickerEntry>) = medications
        .iter()
        .map(|m| PickerEntry {
            medication: Arc::clone(m),
            last_taken: last_use.get(m.id.as_str()).copied(),
        })
        .partition(|e| e.last_taken.is_some());

    used.sort_by(|a, b| b.last_taken.cmp(&a.last_taken));
    unused.sort_by(|a, b| locale_cmp(&a.medication.name, &b.medication.name));
    used.extend(unused);
    used
}

/// Entries whose name, units or active ingredient contain `text`, ignoring case.
///
/// Blank text keeps every entry.
pub fn filter_entries<'a>(entries: &'a [PickerEntry], text: &str) -> Vec<&'a PickerEntry> {
    if text.trim().is_empty() {
        return entries.iter().collect();
    }
    let needle = text.to_lowercase();
    let contains = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));

    entries
        .iter()
        .filter(|e| {
            let m = &e.medication;
            contains(Some(m.name.as_str()))
                || contains(m.units.as_deref())
                || contains(m.active_ingredient.as_deref())
        })
        .collect()
}

/// Action for confirming `text` in the picker.
pub fn confirm(entries: &[PickerEntry], text: &str) -> PickerAction {
    match filter_entries(entries, text).as_slice() {
        [only] => PickerAction::Select(Arc::clone(&only.medication)),
        _ => PickerAction::AddNew(text.trim().to_string()),
    }
}

/// Find a medication by name, ignoring case.
///
/// Used to pick up a medication created from the picker after the catalog
/// has been refetched.
pub fn find_by_name(medications: &[Arc<Medication>], name: &str) -> Option<Arc<Medication>> {
    let wanted = name.trim().to_lowercase();
    medications
        .iter()
        .find(|m| m.name.to_lowercase() == wanted)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use medilog_core::parse_timestamp;

    fn med(id: &str, name: &str) -> Arc<Medication> {
        Arc::new(Medication::new(id, name))
    }

    fn dose(at: &str, id: &str) -> Arc<Record> {
        let offset = FixedOffset::east_opt(0).unwrap();
        Arc::new(Record::new(parse_timestamp(at, offset).unwrap()).with_medication(id, None))
    }

    fn names(entries: &[PickerEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.medication.name.as_str()).collect()
    }

    #[test]
    fn test_used_first_then_alphabetical() {
        let meds = vec![
            med("a", "zinc"),
            med("b", "Paralen"),
            med("c", "ascorbin"),
            med("d", "Nurofen"),
        ];
        let records = vec![
            dose("2024-01-05T10:00:00Z", "d"),
            dose("2024-01-01T10:00:00Z", "b"),
            dose("2024-01-07T10:00:00Z", "b"),
        ];

        let entries = order_for_picker(&meds, &records);
        assert_eq!(names(&entries), vec!["Paralen", "Nurofen", "ascorbin", "zinc"]);
        assert_eq!(
            entries[0].last_taken.unwrap().to_rfc3339(),
            "2024-01-07T10:00:00+00:00"
        );
        assert!(entries[2].last_taken.is_none());
    }

    #[test]
    fn test_filter_fields() {
        let mut nurofen = Medication::new("d", "Nurofen");
        nurofen.active_ingredient = Some("Ibuprofen".into());
        let mut sirup = Medication::new("e", "Sirup");
        sirup.units = Some("ml".into());
        let entries = order_for_picker(&[Arc::new(nurofen), Arc::new(sirup), med("p", "Paralen")], &[]);

        let found: Vec<&str> = filter_entries(&entries, "IBU")
            .iter()
            .map(|e| e.medication.name.as_str())
            .collect();
        assert_eq!(found, vec!["Nurofen"]);
        assert_eq!(filter_entries(&entries, "ML").len(), 1);
        assert_eq!(filter_entries(&entries, "  ").len(), 3);
    }

    #[test]
    fn test_confirm() {
        let entries = order_for_picker(&[med("p", "Paralen"), med("n", "Nurofen")], &[]);

        assert!(matches!(confirm(&entries, "para"), PickerAction::Select(m) if m.id == "p"));
        assert_eq!(confirm(&entries, " Ibalgin "), PickerAction::AddNew("Ibalgin".into()));
        assert_eq!(confirm(&entries, ""), PickerAction::AddNew(String::new()));
    }

    #[test]
    fn test_find_by_name() {
        let meds = vec![med("p", "Paralen")];
        assert_eq!(find_by_name(&meds, " paralen").unwrap().id, "p");
        assert!(find_by_name(&meds, "nurofen").is_none());
    }
}
