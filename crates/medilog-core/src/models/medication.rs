//! Medication models.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A medication known to the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    /// Server-assigned identifier
    pub id: String,
    /// Display name, unique case-insensitively
    pub name: String,
    /// Dosage units (e.g., "tablet", "ml")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Whether the medication lowers fever
    #[serde(default)]
    pub is_antipyretic: bool,
    /// Active ingredient (e.g., "paracetamol")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_ingredient: Option<String>,
}

impl Medication {
    /// Create a medication with required fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            units: None,
            is_antipyretic: false,
            active_ingredient: None,
        }
    }
}

/// Medication fields as edited by the user, before being sent to the backend.
///
/// An absent `id` means "create".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicationDraft {
    pub id: Option<String>,
    pub name: String,
    pub units: Option<String>,
    pub is_antipyretic: bool,
    pub active_ingredient: Option<String>,
}

impl MedicationDraft {
    /// Start a draft for a new medication.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Start a draft editing an existing medication.
    pub fn edit(medication: &Medication) -> Self {
        Self {
            id: Some(medication.id.clone()),
            name: medication.name.clone(),
            units: medication.units.clone(),
            is_antipyretic: medication.is_antipyretic,
            active_ingredient: medication.active_ingredient.clone(),
        }
    }

    /// Whether this draft creates a new medication.
    pub fn is_new(&self) -> bool {
        self.id.as_deref().map_or(true, str::is_empty)
    }

    /// The trimmed name.
    pub fn trimmed_name(&self) -> &str {
        self.name.trim()
    }
}

/// Trim an optional string, mapping blank values to `None`.
pub(crate) fn trimmed_or_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Resolves medication ids to display names.
///
/// Missing or dangling ids resolve to an empty string.
pub trait MedicationNames {
    fn medication_name(&self, id: Option<&str>) -> String;
}

impl MedicationNames for HashMap<String, Medication> {
    fn medication_name(&self, id: Option<&str>) -> String {
        id.filter(|id| !id.is_empty())
            .and_then(|id| self.get(id))
            .map(|m| m.name.clone())
            .unwrap_or_default()
    }
}
