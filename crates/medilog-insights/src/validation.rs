//! Medication form validation.

use std::sync::Arc;

use medilog_core::{Medication, MedicationDraft};
use thiserror::Error;

/// Reasons a medication draft cannot be saved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Medication name is required")]
    NameRequired,

    #[error("A medication named '{0}' already exists")]
    NameExists(String),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Check a draft against the current catalog before saving it.
///
/// The trimmed name must be non-empty and must not match, ignoring case, the
/// name of any other medication. The medication being edited may keep its
/// own name.
pub fn validate_medication(
    draft: &MedicationDraft,
    existing: &[Arc<Medication>],
) -> ValidationResult<()> {
    let name = draft.trimmed_name();
    if name.is_empty() {
        return Err(ValidationError::NameRequired);
    }

    let wanted = name.to_lowercase();
    let editing = draft.id.as_deref();
    let clash = existing
        .iter()
        .find(|m| m.name.to_lowercase() == wanted && Some(m.id.as_str()) != editing);

    match clash {
        Some(m) => Err(ValidationError::NameExists(m.name.clone())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Arc<Medication>> {
        vec![
            Arc::new(Medication::new("med-1", "Paralen")),
            Arc::new(Medication::new("med-2", "Nurofen")),
        ]
    }

    #[test]
    fn test_blank_name() {
        let result = validate_medication(&MedicationDraft::new("   "), &catalog());
        assert_eq!(result, Err(ValidationError::NameRequired));
    }

    #[test]
    fn test_duplicate_ignores_case_and_whitespace() {
        let result = validate_medication(&MedicationDraft::new(" paralen "), &catalog());
        assert_eq!(result, Err(ValidationError::NameExists("Paralen".into())));
    }

    #[test]
    fn test_editing_keeps_own_name() {
        let meds = catalog();
        let mut draft = MedicationDraft::edit(&meds[0]);
        assert!(validate_medication(&draft, &meds).is_ok());

        draft.name = "NUROFEN".into();
        assert!(matches!(
            validate_medication(&draft, &meds),
            Err(ValidationError::NameExists(_))
        ));
    }

    #[test]
    fn test_new_name_ok() {
        assert!(validate_medication(&MedicationDraft::new("Ibalgin"), &catalog()).is_ok());
    }
}
