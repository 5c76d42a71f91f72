//! Domain models for the MediLog data layer.

mod medication;
mod person;
mod record;

pub use medication::*;
pub use person::*;
pub use record::*;

pub(crate) use medication::trimmed_or_none;

use std::cmp::Ordering;

/// Compare display strings the way a user expects a list to be ordered:
/// case-insensitive first, then by exact text for a stable result.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
