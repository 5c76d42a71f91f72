//! Person models.

use serde::{Deserialize, Serialize};

use super::record::{Record, RecordRaw};

/// Person as listed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonRaw {
    /// Home-automation entity id (e.g., "person.alice")
    pub entity: String,
    /// Latest record of this person, if any
    #[serde(default)]
    pub recent_record: Option<RecordRaw>,
}

/// Display attributes of a person, resolved outside the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersonProfile {
    pub friendly_name: Option<String>,
    pub entity_picture: Option<String>,
}

/// A person whose records are tracked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonInfo {
    /// Stable external identifier
    pub entity: String,
    /// Display name; falls back to the entity id
    pub name: String,
    pub entity_picture: Option<String>,
    /// Latest record as of the last directory fetch.
    ///
    /// Not updated by record mutations made afterwards.
    pub recent_record: Option<Record>,
}

impl PersonInfo {
    /// Create a person without a picture or recent record.
    pub fn new(entity: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            name: name.into(),
            entity_picture: None,
            recent_record: None,
        }
    }

    /// Time of the most recent record, if known.
    pub fn recent_activity(&self) -> Option<super::Timestamp> {
        self.recent_record.as_ref().map(|r| r.datetime)
    }
}
