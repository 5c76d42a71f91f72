//! Display-name resolution for persons.

use std::collections::HashMap;

use crate::models::PersonProfile;

/// Looks up display attributes of person entities.
///
/// The backend only knows entity ids; names and pictures come from the
/// home-automation entity registry.
pub trait ProfileLookup: Send + Sync {
    fn profile(&self, entity: &str) -> Option<PersonProfile>;
}

impl ProfileLookup for HashMap<String, PersonProfile> {
    fn profile(&self, entity: &str) -> Option<PersonProfile> {
        self.get(entity).cloned()
    }
}

/// No profiles: every person is shown by entity id.
impl ProfileLookup for () {
    fn profile(&self, _entity: &str) -> Option<PersonProfile> {
        None
    }
}
