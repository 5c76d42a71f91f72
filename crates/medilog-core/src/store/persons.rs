//! Person directory.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::FixedOffset;
use tracing::{debug, error, warn};

use super::{load, replace};
use crate::gateway::{ProfileLookup, RemoteGateway};
use crate::models::{locale_cmp, PersonInfo, PersonRaw, Record};
use crate::notify::{ChangeEvent, ChangeNotifier, Subscription};

#[derive(Debug, Default)]
struct DirectorySnapshot {
    persons: Vec<Arc<PersonInfo>>,
    by_entity: HashMap<String, Arc<PersonInfo>>,
    refreshed_at: Option<Instant>,
}

/// Persons tracked by the backend, sorted by display name.
pub struct PersonDirectory {
    gateway: Arc<dyn RemoteGateway>,
    profiles: Arc<dyn ProfileLookup>,
    offset: FixedOffset,
    notifier: ChangeNotifier,
    snapshot: RwLock<Arc<DirectorySnapshot>>,
}

impl PersonDirectory {
    /// Create an empty directory.
    ///
    /// `profiles` supplies display names and pictures; `offset` is the
    /// household offset used for the persons' latest records.
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        profiles: Arc<dyn ProfileLookup>,
        offset: FixedOffset,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            gateway,
            profiles,
            offset,
            notifier,
            snapshot: RwLock::default(),
        }
    }

    /// Register a listener for directory changes.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.notifier.subscribe(listener)
    }

    /// Replace the directory with the backend's person list.
    ///
    /// Failures are logged and leave the previous list in place.
    pub async fn fetch_all(&self) {
        debug!("Fetching persons");
        let response = match self.gateway.get_persons().await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Failed to fetch persons");
                return;
            }
        };

        let mut persons: Vec<PersonInfo> = response
            .persons
            .iter()
            .map(|raw| self.resolve(raw))
            .collect();
        persons.sort_by(|a, b| locale_cmp(&a.name, &b.name));

        let persons: Vec<Arc<PersonInfo>> = persons.into_iter().map(Arc::new).collect();
        let by_entity = persons
            .iter()
            .map(|p| (p.entity.clone(), Arc::clone(p)))
            .collect();
        let count = persons.len();

        replace(
            &self.snapshot,
            DirectorySnapshot {
                persons,
                by_entity,
                refreshed_at: Some(Instant::now()),
            },
        );
        debug!(count, "Person directory refreshed");
        self.notifier.notify(ChangeEvent::Persons);
    }

    fn resolve(&self, raw: &PersonRaw) -> PersonInfo {
        let profile = self.profiles.profile(&raw.entity).unwrap_or_default();
        let name = profile.friendly_name.unwrap_or_else(|| raw.entity.clone());

        let recent_record = raw.recent_record.as_ref().and_then(|record| {
            Record::from_raw(record, self.offset)
                .map_err(|e| warn!(person = %raw.entity, error = %e, "Ignoring unreadable recent record"))
                .ok()
        });

        PersonInfo {
            entity: raw.entity.clone(),
            name,
            entity_picture: profile.entity_picture,
            recent_record,
        }
    }

    /// The person whose latest record is newest.
    ///
    /// Persons without a record rank last; ties keep name order. `None` when
    /// the directory is empty.
    pub fn most_recent(&self) -> Option<Arc<PersonInfo>> {
        let snapshot = load(&self.snapshot);
        let mut best: Option<&Arc<PersonInfo>> = None;
        for person in &snapshot.persons {
            match best {
                Some(current) if person.recent_activity() <= current.recent_activity() => {}
                _ => best = Some(person),
            }
        }
        best.cloned()
    }

    pub fn get(&self, entity: Option<&str>) -> Option<Arc<PersonInfo>> {
        let entity = entity.filter(|e| !e.is_empty())?;
        load(&self.snapshot).by_entity.get(entity).cloned()
    }

    /// Display name of the person, or `""` when unset or unknown.
    pub fn get_name(&self, entity: Option<&str>) -> String {
        self.get(entity).map(|p| p.name.clone()).unwrap_or_default()
    }

    pub fn has(&self, entity: Option<&str>) -> bool {
        self.get(entity).is_some()
    }

    /// All persons, sorted by name.
    pub fn all(&self) -> Vec<Arc<PersonInfo>> {
        load(&self.snapshot).persons.clone()
    }

    pub fn count(&self) -> usize {
        load(&self.snapshot).persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn last_refreshed(&self) -> Option<Instant> {
        load(&self.snapshot).refreshed_at
    }
}
