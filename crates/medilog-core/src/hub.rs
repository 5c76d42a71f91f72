//! Composition root of the data layer.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::MedilogResult;
use crate::gateway::{ProfileLookup, RemoteGateway};
use crate::models::{PersonInfo, Record};
use crate::notify::{ChangeEvent, ChangeNotifier, Subscription};
use crate::store::{MedicationCatalog, PersonDirectory, RecordStoreRegistry};

/// Records of one person that use a given medication.
#[derive(Debug, Clone)]
pub struct PersonUsage {
    pub person: Arc<PersonInfo>,
    /// Newest first
    pub records: Vec<Arc<Record>>,
}

/// Owns the medication catalog, the person directory and the record stores.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use medilog_core::gateway::InMemoryGateway;
/// use medilog_core::{Config, DataHub, Medication};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let gateway = Arc::new(InMemoryGateway::new());
/// gateway.insert_medication(Medication::new("med-1", "Paralen"));
/// gateway.add_person("person.alice");
///
/// let hub = DataHub::new(gateway, Arc::new(()), Config::default()).unwrap();
/// hub.initialize().await;
///
/// assert_eq!(hub.medications().get_name(Some("med-1")), "Paralen");
/// assert_eq!(hub.persons().count(), 1);
/// # });
/// ```
pub struct DataHub {
    config: Config,
    medications: Arc<MedicationCatalog>,
    persons: Arc<PersonDirectory>,
    records: Arc<RecordStoreRegistry>,
}

impl DataHub {
    /// Build the stores. Nothing is fetched until [`initialize`](Self::initialize).
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        profiles: Arc<dyn ProfileLookup>,
        config: Config,
    ) -> MedilogResult<Self> {
        let offset = config.household_offset()?;

        let medications = MedicationCatalog::new(Arc::clone(&gateway), ChangeNotifier::new());
        let persons =
            PersonDirectory::new(Arc::clone(&gateway), profiles, offset, ChangeNotifier::new());
        let records = RecordStoreRegistry::new(gateway, offset, ChangeNotifier::new());

        Ok(Self {
            config,
            medications: Arc::new(medications),
            persons: Arc::new(persons),
            records: Arc::new(records),
        })
    }

    /// Load medications, then persons. Records load lazily per person.
    pub async fn initialize(&self) {
        info!("Initializing data hub");
        // Medications first; record screens resolve names through the catalog
        self.medications.fetch_all().await;
        self.persons.fetch_all().await;
        info!(
            medications = self.medications.count(),
            persons = self.persons.count(),
            "Data hub initialized"
        );
    }

    /// Refetch medications if the last successful fetch is at least `max_age` old.
    ///
    /// Returns whether a fetch was issued.
    pub async fn refresh_medications_if_stale(&self, max_age: Duration) -> bool {
        if !self.medications.is_stale(max_age) {
            debug!("Medication catalog is fresh");
            return false;
        }
        self.medications.fetch_all().await;
        true
    }

    /// [`refresh_medications_if_stale`](Self::refresh_medications_if_stale)
    /// with the configured staleness window.
    pub async fn refresh_medications(&self) -> bool {
        self.refresh_medications_if_stale(self.config.medication_max_age())
            .await
    }

    /// Register `listener` for changes of every store family.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let listener = Arc::new(listener);
        let on_medications = Arc::clone(&listener);
        let on_persons = Arc::clone(&listener);

        Subscription::merge([
            self.medications.subscribe(move |e| on_medications(e)),
            self.persons.subscribe(move |e| on_persons(e)),
            self.records.subscribe(move |e| listener(e)),
        ])
    }

    /// Every person's records that use `medication_id`, ordered by person name.
    ///
    /// Loads record stores as needed; persons without such records are left out.
    pub async fn medication_usage(&self, medication_id: &str) -> Vec<PersonUsage> {
        let mut usage = Vec::new();
        for person in self.persons.all() {
            let store = self.records.get_or_load(&person).await;
            let records: Vec<Arc<Record>> = store
                .all()
                .into_iter()
                .filter(|r| r.medication_id.as_deref() == Some(medication_id))
                .collect();
            if !records.is_empty() {
                usage.push(PersonUsage { person, records });
            }
        }
        usage
    }

    pub fn medications(&self) -> &Arc<MedicationCatalog> {
        &self.medications
    }

    pub fn persons(&self) -> &Arc<PersonDirectory> {
        &self.persons
    }

    pub fn records(&self) -> &Arc<RecordStoreRegistry> {
        &self.records
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{services, InMemoryGateway};

    #[test]
    fn test_rejects_bad_offset() {
        let config = Config {
            utc_offset_minutes: 24 * 60,
            ..Config::default()
        };
        let result = DataHub::new(Arc::new(InMemoryGateway::new()), Arc::new(()), config);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_initialize_does_not_load_records() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.add_person("person.alice");
        let hub = DataHub::new(gateway.clone(), Arc::new(()), Config::default()).unwrap();

        hub.initialize().await;

        assert_eq!(gateway.call_count(services::GET_MEDICATIONS), 1);
        assert_eq!(gateway.call_count(services::GET_PERSONS), 1);
        assert_eq!(gateway.call_count(services::GET_RECORDS), 0);
        assert!(hub.records().loaded_entities().is_empty());
    }
}
