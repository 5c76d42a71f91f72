//! Medication catalog.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use super::{digest_json, load, replace};
use crate::error::MedilogResult;
use crate::gateway::{DeleteMedicationRequest, RemoteGateway, UpsertMedicationRequest};
use crate::models::{trimmed_or_none, Medication, MedicationDraft, MedicationNames};
use crate::notify::{ChangeEvent, ChangeNotifier, Subscription};

#[derive(Debug, Default)]
struct CatalogSnapshot {
    medications: Vec<Arc<Medication>>,
    by_id: HashMap<String, Arc<Medication>>,
    refreshed_at: Option<Instant>,
}

impl CatalogSnapshot {
    fn new(medications: Vec<Medication>) -> Self {
        let medications: Vec<Arc<Medication>> = medications.into_iter().map(Arc::new).collect();
        let by_id = medications
            .iter()
            .map(|m| (m.id.clone(), Arc::clone(m)))
            .collect();
        Self {
            medications,
            by_id,
            refreshed_at: Some(Instant::now()),
        }
    }
}

/// Every medication known to the backend, with O(1) lookup by id.
///
/// Mutations go straight to the backend and are followed by a full refetch;
/// the local list is never patched in place.
pub struct MedicationCatalog {
    gateway: Arc<dyn RemoteGateway>,
    notifier: ChangeNotifier,
    snapshot: RwLock<Arc<CatalogSnapshot>>,
}

impl MedicationCatalog {
    /// Create an empty catalog. Nothing is fetched until [`fetch_all`](Self::fetch_all).
    pub fn new(gateway: Arc<dyn RemoteGateway>, notifier: ChangeNotifier) -> Self {
        Self {
            gateway,
            notifier,
            snapshot: RwLock::default(),
        }
    }

    /// Register a listener for catalog changes.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.notifier.subscribe(listener)
    }

    /// Replace the catalog with the backend's medication list.
    ///
    /// Failures are logged and leave the previous list in place.
    pub async fn fetch_all(&self) {
        debug!("Fetching medications");
        match self.gateway.get_medications().await {
            Ok(response) => {
                let count = response.medications.len();
                replace(&self.snapshot, CatalogSnapshot::new(response.medications));
                debug!(count, "Medication catalog refreshed");
                self.notifier.notify(ChangeEvent::Medications);
            }
            Err(e) => error!(error = %e, "Failed to fetch medications"),
        }
    }

    /// Create or update a medication, then refetch the catalog.
    ///
    /// The name is trimmed and blank optional fields are sent as absent.
    /// Name uniqueness is the caller's concern.
    pub async fn save(&self, draft: &MedicationDraft) -> MedilogResult<()> {
        let request = UpsertMedicationRequest {
            id: draft.id.clone().filter(|id| !id.is_empty()),
            name: draft.trimmed_name().to_string(),
            units: trimmed_or_none(draft.units.as_deref()),
            is_antipyretic: draft.is_antipyretic,
            active_ingredient: trimmed_or_none(draft.active_ingredient.as_deref()),
        };
        let creating = request.id.is_none();
        let name = request.name.clone();

        if let Err(e) = self.gateway.upsert_medication(request).await {
            error!(medication = %name, error = %e, "Failed to save medication");
            return Err(e.into());
        }
        info!(medication = %name, created = creating, "Medication saved");

        self.fetch_all().await;
        Ok(())
    }

    /// Delete a medication, then refetch the catalog.
    ///
    /// The backend refuses medications still referenced by records.
    pub async fn delete(&self, id: &str) -> MedilogResult<()> {
        let request = DeleteMedicationRequest { id: id.to_string() };
        if let Err(e) = self.gateway.delete_medication(request).await {
            error!(medication_id = %id, error = %e, "Failed to delete medication");
            return Err(e.into());
        }
        info!(medication_id = %id, "Medication deleted");

        self.fetch_all().await;
        Ok(())
    }

    pub fn get(&self, id: Option<&str>) -> Option<Arc<Medication>> {
        let id = id.filter(|id| !id.is_empty())?;
        load(&self.snapshot).by_id.get(id).cloned()
    }

    /// Name of the medication, or `""` when unset or unknown.
    pub fn get_name(&self, id: Option<&str>) -> String {
        self.get(id).map(|m| m.name.clone()).unwrap_or_default()
    }

    pub fn has(&self, id: Option<&str>) -> bool {
        self.get(id).is_some()
    }

    /// All medications in backend order.
    pub fn all(&self) -> Vec<Arc<Medication>> {
        load(&self.snapshot).medications.clone()
    }

    pub fn count(&self) -> usize {
        load(&self.snapshot).medications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// When the last successful fetch completed.
    pub fn last_refreshed(&self) -> Option<Instant> {
        load(&self.snapshot).refreshed_at
    }

    /// Whether the catalog was never fetched or is older than `max_age`.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        is_older_than(self.last_refreshed(), Instant::now(), max_age)
    }

    /// Hex SHA-256 over the current medication list.
    pub fn digest(&self) -> MedilogResult<String> {
        digest_json(&load(&self.snapshot).medications)
    }
}

fn is_older_than(refreshed_at: Option<Instant>, now: Instant, max_age: Duration) -> bool {
    refreshed_at.map_or(true, |at| now.saturating_duration_since(at) > max_age)
}

impl MedicationNames for MedicationCatalog {
    fn medication_name(&self, id: Option<&str>) -> String {
        self.get_name(id)
    }
}
