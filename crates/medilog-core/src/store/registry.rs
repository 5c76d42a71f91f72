//! Lazily loaded record stores, one per person.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::FixedOffset;
use tokio::sync::OnceCell;
use tracing::debug;

use super::PersonRecordStore;
use crate::gateway::RemoteGateway;
use crate::models::PersonInfo;
use crate::notify::{ChangeEvent, ChangeNotifier, Subscription};

type StoreSlot = Arc<OnceCell<Arc<PersonRecordStore>>>;

/// Creates and caches [`PersonRecordStore`]s.
///
/// Concurrent first requests for the same person share one load: the slot
/// for a person is created once and initialised by whichever caller gets
/// there first, while the others wait on it.
pub struct RecordStoreRegistry {
    gateway: Arc<dyn RemoteGateway>,
    offset: FixedOffset,
    notifier: ChangeNotifier,
    stores: Mutex<HashMap<String, StoreSlot>>,
}

impl RecordStoreRegistry {
    pub fn new(gateway: Arc<dyn RemoteGateway>, offset: FixedOffset, notifier: ChangeNotifier) -> Self {
        Self {
            gateway,
            offset,
            notifier,
            stores: Mutex::default(),
        }
    }

    /// Register a listener for record changes of every person.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.notifier.subscribe(listener)
    }

    /// The store for `person`, fetching its records on first use.
    pub async fn get_or_load(&self, person: &PersonInfo) -> Arc<PersonRecordStore> {
        let slot = Arc::clone(self.lock().entry(person.entity.clone()).or_default());

        let store = slot
            .get_or_init(|| async {
                debug!(person = %person.entity, "Loading record store");
                let store = Arc::new(PersonRecordStore::new(
                    person.entity.clone(),
                    Arc::clone(&self.gateway),
                    self.offset,
                    self.notifier.clone(),
                ));
                store.fetch().await;
                store
            })
            .await;
        Arc::clone(store)
    }

    /// The store for `entity` if it has finished loading. Never fetches.
    pub fn get_cached(&self, entity: &str) -> Option<Arc<PersonRecordStore>> {
        self.lock().get(entity).and_then(|slot| slot.get().cloned())
    }

    /// Refetch every loaded store.
    pub async fn refresh_all(&self) {
        let stores = self.loaded();
        debug!(count = stores.len(), "Refreshing record stores");
        for store in stores {
            store.fetch().await;
        }
    }

    /// Entities whose stores have finished loading.
    pub fn loaded_entities(&self) -> Vec<String> {
        let mut entities: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(entity, _)| entity.clone())
            .collect();
        entities.sort();
        entities
    }

    fn loaded(&self) -> Vec<Arc<PersonRecordStore>> {
        self.lock()
            .values()
            .filter_map(|slot| slot.get().cloned())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoreSlot>> {
        self.stores.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
