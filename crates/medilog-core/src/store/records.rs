//! Records of a single person.

use std::sync::{Arc, RwLock};

use chrono::FixedOffset;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::{digest_json, group_by_periods, load, replace};
use crate::error::{GatewayError, MedilogResult};
use crate::gateway::{DeleteRecordRequest, GetRecordsRequest, RemoteGateway, UpsertRecordRequest};
use crate::models::{to_wire_datetime, Record, RecordRaw, RecordsGroupByTime};
use crate::notify::{ChangeEvent, ChangeNotifier};

/// A person's records at one point in time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordSnapshot {
    /// Newest first
    pub all: Vec<Arc<Record>>,
    /// `all` split into runs without multi-day gaps
    pub grouped: Vec<RecordsGroupByTime>,
}

/// Cached records of one person.
///
/// Created by [`RecordStoreRegistry`](super::RecordStoreRegistry), which
/// guarantees a single store per person. Starts empty until the first
/// [`fetch`](Self::fetch) completes.
pub struct PersonRecordStore {
    entity: String,
    gateway: Arc<dyn RemoteGateway>,
    offset: FixedOffset,
    notifier: ChangeNotifier,
    snapshot: RwLock<Arc<RecordSnapshot>>,
}

impl PersonRecordStore {
    pub(crate) fn new(
        entity: impl Into<String>,
        gateway: Arc<dyn RemoteGateway>,
        offset: FixedOffset,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            entity: entity.into(),
            gateway,
            offset,
            notifier,
            snapshot: RwLock::default(),
        }
    }

    /// Entity id of the owning person.
    pub fn person_entity(&self) -> &str {
        &self.entity
    }

    /// Reload the person's records and rebuild the grouping.
    ///
    /// Failures are logged and leave the previous records in place. Records
    /// with unreadable timestamps are skipped.
    pub async fn fetch(&self) {
        debug!(person = %self.entity, "Fetching records");
        let request = GetRecordsRequest {
            person_id: self.entity.clone(),
        };
        let response = match self.gateway.get_records(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(person = %self.entity, error = %e, "Failed to fetch records");
                return;
            }
        };

        let mut all: Vec<Arc<Record>> = response
            .records
            .iter()
            .filter_map(|raw| match Record::from_raw(raw, self.offset) {
                Ok(record) => Some(Arc::new(record)),
                Err(e) => {
                    warn!(person = %self.entity, record_id = ?raw.id, error = %e, "Skipping record");
                    None
                }
            })
            .collect();
        all.sort_by(|a, b| b.datetime.cmp(&a.datetime));
        let grouped = group_by_periods(&all);

        debug!(
            person = %self.entity,
            count = all.len(),
            groups = grouped.len(),
            "Records refreshed"
        );
        replace(&self.snapshot, RecordSnapshot { all, grouped });
        self.notifier.notify(ChangeEvent::Records {
            person: self.entity.clone(),
        });
    }

    /// Create a record for this person, then refetch.
    ///
    /// Any id on `record` is ignored.
    pub async fn add_record(&self, record: &Record) -> MedilogResult<()> {
        let request = self.upsert_request(record, None);
        self.mutate("add", self.gateway.upsert_record(request)).await
    }

    /// Update a record of this person, then refetch.
    ///
    /// A record without an id is created instead.
    pub async fn update_record(&self, record: &Record) -> MedilogResult<()> {
        let request = self.upsert_request(record, record.id.clone());
        self.mutate("update", self.gateway.upsert_record(request)).await
    }

    /// Delete a record of this person, then refetch.
    pub async fn delete_record(&self, id: &str) -> MedilogResult<()> {
        let request = DeleteRecordRequest {
            person_id: self.entity.clone(),
            id: id.to_string(),
        };
        self.mutate("delete", self.gateway.delete_record(request)).await
    }

    fn upsert_request(&self, record: &Record, id: Option<String>) -> UpsertRecordRequest {
        UpsertRecordRequest {
            record: RecordRaw {
                id,
                datetime: to_wire_datetime(&record.datetime),
                temperature: record.temperature,
                medication_id: record.medication_id.clone(),
                medication_amount: record.medication_amount,
                note: record.note.as_deref().map(|note| note.trim().to_string()),
            },
            person_id: self.entity.clone(),
        }
    }

    async fn mutate<F>(&self, action: &str, call: F) -> MedilogResult<()>
    where
        F: std::future::Future<Output = Result<(), GatewayError>>,
    {
        if let Err(e) = call.await {
            error!(person = %self.entity, action, error = %e, "Record mutation failed");
            return Err(e.into());
        }
        info!(person = %self.entity, action, "Record mutation applied");

        self.fetch().await;
        Ok(())
    }

    /// All records, newest first.
    pub fn all(&self) -> Vec<Arc<Record>> {
        load(&self.snapshot).all.clone()
    }

    pub fn grouped(&self) -> Vec<RecordsGroupByTime> {
        load(&self.snapshot).grouped.clone()
    }

    /// Both views from the same fetch.
    pub fn snapshot(&self) -> Arc<RecordSnapshot> {
        load(&self.snapshot)
    }

    /// Hex SHA-256 over the current records and grouping.
    pub fn digest(&self) -> MedilogResult<String> {
        digest_json(&*load(&self.snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{services, InMemoryGateway};
    use crate::models::parse_timestamp;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn raw(datetime: &str) -> RecordRaw {
        RecordRaw {
            id: None,
            datetime: datetime.to_string(),
            temperature: Some(37.1),
            medication_id: None,
            medication_amount: None,
            note: None,
        }
    }

    fn store(gateway: &Arc<InMemoryGateway>) -> PersonRecordStore {
        PersonRecordStore::new("person.alice", gateway.clone(), utc(), ChangeNotifier::new())
    }

    #[tokio::test]
    async fn test_fetch_sorts_newest_first() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.insert_record("person.alice", raw("2024-01-01T08:00:00Z"));
        gateway.insert_record("person.alice", raw("2024-01-02T08:00:00Z"));
        gateway.insert_record("person.alice", raw("2024-01-01T20:00:00Z"));

        let store = store(&gateway);
        assert!(store.all().is_empty());
        store.fetch().await;

        let hours: Vec<String> = store
            .all()
            .iter()
            .map(|r| r.datetime.format("%d %H").to_string())
            .collect();
        assert_eq!(hours, vec!["02 08", "01 20", "01 08"]);
        assert_eq!(store.grouped().len(), 1);
        assert_eq!(store.person_entity(), "person.alice");
    }

    #[tokio::test]
    async fn test_unreadable_records_skipped() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.insert_record("person.alice", raw("2024-01-01T08:00:00Z"));
        gateway.insert_record("person.alice", raw("garbage"));

        let store = store(&gateway);
        store.fetch().await;
        assert_eq!(store.all().len(), 1);
    }

    #[tokio::test]
    async fn test_add_sends_wire_datetime_and_trimmed_note() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.add_person("person.alice");
        let store = store(&gateway);

        let prague = FixedOffset::east_opt(3600).unwrap();
        let mut record = Record::new(parse_timestamp("2024-01-01T10:00:00", prague).unwrap())
            .with_medication("med-1", Some(2.0));
        record.note = Some("  after lunch ".into());
        record.id = Some("ignored".into());

        store.add_record(&record).await.unwrap();

        let saved = gateway.records_of("person.alice");
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].datetime, "2024-01-01T09:00:00.000Z");
        assert_eq!(saved[0].note.as_deref(), Some("after lunch"));
        assert_ne!(saved[0].id.as_deref(), Some("ignored"));
        assert_eq!(store.all().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let gateway = Arc::new(InMemoryGateway::new());
        let id = gateway.insert_record("person.alice", raw("2024-01-01T08:00:00Z"));
        let store = store(&gateway);
        store.fetch().await;

        let mut record = (*store.all()[0]).clone();
        record.temperature = Some(39.0);
        store.update_record(&record).await.unwrap();
        assert_eq!(store.all()[0].temperature, Some(39.0));
        assert_eq!(store.all()[0].id.as_deref(), Some(id.as_str()));

        store.delete_record(&id).await.unwrap();
        assert!(store.all().is_empty());
        assert!(store.grouped().is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_records() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.insert_record("person.alice", raw("2024-01-01T08:00:00Z"));
        let store = store(&gateway);
        store.fetch().await;
        let before = store.digest().unwrap();

        let result = store.delete_record("missing").await;
        assert!(result.unwrap_err().gateway().unwrap().is_rejection());
        assert_eq!(store.digest().unwrap(), before);
        assert_eq!(gateway.call_count(services::GET_RECORDS), 1);
    }
}
