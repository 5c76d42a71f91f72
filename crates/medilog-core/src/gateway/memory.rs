//! In-process backend implementing [`RemoteGateway`].
//!
//! Behaves like the real service closely enough to drive the stores in
//! tests: ids are assigned on create, deleting a medication that records
//! still reference is rejected, and each person's latest record is reported
//! with the person list. Calls are counted per service and the gateway can
//! be taken offline or slowed down to exercise failure and concurrency paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;

use super::{
    services, DeleteMedicationRequest, DeleteRecordRequest, GetRecordsRequest,
    MedicationsResponse, PersonsResponse, RecordsResponse, RemoteGateway,
    UpsertMedicationRequest, UpsertRecordRequest,
};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{Medication, PersonRaw, RecordRaw};

#[derive(Default)]
struct BackendState {
    medications: Vec<Medication>,
    /// Person entities in registration order
    persons: Vec<String>,
    records: HashMap<String, Vec<RecordRaw>>,
}

/// In-memory MediLog backend.
///
/// # Example
///
/// ```
/// use medilog_core::gateway::{InMemoryGateway, services};
/// use medilog_core::Medication;
///
/// let gateway = InMemoryGateway::new();
/// gateway.insert_medication(Medication::new("med-1", "Paralen"));
/// gateway.add_person("person.alice");
/// assert_eq!(gateway.call_count(services::GET_MEDICATIONS), 0);
/// ```
#[derive(Default)]
pub struct InMemoryGateway {
    state: Mutex<BackendState>,
    calls: Mutex<HashMap<&'static str, usize>>,
    offline: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl InMemoryGateway {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a medication as-is.
    pub fn insert_medication(&self, medication: Medication) {
        self.state().medications.push(medication);
    }

    /// Register a person with no records.
    pub fn add_person(&self, entity: impl Into<String>) {
        let entity = entity.into();
        let mut state = self.state();
        if !state.persons.contains(&entity) {
            state.records.entry(entity.clone()).or_default();
            state.persons.push(entity);
        }
    }

    /// Seed a record for a person, assigning an id when absent.
    ///
    /// Returns the record id.
    pub fn insert_record(&self, entity: &str, mut record: RecordRaw) -> String {
        self.add_person(entity);
        let id = record
            .id
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone();
        self.state()
            .records
            .entry(entity.to_string())
            .or_default()
            .push(record);
        id
    }

    /// Current medications held by the backend.
    pub fn medications(&self) -> Vec<Medication> {
        self.state().medications.clone()
    }

    /// Current records of a person held by the backend.
    pub fn records_of(&self, entity: &str) -> Vec<RecordRaw> {
        self.state().records.get(entity).cloned().unwrap_or_default()
    }

    /// Make every call fail with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Delay every call by `latency` before it is served.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Number of times `service` was called (see [`services`]).
    pub fn call_count(&self, service: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service)
            .copied()
            .unwrap_or(0)
    }

    /// Reset all call counters.
    pub fn reset_counts(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call, apply latency and offline mode.
    async fn enter(&self, service: &'static str) -> GatewayResult<()> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(service)
            .or_insert(0) += 1;

        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.offline.load(Ordering::Relaxed) {
            return Err(GatewayError::Transport(format!(
                "backend unreachable while calling {}",
                service
            )));
        }
        Ok(())
    }
}

/// Latest record by parsed timestamp; unparseable timestamps never win.
fn latest_record(records: &[RecordRaw]) -> Option<RecordRaw> {
    records
        .iter()
        .filter_map(|r| {
            DateTime::parse_from_rfc3339(&r.datetime)
                .ok()
                .map(|dt| (dt, r))
        })
        .max_by_key(|(dt, _)| *dt)
        .map(|(_, r)| r.clone())
}

#[async_trait]
impl RemoteGateway for InMemoryGateway {
    async fn get_medications(&self) -> GatewayResult<MedicationsResponse> {
        self.enter(services::GET_MEDICATIONS).await?;
        Ok(MedicationsResponse {
            medications: self.state().medications.clone(),
        })
    }

    async fn upsert_medication(&self, request: UpsertMedicationRequest) -> GatewayResult<()> {
        self.enter(services::UPSERT_MEDICATION).await?;
        let mut state = self.state();

        let duplicate = state.medications.iter().any(|m| {
            m.name.to_lowercase() == request.name.to_lowercase()
                && Some(&m.id) != request.id.as_ref()
        });
        if duplicate {
            return Err(GatewayError::rejected(
                services::UPSERT_MEDICATION,
                format!("medication named '{}' already exists", request.name),
            ));
        }

        match request.id {
            Some(id) => {
                let existing = state
                    .medications
                    .iter_mut()
                    .find(|m| m.id == id)
                    .ok_or_else(|| {
                        GatewayError::rejected(
                            services::UPSERT_MEDICATION,
                            format!("unknown medication '{}'", id),
                        )
                    })?;
                existing.name = request.name;
                existing.units = request.units;
                existing.is_antipyretic = request.is_antipyretic;
                existing.active_ingredient = request.active_ingredient;
            }
            None => state.medications.push(Medication {
                id: uuid::Uuid::new_v4().to_string(),
                name: request.name,
                units: request.units,
                is_antipyretic: request.is_antipyretic,
                active_ingredient: request.active_ingredient,
            }),
        }
        Ok(())
    }

    async fn delete_medication(&self, request: DeleteMedicationRequest) -> GatewayResult<()> {
        self.enter(services::DELETE_MEDICATION).await?;
        let mut state = self.state();

        let in_use = state
            .records
            .values()
            .flatten()
            .any(|r| r.medication_id.as_deref() == Some(request.id.as_str()));
        if in_use {
            return Err(GatewayError::rejected(
                services::DELETE_MEDICATION,
                format!("medication '{}' is used by existing records", request.id),
            ));
        }

        let before = state.medications.len();
        state.medications.retain(|m| m.id != request.id);
        if state.medications.len() == before {
            return Err(GatewayError::rejected(
                services::DELETE_MEDICATION,
                format!("unknown medication '{}'", request.id),
            ));
        }
        Ok(())
    }

    async fn get_persons(&self) -> GatewayResult<PersonsResponse> {
        self.enter(services::GET_PERSONS).await?;
        let state = self.state();
        let persons = state
            .persons
            .iter()
            .map(|entity| PersonRaw {
                entity: entity.clone(),
                recent_record: state
                    .records
                    .get(entity)
                    .and_then(|records| latest_record(records)),
            })
            .collect();
        Ok(PersonsResponse { persons })
    }

    async fn get_records(&self, request: GetRecordsRequest) -> GatewayResult<RecordsResponse> {
        self.enter(services::GET_RECORDS).await?;
        Ok(RecordsResponse {
            records: self.records_of(&request.person_id),
        })
    }

    async fn upsert_record(&self, request: UpsertRecordRequest) -> GatewayResult<()> {
        self.enter(services::UPSERT_RECORD).await?;
        let UpsertRecordRequest { mut record, person_id } = request;

        let mut state = self.state();
        if !state.persons.contains(&person_id) {
            return Err(GatewayError::rejected(
                services::UPSERT_RECORD,
                format!("unknown person '{}'", person_id),
            ));
        }
        let records = state.records.entry(person_id).or_default();

        match record.id.clone() {
            Some(id) => {
                let existing = records
                    .iter_mut()
                    .find(|r| r.id.as_deref() == Some(id.as_str()))
                    .ok_or_else(|| {
                        GatewayError::rejected(
                            services::UPSERT_RECORD,
                            format!("unknown record '{}'", id),
                        )
                    })?;
                *existing = record;
            }
            None => {
                record.id = Some(uuid::Uuid::new_v4().to_string());
                records.push(record);
            }
        }
        Ok(())
    }

    async fn delete_record(&self, request: DeleteRecordRequest) -> GatewayResult<()> {
        self.enter(services::DELETE_RECORD).await?;
        let mut state = self.state();
        let records = state.records.entry(request.person_id).or_default();

        let before = records.len();
        records.retain(|r| r.id.as_deref() != Some(request.id.as_str()));
        if records.len() == before {
            return Err(GatewayError::rejected(
                services::DELETE_RECORD,
                format!("unknown record '{}'", request.id),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(datetime: &str, medication_id: Option<&str>) -> RecordRaw {
        RecordRaw {
            id: None,
            datetime: datetime.to_string(),
            temperature: None,
            medication_id: medication_id.map(str::to_string),
            medication_amount: None,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_delete_in_use_is_rejected() {
        let gateway = InMemoryGateway::new();
        gateway.insert_medication(Medication::new("med-1", "Paralen"));
        gateway.insert_record("person.alice", raw("2024-01-01T10:00:00Z", Some("med-1")));

        let result = gateway
            .delete_medication(DeleteMedicationRequest { id: "med-1".into() })
            .await;

        assert!(matches!(result, Err(GatewayError::Rejected { .. })));
        assert_eq!(gateway.medications().len(), 1);
    }

    #[tokio::test]
    async fn test_recent_record_reported() {
        let gateway = InMemoryGateway::new();
        gateway.insert_record("person.alice", raw("2024-01-01T10:00:00Z", None));
        gateway.insert_record("person.alice", raw("2024-06-01T10:00:00Z", None));
        gateway.add_person("person.bob");

        let persons = gateway.get_persons().await.unwrap().persons;
        assert_eq!(persons.len(), 2);
        assert_eq!(
            persons[0].recent_record.as_ref().unwrap().datetime,
            "2024-06-01T10:00:00Z"
        );
        assert!(persons[1].recent_record.is_none());
    }

    #[tokio::test]
    async fn test_offline_counts_call() {
        let gateway = InMemoryGateway::new();
        gateway.set_offline(true);

        let result = gateway.get_medications().await;
        assert!(matches!(result, Err(GatewayError::Transport(_))));
        assert_eq!(gateway.call_count(services::GET_MEDICATIONS), 1);
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let gateway = InMemoryGateway::new();
        gateway
            .upsert_medication(UpsertMedicationRequest {
                id: None,
                name: "Nurofen".into(),
                units: Some("ml".into()),
                is_antipyretic: true,
                active_ingredient: None,
            })
            .await
            .unwrap();

        let id = gateway.medications()[0].id.clone();
        gateway
            .upsert_medication(UpsertMedicationRequest {
                id: Some(id.clone()),
                name: "Nurofen Junior".into(),
                units: Some("ml".into()),
                is_antipyretic: true,
                active_ingredient: Some("ibuprofen".into()),
            })
            .await
            .unwrap();

        let meds = gateway.medications();
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].id, id);
        assert_eq!(meds[0].name, "Nurofen Junior");
    }
}
