//! Backend contract for the MediLog data layer.
//!
//! The stores only talk to the backend through [`RemoteGateway`]. Two
//! implementations ship with the crate:
//!
//! - [`ServiceGateway`]: maps each RPC onto a home-automation service call
//!   through a [`ServiceTransport`].
//! - [`InMemoryGateway`]: an in-process backend for tests and demos.
//!
//! ```text
//!  MedicationCatalog ─┐
//!  PersonDirectory  ──┼──► RemoteGateway ──► ServiceTransport ──► backend
//!  PersonRecordStore ─┘
//! ```

mod memory;
mod profile;
mod service;

pub use memory::InMemoryGateway;
pub use profile::ProfileLookup;
pub use service::{ServiceGateway, ServiceTransport};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;
use crate::models::{Medication, PersonRaw, RecordRaw};

/// Backend service names.
pub mod services {
    pub const GET_MEDICATIONS: &str = "get_medications";
    pub const UPSERT_MEDICATION: &str = "add_or_update_medication";
    pub const DELETE_MEDICATION: &str = "delete_medication";
    pub const GET_PERSONS: &str = "get_person_list";
    pub const GET_RECORDS: &str = "get_records";
    pub const UPSERT_RECORD: &str = "add_or_update_record";
    pub const DELETE_RECORD: &str = "delete_record";
}

/// Response of `get_medications`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationsResponse {
    pub medications: Vec<Medication>,
}

/// Request of `add_or_update_medication`. An absent `id` creates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpsertMedicationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    pub is_antipyretic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_ingredient: Option<String>,
}

/// Request of `delete_medication`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteMedicationRequest {
    pub id: String,
}

/// Response of `get_person_list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonsResponse {
    pub persons: Vec<PersonRaw>,
}

/// Request of `get_records`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetRecordsRequest {
    pub person_id: String,
}

/// Response of `get_records`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordsResponse {
    pub records: Vec<RecordRaw>,
}

/// Request of `add_or_update_record`. An absent `id` creates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpsertRecordRequest {
    #[serde(flatten)]
    pub record: RecordRaw,
    pub person_id: String,
}

/// Request of `delete_record`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteRecordRequest {
    pub person_id: String,
    pub id: String,
}

/// Request/response channel to the MediLog backend.
///
/// Calls have no client-side timeout or retry. Transport failures surface as
/// [`GatewayError::Transport`](crate::GatewayError::Transport), refusals
/// (such as deleting a medication that records still use) as
/// [`GatewayError::Rejected`](crate::GatewayError::Rejected).
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn get_medications(&self) -> GatewayResult<MedicationsResponse>;

    async fn upsert_medication(&self, request: UpsertMedicationRequest) -> GatewayResult<()>;

    /// Fails if the medication is referenced by existing records.
    async fn delete_medication(&self, request: DeleteMedicationRequest) -> GatewayResult<()>;

    async fn get_persons(&self) -> GatewayResult<PersonsResponse>;

    async fn get_records(&self, request: GetRecordsRequest) -> GatewayResult<RecordsResponse>;

    async fn upsert_record(&self, request: UpsertRecordRequest) -> GatewayResult<()>;

    async fn delete_record(&self, request: DeleteRecordRequest) -> GatewayResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_record_wire_shape() {
        let request = UpsertRecordRequest {
            record: RecordRaw {
                id: None,
                datetime: "2024-01-01T10:00:00.000Z".into(),
                temperature: None,
                medication_id: Some("med-1".into()),
                medication_amount: Some(2.0),
                note: None,
            },
            person_id: "person.alice".into(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "datetime": "2024-01-01T10:00:00.000Z",
                "medication_id": "med-1",
                "medication_amount": 2.0,
                "person_id": "person.alice"
            })
        );
    }

    #[test]
    fn test_upsert_medication_omits_absent_id() {
        let request = UpsertMedicationRequest {
            id: None,
            name: "Paralen".into(),
            units: None,
            is_antipyretic: true,
            active_ingredient: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, serde_json::json!({"name": "Paralen", "is_antipyretic": true}));
    }
}
