//! RemoteGateway over generic home-automation service calls.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{
    services, DeleteMedicationRequest, DeleteRecordRequest, GetRecordsRequest,
    MedicationsResponse, PersonsResponse, RecordsResponse, RemoteGateway,
    UpsertMedicationRequest, UpsertRecordRequest,
};
use crate::error::{GatewayError, GatewayResult};

/// A service-call channel such as a home-automation websocket connection.
#[async_trait]
pub trait ServiceTransport: Send + Sync {
    /// Invoke `domain.service` with `data`.
    ///
    /// When `return_response` is set the service's response payload is
    /// returned; otherwise `Ok(None)` acknowledges success.
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Value,
        return_response: bool,
    ) -> GatewayResult<Option<Value>>;
}

/// Gateway translating each RPC into a named service call.
pub struct ServiceGateway<T> {
    transport: T,
    domain: String,
}

impl<T: ServiceTransport> ServiceGateway<T> {
    /// Create a gateway calling services in `domain`.
    pub fn new(transport: T, domain: impl Into<String>) -> Self {
        Self {
            transport,
            domain: domain.into(),
        }
    }

    /// The service domain used for every call.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Get the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn query<R: DeserializeOwned>(&self, service: &str, data: Value) -> GatewayResult<R> {
        let response = self
            .transport
            .call_service(&self.domain, service, data, true)
            .await?
            .ok_or_else(|| GatewayError::MissingResponse(service.to_string()))?;
        Ok(serde_json::from_value(response)?)
    }

    async fn mutate<Q: Serialize>(&self, service: &str, request: &Q) -> GatewayResult<()> {
        let data = serde_json::to_value(request)?;
        self.transport
            .call_service(&self.domain, service, data, false)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<T: ServiceTransport> RemoteGateway for ServiceGateway<T> {
    async fn get_medications(&self) -> GatewayResult<MedicationsResponse> {
        self.query(services::GET_MEDICATIONS, Value::Object(Default::default()))
            .await
    }

    async fn upsert_medication(&self, request: UpsertMedicationRequest) -> GatewayResult<()> {
        self.mutate(services::UPSERT_MEDICATION, &request).await
    }

    async fn delete_medication(&self, request: DeleteMedicationRequest) -> GatewayResult<()> {
        self.mutate(services::DELETE_MEDICATION, &request).await
    }

    async fn get_persons(&self) -> GatewayResult<PersonsResponse> {
        self.query(services::GET_PERSONS, Value::Object(Default::default()))
            .await
    }

    async fn get_records(&self, request: GetRecordsRequest) -> GatewayResult<RecordsResponse> {
        let data = serde_json::to_value(&request)?;
        self.query(services::GET_RECORDS, data).await
    }

    async fn upsert_record(&self, request: UpsertRecordRequest) -> GatewayResult<()> {
        self.mutate(services::UPSERT_RECORD, &request).await
    }

    async fn delete_record(&self, request: DeleteRecordRequest) -> GatewayResult<()> {
        self.mutate(services::DELETE_RECORD, &request).await
    }
}
