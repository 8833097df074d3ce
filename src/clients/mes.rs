//! Manufacturing execution: batches and process parameters.

use super::{field, unavailable, unknown_operation, ExternalSystem};
use mcp_hub_core::dispatch::DispatchError;
use mcp_hub_core::{ClientFacade, ClientRequest, ClientResponse};
use serde_json::{json, Value};
use std::sync::Arc;

pub const GET_BATCH_INFO: &str = "getBatchInfo";
pub const GET_BATCH_STATUS: &str = "getBatchStatus";
pub const GET_PROCESS_PARAMETERS: &str = "getProcessParameters";
pub const GET_BATCH_PROCESS_EXECUTION: &str = "getBatchProcessExecution";
pub const SEND_NOTIFICATION: &str = "sendNotification";

pub const OPERATIONS: &[&str] = &[
    GET_BATCH_INFO,
    GET_BATCH_STATUS,
    GET_PROCESS_PARAMETERS,
    GET_BATCH_PROCESS_EXECUTION,
    SEND_NOTIFICATION,
];
pub const WRITE_OPERATIONS: &[&str] = &[SEND_NOTIFICATION];

/// Status reported for batches the system could not be asked about.
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

pub fn degraded(request: &ClientRequest) -> Value {
    match request.operation.as_str() {
        GET_BATCH_INFO => json!({
            "batchNumber": field(request, "batchNumber"),
            "productName": unavailable("product information"),
            "status": UNKNOWN_STATUS,
        }),
        GET_BATCH_STATUS => json!({
            "batchNumber": field(request, "batchNumber"),
            "status": UNKNOWN_STATUS,
        }),
        GET_PROCESS_PARAMETERS => json!({
            "processId": field(request, "processId"),
            "processName": unavailable("process information"),
            "parameters": [],
        }),
        // the batch number stands in for the unknown process id
        GET_BATCH_PROCESS_EXECUTION => json!({
            "processId": field(request, "batchNumber"),
            "processName": unavailable("batch process execution"),
            "parameters": [],
        }),
        _ => unknown_operation(ExternalSystem::Mes, request),
    }
}

#[derive(Clone)]
pub struct MesClient {
    facade: Arc<ClientFacade>,
}

impl MesClient {
    pub fn new(facade: Arc<ClientFacade>) -> Self {
        MesClient { facade }
    }

    pub async fn get_batch_info(&self, batch_number: &str) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_BATCH_INFO,
                json!({ "batchNumber": batch_number }),
            ))
            .await
    }

    pub async fn get_batch_status(&self, batch_number: &str) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_BATCH_STATUS,
                json!({ "batchNumber": batch_number }),
            ))
            .await
    }

    pub async fn get_process_parameters(
        &self,
        process_id: &str,
    ) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_PROCESS_PARAMETERS,
                json!({ "processId": process_id }),
            ))
            .await
    }

    pub async fn get_batch_process_execution(
        &self,
        batch_number: &str,
    ) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_BATCH_PROCESS_EXECUTION,
                json!({ "batchNumber": batch_number }),
            ))
            .await
    }

    pub async fn send_notification(&self, notification: Value) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(SEND_NOTIFICATION, notification))
            .await
    }
}
