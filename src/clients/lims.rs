//! Laboratory information: samples, test results and quality standards.

use super::{field, unavailable, unknown_operation, ExternalSystem};
use mcp_hub_core::dispatch::DispatchError;
use mcp_hub_core::{ClientFacade, ClientRequest, ClientResponse};
use serde_json::{json, Value};
use std::sync::Arc;

pub const GET_TEST_RESULTS: &str = "getTestResults";
pub const GET_QUALITY_STANDARD: &str = "getQualityStandard";
pub const GET_SAMPLE_INFO: &str = "getSampleInfo";
pub const IS_SAMPLE_TEST_COMPLETED: &str = "isSampleTestCompleted";
pub const SEND_NOTIFICATION: &str = "sendNotification";

pub const OPERATIONS: &[&str] = &[
    GET_TEST_RESULTS,
    GET_QUALITY_STANDARD,
    GET_SAMPLE_INFO,
    IS_SAMPLE_TEST_COMPLETED,
    SEND_NOTIFICATION,
];
pub const WRITE_OPERATIONS: &[&str] = &[SEND_NOTIFICATION];

pub fn degraded(request: &ClientRequest) -> Value {
    match request.operation.as_str() {
        GET_TEST_RESULTS => json!({
            "sampleId": field(request, "sampleId"),
            "status": "UNKNOWN",
            "description": unavailable("test results cannot be retrieved"),
        }),
        GET_QUALITY_STANDARD => json!({
            "code": field(request, "standardCode"),
            "name": unavailable("quality standard"),
        }),
        GET_SAMPLE_INFO => json!({
            "sampleId": field(request, "sampleId"),
            "sampleName": unavailable("sample information"),
        }),
        // never claim completion without an answer
        IS_SAMPLE_TEST_COMPLETED => json!({
            "sampleId": field(request, "sampleId"),
            "completed": false,
        }),
        _ => unknown_operation(ExternalSystem::Lims, request),
    }
}

#[derive(Clone)]
pub struct LimsClient {
    facade: Arc<ClientFacade>,
}

impl LimsClient {
    pub fn new(facade: Arc<ClientFacade>) -> Self {
        LimsClient { facade }
    }

    pub async fn get_test_results(&self, sample_id: &str) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_TEST_RESULTS,
                json!({ "sampleId": sample_id }),
            ))
            .await
    }

    pub async fn get_quality_standard(
        &self,
        standard_code: &str,
    ) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_QUALITY_STANDARD,
                json!({ "standardCode": standard_code }),
            ))
            .await
    }

    pub async fn get_sample_info(&self, sample_id: &str) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_SAMPLE_INFO,
                json!({ "sampleId": sample_id }),
            ))
            .await
    }

    pub async fn is_sample_test_completed(
        &self,
        sample_id: &str,
    ) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                IS_SAMPLE_TEST_COMPLETED,
                json!({ "sampleId": sample_id }),
            ))
            .await
    }

    pub async fn send_notification(&self, notification: Value) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(SEND_NOTIFICATION, notification))
            .await
    }
}
