use super::{field, unknown_operation, ExternalSystem};
use mcp_hub_core::dispatch::DispatchError;
use mcp_hub_core::{ClientFacade, ClientRequest, ClientResponse};
use serde_json::{json, Value};
use std::sync::Arc;

pub const GET_EMPLOYEE_TRAINING_RECORDS: &str = "getEmployeeTrainingRecords";
pub const IS_TRAINING_COMPLETED: &str = "isTrainingCompleted";
pub const CREATE_TRAINING_NEED: &str = "createTrainingNeed";

pub const OPERATIONS: &[&str] = &[
    GET_EMPLOYEE_TRAINING_RECORDS,
    IS_TRAINING_COMPLETED,
    CREATE_TRAINING_NEED,
];
pub const WRITE_OPERATIONS: &[&str] = &[CREATE_TRAINING_NEED];

pub fn degraded(request: &ClientRequest) -> Value {
    match request.operation.as_str() {
        GET_EMPLOYEE_TRAINING_RECORDS => json!({
            "employeeId": field(request, "employeeId"),
            "records": [],
        }),
        IS_TRAINING_COMPLETED => json!({
            "employeeId": field(request, "employeeId"),
            "trainingCode": field(request, "trainingCode"),
            "completed": false,
        }),
        _ => unknown_operation(ExternalSystem::Training, request),
    }
}

#[derive(Clone)]
pub struct TrainingClient {
    facade: Arc<ClientFacade>,
}

impl TrainingClient {
    pub fn new(facade: Arc<ClientFacade>) -> Self {
        TrainingClient { facade }
    }

    pub async fn get_employee_training_records(
        &self,
        employee_id: &str,
    ) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_EMPLOYEE_TRAINING_RECORDS,
                json!({ "employeeId": employee_id }),
            ))
            .await
    }

    pub async fn is_training_completed(
        &self,
        employee_id: &str,
        training_code: &str,
    ) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                IS_TRAINING_COMPLETED,
                json!({ "employeeId": employee_id, "trainingCode": training_code }),
            ))
            .await
    }

    pub async fn create_training_need(&self, need: Value) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(CREATE_TRAINING_NEED, need))
            .await
    }
}
