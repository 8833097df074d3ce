use super::{field, unavailable, unknown_operation, ExternalSystem};
use mcp_hub_core::dispatch::DispatchError;
use mcp_hub_core::{ClientFacade, ClientRequest, ClientResponse};
use serde_json::{json, Value};
use std::sync::Arc;

pub const GET_EQUIPMENT_INFO: &str = "getEquipmentInfo";
pub const GET_MAINTENANCE_RECORDS: &str = "getMaintenanceRecords";

pub const OPERATIONS: &[&str] = &[GET_EQUIPMENT_INFO, GET_MAINTENANCE_RECORDS];
pub const WRITE_OPERATIONS: &[&str] = &[];

pub fn degraded(request: &ClientRequest) -> Value {
    match request.operation.as_str() {
        GET_EQUIPMENT_INFO => json!({
            "equipmentId": field(request, "equipmentId"),
            "name": unavailable("equipment information"),
            "status": "UNKNOWN",
        }),
        GET_MAINTENANCE_RECORDS => json!({
            "equipmentId": field(request, "equipmentId"),
            "records": [],
        }),
        _ => unknown_operation(ExternalSystem::Equipment, request),
    }
}

#[derive(Clone)]
pub struct EquipmentClient {
    facade: Arc<ClientFacade>,
}

impl EquipmentClient {
    pub fn new(facade: Arc<ClientFacade>) -> Self {
        EquipmentClient { facade }
    }

    pub async fn get_equipment_info(
        &self,
        equipment_id: &str,
    ) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_EQUIPMENT_INFO,
                json!({ "equipmentId": equipment_id }),
            ))
            .await
    }

    pub async fn get_maintenance_records(
        &self,
        equipment_id: &str,
    ) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_MAINTENANCE_RECORDS,
                json!({ "equipmentId": equipment_id }),
            ))
            .await
    }
}
