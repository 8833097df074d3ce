//! Enterprise resource planning: suppliers and materials.

use super::{field, unknown_operation, ExternalSystem};
use mcp_hub_core::dispatch::DispatchError;
use mcp_hub_core::{ClientFacade, ClientRequest, ClientResponse};
use serde_json::{json, Value};
use std::sync::Arc;

pub const GET_SUPPLIER: &str = "getSupplier";
pub const GET_MATERIAL: &str = "getMaterial";
pub const GET_MATERIAL_BATCH: &str = "getMaterialBatch";
pub const IS_SUPPLIER_QUALIFIED: &str = "isSupplierQualified";
pub const SEND_NOTIFICATION: &str = "sendNotification";

pub const OPERATIONS: &[&str] = &[
    GET_SUPPLIER,
    GET_MATERIAL,
    GET_MATERIAL_BATCH,
    IS_SUPPLIER_QUALIFIED,
    SEND_NOTIFICATION,
];
pub const WRITE_OPERATIONS: &[&str] = &[SEND_NOTIFICATION];

pub const DEGRADED_STATUS: &str = "DEGRADED";

pub fn degraded(request: &ClientRequest) -> Value {
    match request.operation.as_str() {
        GET_SUPPLIER => json!({
            "supplierId": field(request, "supplierId"),
            "supplierName": "unknown supplier",
            "status": DEGRADED_STATUS,
        }),
        GET_MATERIAL => json!({
            "materialCode": field(request, "materialCode"),
            "materialName": "unknown material",
            "status": DEGRADED_STATUS,
        }),
        GET_MATERIAL_BATCH => json!({
            "materialCode": field(request, "materialCode"),
            "batchNumber": field(request, "batchNumber"),
            "materialName": "unknown material batch",
            "status": DEGRADED_STATUS,
        }),
        // unqualified until the system confirms otherwise
        IS_SUPPLIER_QUALIFIED => json!({
            "supplierId": field(request, "supplierId"),
            "qualified": false,
        }),
        _ => unknown_operation(ExternalSystem::Erp, request),
    }
}

#[derive(Clone)]
pub struct ErpClient {
    facade: Arc<ClientFacade>,
}

impl ErpClient {
    pub fn new(facade: Arc<ClientFacade>) -> Self {
        ErpClient { facade }
    }

    pub async fn get_supplier(&self, supplier_id: &str) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_SUPPLIER,
                json!({ "supplierId": supplier_id }),
            ))
            .await
    }

    pub async fn get_material(&self, material_code: &str) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_MATERIAL,
                json!({ "materialCode": material_code }),
            ))
            .await
    }

    pub async fn get_material_batch(
        &self,
        material_code: &str,
        batch_number: &str,
    ) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_MATERIAL_BATCH,
                json!({ "materialCode": material_code, "batchNumber": batch_number }),
            ))
            .await
    }

    pub async fn is_supplier_qualified(
        &self,
        supplier_id: &str,
    ) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                IS_SUPPLIER_QUALIFIED,
                json!({ "supplierId": supplier_id }),
            ))
            .await
    }

    pub async fn send_notification(&self, notification: Value) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(SEND_NOTIFICATION, notification))
            .await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn degraded_material_batch() {
        let batch = degraded(&ClientRequest::new(
            GET_MATERIAL_BATCH,
            json!({"materialCode": "M-100", "batchNumber": "L-9"}),
        ));
        assert_eq!(batch["materialCode"], json!("M-100"));
        assert_eq!(batch["batchNumber"], json!("L-9"));
        assert_eq!(batch["status"], json!("DEGRADED"));

        let qualified = degraded(&ClientRequest::new(
            IS_SUPPLIER_QUALIFIED,
            json!({"supplierId": "S-1"}),
        ));
        assert_eq!(qualified["qualified"], json!(false));
    }
}
