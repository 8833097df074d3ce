//! Electronic document management.

use super::{field, unavailable, unknown_operation, ExternalSystem};
use mcp_hub_core::dispatch::DispatchError;
use mcp_hub_core::{ClientFacade, ClientRequest, ClientResponse};
use serde_json::{json, Value};
use std::sync::Arc;

pub const GET_DOCUMENT: &str = "getDocument";
pub const SEARCH_DOCUMENTS: &str = "searchDocuments";
pub const CREATE_DOCUMENT: &str = "createDocument";
pub const UPDATE_DOCUMENT: &str = "updateDocument";

pub const OPERATIONS: &[&str] = &[
    GET_DOCUMENT,
    SEARCH_DOCUMENTS,
    CREATE_DOCUMENT,
    UPDATE_DOCUMENT,
];
pub const WRITE_OPERATIONS: &[&str] = &[CREATE_DOCUMENT, UPDATE_DOCUMENT];

pub fn degraded(request: &ClientRequest) -> Value {
    match request.operation.as_str() {
        GET_DOCUMENT => json!({
            "documentId": field(request, "documentId"),
            "title": unavailable("document"),
            "status": "UNKNOWN",
        }),
        SEARCH_DOCUMENTS => json!({
            "documents": [],
            "total": 0,
        }),
        _ => unknown_operation(ExternalSystem::Edms, request),
    }
}

#[derive(Clone)]
pub struct EdmsClient {
    facade: Arc<ClientFacade>,
}

impl EdmsClient {
    pub fn new(facade: Arc<ClientFacade>) -> Self {
        EdmsClient { facade }
    }

    pub async fn get_document(&self, document_id: &str) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                GET_DOCUMENT,
                json!({ "documentId": document_id }),
            ))
            .await
    }

    pub async fn search_documents(&self, criteria: Value) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                SEARCH_DOCUMENTS,
                json!({ "criteria": criteria }),
            ))
            .await
    }

    pub async fn create_document(&self, document: Value) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                CREATE_DOCUMENT,
                json!({ "document": document }),
            ))
            .await
    }

    pub async fn update_document(
        &self,
        document_id: &str,
        document: Value,
    ) -> Result<ClientResponse, DispatchError> {
        self.facade
            .call(ClientRequest::new(
                UPDATE_DOCUMENT,
                json!({ "documentId": document_id, "document": document }),
            ))
            .await
    }
}
