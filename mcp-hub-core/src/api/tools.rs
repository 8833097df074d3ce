use super::{ClientFacade, ClientRequest, ClientResponse};
use crate::dispatch::DispatchError;
use crate::{logging, utils, Error, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

pub type ToolHandler = dyn Fn(Value) -> BoxFuture<'static, std::result::Result<ClientResponse, DispatchError>>
    + Send
    + Sync;

#[derive(Debug)]
pub enum ToolError {
    UnknownTool(String),
    Dispatch(DispatchError),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::UnknownTool(name) => write!(f, "unknown tool: {}", name),
            ToolError::Dispatch(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ToolError {}

impl From<DispatchError> for ToolError {
    fn from(err: DispatchError) -> Self {
        ToolError::Dispatch(err)
    }
}

/// `ToolRegistry` maps tool names to handlers. It is populated at startup
/// and looked up by name for every invocation.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<BTreeMap<String, Arc<ToolHandler>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering a name twice is an error, the first handler stays.
    pub fn register<F>(&self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(Value) -> BoxFuture<'static, std::result::Result<ClientResponse, DispatchError>>
            + Send
            + Sync
            + 'static,
    {
        let mut tools = utils::write_recover(self.tools.write());
        if tools.contains_key(name) {
            return Err(Error::msg(format!("tool {} is already registered", name)));
        }
        tools.insert(name.to_owned(), Arc::new(handler));
        logging::debug!("[ToolRegistry] Registered tool {}", name);
        Ok(())
    }

    /// Expose one operation of a facade as a tool taking the request payload.
    pub fn register_operation(
        &self,
        name: &str,
        facade: Arc<ClientFacade>,
        operation: &str,
    ) -> Result<()> {
        let operation = operation.to_owned();
        self.register(name, move |payload| {
            let facade = Arc::clone(&facade);
            let request = ClientRequest::new(operation.clone(), payload);
            Box::pin(async move { facade.call(request).await })
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        utils::read_recover(self.tools.read()).contains_key(name)
    }

    /// Registered names in lexical order.
    pub fn names(&self) -> Vec<String> {
        utils::read_recover(self.tools.read())
            .keys()
            .cloned()
            .collect()
    }

    pub async fn execute(
        &self,
        name: &str,
        payload: Value,
    ) -> std::result::Result<ClientResponse, ToolError> {
        let handler = utils::read_recover(self.tools.read()).get(name).cloned();
        match handler {
            Some(handler) => Ok(handler(payload).await?),
            None => Err(ToolError::UnknownTool(name.to_owned())),
        }
    }
}
