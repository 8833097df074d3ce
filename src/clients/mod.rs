//! Facades of the six external systems of the GMP suite.
//!
//! Every system gets one `ClientFacade` bound to the shared hub, a degraded
//! response per operation, and a typed wrapper exposing its operations.
//! Write operations that fail are acknowledged as queued and republished on the
//! system's routing key, where a retry consumer may pick them up.

pub mod edms;
pub mod equipment;
pub mod erp;
mod http;
pub mod lims;
pub mod mes;
pub mod training;

pub use http::*;

use mcp_hub_core::{logging, mq, ClientFacade, ClientRequest, Error, Hub, Result, SubsystemClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Text put in place of names the unavailable system would have answered.
pub const UNAVAILABLE_PREFIX: &str = "[service unavailable]";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalSystem {
    Edms,
    Mes,
    Lims,
    Erp,
    Training,
    Equipment,
}

impl ExternalSystem {
    pub const ALL: [ExternalSystem; 6] = [
        ExternalSystem::Edms,
        ExternalSystem::Mes,
        ExternalSystem::Lims,
        ExternalSystem::Erp,
        ExternalSystem::Training,
        ExternalSystem::Equipment,
    ];

    /// Client name used by the recorder, the breaker and the configuration.
    pub fn name(self) -> &'static str {
        match self {
            ExternalSystem::Edms => "edms",
            ExternalSystem::Mes => "mes",
            ExternalSystem::Lims => "lims",
            ExternalSystem::Erp => "erp",
            ExternalSystem::Training => "training",
            ExternalSystem::Equipment => "equipment",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ExternalSystem::Edms => "Document Management (EDMS)",
            ExternalSystem::Mes => "Manufacturing Execution (MES)",
            ExternalSystem::Lims => "Laboratory Information (LIMS)",
            ExternalSystem::Erp => "Enterprise Resource Planning (ERP)",
            ExternalSystem::Training => "Training Management",
            ExternalSystem::Equipment => "Equipment Management",
        }
    }

    /// e.g. `gmp.mcp.to.mes`
    pub fn routing_key(self) -> String {
        mq::routing_key(self.name())
    }

    pub fn operations(self) -> &'static [&'static str] {
        match self {
            ExternalSystem::Edms => edms::OPERATIONS,
            ExternalSystem::Mes => mes::OPERATIONS,
            ExternalSystem::Lims => lims::OPERATIONS,
            ExternalSystem::Erp => erp::OPERATIONS,
            ExternalSystem::Training => training::OPERATIONS,
            ExternalSystem::Equipment => equipment::OPERATIONS,
        }
    }

    pub fn write_operations(self) -> &'static [&'static str] {
        match self {
            ExternalSystem::Edms => edms::WRITE_OPERATIONS,
            ExternalSystem::Mes => mes::WRITE_OPERATIONS,
            ExternalSystem::Lims => lims::WRITE_OPERATIONS,
            ExternalSystem::Erp => erp::WRITE_OPERATIONS,
            ExternalSystem::Training => training::WRITE_OPERATIONS,
            ExternalSystem::Equipment => equipment::WRITE_OPERATIONS,
        }
    }

    #[inline]
    pub fn is_write_operation(self, operation: &str) -> bool {
        self.write_operations().contains(&operation)
    }

    /// Degraded answer of a read operation.
    pub fn degraded(self, request: &ClientRequest) -> Value {
        match self {
            ExternalSystem::Edms => edms::degraded(request),
            ExternalSystem::Mes => mes::degraded(request),
            ExternalSystem::Lims => lims::degraded(request),
            ExternalSystem::Erp => erp::degraded(request),
            ExternalSystem::Training => training::degraded(request),
            ExternalSystem::Equipment => equipment::degraded(request),
        }
    }
}

impl fmt::Display for ExternalSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExternalSystem {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ExternalSystem::ALL
            .iter()
            .copied()
            .find(|system| system.name() == s)
            .ok_or_else(|| Error::msg(format!("unknown external system: {}", s)))
    }
}

/// The value of `name` in the request payload, `null` if absent.
pub(crate) fn field(request: &ClientRequest, name: &str) -> Value {
    request.payload.get(name).cloned().unwrap_or(Value::Null)
}

pub(crate) fn unavailable(what: &str) -> String {
    format!("{} {}", UNAVAILABLE_PREFIX, what)
}

/// Degraded answer of a read operation the system does not know.
pub(crate) fn unknown_operation(system: ExternalSystem, request: &ClientRequest) -> Value {
    json!({
        "system": system.name(),
        "operation": request.operation,
        "available": false,
        "message": unavailable(system.display_name()),
    })
}

/// Acknowledgement of a write operation that will be retried later.
pub fn queued_for_retry(system: ExternalSystem, request: &ClientRequest) -> Value {
    json!({
        "system": system.name(),
        "operation": request.operation,
        "accepted": false,
        "queuedForRetry": true,
    })
}

/// `SubsystemClients` holds the facade of every wired external system.
#[derive(Default)]
pub struct SubsystemClients {
    facades: BTreeMap<ExternalSystem, Arc<ClientFacade>>,
}

impl SubsystemClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// One HTTP client for each system with a configured base url.
    /// Systems without one are left out.
    pub fn from_config(hub: &Hub) -> Result<Self> {
        let request_timeout =
            Duration::from_millis(hub.config().config.dispatcher.call_timeout_ms);
        let mut clients = SubsystemClients::new();
        for system in ExternalSystem::ALL {
            match hub.config().base_url_of(system.name()) {
                Some(base_url) => {
                    let client = HttpSubsystemClient::new(system.name(), base_url, request_timeout)?;
                    clients.insert(hub, system, Arc::new(client));
                }
                None => logging::warn!(
                    "[Clients] No base url configured for {}, the system is not wired",
                    system.name()
                ),
            }
        }
        Ok(clients)
    }

    /// Wrap `client` into a facade bound to `hub`, replacing any earlier one of the system.
    pub fn insert(
        &mut self,
        hub: &Hub,
        system: ExternalSystem,
        client: Arc<dyn SubsystemClient>,
    ) -> Arc<ClientFacade> {
        let events = Arc::clone(hub.message_queue());
        let app_name = hub.app_name().to_owned();
        let facade = hub
            .facade(system.name(), client)
            .with_write_operations(system.write_operations().iter().copied())
            .with_degraded(move |request| {
                if system.is_write_operation(&request.operation) {
                    events.publish_from(
                        &app_name,
                        &system.routing_key(),
                        json!({
                            "operation": request.operation,
                            "payload": request.payload,
                            "retry": true,
                        }),
                    );
                    queued_for_retry(system, request)
                } else {
                    system.degraded(request)
                }
            })
            .build(hub);
        let facade = Arc::new(facade);
        self.facades.insert(system, Arc::clone(&facade));
        facade
    }

    pub fn get(&self, system: ExternalSystem) -> Option<&Arc<ClientFacade>> {
        self.facades.get(&system)
    }

    pub fn systems(&self) -> Vec<ExternalSystem> {
        self.facades.keys().copied().collect()
    }

    /// Register every operation as the tool `<system>.<operation>`.
    pub fn register_tools(&self, hub: &Hub) -> Result<usize> {
        let mut count = 0;
        for (system, facade) in &self.facades {
            for operation in system.operations() {
                hub.tools().register_operation(
                    &format!("{}.{}", system.name(), operation),
                    Arc::clone(facade),
                    operation,
                )?;
                count += 1;
            }
        }
        logging::info!("[Clients] {} tools registered", count);
        Ok(count)
    }

    pub fn edms(&self) -> Option<edms::EdmsClient> {
        self.get(ExternalSystem::Edms).cloned().map(edms::EdmsClient::new)
    }

    pub fn mes(&self) -> Option<mes::MesClient> {
        self.get(ExternalSystem::Mes).cloned().map(mes::MesClient::new)
    }

    pub fn lims(&self) -> Option<lims::LimsClient> {
        self.get(ExternalSystem::Lims).cloned().map(lims::LimsClient::new)
    }

    pub fn erp(&self) -> Option<erp::ErpClient> {
        self.get(ExternalSystem::Erp).cloned().map(erp::ErpClient::new)
    }

    pub fn training(&self) -> Option<training::TrainingClient> {
        self.get(ExternalSystem::Training)
            .cloned()
            .map(training::TrainingClient::new)
    }

    pub fn equipment(&self) -> Option<equipment::EquipmentClient> {
        self.get(ExternalSystem::Equipment)
            .cloned()
            .map(equipment::EquipmentClient::new)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identity() {
        for system in ExternalSystem::ALL {
            assert_eq!(system.name().parse::<ExternalSystem>().unwrap(), system);
            assert_eq!(system.routing_key(), format!("gmp.mcp.to.{}", system));
            for op in system.write_operations() {
                assert!(system.operations().contains(op));
            }
        }
        assert!("qms".parse::<ExternalSystem>().is_err());
        assert_eq!(
            serde_json::to_value(ExternalSystem::Equipment).unwrap(),
            json!("equipment")
        );
    }

    #[test]
    fn every_read_has_a_degraded_answer() {
        for system in ExternalSystem::ALL {
            for op in system.operations() {
                if system.is_write_operation(op) {
                    continue;
                }
                let answer = system.degraded(&ClientRequest::new(*op, json!({})));
                assert!(answer.is_object(), "{}.{}", system, op);
                assert!(answer.get("available").is_none(), "{}.{}", system, op);
            }
        }
    }
}
