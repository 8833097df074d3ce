//! # MCP Hub
//!
//! Binds the external systems of the GMP suite to the resilience core and serves
//! the monitoring dashboard.
//!
//! - `clients` wires EDMS, MES, LIMS, ERP, training and equipment behind
//!   circuit-broken facades with degraded answers.
//! - `dashboard` is the HTTP API over the hub's metrics, health and trends.
//!
//! A typical process:
//!
//! ```rust
//! let config = mcp_hub::init_with_config_file("testdata/config/hub.yaml")?;
//! let hub = Arc::new(Hub::new(config)?);
//! let clients = SubsystemClients::from_config(&hub)?;
//! clients.register_tools(&hub)?;
//! hub.start()?;
//! let batch = clients.mes().unwrap().get_batch_status("B-2024-001").await?;
//! ```

pub mod clients;

pub use mcp_hub_axum as dashboard;
pub use mcp_hub_core::{
    api, base, cache, circuitbreaker, config, dispatch, logging, metric, mq, report, stat, utils,
};
pub use mcp_hub_core::{
    init_default, init_with_config, init_with_config_file, ClientFacade, ClientFacadeBuilder,
    ClientRequest, ClientResponse, Error, FallbackStrategy, Hub, MetricsOverview, Result,
    SubsystemClient, ToolError, ToolRegistry,
};
