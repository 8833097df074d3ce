#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]

//! # MCP Hub Core
//!
//! The resilience and telemetry engine that sits in front of the external subsystems
//! of the GMP suite (document management, manufacturing execution, lab information,
//! ERP, training and equipment). It protects callers from cascading failures and keeps
//! a running picture of how every dependency behaves.
//!
//! The building blocks, leaf first:
//! 1. `stat::CallRecorder` keeps a bounded ring of `CallRecord`s per client.
//! 2. `circuitbreaker::CircuitBreaker` is the per-client Closed/Open/HalfOpen state machine.
//! 3. `dispatch::Dispatcher` runs client calls on a bounded worker pool with a timeout.
//! 4. `api::ClientFacade` consults the breaker, dispatches, records and falls back.
//! 5. `metric::MetricsAggregator` reduces ring buffers into snapshots, histograms and health.
//! 6. `cache::PerformanceCache` memoizes the aggregator with a TTL.
//! 7. `mq::MessageQueueService` fans domain events out to registered listeners.
//! 8. `report::PerformanceReportService` resamples snapshot history into trend series.
//!
//! ## Initialization
//!
//! The `api` module loads a validated `ConfigEntity`:
//!
//! - `init_default()`: configuration from environment variables, defaults elsewhere.
//! - `init_with_config_file(path)`: configuration from a YAML file.
//! - `init_with_config(entity)`: a hand-crafted `ConfigEntity`.
//!
//! The entity is then handed to `Hub::new`, which owns every long-lived service.
//!
//! ```rust
//! use mcp_hub_core::{init_default, logging, Hub};
//! let config = init_default().unwrap_or_else(|err| {
//!     logging::error!("{:?}", err);
//!     Default::default()
//! });
//! let hub = Hub::new(config)?;
//! hub.start()?;
//! ```
//!
//! ## Protecting a call
//!
//! ```rust
//! let facade = hub
//!     .facade("mes", client)
//!     .with_degraded(|request| json!({"status": "UNKNOWN"}))
//!     .build(&hub);
//! let response = facade.call(ClientRequest::new("getBatchStatus", payload)).await?;
//! if response.used_fallback {
//!     // non-authoritative answer
//! }
//! ```
//!
// This module is not intended to be part of the public API.
#[macro_use]
#[doc(hidden)]
pub mod macros;

/// Hub API: initialization, the `Hub` service container and the client facade.
pub mod api;
/// Core implementations: call records, breakers, dispatcher, aggregator,
/// cache, message queue, reports and configuration.
pub mod core;
/// Adapters for different logging crates.
pub mod logging;
cfg_exporter! {
    /// Prometheus exporter for breaker transitions and call outcomes.
    pub mod exporter;
}
// Utility functions for the hub.
pub mod utils;

// re-export precludes
pub use crate::core::*;
pub use api::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
