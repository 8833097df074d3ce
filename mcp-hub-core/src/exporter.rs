//! Prometheus exporter of the hub's call and breaker counters.
use crate::config::ExporterConfig;
use crate::{logging, Result};
use lazy_static::lazy_static;
use prometheus_exporter::{
    prometheus::{default_registry, opts, CounterVec},
    Builder,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use sysinfo::{System, SystemExt};

struct HubCounters {
    // crate::core::circuitbreaker
    state_change: CounterVec,
    // crate::api::facade
    calls: CounterVec,
    fallbacks: CounterVec,
    // crate::core::dispatch
    rejections: CounterVec,
}

impl HubCounters {
    fn new() -> prometheus_exporter::prometheus::Result<Self> {
        Ok(HubCounters {
            state_change: CounterVec::new(
                opts!(
                    "mcp_hub_circuit_breaker_state_changed_total",
                    "Circuit breaker total state change count"
                ),
                &["host", "pid", "client", "from_state", "to_state"],
            )?,
            calls: CounterVec::new(
                opts!("mcp_hub_calls_total", "Completed dependency calls"),
                &["host", "pid", "client", "result", "error_kind"],
            )?,
            fallbacks: CounterVec::new(
                opts!("mcp_hub_fallbacks_total", "Fallback responses served"),
                &["host", "pid", "client", "strategy"],
            )?,
            rejections: CounterVec::new(
                opts!(
                    "mcp_hub_dispatch_rejections_total",
                    "Calls rejected by a saturated dispatcher"
                ),
                &["host", "pid"],
            )?,
        })
    }

    fn all(&self) -> [&CounterVec; 4] {
        [
            &self.state_change,
            &self.calls,
            &self.fallbacks,
            &self.rejections,
        ]
    }
}

lazy_static! {
    static ref HOST_NAME: String = System::new().host_name().unwrap_or_else(|| "<unknown>".to_owned());
    static ref PID_STRING: String = format!("{}", std::process::id());
    static ref COUNTERS: Option<HubCounters> = match HubCounters::new() {
        Ok(counters) => Some(counters),
        Err(err) => {
            logging::error!("[Exporter] Failed to create counters: {:?}", err);
            None
        }
    };
}

static INITIALIZED: AtomicBool = AtomicBool::new(false);

pub fn add_state_change_counter(client: &str, from: &str, to: &str) {
    if let Some(counters) = &*COUNTERS {
        counters
            .state_change
            .with_label_values(&[&HOST_NAME, &PID_STRING, client, from, to])
            .inc();
    }
}

pub fn add_call_counter(client: &str, result: &str, error_kind: &str) {
    if let Some(counters) = &*COUNTERS {
        counters
            .calls
            .with_label_values(&[&HOST_NAME, &PID_STRING, client, result, error_kind])
            .inc();
    }
}

pub fn add_fallback_counter(client: &str, strategy: &str) {
    if let Some(counters) = &*COUNTERS {
        counters
            .fallbacks
            .with_label_values(&[&HOST_NAME, &PID_STRING, client, strategy])
            .inc();
    }
}

pub fn add_dispatch_rejection() {
    if let Some(counters) = &*COUNTERS {
        counters
            .rejections
            .with_label_values(&[&HOST_NAME, &PID_STRING])
            .inc();
    }
}

/// Register the counters and serve them. Later calls are no-ops.
pub fn init(config: &ExporterConfig) -> Result<()> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    // currently, `prometheus_exporter` crate only support global registry
    if let Some(counters) = &*COUNTERS {
        for item in counters.all() {
            default_registry().register(Box::new(item.clone()))?;
        }
    }
    let binding: SocketAddr = config.addr.parse()?;
    let mut builder = Builder::new(binding);
    builder.with_endpoint(&config.metrics_path)?;
    builder.start()?;
    logging::info!(
        "[Exporter] Serving metrics on {}{}",
        config.addr,
        config.metrics_path
    );
    Ok(())
}
