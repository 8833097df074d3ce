use super::constant::*;
use crate::circuitbreaker::BreakerRule;
use crate::metric::HealthThresholds;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    // app_name identifies the service the hub runs in; one hub serves every service identity.
    pub app_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            app_name: DEFAULT_APP_NAME.into(),
        }
    }
}

// ExporterConfig represents exporter settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExporterConfig {
    pub addr: String,
    pub metrics_path: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        ExporterConfig {
            addr: EXPORTER_ADDR.into(),
            metrics_path: EXPORTER_METRICS_PATH.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    // config_file is the log4rs configuration used by the `logger_log4rs` feature
    pub config_file: String,
    pub exporter: ExporterConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            config_file: LOG_CONFIG_FILE.into(),
            exporter: ExporterConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DispatcherConfig {
    // pool_size bounds the calls running at the same time
    pub pool_size: usize,
    // queue_capacity bounds the calls waiting for a worker
    pub queue_capacity: usize,
    pub call_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            pool_size: DISPATCHER_POOL_SIZE,
            queue_capacity: DISPATCHER_QUEUE_CAPACITY,
            call_timeout_ms: DISPATCHER_CALL_TIMEOUT_MS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RecorderConfig {
    // ring_capacity is the number of recent calls kept per client
    pub ring_capacity: usize,
    pub error_log_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        RecorderConfig {
            ring_capacity: RECORDER_RING_CAPACITY,
            error_log_capacity: ERROR_LOG_CAPACITY,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_ms: u64,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_ms: CACHE_TTL_MS,
            capacity: CACHE_CAPACITY,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    pub snapshot_interval_ms: u64,
    // retention is the number of performance snapshots kept, oldest pruned first
    pub retention: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            snapshot_interval_ms: SNAPSHOT_INTERVAL_MS,
            retention: SNAPSHOT_RETENTION,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DashboardConfig {
    pub addr: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            addr: DASHBOARD_ADDR.into(),
        }
    }
}

// SystemConfig locates one external subsystem.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct SystemConfig {
    pub base_url: String,
    // breaker replaces the default breaker rule for this subsystem
    pub breaker: Option<BreakerRule>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct HubConfig {
    pub app: AppConfig,
    pub log: LogConfig,
    pub breaker: BreakerRule,
    pub dispatcher: DispatcherConfig,
    pub recorder: RecorderConfig,
    pub health: HealthThresholds,
    pub cache: CacheConfig,
    pub report: ReportConfig,
    pub dashboard: DashboardConfig,
    // keyed by subsystem name, e.g. `mes`
    pub systems: BTreeMap<String, SystemConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConfigEntity {
    pub version: String,
    pub config: HubConfig,
}

impl Default for ConfigEntity {
    fn default() -> Self {
        ConfigEntity {
            version: HUB_CONFIG_VERSION.into(),
            config: HubConfig::default(),
        }
    }
}

impl ConfigEntity {
    pub fn new() -> Self {
        ConfigEntity::default()
    }

    pub fn check(&self) -> Result<()> {
        if self.version.is_empty() {
            return Err(Error::msg("empty version"));
        }
        let config = &self.config;
        if config.app.app_name.is_empty() {
            return Err(Error::msg("empty app name"));
        }
        config.breaker.is_valid()?;
        for (name, system) in &config.systems {
            if let Some(rule) = &system.breaker {
                if let Err(err) = rule.is_valid() {
                    return Err(err.context(format!("illegal breaker override of {}", name)));
                }
            }
        }
        if config.dispatcher.pool_size == 0 {
            return Err(Error::msg(
                "illegal dispatcher configuration: pool_size == 0",
            ));
        }
        if config.dispatcher.call_timeout_ms == 0 {
            return Err(Error::msg(
                "illegal dispatcher configuration: call_timeout_ms == 0",
            ));
        }
        if config.recorder.ring_capacity == 0 || config.recorder.error_log_capacity == 0 {
            return Err(Error::msg(
                "illegal recorder configuration: capacity == 0",
            ));
        }
        config.health.is_valid()?;
        if config.cache.capacity == 0 {
            return Err(Error::msg("illegal cache configuration: capacity == 0"));
        }
        if config.report.snapshot_interval_ms == 0 || config.report.retention == 0 {
            return Err(Error::msg(
                "illegal report configuration: snapshot_interval_ms and retention must be positive",
            ));
        }
        Ok(())
    }

    /// Breaker rules of subsystems that override the default one.
    pub fn breaker_overrides(&self) -> HashMap<String, BreakerRule> {
        self.config
            .systems
            .iter()
            .filter_map(|(name, system)| {
                system
                    .breaker
                    .as_ref()
                    .map(|rule| (name.clone(), rule.clone()))
            })
            .collect()
    }

    pub fn base_url_of(&self, system: &str) -> Option<&str> {
        self.config
            .systems
            .get(system)
            .map(|s| s.base_url.as_str())
            .filter(|url| !url.is_empty())
    }
}

impl fmt::Display for ConfigEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(self) {
            Ok(fmtted) => write!(f, "{}", fmtted),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}
