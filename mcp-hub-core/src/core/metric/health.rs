use crate::config::constant::*;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Health derived from a client's error rate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthLevel {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthLevel::Healthy => "HEALTHY",
            HealthLevel::Degraded => "DEGRADED",
            HealthLevel::Unhealthy => "UNHEALTHY",
        }
    }
}

impl fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reachability as the dashboard shows it: DOWN while the circuit is open.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemStatus {
    Up,
    Down,
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemStatus::Up => f.write_str("UP"),
            SystemStatus::Down => f.write_str("DOWN"),
        }
    }
}

/// Error-rate thresholds in percent.
/// Below `degraded_pct` is healthy, above `unhealthy_pct` is unhealthy, degraded in between.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    pub degraded_pct: f64,
    pub unhealthy_pct: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        HealthThresholds {
            degraded_pct: HEALTH_DEGRADED_PCT,
            unhealthy_pct: HEALTH_UNHEALTHY_PCT,
        }
    }
}

impl HealthThresholds {
    pub fn is_valid(&self) -> Result<()> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(self.degraded_pct) || !in_range(self.unhealthy_pct) {
            return Err(Error::msg("health thresholds must lie in [0, 100]"));
        }
        if self.degraded_pct > self.unhealthy_pct {
            return Err(Error::msg(format!(
                "health thresholds must be monotonic, degraded {} > unhealthy {}",
                self.degraded_pct, self.unhealthy_pct
            )));
        }
        Ok(())
    }

    pub fn classify(&self, error_rate_pct: f64) -> HealthLevel {
        if error_rate_pct < self.degraded_pct {
            HealthLevel::Healthy
        } else if error_rate_pct <= self.unhealthy_pct {
            HealthLevel::Degraded
        } else {
            HealthLevel::Unhealthy
        }
    }
}
