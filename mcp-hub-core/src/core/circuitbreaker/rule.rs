use crate::config::constant::*;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rule encompasses the thresholds of one client's circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerRule {
    /// counting failures within `window_ms` that open the circuit
    pub failure_threshold: u32,
    /// `window_ms` is the rolling window the failures must fall into.
    /// It starts at the first failure after a reset and restarts once it has elapsed.
    pub window_ms: u64,
    /// `open_duration_ms` is the cooldown spent in Open before trial calls are let through.
    pub open_duration_ms: u64,
    /// number of trial calls admitted while HalfOpen
    pub half_open_trials: u32,
}

impl Default for BreakerRule {
    fn default() -> Self {
        BreakerRule {
            failure_threshold: BREAKER_FAILURE_THRESHOLD,
            window_ms: BREAKER_WINDOW_MS,
            open_duration_ms: BREAKER_OPEN_DURATION_MS,
            half_open_trials: BREAKER_HALF_OPEN_TRIALS,
        }
    }
}

impl BreakerRule {
    pub fn is_valid(&self) -> Result<()> {
        if self.failure_threshold == 0 {
            return Err(Error::msg("invalid failure_threshold"));
        }
        if self.window_ms == 0 {
            return Err(Error::msg("invalid window_ms"));
        }
        if self.open_duration_ms == 0 {
            return Err(Error::msg("invalid open_duration_ms"));
        }
        if self.half_open_trials == 0 {
            return Err(Error::msg("invalid half_open_trials"));
        }
        Ok(())
    }
}

impl fmt::Display for BreakerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BreakerRule{{threshold: {}, window: {}ms, open: {}ms, trials: {}}}",
            self.failure_threshold, self.window_ms, self.open_duration_ms, self.half_open_trials
        )
    }
}
