use super::{HealthLevel, SystemStatus, LATENCY_BUCKET_COUNT};
use crate::base::ErrorKind;
use crate::circuitbreaker::State;
use crate::stat::LifetimeStats;
use crate::utils;
use enum_map::EnumMap;
use serde::Serialize;

/// Aggregate over one client's lifetime, or over all clients.
/// Recomputed wholesale, never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemMetricsSnapshot {
    pub client_name: String,
    pub total_calls: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
    pub latency_buckets: [u64; LATENCY_BUCKET_COUNT],
    pub errors_by_kind: EnumMap<ErrorKind, u64>,
}

impl SystemMetricsSnapshot {
    pub fn empty<S: Into<String>>(client_name: S) -> Self {
        SystemMetricsSnapshot {
            client_name: client_name.into(),
            total_calls: 0,
            error_count: 0,
            avg_latency_ms: 0.0,
            latency_buckets: [0; LATENCY_BUCKET_COUNT],
            errors_by_kind: EnumMap::default(),
        }
    }

    /// Snapshot of everything a recorder has counted, evicted calls included.
    pub fn from_lifetime<S: Into<String>>(client_name: S, stats: &LifetimeStats) -> Self {
        let totals = stats.totals;
        SystemMetricsSnapshot {
            client_name: client_name.into(),
            total_calls: totals.calls,
            error_count: totals.errors,
            avg_latency_ms: if totals.calls == 0 {
                0.0
            } else {
                totals.latency_sum_ms as f64 / totals.calls as f64
            },
            latency_buckets: stats.latency.buckets(),
            errors_by_kind: stats.errors_by_kind,
        }
    }

    /// Combine per-client snapshots, weighting averages by call count.
    pub fn merge<S: Into<String>>(client_name: S, parts: &[SystemMetricsSnapshot]) -> Self {
        let mut merged = Self::empty(client_name);
        let mut latency_sum = 0.0;
        for part in parts {
            merged.total_calls += part.total_calls;
            merged.error_count += part.error_count;
            latency_sum += part.avg_latency_ms * part.total_calls as f64;
            for (i, count) in part.latency_buckets.iter().enumerate() {
                merged.latency_buckets[i] += count;
            }
            for (kind, count) in &part.errors_by_kind {
                merged.errors_by_kind[kind] += *count;
            }
        }
        if merged.total_calls > 0 {
            merged.avg_latency_ms = latency_sum / merged.total_calls as f64;
        }
        merged
    }

    /// Failed calls in percent, 0 without calls.
    #[inline]
    pub fn error_rate(&self) -> f64 {
        utils::percent(self.error_count, self.total_calls)
    }

    /// Successful calls in percent, 100 without calls.
    #[inline]
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            100.0
        } else {
            100.0 - self.error_rate()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemHealthStatus {
    pub name: String,
    pub status: SystemStatus,
    pub health: HealthLevel,
    pub last_checked_ms: u64,
    pub calls: u64,
    pub errors: u64,
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerStats {
    pub name: String,
    pub state: State,
    pub calls: u64,
    pub failures: u64,
    pub failure_rate: f64,
    pub consecutive_failures: u32,
    pub short_circuited: u64,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::CallOutcome;

    fn snapshot(client_name: &str, outcomes: &[CallOutcome]) -> SystemMetricsSnapshot {
        let stats: LifetimeStats = outcomes.iter().collect();
        SystemMetricsSnapshot::from_lifetime(client_name, &stats)
    }

    #[test]
    fn hundred_call_scenario() {
        let mut outcomes = Vec::new();
        outcomes.extend((0..60).map(|_| CallOutcome::success(80)));
        outcomes.extend((0..30).map(|_| CallOutcome::success(300)));
        outcomes.extend((0..10).map(|_| CallOutcome::success(700)));
        let snapshot = snapshot("mes", &outcomes);
        assert_eq!(snapshot.total_calls, 100);
        assert_eq!(snapshot.latency_buckets, [60, 30, 10, 0, 0]);
        // (60*80 + 30*300 + 10*700) / 100
        assert!((snapshot.avg_latency_ms - 208.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.error_count, 0);
        assert_eq!(snapshot.success_rate(), 100.0);
    }

    #[test]
    fn errors_by_kind() {
        let snapshot = snapshot(
            "lims",
            &[
                CallOutcome::success(10),
                CallOutcome::failure(5, ErrorKind::BadRequest, "bad"),
                CallOutcome::failure(5000, ErrorKind::ConnectionTimeout, "slow"),
                CallOutcome::failure(50, ErrorKind::ConnectionTimeout, "slow"),
            ],
        );
        assert_eq!(snapshot.error_count, 3);
        assert_eq!(snapshot.errors_by_kind[ErrorKind::ConnectionTimeout], 2);
        assert_eq!(snapshot.errors_by_kind[ErrorKind::BadRequest], 1);
        assert_eq!(snapshot.error_rate(), 75.0);
        assert_eq!(snapshot.latency_buckets.iter().sum::<u64>(), 4);
    }

    #[test]
    fn merge_weights_by_calls() {
        let a = snapshot("a", &[CallOutcome::success(100), CallOutcome::success(100)]);
        let b = snapshot("b", &[CallOutcome::success(400)]);
        let merged = SystemMetricsSnapshot::merge("all", &[a, b]);
        assert_eq!(merged.total_calls, 3);
        assert!((merged.avg_latency_ms - 200.0).abs() < 1e-9);
        assert_eq!(merged.latency_buckets, [0, 3, 0, 0, 0]);
        assert_eq!(SystemMetricsSnapshot::merge("all", &[]).avg_latency_ms, 0.0);
    }
}
