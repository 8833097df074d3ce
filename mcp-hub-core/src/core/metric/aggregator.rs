use super::*;
use crate::base::ALL_SYSTEMS;
use crate::circuitbreaker::{BreakerRegistry, State};
use crate::stat::RecorderRegistry;
use crate::utils;
use std::sync::Arc;

/// `MetricsAggregator` reduces recorder lifetime counters into metrics, health and breaker statistics.
/// It only reads copies and never mutates recorder or breaker state.
pub struct MetricsAggregator {
    recorders: Arc<RecorderRegistry>,
    breakers: Arc<BreakerRegistry>,
    thresholds: HealthThresholds,
}

impl MetricsAggregator {
    pub fn new(
        recorders: Arc<RecorderRegistry>,
        breakers: Arc<BreakerRegistry>,
        thresholds: HealthThresholds,
    ) -> Self {
        MetricsAggregator {
            recorders,
            breakers,
            thresholds,
        }
    }

    #[inline]
    pub fn thresholds(&self) -> &HealthThresholds {
        &self.thresholds
    }

    pub fn system_metrics(&self, client_name: &str) -> Option<SystemMetricsSnapshot> {
        self.recorders
            .get(client_name)
            .map(|r| SystemMetricsSnapshot::from_lifetime(client_name, &r.lifetime()))
    }

    /// Per-client metrics ordered by client name.
    pub fn all_system_metrics(&self) -> Vec<SystemMetricsSnapshot> {
        self.recorders
            .list()
            .iter()
            .map(|r| SystemMetricsSnapshot::from_lifetime(r.client_name(), &r.lifetime()))
            .collect()
    }

    pub fn overall_metrics(&self) -> SystemMetricsSnapshot {
        SystemMetricsSnapshot::merge(ALL_SYSTEMS, &self.all_system_metrics())
    }

    pub fn system_health(&self) -> Vec<SystemHealthStatus> {
        self.system_health_at(utils::curr_time_millis())
    }

    pub fn system_health_at(&self, now: u64) -> Vec<SystemHealthStatus> {
        self.all_system_metrics()
            .into_iter()
            .map(|m| {
                let state = self
                    .breakers
                    .get(&m.client_name)
                    .map(|b| b.current_state())
                    .unwrap_or_default();
                let error_rate = m.error_rate();
                SystemHealthStatus {
                    status: if state == State::Open {
                        SystemStatus::Down
                    } else {
                        SystemStatus::Up
                    },
                    health: self.thresholds.classify(error_rate),
                    last_checked_ms: now,
                    calls: m.total_calls,
                    errors: m.error_count,
                    error_rate: utils::round2(error_rate),
                    name: m.client_name,
                }
            })
            .collect()
    }

    pub fn breaker_stats(&self) -> Vec<CircuitBreakerStats> {
        self.breakers
            .snapshots()
            .into_iter()
            .map(|s| CircuitBreakerStats {
                failure_rate: utils::round2(utils::percent(s.failures, s.calls)),
                name: s.client_name,
                state: s.state,
                calls: s.calls,
                failures: s.failures,
                consecutive_failures: s.consecutive_failures,
                short_circuited: s.short_circuited,
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::{CallOutcome, ErrorKind};
    use crate::circuitbreaker::BreakerRule;

    fn aggregator() -> (Arc<RecorderRegistry>, Arc<BreakerRegistry>, MetricsAggregator) {
        let recorders = Arc::new(RecorderRegistry::new(1000, 100));
        let breakers = Arc::new(BreakerRegistry::new(BreakerRule::default()));
        let aggregator = MetricsAggregator::new(
            Arc::clone(&recorders),
            Arc::clone(&breakers),
            HealthThresholds::default(),
        );
        (recorders, breakers, aggregator)
    }

    #[test]
    fn health_follows_error_rate_and_breaker() {
        let (recorders, breakers, aggregator) = aggregator();
        let mes = recorders.get_or_create("mes");
        for _ in 0..99 {
            mes.record(CallOutcome::success(50));
        }
        mes.record(CallOutcome::failure(50, ErrorKind::ServiceUnavailable, "503"));

        let erp = recorders.get_or_create("erp");
        let erp_breaker = breakers.get_or_create("erp");
        for i in 0..5 {
            let outcome = CallOutcome::failure(10, ErrorKind::ConnectionTimeout, "timeout");
            erp.record(outcome.clone());
            erp_breaker.on_request_complete_at(&outcome, i);
        }

        let health = aggregator.system_health_at(42);
        assert_eq!(health.len(), 2);
        let erp = &health[0];
        assert_eq!(erp.name, "erp");
        assert_eq!(erp.status, SystemStatus::Down);
        assert_eq!(erp.health, HealthLevel::Unhealthy);
        assert_eq!(erp.last_checked_ms, 42);
        let mes = &health[1];
        assert_eq!(mes.status, SystemStatus::Up);
        assert_eq!(mes.health, HealthLevel::Healthy);
        assert_eq!((mes.calls, mes.errors), (100, 1));

        let overall = aggregator.overall_metrics();
        assert_eq!(overall.client_name, ALL_SYSTEMS);
        assert_eq!(overall.total_calls, 105);
        assert_eq!(overall.latency_buckets.iter().sum::<u64>(), 105);

        let stats = aggregator.breaker_stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].state, State::Open);
        assert_eq!(stats[0].failure_rate, 100.0);
    }

    #[test]
    fn totals_keep_growing_past_the_ring() {
        let recorders = Arc::new(RecorderRegistry::new(1_000, 100));
        let aggregator = MetricsAggregator::new(
            Arc::clone(&recorders),
            Arc::new(BreakerRegistry::new(BreakerRule::default())),
            HealthThresholds::default(),
        );
        let mes = recorders.get_or_create("mes");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mes = Arc::clone(&mes);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        mes.record(CallOutcome::success(50));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let metrics = aggregator.system_metrics("mes").unwrap();
        assert_eq!(metrics.total_calls, 2_000);
        assert_eq!(metrics.latency_buckets.iter().sum::<u64>(), 2_000);
        assert_eq!(metrics.avg_latency_ms, 50.0);
        assert_eq!(aggregator.system_health()[0].calls, 2_000);
        assert_eq!(mes.len(), 1_000);
    }

    #[test]
    fn unknown_client() {
        let (_, _, aggregator) = aggregator();
        assert!(aggregator.system_metrics("nope").is_none());
        assert_eq!(aggregator.overall_metrics().total_calls, 0);
    }
}
