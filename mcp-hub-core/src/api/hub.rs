use super::{ClientFacade, ClientFacadeBuilder, SubsystemClient, ToolRegistry};
use crate::base::CallRecord;
use crate::cache::{CacheEntry, CacheKey, CacheStats, MetricKind, PerformanceCache};
use crate::circuitbreaker::{BreakerRegistry, State, StateChangeListener};
use crate::config::ConfigEntity;
use crate::dispatch::Dispatcher;
use crate::metric::{CircuitBreakerStats, MetricsAggregator, SystemHealthStatus, SystemMetricsSnapshot};
use crate::mq::{MessageQueueService, QueueStatus, CIRCUIT_STATE_TOPIC};
use crate::report::{
    MetricTrends, PerformanceReport, PerformanceReportService, SnapshotSampler, SnapshotTicker,
    TrendRange, TrendSeries,
};
use crate::stat::RecorderRegistry;
use crate::{logging, utils, Result};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Publishes every breaker transition on the circuit-state topic.
struct CircuitEventPublisher {
    app_name: String,
    events: Arc<MessageQueueService>,
}

impl CircuitEventPublisher {
    fn publish(&self, client_name: &str, prev: State, to: State, consecutive_failures: u32) {
        self.events.publish_from(
            &self.app_name,
            CIRCUIT_STATE_TOPIC,
            json!({
                "system": client_name,
                "from": prev.as_str(),
                "to": to.as_str(),
                "consecutiveFailures": consecutive_failures,
                "timestamp": utils::curr_time_millis(),
            }),
        );
    }
}

impl StateChangeListener for CircuitEventPublisher {
    fn on_transform_to_closed(&self, client_name: &str, prev: State) {
        self.publish(client_name, prev, State::Closed, 0);
    }

    fn on_transform_to_open(&self, client_name: &str, prev: State, consecutive_failures: u32) {
        self.publish(client_name, prev, State::Open, consecutive_failures);
    }

    fn on_transform_to_half_open(&self, client_name: &str, prev: State) {
        self.publish(client_name, prev, State::HalfOpen, 0);
    }
}

/// Overall metrics of every client together with their change against the previous day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsOverview {
    pub overall: SystemMetricsSnapshot,
    pub trends: MetricTrends,
}

/// `Hub` owns the long-lived services of one process. It is built once
/// from a validated `ConfigEntity` and handed by reference to whoever needs it.
pub struct Hub {
    config: ConfigEntity,
    recorders: Arc<RecorderRegistry>,
    breakers: Arc<BreakerRegistry>,
    dispatcher: Arc<Dispatcher>,
    aggregator: Arc<MetricsAggregator>,
    events: Arc<MessageQueueService>,
    report: Arc<PerformanceReportService>,
    ticker: SnapshotTicker,
    tools: ToolRegistry,
    metrics_cache: PerformanceCache<MetricsOverview>,
    health_cache: PerformanceCache<Vec<SystemHealthStatus>>,
    breaker_cache: PerformanceCache<Vec<CircuitBreakerStats>>,
    trend_cache: PerformanceCache<TrendSeries>,
    report_cache: PerformanceCache<PerformanceReport>,
}

impl Hub {
    pub fn new(config: ConfigEntity) -> Result<Self> {
        config.check()?;
        let hub_config = &config.config;
        let recorders = Arc::new(RecorderRegistry::new(
            hub_config.recorder.ring_capacity,
            hub_config.recorder.error_log_capacity,
        ));
        let breakers = Arc::new(BreakerRegistry::new_with_overrides(
            hub_config.breaker.clone(),
            config.breaker_overrides(),
        )?);
        let dispatcher = Arc::new(Dispatcher::new(&hub_config.dispatcher)?);
        let aggregator = Arc::new(MetricsAggregator::new(
            Arc::clone(&recorders),
            Arc::clone(&breakers),
            hub_config.health,
        ));
        let events = Arc::new(MessageQueueService::new());
        breakers.register_state_change_listeners(vec![Arc::new(CircuitEventPublisher {
            app_name: hub_config.app.app_name.clone(),
            events: Arc::clone(&events),
        })]);
        let report = Arc::new(
            PerformanceReportService::new(Arc::clone(&aggregator), hub_config.report.retention)
                .with_dispatcher(Arc::clone(&dispatcher)),
        );
        let ticker = SnapshotTicker::new(
            hub_config.report.snapshot_interval_ms,
            Arc::new(SnapshotSampler::new(Arc::clone(&recorders))),
            Arc::clone(&report),
        );
        let (ttl, capacity) = (hub_config.cache.ttl_ms, hub_config.cache.capacity);
        logging::info!("[Hub] Hub {} created", hub_config.app.app_name);
        Ok(Hub {
            recorders,
            breakers,
            dispatcher,
            aggregator,
            events,
            report,
            ticker,
            tools: ToolRegistry::new(),
            metrics_cache: PerformanceCache::new(ttl, capacity),
            health_cache: PerformanceCache::new(ttl, capacity),
            breaker_cache: PerformanceCache::new(ttl, capacity),
            trend_cache: PerformanceCache::new(ttl, capacity),
            report_cache: PerformanceCache::new(ttl, capacity),
            config,
        })
    }

    /// Start the snapshot ticker, and the metrics exporter when enabled.
    /// Must be called within a tokio runtime, and only once.
    pub fn start(&self) -> Result<()> {
        self.ticker.start()?;
        #[cfg(feature = "exporter")]
        crate::exporter::init(&self.config.config.log.exporter)?;
        logging::info!("[Hub] Hub {} started", self.app_name());
        Ok(())
    }

    /// Stop the snapshot ticker and wait for it.
    pub async fn shutdown(&self) {
        self.ticker.stop().await;
        logging::info!("[Hub] Hub {} shut down", self.app_name());
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    #[inline]
    pub fn config(&self) -> &ConfigEntity {
        &self.config
    }

    #[inline]
    pub fn app_name(&self) -> &str {
        &self.config.config.app.app_name
    }

    /// Start building a facade bound to this hub.
    pub fn facade<S: Into<String>>(
        &self,
        client_name: S,
        client: Arc<dyn SubsystemClient>,
    ) -> ClientFacadeBuilder {
        ClientFacade::builder(client_name, client)
    }

    pub fn recorders(&self) -> &Arc<RecorderRegistry> {
        &self.recorders
    }

    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn aggregator(&self) -> &Arc<MetricsAggregator> {
        &self.aggregator
    }

    pub fn message_queue(&self) -> &Arc<MessageQueueService> {
        &self.events
    }

    pub fn report_service(&self) -> &Arc<PerformanceReportService> {
        &self.report
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn metrics_overview(&self) -> Arc<CacheEntry<MetricsOverview>> {
        self.metrics_cache
            .get(CacheKey::all(MetricKind::SystemMetrics), || MetricsOverview {
                overall: self.aggregator.overall_metrics(),
                trends: self.report.metric_trends(),
            })
    }

    pub fn system_health(&self) -> Arc<CacheEntry<Vec<SystemHealthStatus>>> {
        self.health_cache
            .get(CacheKey::all(MetricKind::SystemHealth), || {
                self.aggregator.system_health()
            })
    }

    pub fn circuit_breakers(&self) -> Arc<CacheEntry<Vec<CircuitBreakerStats>>> {
        self.breaker_cache
            .get(CacheKey::all(MetricKind::CircuitBreakers), || {
                self.aggregator.breaker_stats()
            })
    }

    pub fn performance_trend(&self, range: TrendRange) -> Arc<CacheEntry<TrendSeries>> {
        self.trend_cache
            .get(CacheKey::all(MetricKind::PerformanceTrend(range)), || {
                self.report.trend(range)
            })
    }

    pub fn performance_report(&self) -> Arc<CacheEntry<PerformanceReport>> {
        self.report_cache
            .get(CacheKey::all(MetricKind::PerformanceReport), || {
                self.report.current_report()
            })
    }

    /// Most recent failures across all clients, newest first. Never cached.
    pub fn recent_errors(&self, limit: usize) -> Vec<CallRecord> {
        self.recorders.error_log().recent(limit)
    }

    /// Up to `limit` recent calls of one client, or of every client when `client_name` is `None`,
    /// most recent first. Never cached.
    pub fn recent_calls(&self, client_name: Option<&str>, limit: usize) -> Vec<CallRecord> {
        match client_name {
            Some(name) => self
                .recorders
                .get(name)
                .map(|r| r.recent(limit))
                .unwrap_or_default(),
            None => {
                let mut calls: Vec<CallRecord> = self
                    .recorders
                    .list()
                    .iter()
                    .flat_map(|r| r.recent(limit))
                    .collect();
                calls.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
                calls.truncate(limit);
                calls
            }
        }
    }

    pub fn queue_status(&self) -> QueueStatus {
        self.events.status()
    }

    /// Forget every recorded call, the error log, the snapshot history,
    /// the view caches and the queue counters. Breakers keep their state.
    pub fn reset_metrics(&self) {
        for recorder in self.recorders.list() {
            recorder.reset();
        }
        self.recorders.error_log().clear();
        self.report.clear_history();
        self.events.reset_stats();
        self.metrics_cache.reset();
        self.health_cache.reset();
        self.breaker_cache.reset();
        self.trend_cache.reset();
        self.report_cache.reset();
        logging::info!("[Hub] Metrics of {} reset", self.app_name());
    }

    /// The error log first, then the live ring buffers.
    pub fn error_details(&self, call_id: &str) -> Option<CallRecord> {
        self.recorders.error_log().find(call_id).or_else(|| {
            self.recorders
                .list()
                .iter()
                .find_map(|r| r.find(call_id))
                .filter(|r| r.is_failure())
        })
    }

    /// Hit and miss counts summed over every view cache.
    pub fn cache_stats(&self) -> CacheStats {
        let all = [
            self.metrics_cache.stats(),
            self.health_cache.stats(),
            self.breaker_cache.stats(),
            self.trend_cache.stats(),
            self.report_cache.stats(),
        ];
        let hits: u64 = all.iter().map(|s| s.hits).sum();
        let misses: u64 = all.iter().map(|s| s.misses).sum();
        CacheStats {
            hits,
            misses,
            hit_rate: utils::round2(utils::percent(hits, hits + misses)),
            entries: all.iter().map(|s| s.entries).sum(),
        }
    }

    pub fn clear_caches(&self) {
        self.metrics_cache.clear();
        self.health_cache.clear();
        self.breaker_cache.clear();
        self.trend_cache.clear();
        self.report_cache.clear();
    }
}
