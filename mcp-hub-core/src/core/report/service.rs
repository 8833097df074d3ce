use super::*;
use crate::dispatch::Dispatcher;
use crate::metric::{MetricsAggregator, SystemMetricsSnapshot};
use crate::utils::{self, DAY_MS};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const SUCCESS_RATE_WARNING_PCT: f64 = 85.0;
const SUCCESS_RATE_HINT_PCT: f64 = 95.0;
const RESPONSE_TIME_WARNING_MS: f64 = 500.0;
const RESPONSE_TIME_HINT_MS: f64 = 200.0;
const ACTIVE_CALLS_HINT: usize = 100;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationLevel {
    Warning,
    Hint,
    Notice,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub level: RecommendationLevel,
    pub message: String,
}

impl Recommendation {
    fn new<M: Into<String>>(level: RecommendationLevel, message: M) -> Self {
        Recommendation {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub generated_at_ms: u64,
    pub overall: SystemMetricsSnapshot,
    pub systems: Vec<SystemMetricsSnapshot>,
    pub active_calls: usize,
    pub recommendations: Vec<Recommendation>,
}

/// Change of the last 24 hours against the 24 hours before.
/// Call count and response time are relative changes in percent,
/// success and error rate are differences in percentage points.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize)]
pub struct MetricTrends {
    pub calls_trend: f64,
    pub success_trend: f64,
    pub response_trend: f64,
    pub error_trend: f64,
}

pub fn recommendations(
    overall: &SystemMetricsSnapshot,
    active_calls: usize,
) -> Vec<Recommendation> {
    let mut list = Vec::new();
    let success_rate = overall.success_rate();
    if success_rate < SUCCESS_RATE_WARNING_PCT {
        list.push(Recommendation::new(
            RecommendationLevel::Warning,
            format!(
                "success rate {:.2}% is below {}%, check the external system connections and the error log",
                success_rate, SUCCESS_RATE_WARNING_PCT
            ),
        ));
    } else if success_rate < SUCCESS_RATE_HINT_PCT {
        list.push(Recommendation::new(
            RecommendationLevel::Hint,
            format!(
                "success rate {:.2}% is below {}%, consider refining error handling and retry policies",
                success_rate, SUCCESS_RATE_HINT_PCT
            ),
        ));
    }

    if overall.avg_latency_ms > RESPONSE_TIME_WARNING_MS {
        list.push(Recommendation::new(
            RecommendationLevel::Warning,
            format!(
                "average response time {:.2}ms exceeds {}ms, check network latency and external system performance",
                overall.avg_latency_ms, RESPONSE_TIME_WARNING_MS
            ),
        ));
    } else if overall.avg_latency_ms > RESPONSE_TIME_HINT_MS {
        list.push(Recommendation::new(
            RecommendationLevel::Hint,
            format!(
                "average response time {:.2}ms exceeds {}ms, consider caching or trimming call payloads",
                overall.avg_latency_ms, RESPONSE_TIME_HINT_MS
            ),
        ));
    }

    if active_calls > ACTIVE_CALLS_HINT {
        list.push(Recommendation::new(
            RecommendationLevel::Hint,
            format!(
                "{} calls in flight, consider a larger dispatcher pool",
                active_calls
            ),
        ));
    }

    if overall.total_calls == 0 {
        list.push(Recommendation::new(
            RecommendationLevel::Notice,
            "no calls recorded yet, a detailed analysis is not available",
        ));
    }
    list
}

#[derive(Default)]
struct WindowTotals {
    calls: u64,
    latency_weighted: f64,
    error_weighted: f64,
}

impl WindowTotals {
    fn avg_latency(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.latency_weighted / self.calls as f64
        }
    }

    fn error_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.error_weighted / self.calls as f64
        }
    }
}

fn relative_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) * 100.0 / previous
    }
}

/// `PerformanceReportService` keeps the bounded snapshot history and derives trends and reports from it.
pub struct PerformanceReportService {
    retention: usize,
    history: Mutex<VecDeque<PerformanceSnapshot>>,
    aggregator: Arc<MetricsAggregator>,
    dispatcher: Option<Arc<Dispatcher>>,
}

impl PerformanceReportService {
    pub fn new(aggregator: Arc<MetricsAggregator>, retention: usize) -> Self {
        PerformanceReportService {
            retention: retention.max(1),
            history: Mutex::new(VecDeque::new()),
            aggregator,
            dispatcher: None,
        }
    }

    /// Reports then include the dispatcher's in-flight calls.
    pub fn with_dispatcher(mut self, dispatcher: Arc<Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    #[inline]
    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Append one snapshot, pruning the oldest beyond the retention.
    pub fn append(&self, snapshot: PerformanceSnapshot) {
        let mut history = utils::lock_recover(self.history.lock());
        while history.len() >= self.retention {
            history.pop_front();
        }
        history.push_back(snapshot);
    }

    pub fn history(&self) -> Vec<PerformanceSnapshot> {
        utils::lock_recover(self.history.lock())
            .iter()
            .copied()
            .collect()
    }

    pub fn history_len(&self) -> usize {
        utils::lock_recover(self.history.lock()).len()
    }

    pub fn clear_history(&self) {
        utils::lock_recover(self.history.lock()).clear();
    }

    #[inline]
    pub fn trend(&self, range: TrendRange) -> TrendSeries {
        self.trend_at(range, utils::curr_time_millis())
    }

    pub fn trend_at(&self, range: TrendRange, now: u64) -> TrendSeries {
        resample(range, &self.history(), now)
    }

    #[inline]
    pub fn metric_trends(&self) -> MetricTrends {
        self.metric_trends_at(utils::curr_time_millis())
    }

    pub fn metric_trends_at(&self, now: u64) -> MetricTrends {
        let current_start = now.saturating_sub(DAY_MS);
        let previous_start = current_start.saturating_sub(DAY_MS);
        let mut current = WindowTotals::default();
        let mut previous = WindowTotals::default();
        for s in utils::lock_recover(self.history.lock()).iter() {
            let window = if s.timestamp_ms > current_start && s.timestamp_ms <= now {
                &mut current
            } else if s.timestamp_ms > previous_start && s.timestamp_ms <= current_start {
                &mut previous
            } else {
                continue;
            };
            let calls = s.call_count as f64;
            window.calls += s.call_count;
            window.latency_weighted += s.avg_response_time_ms * calls;
            window.error_weighted += s.error_rate_pct * calls;
        }
        if previous.calls == 0 {
            return MetricTrends::default();
        }
        let error_trend = current.error_rate() - previous.error_rate();
        MetricTrends {
            calls_trend: utils::round2(relative_change(
                current.calls as f64,
                previous.calls as f64,
            )),
            success_trend: utils::round2(if current.calls == 0 { 0.0 } else { -error_trend }),
            response_trend: utils::round2(if current.calls == 0 {
                0.0
            } else {
                relative_change(current.avg_latency(), previous.avg_latency())
            }),
            error_trend: utils::round2(if current.calls == 0 { 0.0 } else { error_trend }),
        }
    }

    pub fn current_report(&self) -> PerformanceReport {
        let systems = self.aggregator.all_system_metrics();
        let overall = SystemMetricsSnapshot::merge(crate::base::ALL_SYSTEMS, &systems);
        let active_calls = self
            .dispatcher
            .as_ref()
            .map(|d| d.in_flight())
            .unwrap_or(0);
        PerformanceReport {
            generated_at_ms: utils::curr_time_millis(),
            recommendations: recommendations(&overall, active_calls),
            overall,
            systems,
            active_calls,
        }
    }
}
