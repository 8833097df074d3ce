//! JSON shapes the dashboard front-end reads. Field names are camelCase.

use mcp_hub_core::base::{CallOutcome, CallRecord};
use mcp_hub_core::cache::CacheStats;
use mcp_hub_core::circuitbreaker::State;
use mcp_hub_core::metric::{
    CircuitBreakerStats, HealthLevel, SystemHealthStatus, SystemMetricsSnapshot, SystemStatus,
    LATENCY_BUCKET_COUNT,
};
use mcp_hub_core::mq::{DeliveryFailure, QueueStatus};
use mcp_hub_core::report::{PerformanceReport, Recommendation, TrendSeries};
use mcp_hub_core::{utils, MetricsOverview};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsView {
    pub total_calls: u64,
    pub calls_trend: f64,
    pub success_rate: f64,
    pub success_trend: f64,
    pub avg_response_time: f64,
    pub response_trend: f64,
    pub error_rate: f64,
    pub error_trend: f64,
    pub response_time_distribution: [u64; LATENCY_BUCKET_COUNT],
}

impl From<&MetricsOverview> for MetricsView {
    fn from(m: &MetricsOverview) -> Self {
        MetricsView {
            total_calls: m.overall.total_calls,
            calls_trend: m.trends.calls_trend,
            success_rate: utils::round2(m.overall.success_rate()),
            success_trend: m.trends.success_trend,
            avg_response_time: m.overall.avg_latency_ms,
            response_trend: m.trends.response_trend,
            error_rate: utils::round2(m.overall.error_rate()),
            error_trend: m.trends.error_trend,
            response_time_distribution: m.overall.latency_buckets,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealthView {
    pub name: String,
    pub status: SystemStatus,
    pub health: HealthLevel,
    pub last_checked: String,
    pub calls: u64,
    pub errors: u64,
    pub error_rate: f64,
}

impl From<&SystemHealthStatus> for SystemHealthView {
    fn from(s: &SystemHealthStatus) -> Self {
        SystemHealthView {
            name: s.name.clone(),
            status: s.status,
            health: s.health,
            last_checked: utils::format_date_time(s.last_checked_ms),
            calls: s.calls,
            errors: s.errors,
            error_rate: s.error_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerView {
    pub name: String,
    pub status: State,
    pub calls: u64,
    pub failures: u64,
    pub failure_rate: f64,
    pub consecutive_failures: u32,
    pub short_circuited: u64,
}

impl From<&CircuitBreakerStats> for CircuitBreakerView {
    fn from(s: &CircuitBreakerStats) -> Self {
        CircuitBreakerView {
            name: s.name.clone(),
            status: s.state,
            calls: s.calls,
            failures: s.failures,
            failure_rate: s.failure_rate,
            consecutive_failures: s.consecutive_failures,
            short_circuited: s.short_circuited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorView {
    pub time: String,
    pub system: String,
    pub error_type: String,
    pub message: String,
    pub call_id: String,
}

impl From<&CallRecord> for ErrorView {
    fn from(r: &CallRecord) -> Self {
        ErrorView {
            time: utils::format_date_time(r.timestamp_ms),
            system: r.client_name.clone(),
            error_type: error_type(&r.outcome),
            message: r.outcome.error_message().unwrap_or_default().to_owned(),
            call_id: r.call_id.clone(),
        }
    }
}

/// Full record of one failed call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetailsView {
    pub call_id: String,
    pub time: String,
    pub timestamp: u64,
    pub system: String,
    pub error_type: String,
    pub message: String,
    pub duration_ms: u64,
}

impl From<&CallRecord> for ErrorDetailsView {
    fn from(r: &CallRecord) -> Self {
        ErrorDetailsView {
            call_id: r.call_id.clone(),
            time: utils::format_date_time(r.timestamp_ms),
            timestamp: r.timestamp_ms,
            system: r.client_name.clone(),
            error_type: error_type(&r.outcome),
            message: r.outcome.error_message().unwrap_or_default().to_owned(),
            duration_ms: r.duration_ms(),
        }
    }
}

fn error_type(outcome: &CallOutcome) -> String {
    outcome
        .error_kind()
        .map(|k| k.as_str().to_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendView {
    pub labels: Vec<String>,
    pub response_times: Vec<f64>,
    pub call_counts: Vec<u64>,
    pub error_rates: Vec<f64>,
}

impl From<&TrendSeries> for TrendView {
    fn from(t: &TrendSeries) -> Self {
        TrendView {
            labels: t.labels.clone(),
            response_times: t.avg_response_time.clone(),
            call_counts: t.call_count.clone(),
            error_rates: t.error_rate.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetricsView {
    pub name: String,
    pub total_calls: u64,
    pub error_count: u64,
    pub success_rate: f64,
    pub avg_response_time: f64,
    pub response_time_distribution: [u64; LATENCY_BUCKET_COUNT],
    pub errors_by_type: BTreeMap<String, u64>,
}

impl From<&SystemMetricsSnapshot> for SystemMetricsView {
    fn from(m: &SystemMetricsSnapshot) -> Self {
        SystemMetricsView {
            name: m.client_name.clone(),
            total_calls: m.total_calls,
            error_count: m.error_count,
            success_rate: utils::round2(m.success_rate()),
            avg_response_time: m.avg_latency_ms,
            response_time_distribution: m.latency_buckets,
            errors_by_type: m
                .errors_by_kind
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(kind, count)| (kind.as_str().to_owned(), *count))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub generated_at: String,
    pub overall: SystemMetricsView,
    pub systems: Vec<SystemMetricsView>,
    pub active_calls: usize,
    pub recommendations: Vec<Recommendation>,
}

impl From<&PerformanceReport> for ReportView {
    fn from(r: &PerformanceReport) -> Self {
        ReportView {
            generated_at: utils::format_date_time(r.generated_at_ms),
            overall: SystemMetricsView::from(&r.overall),
            systems: r.systems.iter().map(SystemMetricsView::from).collect(),
            active_calls: r.active_calls,
            recommendations: r.recommendations.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheView {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entries: usize,
}

impl From<CacheStats> for CacheView {
    fn from(s: CacheStats) -> Self {
        CacheView {
            hits: s.hits,
            misses: s.misses,
            hit_rate: s.hit_rate,
            entries: s.entries,
        }
    }
}

/// One recorded call, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallDetailView {
    pub call_id: String,
    pub time: String,
    pub system: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&CallRecord> for CallDetailView {
    fn from(r: &CallRecord) -> Self {
        CallDetailView {
            call_id: r.call_id.clone(),
            time: utils::format_date_time(r.timestamp_ms),
            system: r.client_name.clone(),
            success: r.outcome.is_success(),
            duration_ms: r.duration_ms(),
            error_type: r.outcome.error_kind().map(|k| k.as_str().to_owned()),
            message: r.outcome.error_message().map(str::to_owned),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryFailureView {
    pub message_id: String,
    pub topic: String,
    pub error: String,
    pub time: String,
}

impl From<&DeliveryFailure> for DeliveryFailureView {
    fn from(f: &DeliveryFailure) -> Self {
        DeliveryFailureView {
            message_id: f.message_id.clone(),
            topic: f.topic.clone(),
            error: f.error.clone(),
            time: utils::format_date_time(f.failed_at_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatusView {
    pub published: u64,
    pub delivered: u64,
    pub failed: u64,
    pub subscriptions: BTreeMap<String, usize>,
    pub recent_failures: Vec<DeliveryFailureView>,
}

impl From<&QueueStatus> for QueueStatusView {
    fn from(s: &QueueStatus) -> Self {
        QueueStatusView {
            published: s.stats.published,
            delivered: s.stats.delivered,
            failed: s.stats.failed,
            subscriptions: s.topics.clone(),
            recent_failures: s.recent_failures.iter().map(DeliveryFailureView::from).collect(),
        }
    }
}
