use super::{PerformanceReportService, PerformanceSnapshot};
use crate::stat::{LifetimeTotals, RecorderRegistry};
use crate::{logging, utils, Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// `SnapshotSampler` turns the growth of the recorders' lifetime totals
/// since the previous sample into one `PerformanceSnapshot`.
pub struct SnapshotSampler {
    recorders: Arc<RecorderRegistry>,
    last: Mutex<LifetimeTotals>,
}

impl SnapshotSampler {
    pub fn new(recorders: Arc<RecorderRegistry>) -> Self {
        let last = recorders.totals();
        SnapshotSampler {
            recorders,
            last: Mutex::new(last),
        }
    }

    #[inline]
    pub fn sample(&self) -> PerformanceSnapshot {
        self.sample_at(utils::curr_time_millis())
    }

    pub fn sample_at(&self, now: u64) -> PerformanceSnapshot {
        let delta = {
            let mut last = utils::lock_recover(self.last.lock());
            let totals = self.recorders.totals();
            let delta = totals.delta_since(&last);
            *last = totals;
            delta
        };
        PerformanceSnapshot {
            timestamp_ms: now,
            avg_response_time_ms: if delta.calls == 0 {
                0.0
            } else {
                utils::round2(delta.latency_sum_ms as f64 / delta.calls as f64)
            },
            call_count: delta.calls,
            error_rate_pct: utils::round2(utils::percent(delta.errors, delta.calls)),
        }
    }
}

struct TickerTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Background task appending one snapshot per interval.
/// It runs on its own task, never on the dispatcher's pool.
pub struct SnapshotTicker {
    interval: Duration,
    sampler: Arc<SnapshotSampler>,
    report: Arc<PerformanceReportService>,
    started: AtomicBool,
    task: Mutex<Option<TickerTask>>,
}

impl SnapshotTicker {
    pub fn new(
        interval_ms: u64,
        sampler: Arc<SnapshotSampler>,
        report: Arc<PerformanceReportService>,
    ) -> Self {
        SnapshotTicker {
            interval: Duration::from_millis(interval_ms.max(1)),
            sampler,
            report,
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        utils::lock_recover(self.task.lock()).is_some()
    }

    /// Spawn the ticker on the current tokio runtime. A ticker starts at most once.
    pub fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::msg("snapshot ticker already started"));
        }
        let (stop, mut stop_rx) = oneshot::channel::<()>();
        let period = self.interval;
        let sampler = Arc::clone(&self.sampler);
        let report = Arc::clone(&self.report);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        let snapshot = sampler.sample();
                        logging::debug!(
                            "[SnapshotTicker] Snapshot taken, calls: {}, avg: {}ms, errors: {}%",
                            snapshot.call_count,
                            snapshot.avg_response_time_ms,
                            snapshot.error_rate_pct
                        );
                        report.append(snapshot);
                    }
                }
            }
            logging::info!("[SnapshotTicker] Stopped");
        });
        *utils::lock_recover(self.task.lock()) = Some(TickerTask { stop, handle });
        logging::info!(
            "[SnapshotTicker] Started, interval: {}ms",
            period.as_millis()
        );
        Ok(())
    }

    /// Stop the ticker and wait for its task to finish.
    pub async fn stop(&self) {
        let task = utils::lock_recover(self.task.lock()).take();
        if let Some(task) = task {
            let _ = task.stop.send(());
            if let Err(err) = task.handle.await {
                logging::error!("[SnapshotTicker] Task failed: {:?}", err);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::{CallOutcome, ErrorKind};
    use crate::circuitbreaker::{BreakerRegistry, BreakerRule};
    use crate::metric::{HealthThresholds, MetricsAggregator};

    fn fixture() -> (Arc<RecorderRegistry>, Arc<PerformanceReportService>) {
        let recorders = Arc::new(RecorderRegistry::new(100, 100));
        let aggregator = Arc::new(MetricsAggregator::new(
            Arc::clone(&recorders),
            Arc::new(BreakerRegistry::new(BreakerRule::default())),
            HealthThresholds::default(),
        ));
        (
            recorders,
            Arc::new(PerformanceReportService::new(aggregator, 100)),
        )
    }

    #[test]
    fn samples_deltas() {
        let (recorders, _) = fixture();
        let mes = recorders.get_or_create("mes");
        mes.record(CallOutcome::success(999));
        let sampler = SnapshotSampler::new(Arc::clone(&recorders));

        mes.record(CallOutcome::success(100));
        mes.record(CallOutcome::success(200));
        mes.record(CallOutcome::failure(300, ErrorKind::ConnectionTimeout, "t"));
        recorders
            .get_or_create("lims")
            .record(CallOutcome::success(400));
        let first = sampler.sample_at(1_000);
        assert_eq!(first.timestamp_ms, 1_000);
        assert_eq!(first.call_count, 4);
        assert_eq!(first.avg_response_time_ms, 250.0);
        assert_eq!(first.error_rate_pct, 25.0);

        let idle = sampler.sample_at(2_000);
        assert_eq!(idle.call_count, 0);
        assert_eq!(idle.avg_response_time_ms, 0.0);
        assert_eq!(idle.error_rate_pct, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_until_stopped() {
        let (recorders, report) = fixture();
        let sampler = Arc::new(SnapshotSampler::new(Arc::clone(&recorders)));
        let ticker = SnapshotTicker::new(1_000, sampler, Arc::clone(&report));
        ticker.start().unwrap();
        assert!(ticker.start().is_err());
        assert!(ticker.is_running());

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        ticker.stop().await;
        assert!(!ticker.is_running());
        let taken = report.history_len();
        assert_eq!(taken, 3);

        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(report.history_len(), taken);
    }
}
