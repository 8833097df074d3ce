use super::ErrorLog;
use crate::base::{CallOutcome, CallRecord, ErrorKind};
use crate::metric::LatencyHistogram;
use crate::utils;
use enum_map::EnumMap;
use std::collections::VecDeque;
use std::ops::AddAssign;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Counters over every call since the recorder was created or last reset,
/// independent of ring eviction.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct LifetimeTotals {
    pub calls: u64,
    pub errors: u64,
    pub latency_sum_ms: u64,
}

impl LifetimeTotals {
    /// Counters accumulated since `earlier` was taken.
    /// Counters that went backwards were reset in between, so all of `self` is new.
    pub fn delta_since(&self, earlier: &LifetimeTotals) -> LifetimeTotals {
        if self.calls < earlier.calls {
            return *self;
        }
        LifetimeTotals {
            calls: self.calls - earlier.calls,
            errors: self.errors.saturating_sub(earlier.errors),
            latency_sum_ms: self.latency_sum_ms.saturating_sub(earlier.latency_sum_ms),
        }
    }
}

impl AddAssign for LifetimeTotals {
    fn add_assign(&mut self, other: LifetimeTotals) {
        self.calls += other.calls;
        self.errors += other.errors;
        self.latency_sum_ms += other.latency_sum_ms;
    }
}

/// Everything counted since the recorder was created or last reset.
/// Memory stays bounded however many calls went through.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LifetimeStats {
    pub totals: LifetimeTotals,
    pub latency: LatencyHistogram,
    pub errors_by_kind: EnumMap<ErrorKind, u64>,
}

impl LifetimeStats {
    pub fn record(&mut self, outcome: &CallOutcome) {
        let latency = outcome.latency_ms();
        self.totals.calls += 1;
        self.totals.latency_sum_ms += latency;
        self.latency.record(latency);
        if let Some(kind) = outcome.error_kind() {
            self.totals.errors += 1;
            self.errors_by_kind[kind] += 1;
        }
    }
}

impl<'a> FromIterator<&'a CallOutcome> for LifetimeStats {
    fn from_iter<I: IntoIterator<Item = &'a CallOutcome>>(iter: I) -> Self {
        let mut stats = LifetimeStats::default();
        for outcome in iter {
            stats.record(outcome);
        }
        stats
    }
}

#[derive(Debug)]
struct RecorderState {
    ring: VecDeque<CallRecord>,
    lifetime: LifetimeStats,
}

/// `CallRecorder` keeps the most recent calls of one client in a fixed-capacity ring.
/// The oldest record is evicted first once the ring is full.
#[derive(Debug)]
pub struct CallRecorder {
    client_name: String,
    capacity: usize,
    state: Mutex<RecorderState>,
    error_log: Option<Arc<ErrorLog>>,
}

impl CallRecorder {
    pub fn new<S: Into<String>>(client_name: S, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        CallRecorder {
            client_name: client_name.into(),
            capacity,
            state: Mutex::new(RecorderState {
                ring: VecDeque::with_capacity(capacity),
                lifetime: LifetimeStats::default(),
            }),
            error_log: None,
        }
    }

    /// Failures recorded here are also appended to the shared `error_log`.
    pub fn new_with_error_log<S: Into<String>>(
        client_name: S,
        capacity: usize,
        error_log: Arc<ErrorLog>,
    ) -> Self {
        CallRecorder {
            error_log: Some(error_log),
            ..Self::new(client_name, capacity)
        }
    }

    #[inline]
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        utils::lock_recover(self.state.lock()).ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record a completed call under a fresh call id.
    pub fn record(&self, outcome: CallOutcome) -> CallRecord {
        self.record_with_id(Uuid::new_v4().to_string(), outcome)
    }

    /// The completion timestamp is taken while holding the lock,
    /// so records of one client are ordered by completion time.
    pub fn record_with_id(&self, call_id: String, outcome: CallOutcome) -> CallRecord {
        let record = {
            let mut state = utils::lock_recover(self.state.lock());
            state.lifetime.record(&outcome);
            let record = CallRecord {
                call_id,
                client_name: self.client_name.clone(),
                timestamp_ms: utils::curr_time_millis(),
                outcome,
            };
            if state.ring.len() >= self.capacity {
                state.ring.pop_front();
            }
            state.ring.push_back(record.clone());
            record
        };
        if record.is_failure() {
            if let Some(error_log) = &self.error_log {
                error_log.push(record.clone());
            }
        }
        record
    }

    /// Copy of the ring, oldest first. Aggregation works on the copy
    /// and never holds the lock while computing.
    pub fn snapshot(&self) -> Vec<CallRecord> {
        utils::lock_recover(self.state.lock())
            .ring
            .iter()
            .cloned()
            .collect()
    }

    /// Up to `limit` records, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<CallRecord> {
        utils::lock_recover(self.state.lock())
            .ring
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn find(&self, call_id: &str) -> Option<CallRecord> {
        utils::lock_recover(self.state.lock())
            .ring
            .iter()
            .rev()
            .find(|r| r.call_id == call_id)
            .cloned()
    }

    pub fn totals(&self) -> LifetimeTotals {
        utils::lock_recover(self.state.lock()).lifetime.totals
    }

    pub fn lifetime(&self) -> LifetimeStats {
        utils::lock_recover(self.state.lock()).lifetime.clone()
    }

    /// Drop the ring and every lifetime counter.
    pub fn reset(&self) {
        let mut state = utils::lock_recover(self.state.lock());
        state.ring.clear();
        state.lifetime = LifetimeStats::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::ErrorKind;
    use std::thread;

    #[test]
    fn evicts_oldest_first() {
        let recorder = CallRecorder::new("mes", 3);
        for latency in 1..=5 {
            recorder.record(CallOutcome::success(latency));
        }
        let latencies: Vec<u64> = recorder.snapshot().iter().map(|r| r.duration_ms()).collect();
        assert_eq!(latencies, vec![3, 4, 5]);
        assert_eq!(recorder.totals().calls, 5);
        assert_eq!(recorder.totals().latency_sum_ms, 15);
    }

    #[test]
    fn ordered_by_completion() {
        let recorder = CallRecorder::new("lims", 100);
        for i in 0..50 {
            recorder.record(CallOutcome::success(i));
        }
        let snapshot = recorder.snapshot();
        assert!(snapshot
            .windows(2)
            .all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
    }

    #[test]
    fn failures_go_to_error_log() {
        let log = Arc::new(ErrorLog::new(10));
        let recorder = CallRecorder::new_with_error_log("erp", 10, Arc::clone(&log));
        recorder.record(CallOutcome::success(10));
        let failed = recorder.record(CallOutcome::failure(
            20,
            ErrorKind::ServiceUnavailable,
            "503",
        ));
        assert_eq!(log.len(), 1);
        assert_eq!(log.find(&failed.call_id), Some(failed.clone()));
        assert_eq!(recorder.find(&failed.call_id), Some(failed));
        assert_eq!(recorder.totals().errors, 1);
    }

    #[test]
    fn concurrent_recording() {
        const THREADS: usize = 8;
        const CALLS: usize = 500;
        let recorder = Arc::new(CallRecorder::new("edms", 100));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let recorder = Arc::clone(&recorder);
                thread::spawn(move || {
                    for _ in 0..CALLS {
                        recorder.record(CallOutcome::success(1));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(recorder.totals().calls, (THREADS * CALLS) as u64);
        assert_eq!(recorder.len(), 100);
    }

    #[test]
    fn lifetime_outlives_the_ring() {
        const THREADS: usize = 8;
        const CALLS: usize = 250;
        let recorder = Arc::new(CallRecorder::new("mes", 1_000));
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let recorder = Arc::clone(&recorder);
                thread::spawn(move || {
                    for i in 0..CALLS {
                        if t == 0 && i % 50 == 0 {
                            recorder.record(CallOutcome::failure(
                                700,
                                ErrorKind::ServiceUnavailable,
                                "503",
                            ));
                        } else {
                            recorder.record(CallOutcome::success(50));
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let lifetime = recorder.lifetime();
        assert_eq!(recorder.len(), 1_000);
        assert_eq!(lifetime.totals.calls, 2_000);
        assert_eq!(lifetime.totals.errors, 5);
        assert_eq!(lifetime.errors_by_kind[ErrorKind::ServiceUnavailable], 5);
        assert_eq!(lifetime.latency.buckets(), [1_995, 0, 5, 0, 0]);
    }

    #[test]
    fn recent_and_reset() {
        let recorder = CallRecorder::new("training", 3);
        for latency in 1..=4 {
            recorder.record(CallOutcome::success(latency));
        }
        let latencies: Vec<u64> = recorder.recent(2).iter().map(|r| r.duration_ms()).collect();
        assert_eq!(latencies, vec![4, 3]);
        assert_eq!(recorder.recent(10).len(), 3);

        recorder.reset();
        assert!(recorder.is_empty());
        assert_eq!(recorder.lifetime(), LifetimeStats::default());
        recorder.record(CallOutcome::success(9));
        assert_eq!(recorder.totals().calls, 1);
    }

    #[test]
    fn delta_after_reset() {
        let before = LifetimeTotals {
            calls: 100,
            errors: 4,
            latency_sum_ms: 9_000,
        };
        let after = LifetimeTotals {
            calls: 3,
            errors: 1,
            latency_sum_ms: 60,
        };
        assert_eq!(after.delta_since(&before), after);
    }

    #[test]
    fn totals_delta() {
        let earlier = LifetimeTotals {
            calls: 10,
            errors: 1,
            latency_sum_ms: 1000,
        };
        let later = LifetimeTotals {
            calls: 15,
            errors: 3,
            latency_sum_ms: 1600,
        };
        assert_eq!(
            later.delta_since(&earlier),
            LifetimeTotals {
                calls: 5,
                errors: 2,
                latency_sum_ms: 600
            }
        );
    }
}
