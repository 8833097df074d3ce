mod error_log;
mod recorder;

pub use error_log::*;
pub use recorder::*;

use crate::utils;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// `RecorderRegistry` hands out one `CallRecorder` per client.
/// All recorders share a single `ErrorLog`.
#[derive(Debug)]
pub struct RecorderRegistry {
    ring_capacity: usize,
    error_log: Arc<ErrorLog>,
    recorders: RwLock<BTreeMap<String, Arc<CallRecorder>>>,
}

impl RecorderRegistry {
    pub fn new(ring_capacity: usize, error_log_capacity: usize) -> Self {
        RecorderRegistry {
            ring_capacity,
            error_log: Arc::new(ErrorLog::new(error_log_capacity)),
            recorders: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn get_or_create(&self, client_name: &str) -> Arc<CallRecorder> {
        if let Some(recorder) = self.get(client_name) {
            return recorder;
        }
        let mut recorders = utils::write_recover(self.recorders.write());
        Arc::clone(recorders.entry(client_name.to_owned()).or_insert_with(|| {
            Arc::new(CallRecorder::new_with_error_log(
                client_name,
                self.ring_capacity,
                Arc::clone(&self.error_log),
            ))
        }))
    }

    pub fn get(&self, client_name: &str) -> Option<Arc<CallRecorder>> {
        utils::read_recover(self.recorders.read())
            .get(client_name)
            .cloned()
    }

    /// All recorders ordered by client name.
    pub fn list(&self) -> Vec<Arc<CallRecorder>> {
        utils::read_recover(self.recorders.read())
            .values()
            .cloned()
            .collect()
    }

    pub fn error_log(&self) -> &Arc<ErrorLog> {
        &self.error_log
    }

    /// Lifetime totals summed over every client.
    pub fn totals(&self) -> LifetimeTotals {
        let mut sum = LifetimeTotals::default();
        for recorder in self.list() {
            sum += recorder.totals();
        }
        sum
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::CallOutcome;

    #[test]
    fn one_recorder_per_client() {
        let registry = RecorderRegistry::new(10, 10);
        let a = registry.get_or_create("mes");
        let b = registry.get_or_create("mes");
        assert!(Arc::ptr_eq(&a, &b));
        registry.get_or_create("edms");
        let names: Vec<String> = registry
            .list()
            .iter()
            .map(|r| r.client_name().to_owned())
            .collect();
        assert_eq!(names, vec!["edms".to_string(), "mes".to_string()]);

        a.record(CallOutcome::success(10));
        registry
            .get_or_create("edms")
            .record(CallOutcome::success(30));
        assert_eq!(registry.totals().calls, 2);
        assert_eq!(registry.totals().latency_sum_ms, 40);
    }
}
