use crate::base::CallRecord;
use crate::utils;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Most recent failed calls across all clients, bounded FIFO.
#[derive(Debug)]
pub struct ErrorLog {
    capacity: usize,
    records: Mutex<VecDeque<CallRecord>>,
}

impl ErrorLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ErrorLog {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, record: CallRecord) {
        let mut records = utils::lock_recover(self.records.lock());
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Up to `limit` failures, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<CallRecord> {
        utils::lock_recover(self.records.lock())
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn find(&self, call_id: &str) -> Option<CallRecord> {
        utils::lock_recover(self.records.lock())
            .iter()
            .rev()
            .find(|r| r.call_id == call_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        utils::lock_recover(self.records.lock()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        utils::lock_recover(self.records.lock()).clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::{CallOutcome, ErrorKind};

    fn failure(id: &str) -> CallRecord {
        CallRecord {
            call_id: id.into(),
            client_name: "mes".into(),
            timestamp_ms: 0,
            outcome: CallOutcome::failure(5, ErrorKind::ConnectionTimeout, "timeout"),
        }
    }

    #[test]
    fn most_recent_first_and_bounded() {
        let log = ErrorLog::new(2);
        log.push(failure("a"));
        log.push(failure("b"));
        log.push(failure("c"));
        let ids: Vec<String> = log.recent(10).into_iter().map(|r| r.call_id).collect();
        assert_eq!(ids, vec!["c".to_string(), "b".to_string()]);
        assert!(log.find("a").is_none());
        assert_eq!(log.recent(1).len(), 1);
    }
}
