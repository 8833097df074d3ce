use super::{CallError, ErrorKind};
use serde::{Deserialize, Serialize};

/// Outcome of one completed call, pattern-matched by the recorder and the breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum CallOutcome {
    Success {
        latency_ms: u64,
    },
    Failure {
        latency_ms: u64,
        kind: ErrorKind,
        message: String,
    },
}

impl CallOutcome {
    pub fn success(latency_ms: u64) -> Self {
        CallOutcome::Success { latency_ms }
    }

    pub fn failure<M: Into<String>>(latency_ms: u64, kind: ErrorKind, message: M) -> Self {
        CallOutcome::Failure {
            latency_ms,
            kind,
            message: message.into(),
        }
    }

    pub fn from_result<T>(latency_ms: u64, result: &std::result::Result<T, CallError>) -> Self {
        match result {
            Ok(_) => CallOutcome::success(latency_ms),
            Err(err) => CallOutcome::failure(latency_ms, err.kind, err.message.clone()),
        }
    }

    #[inline]
    pub fn latency_ms(&self) -> u64 {
        match self {
            CallOutcome::Success { latency_ms } => *latency_ms,
            CallOutcome::Failure { latency_ms, .. } => *latency_ms,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success { .. })
    }

    #[inline]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            CallOutcome::Success { .. } => None,
            CallOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            CallOutcome::Success { .. } => None,
            CallOutcome::Failure { message, .. } => Some(message),
        }
    }
}

/// `CallRecord` is created when a call completes and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub call_id: String,
    pub client_name: String,
    /// completion time, unix millis in UTC
    pub timestamp_ms: u64,
    pub outcome: CallOutcome,
}

impl CallRecord {
    #[inline]
    pub fn duration_ms(&self) -> u64 {
        self.outcome.latency_ms()
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        !self.outcome.is_success()
    }
}
