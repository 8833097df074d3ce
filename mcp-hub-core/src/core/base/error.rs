use enum_map::Enum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `ErrorKind` classifies a failed call to an external subsystem.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum ErrorKind {
    ConnectionTimeout,
    ResourceNotFound,
    /// The caller sent an invalid request, the dependency is not to blame.
    BadRequest,
    Unauthorized,
    ServiceUnavailable,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::ConnectionTimeout,
        ErrorKind::ResourceNotFound,
        ErrorKind::BadRequest,
        ErrorKind::Unauthorized,
        ErrorKind::ServiceUnavailable,
    ];

    /// Whether a failure of this kind is held against the dependency by its circuit breaker.
    /// Only timeouts and unavailability count, caller-side faults are neutral.
    #[inline]
    pub fn counts_against_breaker(self) -> bool {
        matches!(
            self,
            ErrorKind::ConnectionTimeout | ErrorKind::ServiceUnavailable
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ConnectionTimeout => "ConnectionTimeout",
            ErrorKind::ResourceNotFound => "ResourceNotFound",
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::ServiceUnavailable => "ServiceUnavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `CallError` is the classified failure of one dependency call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CallError {
    pub fn new<M: Into<String>>(kind: ErrorKind, message: M) -> Self {
        CallError {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        CallError::new(
            ErrorKind::ConnectionTimeout,
            format!("call timed out after {}ms", timeout_ms),
        )
    }

    pub fn circuit_open(client_name: &str) -> Self {
        CallError::new(
            ErrorKind::ServiceUnavailable,
            format!("circuit open for {}", client_name),
        )
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for CallError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn breaker_accounting() {
        let counted: Vec<ErrorKind> = ErrorKind::ALL
            .iter()
            .copied()
            .filter(|k| k.counts_against_breaker())
            .collect();
        assert_eq!(
            counted,
            vec![ErrorKind::ConnectionTimeout, ErrorKind::ServiceUnavailable]
        );
    }

    #[test]
    fn display() {
        let err = CallError::new(ErrorKind::BadRequest, "missing batch number");
        assert_eq!(err.to_string(), "BadRequest: missing batch number");
        assert_eq!(
            CallError::new(ErrorKind::Unauthorized, "").to_string(),
            "Unauthorized"
        );
        assert_eq!(CallError::timeout(50).kind(), ErrorKind::ConnectionTimeout);
    }
}
