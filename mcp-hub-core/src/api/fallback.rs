use super::ClientRequest;
use crate::circuitbreaker::State;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// Substitute response path chosen at call time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FallbackStrategy {
    /// the last successful response of the same operation,
    /// or the degraded response if there is none yet
    LastKnownGood,
    /// an explicit degraded marker built from the request
    Degraded,
    /// no fallback, the classified error is surfaced
    None,
}

impl FallbackStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            FallbackStrategy::LastKnownGood => "last_known_good",
            FallbackStrategy::Degraded => "degraded",
            FallbackStrategy::None => "none",
        }
    }
}

impl fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the strategy from the breaker state observed when the primary path gave up.
pub type FallbackResolver = dyn Fn(State) -> FallbackStrategy + Send + Sync;

/// Builds the degraded payload of one request.
pub type DegradedBuilder = dyn Fn(&ClientRequest) -> Value + Send + Sync;

/// Always answers with the given strategy.
pub fn fixed_resolver(strategy: FallbackStrategy) -> Arc<FallbackResolver> {
    Arc::new(move |_| strategy)
}

/// Open breakers serve the last known good response, failed calls
/// on a closed or half-open breaker get an explicit degraded marker.
pub fn default_resolver(state: State) -> FallbackStrategy {
    match state {
        State::Open => FallbackStrategy::LastKnownGood,
        State::Closed | State::HalfOpen => FallbackStrategy::Degraded,
    }
}

/// Marker served when no degraded builder is configured.
pub fn unavailable_marker(client_name: &str, request: &ClientRequest) -> Value {
    json!({
        "system": client_name,
        "operation": request.operation,
        "available": false,
        "message": "service unavailable",
    })
}

/// Degraded payloads are always flagged, whatever the builder returned.
pub(crate) fn mark_degraded(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => {
            map.insert("degraded".into(), Value::Bool(true));
            Value::Object(map)
        }
        other => json!({ "degraded": true, "data": other }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_resolution() {
        assert_eq!(default_resolver(State::Open), FallbackStrategy::LastKnownGood);
        assert_eq!(default_resolver(State::Closed), FallbackStrategy::Degraded);
        assert_eq!(default_resolver(State::HalfOpen), FallbackStrategy::Degraded);
        let resolver = fixed_resolver(FallbackStrategy::None);
        assert_eq!(resolver(State::Open), FallbackStrategy::None);
    }

    #[test]
    fn degraded_flag() {
        let request = ClientRequest::new("getBatchStatus", json!({"batchNumber": "B-7"}));
        let marker = mark_degraded(unavailable_marker("mes", &request));
        assert_eq!(marker["degraded"], json!(true));
        assert_eq!(marker["operation"], json!("getBatchStatus"));
        assert_eq!(marker["available"], json!(false));

        let wrapped = mark_degraded(json!("UNKNOWN"));
        assert_eq!(wrapped, json!({"degraded": true, "data": "UNKNOWN"}));
    }
}
