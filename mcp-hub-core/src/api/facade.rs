use super::fallback::{self, DegradedBuilder, FallbackResolver, FallbackStrategy};
use super::Hub;
use crate::base::{CallError, CallOutcome};
use crate::circuitbreaker::{CircuitBreaker, State};
use crate::dispatch::{DispatchError, Dispatcher};
use crate::mq::{MessageQueueService, CALL_FAILED_TOPIC};
use crate::stat::CallRecorder;
use crate::{logging, utils};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRequest {
    pub operation: String,
    pub payload: Value,
}

impl ClientRequest {
    pub fn new<S: Into<String>>(operation: S, payload: Value) -> Self {
        ClientRequest {
            operation: operation.into(),
            payload,
        }
    }
}

/// A fallback response (`used_fallback`) is not authoritative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientResponse {
    pub payload: Value,
    pub used_fallback: bool,
    pub degraded: bool,
}

impl ClientResponse {
    fn primary(payload: Value) -> Self {
        ClientResponse {
            payload,
            used_fallback: false,
            degraded: false,
        }
    }
}

/// `SubsystemClient` is the black-box request/response API of one external subsystem.
/// It answers with a payload or a classified failure.
pub trait SubsystemClient: Send + Sync {
    fn call(&self, request: ClientRequest)
        -> BoxFuture<'static, std::result::Result<Value, CallError>>;
}

/// Completion side of a call, run by the dispatcher once the call finishes or times out,
/// whether or not the caller still waits for it.
struct CallSink {
    client_name: String,
    recorder: Arc<CallRecorder>,
    breaker: Arc<CircuitBreaker>,
    events: Arc<MessageQueueService>,
    // answers of these operations are never replayed as last known good
    write_operations: HashSet<String>,
    last_good: Mutex<HashMap<String, Value>>,
}

impl CallSink {
    fn complete(
        &self,
        operation: &str,
        result: &std::result::Result<Value, CallError>,
        latency_ms: u64,
    ) {
        let outcome = CallOutcome::from_result(latency_ms, result);
        let record = self.recorder.record(outcome.clone());
        self.breaker.on_request_complete(&outcome);

        #[cfg(feature = "exporter")]
        crate::exporter::add_call_counter(
            &self.client_name,
            if outcome.is_success() { "success" } else { "failure" },
            outcome.error_kind().map(|k| k.as_str()).unwrap_or(""),
        );

        match result {
            Ok(payload) if !self.write_operations.contains(operation) => {
                utils::lock_recover(self.last_good.lock())
                    .insert(operation.to_owned(), payload.clone());
            }
            Ok(_) => {}
            Err(err) => {
                logging::debug!(
                    "[ClientFacade] Call failed, client: {}, operation: {}, callId: {}, error: {}",
                    self.client_name,
                    operation,
                    record.call_id,
                    err
                );
                self.events.publish(
                    CALL_FAILED_TOPIC,
                    json!({
                        "callId": record.call_id,
                        "system": self.client_name,
                        "operation": operation,
                        "errorType": err.kind.as_str(),
                        "message": err.message,
                        "timestamp": record.timestamp_ms,
                    }),
                );
            }
        }
    }

    fn last_good(&self, operation: &str) -> Option<Value> {
        utils::lock_recover(self.last_good.lock())
            .get(operation)
            .cloned()
    }
}

/// `ClientFacade` guards one subsystem client: it consults the breaker,
/// dispatches the call, records the outcome and serves fallbacks.
pub struct ClientFacade {
    client: Arc<dyn SubsystemClient>,
    dispatcher: Arc<Dispatcher>,
    sink: Arc<CallSink>,
    resolver: Option<Arc<FallbackResolver>>,
    degraded: Option<Arc<DegradedBuilder>>,
}

impl ClientFacade {
    pub fn builder<S: Into<String>>(
        client_name: S,
        client: Arc<dyn SubsystemClient>,
    ) -> ClientFacadeBuilder {
        ClientFacadeBuilder {
            client_name: client_name.into(),
            client,
            resolver: Some(Arc::new(fallback::default_resolver)),
            degraded: None,
            write_operations: HashSet::new(),
        }
    }

    #[inline]
    pub fn client_name(&self) -> &str {
        &self.sink.client_name
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.sink.breaker
    }

    pub fn recorder(&self) -> &Arc<CallRecorder> {
        &self.sink.recorder
    }

    /// Open breakers fail fast without contacting the dependency. Failures of an
    /// attempted call are recorded before the fallback or the error is returned.
    pub async fn call(
        &self,
        request: ClientRequest,
    ) -> std::result::Result<ClientResponse, DispatchError> {
        let breaker = &self.sink.breaker;
        if !breaker.try_pass() {
            breaker.record_short_circuit();
            return self.fallback_or(
                &request,
                State::Open,
                DispatchError::Call(CallError::circuit_open(self.client_name())),
            );
        }

        let sink = Arc::clone(&self.sink);
        let operation = request.operation.clone();
        let submitted = self.dispatcher.submit(
            self.client.call(request.clone()),
            move |result: &std::result::Result<Value, CallError>, latency_ms| {
                sink.complete(&operation, result, latency_ms)
            },
        );
        let handle = match submitted {
            Ok(handle) => handle,
            Err(err) => {
                // never ran, the half-open trial goes back to the breaker
                breaker.release_trial();
                return self.fallback_or(&request, breaker.current_state(), err);
            }
        };
        match handle.await {
            Ok(payload) => Ok(ClientResponse::primary(payload)),
            Err(err) => {
                if matches!(err, DispatchError::Canceled) {
                    breaker.release_trial();
                }
                self.fallback_or(&request, breaker.current_state(), err)
            }
        }
    }

    fn fallback_or(
        &self,
        request: &ClientRequest,
        state: State,
        err: DispatchError,
    ) -> std::result::Result<ClientResponse, DispatchError> {
        let strategy = match &self.resolver {
            Some(resolver) => resolver(state),
            None => FallbackStrategy::None,
        };
        let response = match strategy {
            FallbackStrategy::None => return Err(err),
            FallbackStrategy::LastKnownGood => match self.sink.last_good(&request.operation) {
                Some(payload) => ClientResponse {
                    payload,
                    used_fallback: true,
                    degraded: false,
                },
                None => self.degraded_response(request),
            },
            FallbackStrategy::Degraded => self.degraded_response(request),
        };
        logging::warn!(
            "[ClientFacade] Fallback served, client: {}, operation: {}, strategy: {}, state: {}, cause: {}",
            self.client_name(),
            request.operation,
            strategy,
            state,
            err
        );
        #[cfg(feature = "exporter")]
        crate::exporter::add_fallback_counter(self.client_name(), strategy.as_str());
        Ok(response)
    }

    fn degraded_response(&self, request: &ClientRequest) -> ClientResponse {
        let payload = match &self.degraded {
            Some(builder) => builder(request),
            None => fallback::unavailable_marker(self.client_name(), request),
        };
        ClientResponse {
            payload: fallback::mark_degraded(payload),
            used_fallback: true,
            degraded: true,
        }
    }
}

pub struct ClientFacadeBuilder {
    client_name: String,
    client: Arc<dyn SubsystemClient>,
    resolver: Option<Arc<FallbackResolver>>,
    degraded: Option<Arc<DegradedBuilder>>,
    write_operations: HashSet<String>,
}

impl ClientFacadeBuilder {
    /// Operations with side effects. Their fallback is always the degraded response.
    pub fn with_write_operations<I, S>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write_operations
            .extend(operations.into_iter().map(Into::into));
        self
    }

    pub fn with_degraded<F>(mut self, builder: F) -> Self
    where
        F: Fn(&ClientRequest) -> Value + Send + Sync + 'static,
    {
        self.degraded = Some(Arc::new(builder));
        self
    }

    pub fn with_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(State) -> FallbackStrategy + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Failures are surfaced to the caller, open breakers answer `circuit open`.
    pub fn without_fallback(mut self) -> Self {
        self.resolver = None;
        self
    }

    /// Bind the facade to the hub's recorder, breaker, dispatcher and event queue.
    pub fn build(self, hub: &Hub) -> ClientFacade {
        let sink = CallSink {
            recorder: hub.recorders().get_or_create(&self.client_name),
            breaker: hub.breakers().get_or_create(&self.client_name),
            events: Arc::clone(hub.message_queue()),
            write_operations: self.write_operations,
            last_good: Mutex::new(HashMap::new()),
            client_name: self.client_name,
        };
        ClientFacade {
            client: self.client,
            dispatcher: Arc::clone(hub.dispatcher()),
            sink: Arc::new(sink),
            resolver: self.resolver,
            degraded: self.degraded,
        }
    }
}

#[cfg(test)]
pub(crate) use test::MockClient;
