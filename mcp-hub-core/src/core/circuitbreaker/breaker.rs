//!  Circuit Breaker State Machine:
//!
//!                        failures reach threshold within the window
//!
//!             +-----------------------------------------------------------------------+
//!             |                                                                       |
//!             |                                                                       v
//!     +----------------+                   +----------------+  cooldown over  +----------------+
//!     |                |                   |                |<----------------|                |
//!     |                |   trial succeed   |                |                 |                |
//!     |     Closed     |<------------------|    HalfOpen    |                 |      Open      |
//!     |                |                   |                |   trial failed  |                |
//!     |                |                   |                +---------------->|                |
//!     +----------------+                   +----------------+                 +----------------+
//!

use super::BreakerRule;
use crate::base::CallOutcome;
use crate::{logging, utils};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// States of Circuit Breaker State Machine
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    Closed,
    HalfOpen,
    Open,
}

impl Default for State {
    fn default() -> State {
        State::Closed
    }
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            State::Closed => "CLOSED",
            State::HalfOpen => "HALF_OPEN",
            State::Open => "OPEN",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `StateChangeListener` listens on the circuit breaker state change event.
/// Listeners are invoked after the breaker lock is released, so they may query the breaker.
pub trait StateChangeListener: Sync + Send {
    /// `on_transform_to_closed` is triggered when circuit breaker state transformed to Closed.
    fn on_transform_to_closed(&self, client_name: &str, prev: State);

    /// `on_transform_to_open` is triggered when circuit breaker state transformed to Open.
    /// `consecutive_failures` is the failure count that triggered the transformation.
    fn on_transform_to_open(&self, client_name: &str, prev: State, consecutive_failures: u32);

    /// `on_transform_to_half_open` is triggered when circuit breaker state transformed to HalfOpen.
    fn on_transform_to_half_open(&self, client_name: &str, prev: State);
}

pub type StateChangeListeners = Arc<RwLock<Vec<Arc<dyn StateChangeListener>>>>;

#[derive(Debug, Clone, Default)]
struct BreakerState {
    state: State,
    consecutive_failures: u32,
    window_start_ms: u64,
    last_transition_ms: u64,
    half_open_trials_remaining: u32,
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    from: State,
    to: State,
    consecutive_failures: u32,
}

/// Copy of a breaker's state and counters, taken under its lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub client_name: String,
    pub state: State,
    pub consecutive_failures: u32,
    pub window_start_ms: u64,
    pub last_transition_ms: u64,
    pub half_open_trials_remaining: u32,
    /// completed calls observed
    pub calls: u64,
    /// completed calls that counted as failures
    pub failures: u64,
    /// calls rejected without contacting the dependency
    pub short_circuited: u64,
}

/// `CircuitBreaker` guards a single external client.
/// Every transition happens under one mutex, so each client's state changes atomically.
pub struct CircuitBreaker {
    client_name: String,
    rule: BreakerRule,
    state: Mutex<BreakerState>,
    calls: AtomicU64,
    failures: AtomicU64,
    short_circuited: AtomicU64,
    listeners: StateChangeListeners,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("client_name", &self.client_name)
            .field("rule", &self.rule)
            .field("state", &self.state)
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new<S: Into<String>>(client_name: S, rule: BreakerRule) -> Self {
        Self::new_with_listeners(client_name, rule, Arc::new(RwLock::new(Vec::new())))
    }

    pub fn new_with_listeners<S: Into<String>>(
        client_name: S,
        rule: BreakerRule,
        listeners: StateChangeListeners,
    ) -> Self {
        CircuitBreaker {
            client_name: client_name.into(),
            rule,
            state: Mutex::new(BreakerState::default()),
            calls: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            short_circuited: AtomicU64::new(0),
            listeners,
        }
    }

    #[inline]
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    #[inline]
    pub fn bound_rule(&self) -> &BreakerRule {
        &self.rule
    }

    /// `current_state` returns the stored state. An expired Open state
    /// only moves to HalfOpen when the next call asks for permission.
    pub fn current_state(&self) -> State {
        utils::lock_recover(self.state.lock()).state
    }

    pub fn consecutive_failures(&self) -> u32 {
        utils::lock_recover(self.state.lock()).consecutive_failures
    }

    #[inline]
    pub fn try_pass(&self) -> bool {
        self.try_pass_at(utils::curr_time_millis())
    }

    /// `try_pass_at` acquires permission for one call at time `now`.
    /// Open turns into HalfOpen once the cooldown since the last transition has elapsed,
    /// and HalfOpen admits at most `half_open_trials` calls.
    pub fn try_pass_at(&self, now: u64) -> bool {
        let (passed, transition) = {
            let mut s = utils::lock_recover(self.state.lock());
            match s.state {
                State::Closed => (true, None),
                State::Open => {
                    let retry_at = s.last_transition_ms.saturating_add(self.rule.open_duration_ms);
                    if now >= retry_at {
                        let t = self.transform(&mut s, State::HalfOpen, now);
                        (Self::take_trial(&mut s), Some(t))
                    } else {
                        (false, None)
                    }
                }
                State::HalfOpen => (Self::take_trial(&mut s), None),
            }
        };
        if let Some(t) = transition {
            self.notify(t);
        }
        passed
    }

    #[inline]
    pub fn on_request_complete(&self, outcome: &CallOutcome) {
        self.on_request_complete_at(outcome, utils::curr_time_millis())
    }

    /// `on_request_complete_at` feeds the outcome of a call admitted by `try_pass` back into the state machine.
    pub fn on_request_complete_at(&self, outcome: &CallOutcome, now: u64) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let transition = {
            let mut s = utils::lock_recover(self.state.lock());
            match outcome.error_kind() {
                None => {
                    s.consecutive_failures = 0;
                    if s.state == State::HalfOpen {
                        Some(self.transform(&mut s, State::Closed, now))
                    } else {
                        None
                    }
                }
                Some(kind) if !kind.counts_against_breaker() => {
                    // neutral outcome, a consumed trial slot goes back
                    Self::give_back_trial(&mut s, self.rule.half_open_trials);
                    None
                }
                Some(_) => {
                    self.failures.fetch_add(1, Ordering::SeqCst);
                    match s.state {
                        State::Closed => {
                            if s.consecutive_failures == 0
                                || now.saturating_sub(s.window_start_ms) > self.rule.window_ms
                            {
                                s.window_start_ms = now;
                                s.consecutive_failures = 1;
                            } else {
                                s.consecutive_failures += 1;
                            }
                            if s.consecutive_failures >= self.rule.failure_threshold {
                                Some(self.transform(&mut s, State::Open, now))
                            } else {
                                None
                            }
                        }
                        State::HalfOpen => {
                            s.consecutive_failures += 1;
                            Some(self.transform(&mut s, State::Open, now))
                        }
                        // late completion of a call admitted before the circuit opened
                        State::Open => {
                            s.consecutive_failures += 1;
                            None
                        }
                    }
                }
            }
        };
        if let Some(t) = transition {
            self.notify(t);
        }
    }

    /// Hand back a trial slot of a call that was admitted but never reached the dependency.
    pub fn release_trial(&self) {
        let mut s = utils::lock_recover(self.state.lock());
        Self::give_back_trial(&mut s, self.rule.half_open_trials);
    }

    pub fn record_short_circuit(&self) {
        self.short_circuited.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let s = utils::lock_recover(self.state.lock()).clone();
        BreakerSnapshot {
            client_name: self.client_name.clone(),
            state: s.state,
            consecutive_failures: s.consecutive_failures,
            window_start_ms: s.window_start_ms,
            last_transition_ms: s.last_transition_ms,
            half_open_trials_remaining: s.half_open_trials_remaining,
            calls: self.calls.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            short_circuited: self.short_circuited.load(Ordering::SeqCst),
        }
    }

    fn take_trial(s: &mut BreakerState) -> bool {
        if s.half_open_trials_remaining > 0 {
            s.half_open_trials_remaining -= 1;
            true
        } else {
            false
        }
    }

    fn give_back_trial(s: &mut BreakerState, max_trials: u32) {
        if s.state == State::HalfOpen && s.half_open_trials_remaining < max_trials {
            s.half_open_trials_remaining += 1;
        }
    }

    fn transform(&self, s: &mut BreakerState, to: State, now: u64) -> Transition {
        let from = s.state;
        s.state = to;
        s.last_transition_ms = now;
        match to {
            State::Closed => {
                s.consecutive_failures = 0;
                s.window_start_ms = 0;
                s.half_open_trials_remaining = 0;
            }
            State::HalfOpen => {
                s.half_open_trials_remaining = self.rule.half_open_trials;
            }
            State::Open => {
                s.half_open_trials_remaining = 0;
            }
        }
        Transition {
            from,
            to,
            consecutive_failures: s.consecutive_failures,
        }
    }

    fn notify(&self, t: Transition) {
        logging::info!(
            "[CircuitBreaker] State changed, client: {}, {} -> {}, consecutive failures: {}",
            self.client_name,
            t.from,
            t.to,
            t.consecutive_failures
        );
        let listeners = utils::read_recover(self.listeners.read()).clone();
        for listener in &listeners {
            match t.to {
                State::Closed => listener.on_transform_to_closed(&self.client_name, t.from),
                State::HalfOpen => listener.on_transform_to_half_open(&self.client_name, t.from),
                State::Open => {
                    listener.on_transform_to_open(&self.client_name, t.from, t.consecutive_failures)
                }
            }
        }

        #[cfg(feature = "exporter")]
        crate::exporter::add_state_change_counter(&self.client_name, t.from.as_str(), t.to.as_str());
    }
}

#[cfg(test)]
pub(crate) use test::MockStateListener;

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::base::ErrorKind;
    use mockall::*;

    mock! {
        pub(crate) StateListener {}
        impl StateChangeListener for StateListener {
            fn on_transform_to_closed(&self, client_name: &str, prev: State);
            fn on_transform_to_open(&self, client_name: &str, prev: State, consecutive_failures: u32);
            fn on_transform_to_half_open(&self, client_name: &str, prev: State);
        }
    }

    fn unavailable() -> CallOutcome {
        CallOutcome::failure(10, ErrorKind::ServiceUnavailable, "503")
    }

    fn rule() -> BreakerRule {
        BreakerRule {
            failure_threshold: 5,
            window_ms: 60_000,
            open_duration_ms: 30_000,
            half_open_trials: 1,
        }
    }

    fn open_breaker(breaker: &CircuitBreaker, start: u64) {
        for i in 0..5 {
            assert!(breaker.try_pass_at(start + i));
            breaker.on_request_complete_at(&unavailable(), start + i);
        }
        assert_eq!(breaker.current_state(), State::Open);
    }

    #[test]
    fn threshold_failures_open() {
        let breaker = CircuitBreaker::new("mes", rule());
        for i in 0..4 {
            breaker.on_request_complete_at(&unavailable(), 1_000 + i);
        }
        assert_eq!(breaker.current_state(), State::Closed);
        assert_eq!(breaker.consecutive_failures(), 4);
        breaker.on_request_complete_at(&unavailable(), 1_005);
        assert_eq!(breaker.current_state(), State::Open);
        // within the cooldown the call is short-circuited
        assert!(!breaker.try_pass_at(1_006));
        assert!(!breaker.try_pass_at(1_005 + 29_999));
    }

    #[test]
    fn window_restarts_after_expiry() {
        let breaker = CircuitBreaker::new("mes", rule());
        for i in 0..4 {
            breaker.on_request_complete_at(&unavailable(), i);
        }
        breaker.on_request_complete_at(&unavailable(), 70_000);
        assert_eq!(breaker.current_state(), State::Closed);
        assert_eq!(breaker.consecutive_failures(), 1);
        assert_eq!(breaker.snapshot().window_start_ms, 70_000);
    }

    #[test]
    fn success_resets_failures() {
        let breaker = CircuitBreaker::new("lims", rule());
        for i in 0..4 {
            breaker.on_request_complete_at(&unavailable(), i);
        }
        breaker.on_request_complete_at(&CallOutcome::success(5), 5);
        assert_eq!(breaker.consecutive_failures(), 0);
        for i in 0..4 {
            breaker.on_request_complete_at(&unavailable(), 10 + i);
        }
        assert_eq!(breaker.current_state(), State::Closed);
    }

    #[test]
    fn trial_success_closes() {
        let breaker = CircuitBreaker::new("erp", rule());
        open_breaker(&breaker, 0);
        let retry_at = 4 + 30_000;
        assert!(breaker.try_pass_at(retry_at));
        assert_eq!(breaker.current_state(), State::HalfOpen);
        // only one trial at a time
        assert!(!breaker.try_pass_at(retry_at + 1));
        breaker.on_request_complete_at(&CallOutcome::success(20), retry_at + 20);
        assert_eq!(breaker.current_state(), State::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
        assert!(breaker.try_pass_at(retry_at + 21));
    }

    #[test]
    fn trial_failure_reopens_and_restarts_cooldown() {
        let breaker = CircuitBreaker::new("erp", rule());
        open_breaker(&breaker, 0);
        let retry_at = 4 + 30_000;
        assert!(breaker.try_pass_at(retry_at));
        breaker.on_request_complete_at(&unavailable(), retry_at + 100);
        assert_eq!(breaker.current_state(), State::Open);
        assert_eq!(breaker.snapshot().last_transition_ms, retry_at + 100);
        assert!(!breaker.try_pass_at(retry_at + 30_000));
        assert!(breaker.try_pass_at(retry_at + 100 + 30_000));
    }

    #[test]
    fn caller_faults_are_neutral() {
        let breaker = CircuitBreaker::new("training", rule());
        for i in 0..20 {
            breaker.on_request_complete_at(
                &CallOutcome::failure(5, ErrorKind::BadRequest, "invalid"),
                i,
            );
        }
        assert_eq!(breaker.current_state(), State::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
        assert_eq!(breaker.snapshot().failures, 0);
        assert_eq!(breaker.snapshot().calls, 20);

        open_breaker(&breaker, 100);
        assert!(breaker.try_pass_at(100 + 4 + 30_000));
        breaker.on_request_complete_at(
            &CallOutcome::failure(5, ErrorKind::ResourceNotFound, "404"),
            100 + 4 + 30_001,
        );
        // still probing, and the trial slot is available again
        assert_eq!(breaker.current_state(), State::HalfOpen);
        assert!(breaker.try_pass_at(100 + 4 + 30_002));
    }

    #[test]
    fn released_trial_can_be_retaken() {
        let breaker = CircuitBreaker::new("equipment", rule());
        open_breaker(&breaker, 0);
        assert!(breaker.try_pass_at(30_004));
        assert!(!breaker.try_pass_at(30_005));
        breaker.release_trial();
        assert!(breaker.try_pass_at(30_006));
    }

    #[test]
    fn listeners_notified() {
        let mut listener = MockStateListener::new();
        listener
            .expect_on_transform_to_open()
            .withf(|name: &str, prev: &State, failures: &u32| {
                name == "edms" && *prev == State::Closed && *failures == 5
            })
            .times(1)
            .return_const(());
        listener
            .expect_on_transform_to_half_open()
            .withf(|name: &str, prev: &State| name == "edms" && *prev == State::Open)
            .times(1)
            .return_const(());
        listener
            .expect_on_transform_to_closed()
            .withf(|name: &str, prev: &State| name == "edms" && *prev == State::HalfOpen)
            .times(1)
            .return_const(());
        let listeners: StateChangeListeners = Arc::new(RwLock::new(vec![Arc::new(listener)]));
        let breaker = CircuitBreaker::new_with_listeners("edms", rule(), listeners);
        open_breaker(&breaker, 0);
        assert!(breaker.try_pass_at(30_004));
        breaker.on_request_complete_at(&CallOutcome::success(1), 30_005);
    }
}
