//! In-process publish/subscribe.
//!
//! Delivery is synchronous and at-most-once: a message reaches the callbacks registered
//! for its topic at the moment of publishing. A failing or panicking callback does not
//! stop delivery to its siblings, and the failure is kept as an error event.

use crate::{logging, utils, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

pub const DEFAULT_SOURCE_SYSTEM: &str = "mcp-hub";
pub const ROUTING_KEY_PREFIX: &str = "gmp.mcp.";
/// published on every breaker transition
pub const CIRCUIT_STATE_TOPIC: &str = "gmp.mcp.events.circuit-state";
/// published for every failed dependency call
pub const CALL_FAILED_TOPIC: &str = "gmp.mcp.events.call-failed";
const DELIVERY_FAILURE_CAPACITY: usize = 100;

/// Routing key of messages addressed to one subsystem, e.g. `gmp.mcp.to.mes`.
pub fn routing_key(system: &str) -> String {
    format!("{}to.{}", ROUTING_KEY_PREFIX, system)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub message_id: String,
    pub topic: String,
    pub source_system: String,
    pub payload: serde_json::Value,
    pub published_at_ms: u64,
}

pub type MessageListener = dyn Fn(&QueueMessage) -> Result<()> + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    topic: String,
    id: u64,
}

impl SubscriptionHandle {
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Outcome of one publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub message_id: String,
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub message_id: String,
    pub topic: String,
    pub subscription_id: u64,
    pub error: String,
    pub failed_at_ms: u64,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub published: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// Counters, live subscriptions per topic and the latest delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    #[serde(flatten)]
    pub stats: QueueStats,
    pub topics: BTreeMap<String, usize>,
    pub recent_failures: Vec<DeliveryFailure>,
}

type Subscribers = HashMap<String, Vec<(u64, Arc<MessageListener>)>>;

pub struct MessageQueueService {
    subscribers: RwLock<Subscribers>,
    next_id: AtomicU64,
    published: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    failures: Mutex<VecDeque<DeliveryFailure>>,
}

impl Default for MessageQueueService {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageQueueService {
    pub fn new() -> Self {
        MessageQueueService {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    pub fn subscribe<F>(&self, topic: &str, callback: F) -> SubscriptionHandle
    where
        F: Fn(&QueueMessage) -> Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let listener: Arc<MessageListener> = Arc::new(callback);
        utils::write_recover(self.subscribers.write())
            .entry(topic.to_owned())
            .or_insert_with(Vec::new)
            .push((id, listener));
        logging::debug!("[MessageQueue] Subscribed, topic: {}, id: {}", topic, id);
        SubscriptionHandle {
            topic: topic.to_owned(),
            id,
        }
    }

    /// Returns false if the handle was already removed.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let mut subscribers = utils::write_recover(self.subscribers.write());
        let removed = match subscribers.get_mut(&handle.topic) {
            Some(list) => {
                let before = list.len();
                list.retain(|(id, _)| *id != handle.id);
                before != list.len()
            }
            None => false,
        };
        if subscribers
            .get(&handle.topic)
            .map(|l| l.is_empty())
            .unwrap_or(false)
        {
            subscribers.remove(&handle.topic);
        }
        removed
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        utils::read_recover(self.subscribers.read())
            .get(topic)
            .map(|l| l.len())
            .unwrap_or(0)
    }

    #[inline]
    pub fn publish(&self, topic: &str, payload: serde_json::Value) -> DeliveryReport {
        self.publish_from(DEFAULT_SOURCE_SYSTEM, topic, payload)
    }

    /// Publishing to a topic without subscribers is a no-op.
    pub fn publish_from(
        &self,
        source_system: &str,
        topic: &str,
        payload: serde_json::Value,
    ) -> DeliveryReport {
        let message = QueueMessage {
            message_id: Uuid::new_v4().to_string(),
            topic: topic.to_owned(),
            source_system: source_system.to_owned(),
            payload,
            published_at_ms: utils::curr_time_millis(),
        };
        self.published.fetch_add(1, Ordering::SeqCst);
        // listeners are called without the lock, so they may subscribe or publish themselves
        let listeners: Vec<(u64, Arc<MessageListener>)> =
            utils::read_recover(self.subscribers.read())
                .get(topic)
                .cloned()
                .unwrap_or_default();

        let mut report = DeliveryReport {
            message_id: message.message_id.clone(),
            delivered: 0,
            failed: 0,
        };
        for (id, listener) in listeners {
            let res = match panic::catch_unwind(AssertUnwindSafe(|| listener(&message))) {
                Ok(res) => res,
                Err(_) => Err(Error::msg("subscriber panicked")),
            };
            match res {
                Ok(()) => {
                    report.delivered += 1;
                    self.delivered.fetch_add(1, Ordering::SeqCst);
                }
                Err(err) => {
                    report.failed += 1;
                    self.record_failure(&message, id, err);
                }
            }
        }
        report
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            published: self.published.load(Ordering::SeqCst),
            delivered: self.delivered.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }

    /// Subscriber count of every topic that has one.
    pub fn topics(&self) -> BTreeMap<String, usize> {
        utils::read_recover(self.subscribers.read())
            .iter()
            .map(|(topic, list)| (topic.clone(), list.len()))
            .collect()
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            stats: self.stats(),
            topics: self.topics(),
            recent_failures: self.recent_failures(),
        }
    }

    /// Zero the counters and forget past failures. Subscriptions stay.
    pub fn reset_stats(&self) {
        let mut failures = utils::lock_recover(self.failures.lock());
        failures.clear();
        self.published.store(0, Ordering::SeqCst);
        self.delivered.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
    }

    /// Most recent delivery failures, newest first.
    pub fn recent_failures(&self) -> Vec<DeliveryFailure> {
        utils::lock_recover(self.failures.lock())
            .iter()
            .rev()
            .cloned()
            .collect()
    }

    fn record_failure(&self, message: &QueueMessage, subscription_id: u64, err: Error) {
        logging::error!(
            "[MessageQueue] Subscriber failed, topic: {}, subscription: {}, message: {}, error: {:?}",
            message.topic,
            subscription_id,
            message.message_id,
            err
        );
        self.failed.fetch_add(1, Ordering::SeqCst);
        let mut failures = utils::lock_recover(self.failures.lock());
        if failures.len() >= DELIVERY_FAILURE_CAPACITY {
            failures.pop_front();
        }
        failures.push_back(DeliveryFailure {
            message_id: message.message_id.clone(),
            topic: message.topic.clone(),
            subscription_id,
            error: err.to_string(),
            failed_at_ms: utils::curr_time_millis(),
        });
    }
}
