use super::*;
use crate::{logging, utils, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// `BreakerRegistry` owns one `CircuitBreaker` per client.
/// Unlike a process-wide map it is constructed by the hub and passed around by handle.
pub struct BreakerRegistry {
    default_rule: BreakerRule,
    overrides: HashMap<String, BreakerRule>,
    breakers: RwLock<BTreeMap<String, Arc<CircuitBreaker>>>,
    listeners: StateChangeListeners,
}

impl BreakerRegistry {
    pub fn new(default_rule: BreakerRule) -> Self {
        BreakerRegistry {
            default_rule,
            overrides: HashMap::new(),
            breakers: RwLock::new(BTreeMap::new()),
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Rules in `overrides` replace the default rule for the named clients.
    pub fn new_with_overrides(
        default_rule: BreakerRule,
        overrides: HashMap<String, BreakerRule>,
    ) -> Result<Self> {
        default_rule.is_valid()?;
        for (client, rule) in &overrides {
            if let Err(err) = rule.is_valid() {
                return Err(err.context(format!("invalid breaker rule for {}", client)));
            }
        }
        Ok(BreakerRegistry {
            overrides,
            ..Self::new(default_rule)
        })
    }

    pub fn rule_of(&self, client_name: &str) -> &BreakerRule {
        self.overrides
            .get(client_name)
            .unwrap_or(&self.default_rule)
    }

    pub fn get_or_create(&self, client_name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.get(client_name) {
            return breaker;
        }
        let mut breakers = utils::write_recover(self.breakers.write());
        Arc::clone(breakers.entry(client_name.to_owned()).or_insert_with(|| {
            let rule = self.rule_of(client_name).clone();
            logging::debug!(
                "[CircuitBreaker] Breaker created, client: {}, rule: {}",
                client_name,
                rule
            );
            Arc::new(CircuitBreaker::new_with_listeners(
                client_name,
                rule,
                Arc::clone(&self.listeners),
            ))
        }))
    }

    pub fn get(&self, client_name: &str) -> Option<Arc<CircuitBreaker>> {
        utils::read_recover(self.breakers.read())
            .get(client_name)
            .cloned()
    }

    /// Snapshots of every breaker ordered by client name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let breakers: Vec<Arc<CircuitBreaker>> = utils::read_recover(self.breakers.read())
            .values()
            .cloned()
            .collect();
        breakers.iter().map(|b| b.snapshot()).collect()
    }

    /// Listeners apply to breakers created before and after the registration.
    pub fn register_state_change_listeners(&self, listeners: Vec<Arc<dyn StateChangeListener>>) {
        utils::write_recover(self.listeners.write()).extend(listeners);
    }

    pub fn clear_state_change_listeners(&self) {
        utils::write_recover(self.listeners.write()).clear();
    }
}
