use crate::domain::model::Action;
use crate::domain::ports::{Dispatch, EventEmitter};
use std::sync::{Arc, Mutex};

/// Keeps every dispatched action in order. Cloning shares the same log.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    actions: Arc<Mutex<Vec<Action>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<Action> {
        match self.actions.lock() {
            Ok(actions) => actions.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn take(&self) -> Vec<Action> {
        match self.actions.lock() {
            Ok(mut actions) => std::mem::take(&mut *actions),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Dispatch for ActionLog {
    fn dispatch(&self, action: Action) {
        tracing::debug!("dispatch {:?}", action_type(&action));
        match self.actions.lock() {
            Ok(mut actions) => actions.push(action),
            Err(poisoned) => poisoned.into_inner().push(action),
        }
    }
}

fn action_type(action: &Action) -> String {
    serde_json::to_value(action)
        .ok()
        .and_then(|value| value.get("type").and_then(|t| t.as_str()).map(str::to_string))
        .unwrap_or_default()
}

/// Records emitted events, for callers without a map to notify.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, serde_json::Value)> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventEmitter for EventLog {
    fn emit(&self, event: &str, payload: serde_json::Value) {
        tracing::debug!("emit {}", event);
        match self.events.lock() {
            Ok(mut events) => events.push((event.to_string(), payload)),
            Err(poisoned) => poisoned.into_inner().push((event.to_string(), payload)),
        }
    }
}
