//! Live configuration store
//!
//! Holds the most recently applied JSON configuration behind one lock.
//! Updates go through a single entry point that deep-merges the incoming
//! document and notifies registered listeners; there is no process-wide
//! static, hosts receive a handle to the store they care about.

use std::sync::Mutex;

use serde_json::Value;

type Listener = Box<dyn Fn(&Value) + Send + Sync>;

/// Owned holder for the currently active configuration
pub struct ConfigStore {
    current: Mutex<Option<Value>>,
    listeners: Mutex<Vec<Listener>>,
}

impl ConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// The active configuration, if one has been applied
    pub fn current(&self) -> Option<Value> {
        self.lock_current().clone()
    }

    /// Register a listener invoked after every successful replace
    pub fn subscribe(&self, listener: impl Fn(&Value) + Send + Sync + 'static) {
        self.lock_listeners().push(Box::new(listener));
    }

    /// Merge a new document over the active configuration and notify
    /// listeners with the merged result.
    pub fn replace(&self, incoming: Value) {
        let merged = {
            let mut current = self.lock_current();
            match current.take() {
                Some(mut base) => {
                    merge(&mut base, incoming);
                    *current = Some(base);
                }
                None => *current = Some(incoming),
            }
            current.clone()
        };

        if let Some(value) = merged {
            tracing::debug!("Configuration applied");
            for listener in self.lock_listeners().iter() {
                listener(&value);
            }
        }
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<Value>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<Listener>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep-merge `incoming` into `base`: objects merge key-wise, everything
/// else replaces.
fn merge(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (key, value) in incoming_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base_slot, incoming) => *base_slot = incoming,
    }
}
