//! Call correlation tables
//!
//! When the script answers through a host function instead of a direct return
//! value, the session parks the caller's callback here until the answer
//! arrives. Each entry resolves at most once: resolution removes the entry
//! under the lock and runs the callback after the lock is released, so a
//! callback may safely start another operation on the same session.

use crate::outcome::Outcome;
use crate::utils::logging::LoggingHelper;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Single-shot callback receiving the outcome of an asynchronous operation
///
/// Callbacks may run on any thread, including the runtime thread.
pub type Callback<T> = Box<dyn FnOnce(Outcome<T>) + Send + 'static>;

/// Opaque token linking an outbound request to its inbound result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationToken(Uuid);

impl CorrelationToken {
    /// Generate a fresh random (v4) token
    #[must_use]
    pub fn issue() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a token echoed back by the script
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text.trim()).ok().map(Self)
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Pending callbacks for one operation kind, keyed by token or username
pub struct CorrelationTable<K, T> {
    name: &'static str,
    entries: Mutex<HashMap<K, Callback<T>>>,
}

impl<K, T> CorrelationTable<K, T>
where
    K: Eq + Hash + fmt::Display,
{
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Callback<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Park `callback` under `key`
    ///
    /// Returns `true` if an earlier callback for the same key was replaced;
    /// that callback is dropped without being invoked.
    pub fn register(&self, key: K, callback: Callback<T>) -> bool {
        let label = key.to_string();
        let replaced = self.lock().insert(key, callback).is_some();
        if replaced {
            LoggingHelper::log_callback_replaced(self.name, &label);
        }
        replaced
    }

    /// Deliver `outcome` to the callback under `key` and drop the entry
    ///
    /// A missing key is a silent no-op: the operation already completed.
    /// Returns whether a callback ran.
    pub fn resolve(&self, key: &K, outcome: Outcome<T>) -> bool {
        let callback = self.lock().remove(key);
        match callback {
            Some(callback) => {
                callback(outcome);
                true
            }
            None => {
                LoggingHelper::log_stale_resolution(self.name, &key.to_string());
                false
            }
        }
    }

    /// Drop the entry under `key` without invoking it
    pub fn discard(&self, key: &K) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Resolve every waiting callback with a failure and empty the table
    ///
    /// Returns how many callbacks ran.
    pub fn fail_all(&self, message: &str) -> usize {
        let drained: Vec<Callback<T>> = self.lock().drain().map(|(_, callback)| callback).collect();
        let count = drained.len();
        for callback in drained {
            callback(Outcome::failure(message));
        }
        count
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Single pending callback for operations the script answers without a token
///
/// Only the most recent registration is honoured.
pub struct PendingSlot<T> {
    name: &'static str,
    slot: Mutex<Option<Callback<T>>>,
}

impl<T> PendingSlot<T> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Callback<T>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `callback`, dropping any callback still waiting
    pub fn register(&self, callback: Callback<T>) -> bool {
        let replaced = self.lock().replace(callback).is_some();
        if replaced {
            LoggingHelper::log_callback_replaced(self.name, "pending");
        }
        replaced
    }

    /// Deliver `outcome` to the waiting callback, if any
    pub fn resolve(&self, outcome: Outcome<T>) -> bool {
        let callback = self.lock().take();
        match callback {
            Some(callback) => {
                callback(outcome);
                true
            }
            None => {
                LoggingHelper::log_stale_resolution(self.name, "pending");
                false
            }
        }
    }

    /// Drop the waiting callback without invoking it
    pub fn discard(&self) -> bool {
        self.lock().take().is_some()
    }

    /// Resolve the waiting callback, if any, with a failure
    pub fn fail(&self, message: &str) -> bool {
        let Some(callback) = self.lock().take() else {
            return false;
        };
        callback(Outcome::failure(message));
        true
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }
}
