#![forbid(unsafe_code)]

//! Named command ("trigger") registry.
//!
//! Triggers are named handlers taking a JSON payload and returning a JSON
//! result. A trigger registered in [`TriggerMode::Singleton`] admits at most
//! one in-flight invocation: a re-entrant dispatch while the handler is still
//! running fails with [`TriggerError::Busy`] instead of nesting.
//!
//! # Invariants
//!
//! - Names are unique; registering a taken name fails with
//!   [`TriggerError::Duplicate`].
//! - The in-flight count is restored even if a handler panics.
//! - Handler errors propagate unchanged to the dispatcher.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;

/// Result of a trigger invocation.
pub type TriggerResult = Result<Value, TriggerError>;

/// Errors surfaced by [`TriggerRegistry`].
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("unknown trigger: {name}")]
    Unknown { name: String },

    #[error("trigger already registered: {name}")]
    Duplicate { name: String },

    #[error("trigger {name} is already running")]
    Busy { name: String },

    #[error("invalid payload for {name}: {message}")]
    InvalidPayload { name: String, message: String },

    #[error("trigger {name} failed: {source}")]
    Failed {
        name: String,
        #[source]
        source: Box<dyn StdError + 'static>,
    },
}

impl TriggerError {
    #[must_use]
    pub fn invalid_payload(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            name: name.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn failed(name: impl Into<String>, source: impl StdError + 'static) -> Self {
        Self::Failed {
            name: name.into(),
            source: Box::new(source),
        }
    }
}

/// Concurrency limit for a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerMode {
    /// Re-entrant dispatch is allowed.
    #[default]
    Concurrent,
    /// At most one in-flight invocation.
    Singleton,
}

type Handler = dyn Fn(Value) -> TriggerResult;

struct TriggerEntry {
    mode: TriggerMode,
    in_flight: Cell<usize>,
    handler: Box<Handler>,
}

/// Decrements the in-flight count on every exit path.
struct InFlight<'a>(&'a Cell<usize>);

impl<'a> InFlight<'a> {
    fn enter(count: &'a Cell<usize>) -> Self {
        count.set(count.get() + 1);
        Self(count)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Registry of named triggers.
#[derive(Default)]
pub struct TriggerRegistry {
    entries: RefCell<HashMap<String, Rc<TriggerEntry>>>,
}

impl fmt::Debug for TriggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.entries.borrow().keys().cloned().collect();
        names.sort();
        f.debug_struct("TriggerRegistry")
            .field("triggers", &names)
            .finish()
    }
}

impl TriggerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`.
    pub fn register(
        &self,
        name: impl Into<String>,
        mode: TriggerMode,
        handler: impl Fn(Value) -> TriggerResult + 'static,
    ) -> Result<(), TriggerError> {
        let name = name.into();
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(&name) {
            return Err(TriggerError::Duplicate { name });
        }
        tracing::debug!(message = "trigger.register", name = %name, ?mode);
        entries.insert(
            name,
            Rc::new(TriggerEntry {
                mode,
                in_flight: Cell::new(0),
                handler: Box::new(handler),
            }),
        );
        Ok(())
    }

    /// Remove a trigger. Returns whether it existed.
    pub fn unregister(&self, name: &str) -> bool {
        self.entries.borrow_mut().remove(name).is_some()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    /// Sorted names of all registered triggers.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether `name` currently has an invocation in flight.
    #[must_use]
    pub fn is_running(&self, name: &str) -> bool {
        self.entries
            .borrow()
            .get(name)
            .is_some_and(|entry| entry.in_flight.get() > 0)
    }

    /// Invoke `name` with `payload`.
    pub fn dispatch(&self, name: &str, payload: Value) -> TriggerResult {
        let entry = self
            .entries
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| TriggerError::Unknown {
                name: name.to_string(),
            })?;

        if entry.mode == TriggerMode::Singleton && entry.in_flight.get() > 0 {
            tracing::warn!(message = "trigger.busy", name);
            return Err(TriggerError::Busy {
                name: name.to_string(),
            });
        }

        let _guard = InFlight::enter(&entry.in_flight);
        tracing::debug!(message = "trigger.dispatch", name);
        let result = (entry.handler)(payload);
        if let Err(err) = &result {
            tracing::debug!(message = "trigger.error", name, error = %err);
        }
        result
    }
}
