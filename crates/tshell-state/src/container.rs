#![forbid(unsafe_code)]

//! Layered application state.
//!
//! [`ApplicationStateContainer`] keeps three trees:
//!
//! - `initial`: the baseline, supplied at construction and raised only by
//!   `reload(_, true)`;
//! - `additional`: everything accumulated through [`update`], never cleared;
//! - `effective`: the tree consumers read, rebuilt from the other two.
//!
//! # Invariants
//!
//! 1. `additional` wins over `initial` on every conflicting leaf.
//! 2. `update` never removes keys from `effective`.
//! 3. Only `reload` shrinks `effective`, and only down to the shape of
//!    `initial` plus `additional` (plus the overlay of a non-init reload).
//! 4. `effective` is only mutated through `update` / `reload`.
//!
//! [`update`]: ApplicationStateContainer::update

use serde_json::Value;

use crate::error::{Result, StateError};
use crate::merge::{StateTree, merge};

/// Version reported when the initial state carries none.
pub const DEFAULT_VERSION: &str = "1.0.0";
/// Initial-state field holding the semantic version.
pub const VERSION_FIELD: &str = "buildVersion";
/// Initial-state field holding the build identifier.
pub const BUILD_FIELD: &str = "buildId";

/// Merge-based state container with `update` / `reload` semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationStateContainer {
    initial: StateTree,
    additional: StateTree,
    effective: StateTree,
    version: String,
    build: Option<String>,
    revision: u64,
}

impl Default for ApplicationStateContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationStateContainer {
    /// An empty container at version [`DEFAULT_VERSION`].
    #[must_use]
    pub fn new() -> Self {
        Self::from_tree(StateTree::new())
    }

    /// Build a container from an initial JSON value, which must be an object.
    pub fn with_initial(initial: Value) -> Result<Self> {
        match initial {
            Value::Object(tree) => Ok(Self::from_tree(tree)),
            other => Err(StateError::invalid(&other)),
        }
    }

    /// Build a container from an initial tree. Recognized metadata fields are
    /// read but left in the tree.
    #[must_use]
    pub fn from_tree(initial: StateTree) -> Self {
        let version = initial
            .get(VERSION_FIELD)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_VERSION)
            .to_string();
        let build = initial.get(BUILD_FIELD).and_then(|value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        Self {
            effective: initial.clone(),
            initial,
            additional: StateTree::new(),
            version,
            build,
            revision: 0,
        }
    }

    /// Accumulate `state` into `additional` and apply it to `effective`.
    ///
    /// Repeated updates are additive: no key is ever removed.
    pub fn update(&mut self, state: &Value) -> Result<()> {
        let state = as_tree(state)?;
        merge(&mut self.additional, state, false);
        merge(&mut self.effective, &self.additional, false);
        self.revision += 1;
        tracing::debug!(
            message = "state.update",
            keys = state.len(),
            revision = self.revision
        );
        Ok(())
    }

    /// Rebuild `effective` from the baseline.
    ///
    /// With `init`, `state` is merged into `initial` permanently. Without it,
    /// `state` is overlaid on the rebuilt tree only. Either way `effective`
    /// first takes exactly the shape of `initial`, and `additional` is
    /// reapplied last.
    pub fn reload(&mut self, state: &Value, init: bool) -> Result<()> {
        let state = as_tree(state)?;
        if init {
            merge(&mut self.initial, state, false);
        }
        merge(&mut self.effective, &self.initial, true);
        if !init {
            merge(&mut self.effective, state, false);
        }
        merge(&mut self.effective, &self.additional, false);
        self.revision += 1;
        tracing::debug!(
            message = "state.reload",
            init,
            keys = state.len(),
            effective_keys = self.effective.len(),
            revision = self.revision
        );
        Ok(())
    }

    /// The tree consumers read.
    #[must_use]
    pub fn effective(&self) -> &StateTree {
        &self.effective
    }

    #[must_use]
    pub fn initial(&self) -> &StateTree {
        &self.initial
    }

    #[must_use]
    pub fn additional(&self) -> &StateTree {
        &self.additional
    }

    /// Read a value from `effective` by dotted path (`"user.profile.name"`).
    /// Numeric segments index into arrays.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.effective.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Semantic version read from the initial state.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Build identifier read from the initial state.
    #[must_use]
    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    /// Count of successful `update` and `reload` calls.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

fn as_tree(value: &Value) -> Result<&StateTree> {
    value.as_object().ok_or_else(|| StateError::invalid(value))
}
