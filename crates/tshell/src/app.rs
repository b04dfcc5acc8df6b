#![forbid(unsafe_code)]

//! Application wiring.
//!
//! An [`App`] owns one instance of every shared container: the layered state,
//! the language store, the trigger registry, and the root mount gate. UI
//! units receive handles from it rather than reaching for globals.
//!
//! The state triggers `app.update` and `app.reload` are registered when the
//! root unit first mounts, so nothing can mutate state before first paint.
//!
//! # Trigger payloads
//!
//! - `app.update`: the state object to merge.
//! - `app.reload`: `{ "state": { .. }, "init": bool }`; `init` defaults to
//!   `false`.
//!
//! Both return `{ "revision": n }` on success.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::{Value, json};
use tshell_i18n::{LanguageStore, TranslationTracker};
use tshell_runtime::{
    MountGate, MountSubscription, MountTeardown, Observable, Subscription, TriggerError,
    TriggerMode, TriggerRegistry, TriggerResult,
};
use tshell_state::ApplicationStateContainer;

use crate::config::AppConfig;
use crate::error::Result;

/// Name of the trigger that merges into `additional`.
pub const UPDATE_TRIGGER: &str = "app.update";
/// Name of the trigger that rebuilds `effective`.
pub const RELOAD_TRIGGER: &str = "app.reload";

type SharedState = Rc<RefCell<ApplicationStateContainer>>;

/// One application instance.
pub struct App {
    state: SharedState,
    revision: Observable<u64>,
    store: Rc<LanguageStore>,
    triggers: Rc<TriggerRegistry>,
    mount: MountGate,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("revision", &self.revision.get_untracked())
            .field("store", &self.store)
            .field("triggers", &self.triggers)
            .field("mount", &self.mount)
            .finish()
    }
}

impl App {
    /// Build an application from `config`.
    pub fn new(config: AppConfig) -> Result<Self> {
        let container = ApplicationStateContainer::with_initial(config.initial_state.clone())?;
        let store = Rc::new(LanguageStore::new(config.language.clone()));
        for (language, lexicon) in config.parsed_lexicons()? {
            store.insert_lexicon(language, lexicon);
        }

        let app = Self {
            state: Rc::new(RefCell::new(container)),
            revision: Observable::new(0),
            store,
            triggers: Rc::new(TriggerRegistry::new()),
            mount: MountGate::new(),
        };

        let triggers = Rc::clone(&app.triggers);
        let state = Rc::clone(&app.state);
        let revision = app.revision.clone();
        let _deferred = app.mount.subscribe(move || {
            if let Err(err) = register_state_triggers(&triggers, &state, &revision) {
                tracing::warn!(message = "app.triggers", error = %err);
            }
        });

        tracing::info!(
            message = "app.new",
            language = %config.language,
            version = app.state.borrow().version()
        );
        Ok(app)
    }

    /// Mark the root unit mounted. Registers the state triggers on the first
    /// mount.
    pub fn mount(&self) -> MountTeardown {
        self.mount.on_mount()
    }

    /// Defer `callback` until the root unit mounts. Inert once mounted.
    pub fn on_mounted(&self, callback: impl FnOnce() + 'static) -> MountSubscription {
        self.mount.subscribe(callback)
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mount.is_mounted()
    }

    /// Dispatch a named trigger.
    pub fn dispatch(&self, name: &str, payload: Value) -> TriggerResult {
        self.triggers.dispatch(name, payload)
    }

    /// Dispatch `app.update`. An invalid payload yields
    /// [`AppError::State`](crate::AppError::State).
    pub fn update(&self, state: Value) -> Result<()> {
        self.dispatch(UPDATE_TRIGGER, state)?;
        Ok(())
    }

    /// Dispatch `app.reload`. An invalid payload yields
    /// [`AppError::State`](crate::AppError::State).
    pub fn reload(&self, state: Value, init: bool) -> Result<()> {
        self.dispatch(RELOAD_TRIGGER, json!({ "state": state, "init": init }))?;
        Ok(())
    }

    /// Read access to the state container.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a state trigger handler.
    #[must_use]
    pub fn state(&self) -> Ref<'_, ApplicationStateContainer> {
        self.state.borrow()
    }

    /// Number of successful state mutations (tracked read).
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    /// Call `callback` with the new revision after each state mutation.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn on_state_change(&self, callback: impl Fn(u64) + 'static) -> Subscription {
        self.revision.subscribe(move |revision| callback(*revision))
    }

    #[must_use]
    pub fn language_store(&self) -> Rc<LanguageStore> {
        Rc::clone(&self.store)
    }

    pub fn set_language(&self, language: &str) {
        self.store.set_language(language);
    }

    /// A translation tracker for one UI unit.
    #[must_use]
    pub fn tracker(&self, namespace: Option<&str>) -> TranslationTracker {
        let store = Rc::clone(&self.store);
        match namespace {
            Some(namespace) => TranslationTracker::with_namespace(store, namespace),
            None => TranslationTracker::new(store),
        }
    }

    #[must_use]
    pub fn triggers(&self) -> &TriggerRegistry {
        &self.triggers
    }

    /// Explicit teardown: unregister the state triggers. Idempotent.
    pub fn shutdown(&self) {
        self.triggers.unregister(UPDATE_TRIGGER);
        self.triggers.unregister(RELOAD_TRIGGER);
        tracing::info!(message = "app.shutdown", revision = self.revision.get_untracked());
    }
}

fn register_state_triggers(
    registry: &TriggerRegistry,
    state: &SharedState,
    revision: &Observable<u64>,
) -> std::result::Result<(), TriggerError> {
    let update_state = Rc::clone(state);
    let update_revision = revision.clone();
    registry.register(UPDATE_TRIGGER, TriggerMode::Singleton, move |payload| {
        let current = {
            let mut container = update_state.borrow_mut();
            container
                .update(&payload)
                .map_err(|err| TriggerError::failed(UPDATE_TRIGGER, err))?;
            container.revision()
        };
        update_revision.set(current);
        Ok(json!({ "revision": current }))
    })?;

    let reload_state = Rc::clone(state);
    let reload_revision = revision.clone();
    registry.register(RELOAD_TRIGGER, TriggerMode::Singleton, move |payload| {
        let (next, init) = parse_reload(payload)?;
        let current = {
            let mut container = reload_state.borrow_mut();
            container
                .reload(&next, init)
                .map_err(|err| TriggerError::failed(RELOAD_TRIGGER, err))?;
            container.revision()
        };
        reload_revision.set(current);
        Ok(json!({ "revision": current }))
    })?;
    Ok(())
}

fn parse_reload(payload: Value) -> std::result::Result<(Value, bool), TriggerError> {
    let Value::Object(mut fields) = payload else {
        return Err(TriggerError::invalid_payload(
            RELOAD_TRIGGER,
            "expected an object with a `state` field",
        ));
    };
    let state = fields
        .remove("state")
        .ok_or_else(|| TriggerError::invalid_payload(RELOAD_TRIGGER, "missing `state`"))?;
    let init = match fields.remove("init") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(init)) => init,
        Some(_) => {
            return Err(TriggerError::invalid_payload(
                RELOAD_TRIGGER,
                "`init` must be a boolean",
            ));
        }
    };
    Ok((state, init))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tshell_state::StateError;

    fn mounted_app() -> (App, MountTeardown) {
        let app = App::new(AppConfig::default()).unwrap();
        let teardown = app.mount();
        (app, teardown)
    }

    #[test]
    fn triggers_wait_for_mount() {
        let app = App::new(AppConfig::default()).unwrap();
        assert!(!app.triggers().contains(UPDATE_TRIGGER));
        let err = app.update(json!({"a": 1})).unwrap_err();
        assert!(matches!(
            err,
            crate::AppError::Trigger(TriggerError::Unknown { .. })
        ));

        let _teardown = app.mount();
        assert!(app.triggers().contains(UPDATE_TRIGGER));
        assert!(app.triggers().contains(RELOAD_TRIGGER));
        app.update(json!({"a": 1})).unwrap();
    }

    #[test]
    fn remount_does_not_reregister() {
        let app = App::new(AppConfig::default()).unwrap();
        app.mount().teardown();
        let _teardown = app.mount();
        assert_eq!(app.triggers().names(), vec![RELOAD_TRIGGER, UPDATE_TRIGGER]);
    }

    #[test]
    fn update_and_reload_through_triggers() {
        let (app, _teardown) = mounted_app();
        app.reload(json!({"a": 1, "b": 2}), true).unwrap();
        app.update(json!({"c": 3})).unwrap();
        app.reload(json!({"a": 9}), false).unwrap();
        assert_eq!(
            Value::Object(app.state().effective().clone()),
            json!({"a": 9, "b": 2, "c": 3})
        );
        assert_eq!(app.revision(), 3);
    }

    #[test]
    fn invalid_state_propagates_through_trigger() {
        let (app, _teardown) = mounted_app();
        let err = app.dispatch(UPDATE_TRIGGER, json!([1])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "trigger app.update failed: invalid state: expected a plain object, found array"
        );
        assert_eq!(app.revision(), 0);
    }

    #[test]
    fn state_helpers_return_typed_state_errors() {
        let (app, _teardown) = mounted_app();
        assert!(matches!(
            app.update(json!([1])),
            Err(crate::AppError::State(StateError::InvalidState { found: "array" }))
        ));
        assert!(matches!(
            app.reload(json!("x"), true),
            Err(crate::AppError::State(StateError::InvalidState { found: "string" }))
        ));
        app.reload(json!({}), false).unwrap();
    }

    #[test]
    fn reload_payload_is_validated() {
        let (app, _teardown) = mounted_app();
        for bad in [json!(1), json!({}), json!({"state": {}, "init": "yes"})] {
            assert!(matches!(
                app.dispatch(RELOAD_TRIGGER, bad),
                Err(TriggerError::InvalidPayload { .. })
            ));
        }
        let out = app.dispatch(RELOAD_TRIGGER, json!({"state": {"x": 1}})).unwrap();
        assert_eq!(out, json!({"revision": 1}));
    }

    #[test]
    fn state_change_subscribers_can_read_state() {
        let (app, _teardown) = mounted_app();
        let app = Rc::new(app);
        let seen = Rc::new(Cell::new(0usize));
        let seen_clone = Rc::clone(&seen);
        let weak = Rc::downgrade(&app);
        let _sub = app.on_state_change(move |_| {
            if let Some(app) = weak.upgrade() {
                seen_clone.set(app.state().effective().len());
            }
        });
        app.update(json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn shutdown_unregisters_triggers() {
        let (app, _teardown) = mounted_app();
        assert_eq!(app.triggers().names().len(), 2);
        app.shutdown();
        app.shutdown();
        assert!(app.triggers().names().is_empty());
        assert!(matches!(
            app.update(json!({"a": 1})),
            Err(crate::AppError::Trigger(TriggerError::Unknown { .. }))
        ));
    }
}
