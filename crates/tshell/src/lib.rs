#![forbid(unsafe_code)]

//! tshell public facade.
//!
//! Re-exports the state, runtime, and i18n crates and adds [`App`], which
//! owns one instance of each shared container and wires the `app.update` /
//! `app.reload` triggers to the state container.
//!
//! ```
//! use serde_json::json;
//! use tshell::prelude::*;
//!
//! let config = AppConfig::default()
//!     .with_initial_state(json!({"buildVersion": "2.3.0"}))
//!     .with_lexicon("en", json!({"title": "Home"}));
//! let app = App::new(config).unwrap();
//! let _teardown = app.mount();
//!
//! app.update(json!({"theme": "dark"})).unwrap();
//! assert_eq!(app.state().version(), "2.3.0");
//! assert_eq!(app.state().get("theme"), Some(&json!("dark")));
//!
//! let tracker = app.tracker(None);
//! assert_eq!(tracker.render(|t| t.t("title", None, &[])), "Home");
//! ```

pub mod app;
pub mod config;
pub mod error;

pub use app::{App, RELOAD_TRIGGER, UPDATE_TRIGGER};
pub use config::{AppConfig, DEFAULT_LANGUAGE};
pub use error::{AppError, Result};

pub use tshell_i18n as i18n;
pub use tshell_runtime as runtime;
pub use tshell_state as state;

pub mod prelude {
    //! Common imports for applications built on tshell.

    pub use crate::{App, AppConfig, AppError};
    pub use tshell_i18n::{LanguageSnapshot, LanguageStore, Lexicon, TranslationTracker};
    pub use tshell_runtime::{MountGate, Observable, Reaction, Subscription, TriggerMode};
    pub use tshell_state::{ApplicationStateContainer, StateError, StateTree};
}
