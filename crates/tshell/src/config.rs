#![forbid(unsafe_code)]

//! Application configuration.
//!
//! [`AppConfig`] can be built in code with the `with_*` methods or
//! deserialized from JSON:
//!
//! ```json
//! {
//!   "initialState": { "buildVersion": "2.3.0", "theme": "dark" },
//!   "language": "en",
//!   "lexicons": { "en": { "nav": { "home": "Home" } } }
//! }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tshell_i18n::Lexicon;

use crate::error::AppError;

/// Language used when the configuration names none.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Everything needed to construct an [`App`](crate::App).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AppConfig {
    /// Baseline application state. Must be a JSON object.
    pub initial_state: Value,
    /// Active language code at startup.
    pub language: String,
    /// Raw catalogs keyed by language code. Nested objects are flattened.
    pub lexicons: BTreeMap<String, Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            initial_state: Value::Object(serde_json::Map::new()),
            language: DEFAULT_LANGUAGE.to_string(),
            lexicons: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Parse a configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the baseline state.
    #[must_use]
    pub fn with_initial_state(mut self, state: Value) -> Self {
        self.initial_state = state;
        self
    }

    /// Set the startup language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Add a raw catalog for `language`.
    #[must_use]
    pub fn with_lexicon(mut self, language: impl Into<String>, catalog: Value) -> Self {
        self.lexicons.insert(language.into(), catalog);
        self
    }

    /// Parse every raw catalog.
    pub fn parsed_lexicons(&self) -> Result<Vec<(String, Lexicon)>, AppError> {
        self.lexicons
            .iter()
            .map(|(language, raw)| {
                let lexicon = Lexicon::from_value(raw)?;
                Ok((language.clone(), lexicon))
            })
            .collect::<Result<Vec<_>, AppError>>()
    }
}
