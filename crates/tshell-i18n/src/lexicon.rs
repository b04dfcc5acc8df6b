#![forbid(unsafe_code)]

//! Translation catalogs.
//!
//! A [`Lexicon`] maps fully-qualified keys to a string or a list of strings.
//! Catalog files may nest objects; nested keys are flattened with `.` so
//! `{"nav": {"home": "Home"}}` yields the key `nav.home`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{I18nError, Result};

/// Separator between a namespace and its keys, and between nested levels.
pub const KEY_SEPARATOR: char = '.';

/// A single lexicon value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LexiconEntry {
    Text(String),
    List(Vec<String>),
}

impl LexiconEntry {
    /// Render the entry as display text; list items are joined by newlines.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::List(items) => items.join("\n"),
        }
    }
}

impl From<&str> for LexiconEntry {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for LexiconEntry {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for LexiconEntry {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Flat key → entry catalog for one language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lexicon {
    entries: BTreeMap<String, LexiconEntry>,
}

impl Lexicon {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON catalog, flattening nested objects into dotted keys.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Build a catalog from a JSON value, flattening nested objects.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(root) = value else {
            return Err(I18nError::InvalidRoot {
                found: kind_of(value),
            });
        };
        let mut lexicon = Self::new();
        for (key, value) in root {
            lexicon.flatten_into(key.clone(), value)?;
        }
        Ok(lexicon)
    }

    fn flatten_into(&mut self, key: String, value: &Value) -> Result<()> {
        match value {
            Value::String(text) => {
                self.entries.insert(key, LexiconEntry::Text(text.clone()));
            }
            Value::Array(items) => {
                let list = items
                    .iter()
                    .map(|item| match item {
                        Value::String(text) => Ok(text.clone()),
                        other => Err(I18nError::InvalidEntry {
                            key: key.clone(),
                            found: kind_of(other),
                        }),
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.entries.insert(key, LexiconEntry::List(list));
            }
            Value::Object(children) => {
                for (child, value) in children {
                    self.flatten_into(format!("{key}{KEY_SEPARATOR}{child}"), value)?;
                }
            }
            other => {
                return Err(I18nError::InvalidEntry {
                    key,
                    found: kind_of(other),
                });
            }
        }
        Ok(())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, entry: impl Into<LexiconEntry>) -> Self {
        self.insert(key, entry);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: impl Into<LexiconEntry>) {
        self.entries.insert(key.into(), entry.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<LexiconEntry> {
        self.entries.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LexiconEntry> {
        self.entries.get(key)
    }

    /// Copy every entry of `other` over this catalog.
    pub fn extend(&mut self, other: &Lexicon) {
        for (key, entry) in &other.entries {
            self.entries.insert(key.clone(), entry.clone());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
