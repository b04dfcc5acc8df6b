#![forbid(unsafe_code)]

//! Active language and lexicon, exposed as one observable.
//!
//! [`LanguageStore`] keeps one [`Lexicon`] per language and publishes the
//! active `(language, lexicon)` pair through a single [`Observable`], so any
//! lookup made inside a tracked computation becomes a dependency of it.
//!
//! # Invariants
//!
//! - A language switch replaces the language code and the lexicon in one
//!   write: every subscriber of that round already sees the new catalog.
//! - Lookups never fail: a missing key yields the caller's fallback.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tshell_runtime::{Observable, Subscription};

use crate::lexicon::{Lexicon, LexiconEntry};

/// `{name}` placeholder substitutions applied by [`LanguageStore::translate`].
pub type Replacements<'a> = &'a [(&'a str, &'a str)];

/// The language code together with the catalog currently served for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveLanguage {
    pub language: String,
    pub lexicon: Rc<Lexicon>,
}

/// Language catalogs plus the observable active language.
pub struct LanguageStore {
    active: Observable<ActiveLanguage>,
    catalogs: RefCell<HashMap<String, Rc<Lexicon>>>,
}

impl fmt::Debug for LanguageStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageStore")
            .field("language", &self.active.get_untracked().language)
            .field("catalogs", &self.languages())
            .finish()
    }
}

impl LanguageStore {
    /// A store with `language` active and no catalogs.
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            active: Observable::new(ActiveLanguage {
                language: language.into(),
                lexicon: Rc::new(Lexicon::new()),
            }),
            catalogs: RefCell::new(HashMap::new()),
        }
    }

    /// Install (or replace) the catalog for `language`. If it is the active
    /// language the active lexicon is swapped immediately.
    pub fn insert_lexicon(&self, language: impl Into<String>, lexicon: Lexicon) {
        let language = language.into();
        let lexicon = Rc::new(lexicon);
        self.catalogs
            .borrow_mut()
            .insert(language.clone(), Rc::clone(&lexicon));
        if self.active.with_untracked(|active| active.language == language) {
            self.active.update(|active| active.lexicon = lexicon);
        }
    }

    /// Set a single entry in the catalog for `language`, creating the catalog
    /// if needed.
    pub fn set_entry(
        &self,
        language: &str,
        key: impl Into<String>,
        entry: impl Into<LexiconEntry>,
    ) {
        let mut lexicon = self
            .catalogs
            .borrow()
            .get(language)
            .map(|lexicon| Lexicon::clone(lexicon))
            .unwrap_or_default();
        lexicon.insert(key, entry);
        self.insert_lexicon(language, lexicon);
    }

    /// Switch the active language. A language with no catalog gets an empty
    /// lexicon, so every lookup falls back.
    pub fn set_language(&self, language: impl Into<String>) {
        let language = language.into();
        let lexicon = self
            .catalogs
            .borrow()
            .get(&language)
            .cloned()
            .unwrap_or_default();
        tracing::debug!(message = "i18n.language", language = %language);
        self.active.set(ActiveLanguage { language, lexicon });
    }

    /// Active language and catalog as one consistent pair (tracked read).
    #[must_use]
    pub fn active(&self) -> ActiveLanguage {
        self.active.get()
    }

    /// Active language code (tracked read).
    #[must_use]
    pub fn language(&self) -> String {
        self.active.with(|active| active.language.clone())
    }

    /// Active lexicon (tracked read).
    #[must_use]
    pub fn lexicon(&self) -> Rc<Lexicon> {
        self.active.with(|active| Rc::clone(&active.lexicon))
    }

    /// Languages with an installed catalog, sorted.
    #[must_use]
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.catalogs.borrow().keys().cloned().collect();
        languages.sort();
        languages
    }

    /// Raw entry for `key` in the active lexicon (tracked read).
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<LexiconEntry> {
        self.active.with(|active| active.lexicon.get(key).cloned())
    }

    /// Translate `key`, falling back to `fallback` when it is absent, then
    /// substitute `{name}` placeholders.
    #[must_use]
    pub fn translate(&self, key: &str, fallback: &str, replacements: Replacements<'_>) -> String {
        let text = self
            .entry(key)
            .map_or_else(|| fallback.to_string(), |entry| entry.to_text());
        interpolate(text, replacements)
    }

    /// Call `callback` with the new code whenever the active language changes.
    /// Catalog edits within the same language do not fire it.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn on_language_change(&self, callback: impl Fn(&str) + 'static) -> Subscription {
        let last = RefCell::new(self.active.get_untracked().language);
        self.active.subscribe(move |active| {
            if *last.borrow() == active.language {
                return;
            }
            last.replace(active.language.clone());
            callback(&active.language);
        })
    }
}

fn interpolate(mut text: String, replacements: Replacements<'_>) -> String {
    for (name, value) in replacements {
        let placeholder = format!("{{{name}}}");
        if text.contains(&placeholder) {
            text = text.replace(&placeholder, value);
        }
    }
    text
}
