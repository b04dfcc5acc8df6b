#![forbid(unsafe_code)]

//! Localization for tshell: lexicon catalogs, the observable language store,
//! and per-consumer translation trackers that re-render a UI unit only when
//! the keys it actually used change value.

pub mod error;
pub mod lexicon;
pub mod store;
pub mod tracker;

pub use error::{I18nError, Result};
pub use lexicon::{KEY_SEPARATOR, Lexicon, LexiconEntry};
pub use store::{ActiveLanguage, LanguageStore, Replacements};
pub use tracker::{LanguageSnapshot, MAX_RENDER_COUNT, Namespaced, TranslationTracker};
