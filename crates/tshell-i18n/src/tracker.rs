#![forbid(unsafe_code)]

//! Per-consumer translation dependency tracking.
//!
//! A [`TranslationTracker`] belongs to one consuming UI unit. During each
//! render pass it records which fully-qualified keys the unit translated.
//! After the pass, [`end_render`](TranslationTracker::end_render) compares
//! that ordered key list with the one behind the live subscription and only
//! rebuilds the subscription when the list differs. The subscription is a
//! [`Reaction`] over the concatenated raw entries of the tracked keys: any
//! lexicon change that alters one of them bumps the render counter in the
//! tracker's [`LanguageSnapshot`], which is what the host watches to decide
//! when to re-render.
//!
//! A second, key-independent subscription resets the snapshot to
//! `{ language, render_count: 0 }` whenever the active language changes. The
//! key reaction also watches the language code and skips the bump for a
//! run caused by a language switch, so a switch produces exactly one
//! snapshot change, and the store has already swapped the lexicon by then.
//!
//! # Invariants
//!
//! 1. `t()` records each qualified key at most once per render, in first-use
//!    order.
//! 2. A render whose key list equals the previous one by length and position
//!    creates no new subscription.
//! 3. Every snapshot notification is observed with the matching lexicon
//!    already active.
//! 4. `render_count` wraps to zero after [`MAX_RENDER_COUNT`].
//! 5. [`dispose`](TranslationTracker::dispose) drops both subscriptions
//!    together and is idempotent; dropping the tracker disposes it.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use tshell_i18n::{LanguageStore, Lexicon, TranslationTracker};
//!
//! let store = Rc::new(LanguageStore::new("en"));
//! store.insert_lexicon("en", Lexicon::new().with("inbox.title", "Inbox"));
//!
//! let tracker = TranslationTracker::with_namespace(Rc::clone(&store), "inbox");
//! let title = tracker.render(|t| t.namespaced().t("title", None, &[]));
//! assert_eq!(title, "Inbox");
//!
//! store.set_entry("en", "inbox.title", "Mail");
//! assert_eq!(tracker.snapshot().render_count, 1);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tshell_runtime::{Observable, Reaction, Subscription, untracked};

use crate::lexicon::{KEY_SEPARATOR, LexiconEntry};
use crate::store::{LanguageStore, Replacements};

/// Largest render counter value before wrapping to zero (`2^53 - 1`).
pub const MAX_RENDER_COUNT: u64 = (1 << 53) - 1;

/// Separator used when concatenating tracked entries into one comparison
/// string. Unit separator, so it cannot collide with display text.
const ENTRY_DELIMITER: &str = "\u{1f}";

/// The state whose change must re-render the consuming unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSnapshot {
    pub language: String,
    pub render_count: u64,
}

impl LanguageSnapshot {
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            render_count: 0,
        }
    }

    fn bumped(&self) -> Self {
        let render_count = if self.render_count >= MAX_RENDER_COUNT {
            0
        } else {
            self.render_count + 1
        };
        Self {
            language: self.language.clone(),
            render_count,
        }
    }
}

#[derive(Default)]
struct TrackerState {
    current: Vec<String>,
    last: Vec<String>,
    active: Option<Reaction<(String, String)>>,
    created: u64,
    disposed: bool,
}

/// Dependency-tracked translation access for one consuming UI unit.
pub struct TranslationTracker {
    store: Rc<LanguageStore>,
    namespace: Option<String>,
    snapshot: Observable<LanguageSnapshot>,
    state: RefCell<TrackerState>,
    language_subscription: RefCell<Option<Subscription>>,
}

impl fmt::Debug for TranslationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("TranslationTracker")
            .field("namespace", &self.namespace)
            .field("snapshot", &self.snapshot.get_untracked())
            .field("tracked", &state.last)
            .field("subscriptions_created", &state.created)
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl TranslationTracker {
    /// Mount a tracker without a namespace.
    #[must_use]
    pub fn new(store: Rc<LanguageStore>) -> Self {
        Self::build(store, None)
    }

    /// Mount a tracker whose [`namespaced`](Self::namespaced) accessor
    /// prefixes keys with `namespace`.
    #[must_use]
    pub fn with_namespace(store: Rc<LanguageStore>, namespace: impl Into<String>) -> Self {
        Self::build(store, Some(namespace.into()))
    }

    fn build(store: Rc<LanguageStore>, namespace: Option<String>) -> Self {
        let snapshot = Observable::new(LanguageSnapshot::new(store.language()));
        let reset = snapshot.clone();
        let language_subscription = store.on_language_change(move |language| {
            reset.set(LanguageSnapshot::new(language));
        });
        Self {
            store,
            namespace,
            snapshot,
            state: RefCell::new(TrackerState::default()),
            language_subscription: RefCell::new(Some(language_subscription)),
        }
    }

    /// Start a render pass: forget the keys recorded by the previous pass.
    pub fn begin_render(&self) {
        self.state.borrow_mut().current.clear();
    }

    /// Translate `key` verbatim, recording it for this render pass.
    ///
    /// `fallback` defaults to the key itself.
    pub fn t(&self, key: &str, fallback: Option<&str>, replacements: Replacements<'_>) -> String {
        self.lookup(key.to_string(), fallback.unwrap_or(key), replacements)
    }

    /// Alias of [`t`](Self::t).
    pub fn translate(
        &self,
        key: &str,
        fallback: Option<&str>,
        replacements: Replacements<'_>,
    ) -> String {
        self.t(key, fallback, replacements)
    }

    /// Accessor that prefixes keys with this tracker's namespace.
    #[must_use]
    pub fn namespaced(&self) -> Namespaced<'_> {
        Namespaced { tracker: self }
    }

    fn lookup(&self, qualified: String, fallback: &str, replacements: Replacements<'_>) -> String {
        let text = self.store.translate(&qualified, fallback, replacements);
        let mut state = self.state.borrow_mut();
        if !state.current.contains(&qualified) {
            state.current.push(qualified);
        }
        text
    }

    /// Finish a render pass: rebuild the key subscription if the recorded
    /// key list differs from the subscribed one, or if none exists yet.
    ///
    /// Returns whether a new subscription was created.
    pub fn end_render(&self) -> bool {
        let (keys, stale) = {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return false;
            }
            let resubscribe = state.active.is_none() || state.current != state.last;
            if !resubscribe {
                return false;
            }
            state.last = state.current.clone();
            state.created += 1;
            tracing::trace!(
                message = "tracker.resubscribe",
                keys = state.last.len(),
                generation = state.created
            );
            (state.last.clone(), state.active.take())
        };
        if let Some(stale) = stale {
            stale.dispose();
        }

        let store = Rc::clone(&self.store);
        let snapshot = self.snapshot.clone();
        let seen_language = RefCell::new(untracked(|| self.store.language()));
        let reaction = Reaction::new(
            move || (store.language(), fingerprint(&store, &keys)),
            move |(language, _)| {
                if *seen_language.borrow() != *language {
                    // The language subscription owns this transition.
                    seen_language.replace(language.clone());
                    return;
                }
                snapshot.update(|s| *s = s.bumped());
            },
        );
        self.state.borrow_mut().active = Some(reaction);
        true
    }

    /// Run one full render pass: `begin_render`, `f`, `end_render`.
    pub fn render<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        self.begin_render();
        let out = f(self);
        self.end_render();
        out
    }

    /// Current render state.
    #[must_use]
    pub fn snapshot(&self) -> LanguageSnapshot {
        self.snapshot.get()
    }

    /// Call `callback` whenever the render state changes.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&LanguageSnapshot) + 'static) -> Subscription {
        self.snapshot.subscribe(callback)
    }

    /// Keys behind the live subscription, in first-use order.
    #[must_use]
    pub fn tracked_keys(&self) -> Vec<String> {
        self.state.borrow().last.clone()
    }

    /// Number of key subscriptions created so far.
    #[must_use]
    pub fn subscription_count(&self) -> u64 {
        self.state.borrow().created
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }

    /// Drop the language subscription and the key subscription together.
    pub fn dispose(&self) {
        let active = {
            let mut state = self.state.borrow_mut();
            state.disposed = true;
            state.active.take()
        };
        let language = self.language_subscription.borrow_mut().take();
        if let Some(active) = active {
            active.dispose();
        }
        drop(language);
    }
}

impl Drop for TranslationTracker {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Namespaced view of a [`TranslationTracker`].
#[derive(Debug, Clone, Copy)]
pub struct Namespaced<'a> {
    tracker: &'a TranslationTracker,
}

impl Namespaced<'_> {
    /// Translate `namespace.key` (or `key` when the tracker has no
    /// namespace). `fallback` defaults to the unqualified key.
    pub fn t(&self, key: &str, fallback: Option<&str>, replacements: Replacements<'_>) -> String {
        let qualified = match self.tracker.namespace.as_deref() {
            Some(namespace) => format!("{namespace}{KEY_SEPARATOR}{key}"),
            None => key.to_string(),
        };
        self.tracker
            .lookup(qualified, fallback.unwrap_or(key), replacements)
    }
}

/// Concatenate the raw entries of `keys` into one comparison string.
fn fingerprint(store: &LanguageStore, keys: &[String]) -> String {
    let mut out = String::new();
    for key in keys {
        match store.entry(key) {
            Some(LexiconEntry::List(items)) => out.push_str(&items.join(ENTRY_DELIMITER)),
            Some(LexiconEntry::Text(text)) => {
                out.push_str(ENTRY_DELIMITER);
                out.push_str(&text);
            }
            None => out.push_str(ENTRY_DELIMITER),
        }
    }
    out
}
