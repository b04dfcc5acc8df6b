#![forbid(unsafe_code)]

//! Tracked computations that call back when their result changes.
//!
//! # Design
//!
//! [`Reaction<V>`] owns a compute function, the last value it produced, and
//! one [`Subscription`] per observable read during the last run. Any change
//! to one of those observables re-runs the computation synchronously, rebuilds
//! the subscription set from the reads of the new run, and invokes the change
//! callback when the new value differs from the previous one.
//!
//! # Invariants
//!
//! 1. The change callback never fires for the initial run.
//! 2. The change callback fires at most once per re-run, and only when the
//!    new value `!=` the previous value.
//! 3. After [`dispose`](Reaction::dispose) no further runs or callbacks
//!    happen. Disposing twice is a no-op.
//!
//! # Failure Modes
//!
//! - **Compute function panics**: the panic propagates to whoever mutated the
//!   observable. The previous subscriptions have not been replaced yet, so the
//!   reaction keeps watching its old dependency set.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::observable::Subscription;
use super::tracking;

struct ReactionInner<V> {
    compute: Rc<dyn Fn() -> V>,
    on_change: Rc<dyn Fn(&V)>,
    last: Option<V>,
    subscriptions: Vec<Subscription>,
    disposed: bool,
    runs: u64,
}

/// A computation re-evaluated whenever an observable it read changes.
///
/// Dropping the handle disposes the reaction.
pub struct Reaction<V> {
    inner: Rc<RefCell<ReactionInner<V>>>,
}

impl<V: fmt::Debug> fmt::Debug for Reaction<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Reaction")
            .field("last", &inner.last)
            .field("dependencies", &inner.subscriptions.len())
            .field("runs", &inner.runs)
            .field("disposed", &inner.disposed)
            .finish()
    }
}

impl<V: Clone + PartialEq + 'static> Reaction<V> {
    /// Run `compute` once to discover its dependencies, then keep watching
    /// them. `on_change` receives each new value that differs from the last.
    pub fn new(compute: impl Fn() -> V + 'static, on_change: impl Fn(&V) + 'static) -> Self {
        let inner = Rc::new(RefCell::new(ReactionInner {
            compute: Rc::new(compute),
            on_change: Rc::new(on_change),
            last: None,
            subscriptions: Vec::new(),
            disposed: false,
            runs: 0,
        }));
        run(&inner);
        Self { inner }
    }

    /// Stop watching dependencies. Idempotent.
    pub fn dispose(&self) {
        let dropped = {
            let mut inner = self.inner.borrow_mut();
            inner.disposed = true;
            std::mem::take(&mut inner.subscriptions)
        };
        drop(dropped);
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().disposed
    }

    /// The value produced by the most recent run.
    #[must_use]
    pub fn value(&self) -> Option<V> {
        self.inner.borrow().last.clone()
    }

    /// Number of completed runs, including the initial one.
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.inner.borrow().runs
    }

    /// Number of observables read during the most recent run.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.inner.borrow().subscriptions.len()
    }
}

impl<V> Drop for Reaction<V> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.disposed = true;
            inner.subscriptions.clear();
        }
    }
}

fn run<V: Clone + PartialEq + 'static>(inner: &Rc<RefCell<ReactionInner<V>>>) {
    let compute = {
        let state = inner.borrow();
        if state.disposed {
            return;
        }
        Rc::clone(&state.compute)
    };

    let (value, sources) = tracking::track(|| compute());

    let weak: Weak<RefCell<ReactionInner<V>>> = Rc::downgrade(inner);
    let subscriptions: Vec<Subscription> = sources
        .iter()
        .map(|source| {
            let weak = weak.clone();
            source.watch(Rc::new(move || {
                if let Some(strong) = weak.upgrade() {
                    run(&strong);
                }
            }))
        })
        .collect();

    let (notify, stale) = {
        let mut state = inner.borrow_mut();
        if state.disposed {
            return;
        }
        let changed = state.last.as_ref().is_some_and(|last| *last != value);
        state.runs += 1;
        state.last = Some(value.clone());
        let stale = std::mem::replace(&mut state.subscriptions, subscriptions);
        (changed.then(|| Rc::clone(&state.on_change)), stale)
    };
    drop(stale);

    if let Some(on_change) = notify {
        on_change(&value);
    }
}
