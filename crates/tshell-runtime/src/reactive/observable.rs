#![forbid(unsafe_code)]

//! Shared, version-tracked values with change notification.
//!
//! # Failure Modes
//!
//! - **Re-entrant mutation**: a subscriber may call [`Observable::set`] on the
//!   observable that notified it. The value is updated immediately and a
//!   nested notification round runs before the outer one continues.
//!   Every callback receives the value current at the moment it is called,
//!   so later subscribers of the outer round see the newest value, never
//!   the one that started the round.
//! - **Subscriber dropped mid-round**: callbacks are upgraded before the
//!   round starts, so a subscription dropped by an earlier callback still
//!   receives the in-flight notification once.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::tracking::{self, Source};

static NEXT_OBSERVABLE_ID: AtomicU64 = AtomicU64::new(1);

type Callback<T> = dyn Fn(&T);

struct ObservableInner<T> {
    id: u64,
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
}

/// A shared value whose reads are tracked and whose writes notify.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable holding `value` at version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                id: NEXT_OBSERVABLE_ID.fetch_add(1, Ordering::Relaxed),
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone out the current value, recording the read.
    #[must_use]
    pub fn get(&self) -> T {
        self.record_read();
        self.inner.borrow().value.clone()
    }

    /// Clone out the current value without recording the read.
    #[must_use]
    pub fn get_untracked(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference, recording the read.
    ///
    /// # Panics
    ///
    /// Panics if the closure calls [`set`](Self::set) on the same observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.record_read();
        f(&self.inner.borrow().value)
    }

    /// Access the current value by reference without recording the read.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value. Equal values are ignored; otherwise the version is
    /// bumped and every live subscriber is called in registration order.
    pub fn set(&self, value: T) {
        let callbacks = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
            inner.subscribers.retain(|weak| weak.strong_count() > 0);
            inner
                .subscribers
                .iter()
                .filter_map(Weak::upgrade)
                .collect::<Vec<_>>()
        };
        for callback in callbacks {
            let current = self.get_untracked();
            callback(&current);
        }
    }

    /// Mutate a copy of the value in place and store it with [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get_untracked();
        f(&mut value);
        self.set(value);
    }

    /// Register a change callback. The callback stays registered for as long
    /// as the returned [`Subscription`] is alive.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Number of mutations that changed the value.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of subscribers whose [`Subscription`] is still alive.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    fn record_read(&self) {
        let id = self.inner.borrow().id;
        tracking::record(id, || Rc::new(self.clone()) as Rc<dyn Source>);
    }
}

impl<T: Clone + PartialEq + 'static> Source for Observable<T> {
    fn source_id(&self) -> u64 {
        self.inner.borrow().id
    }

    fn watch(&self, on_change: Rc<dyn Fn()>) -> Subscription {
        self.subscribe(move |_| on_change())
    }
}

/// RAII guard for an [`Observable`] callback. Dropping it unsubscribes.
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl Subscription {
    /// Unsubscribe explicitly. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn set_bumps_version_and_notifies() {
        let source = Observable::new(1);
        let seen = Rc::new(Cell::new(0));
        let seen_clone = Rc::clone(&seen);
        let _sub = source.subscribe(move |v| seen_clone.set(*v));

        source.set(7);
        assert_eq!(source.version(), 1);
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn equal_set_is_noop() {
        let source = Observable::new("en".to_string());
        let calls = Rc::new(Cell::new(0u32));
        let calls_clone = Rc::clone(&calls);
        let _sub = source.subscribe(move |_| calls_clone.set(calls_clone.get() + 1));

        source.set("en".to_string());
        assert_eq!(source.version(), 0);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn subscribers_notified_in_registration_order() {
        let source = Observable::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<Subscription> = (0..3)
            .map(|i| {
                let order = Rc::clone(&order);
                source.subscribe(move |_| order.borrow_mut().push(i))
            })
            .collect();

        source.set(1);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn dropping_subscription_stops_notifications() {
        let source = Observable::new(0);
        let calls = Rc::new(Cell::new(0u32));
        let calls_clone = Rc::clone(&calls);
        let sub = source.subscribe(move |_| calls_clone.set(calls_clone.get() + 1));

        source.set(1);
        sub.unsubscribe();
        source.set(2);
        assert_eq!(calls.get(), 1);
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn update_mutates_in_place() {
        let source = Observable::new(vec![1, 2]);
        source.update(|v| v.push(3));
        assert_eq!(source.get(), vec![1, 2, 3]);
        assert_eq!(source.version(), 1);
    }

    #[test]
    fn reentrant_set_from_subscriber() {
        let source = Observable::new(0);
        let handle = source.clone();
        let _sub = source.subscribe(move |v| {
            if *v < 3 {
                handle.set(v + 1);
            }
        });

        source.set(1);
        assert_eq!(source.get(), 3);
        assert_eq!(source.version(), 3);
    }

    #[test]
    fn later_subscribers_never_see_stale_values_after_reentry() {
        let source = Observable::new(0);
        let handle = source.clone();
        let _bump = source.subscribe(move |v| {
            if *v < 3 {
                handle.set(v + 1);
            }
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _watch = source.subscribe(move |v| seen_clone.borrow_mut().push(*v));

        source.set(1);
        assert_eq!(*seen.borrow(), vec![3, 3, 3]);
    }

    #[test]
    fn clone_shares_value() {
        let a = Observable::new(1);
        let b = a.clone();
        b.set(5);
        assert_eq!(a.get(), 5);
    }

    #[test]
    fn debug_format() {
        let source = Observable::new(42);
        let dbg = format!("{source:?}");
        assert!(dbg.contains("Observable"));
        assert!(dbg.contains("42"));
    }
}
