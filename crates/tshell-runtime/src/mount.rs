#![forbid(unsafe_code)]

//! One-shot mount gate.
//!
//! A [`MountGate`] lets dependents defer work until the owning UI unit has
//! completed its first mount. Callbacks queued before [`MountGate::on_mount`]
//! fire exactly once, in registration order. After the gate opens, new
//! subscriptions are inert: late subscribers poll [`MountGate::is_mounted`]
//! instead of being notified.
//!
//! # Invariants
//!
//! 1. Each queued callback fires at most once.
//! 2. Callbacks fire in registration order.
//! 3. Subscribing while mounted never calls the callback and retains nothing.
//! 4. No operation fails or panics on repeated use.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tshell_runtime::mount::MountGate;
//!
//! let gate = MountGate::new();
//! let fired = Rc::new(Cell::new(false));
//! let flag = Rc::clone(&fired);
//! let _sub = gate.subscribe(move || flag.set(true));
//!
//! let teardown = gate.on_mount();
//! assert!(fired.get());
//! teardown.teardown();
//! assert!(!gate.is_mounted());
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type MountCallback = Box<dyn FnOnce()>;

#[derive(Default)]
struct MountRecord {
    mounted: bool,
    next_id: u64,
    subscribers: Vec<(u64, MountCallback)>,
}

/// Shared one-shot latch. Cloning yields another handle to the same gate.
#[derive(Clone, Default)]
pub struct MountGate {
    record: Rc<RefCell<MountRecord>>,
}

impl fmt::Debug for MountGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record.borrow();
        f.debug_struct("MountGate")
            .field("mounted", &record.mounted)
            .field("pending", &record.subscribers.len())
            .finish()
    }
}

impl MountGate {
    /// Create an unmounted gate with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `callback` to run once on mount.
    ///
    /// While mounted the callback is dropped without being called and the
    /// returned handle does nothing.
    pub fn subscribe(&self, callback: impl FnOnce() + 'static) -> MountSubscription {
        let mut record = self.record.borrow_mut();
        if record.mounted {
            return MountSubscription {
                record: Weak::new(),
                id: None,
            };
        }
        let id = record.next_id;
        record.next_id += 1;
        record.subscribers.push((id, Box::new(callback)));
        MountSubscription {
            record: Rc::downgrade(&self.record),
            id: Some(id),
        }
    }

    /// Open the gate: mark mounted, fire queued callbacks in order, clear the
    /// queue. The returned [`MountTeardown`] resets the gate to unmounted.
    pub fn on_mount(&self) -> MountTeardown {
        let queued = {
            let mut record = self.record.borrow_mut();
            record.mounted = true;
            std::mem::take(&mut record.subscribers)
        };
        tracing::debug!(message = "mount.fire", callbacks = queued.len());
        for (_, callback) in queued {
            callback();
        }
        MountTeardown {
            record: Rc::downgrade(&self.record),
        }
    }

    /// Whether the gate is currently open.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.record.borrow().mounted
    }

    /// Number of callbacks waiting for the mount.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.record.borrow().subscribers.len()
    }
}

/// Handle returned by [`MountGate::subscribe`].
///
/// Dropping the handle does **not** deregister the callback.
#[derive(Debug)]
pub struct MountSubscription {
    record: Weak<RefCell<MountRecord>>,
    id: Option<u64>,
}

impl MountSubscription {
    /// Remove the callback if it has not fired yet. No-op otherwise.
    pub fn unsubscribe(self) {
        let (Some(id), Some(record)) = (self.id, self.record.upgrade()) else {
            return;
        };
        let removed = {
            let mut record = record.borrow_mut();
            record
                .subscribers
                .iter()
                .position(|(queued, _)| *queued == id)
                .map(|index| record.subscribers.remove(index))
        };
        drop(removed);
    }

    /// Whether this handle refers to a queued registration (false for
    /// subscriptions made after the gate opened).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.id.is_some() && self.record.strong_count() > 0
    }
}

/// Handle returned by [`MountGate::on_mount`].
#[derive(Debug)]
pub struct MountTeardown {
    record: Weak<RefCell<MountRecord>>,
}

impl MountTeardown {
    /// Reset the gate to unmounted so a remount can fire it again.
    pub fn teardown(self) {
        if let Some(record) = self.record.upgrade() {
            record.borrow_mut().mounted = false;
        }
    }
}
