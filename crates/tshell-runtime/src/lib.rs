#![forbid(unsafe_code)]

//! Runtime primitives for the tshell application shell: fine-grained
//! reactivity, the one-shot mount gate, and the named trigger registry.

pub mod mount;
pub mod reactive;
pub mod trigger;

pub use mount::{MountGate, MountSubscription, MountTeardown};
pub use reactive::{Observable, Reaction, Subscription, is_tracking, untracked};
pub use trigger::{TriggerError, TriggerMode, TriggerRegistry, TriggerResult};
