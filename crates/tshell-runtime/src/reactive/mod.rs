#![forbid(unsafe_code)]

//! Dependency-tracked values and reactions.
//!
//! Three pieces make up the engine:
//!
//! - [`Observable`] holds a value, counts effective writes, and notifies its
//!   subscribers.
//! - [`Reaction`] re-evaluates a closure whenever something it read changes.
//! - Tracking frames connect the two. Each reaction run pushes a frame onto
//!   a thread-local stack; reads through [`Observable::get`] or
//!   [`Observable::with`] land in the innermost frame. [`untracked`] pushes
//!   a silent frame so nested reads stay invisible to the enclosing run.
//!
//! # Reaction lifecycle
//!
//! A run evaluates the closure, collects the frame's sources (deduplicated,
//! in first-read order), and swaps them in for the previous run's
//! [`Subscription`]s. A branch that stops reading an observable therefore
//! stops being woken by it on the following run. The change callback sees
//! only values that differ from the last run, and never the first one.
//!
//! # Invariants
//!
//! 1. Frames are strictly nested: a frame is popped by the run that pushed
//!    it, even when the closure panics.
//! 2. A disposed reaction holds no subscriptions and never runs again.
//! 3. Callbacks run with no `RefCell` borrow held, so any of them may write
//!    to observables or dispose reactions.

pub mod observable;
pub mod reaction;
mod tracking;

pub use observable::{Observable, Subscription};
pub use reaction::Reaction;
pub use tracking::{is_tracking, untracked};
