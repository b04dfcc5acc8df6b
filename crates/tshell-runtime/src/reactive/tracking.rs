#![forbid(unsafe_code)]

//! Thread-local read tracking.
//!
//! A frame stack records which observables were read while a tracked
//! computation ran. `None` frames come from [`untracked`] and swallow reads.

use std::cell::RefCell;
use std::rc::Rc;

use super::observable::Subscription;

/// A type-erased dependency that a reaction can subscribe to.
pub(crate) trait Source {
    /// Identity used to deduplicate repeated reads within one frame.
    fn source_id(&self) -> u64;

    /// Subscribe `on_change` to value changes of this source.
    fn watch(&self, on_change: Rc<dyn Fn()>) -> Subscription;
}

type Frame = Option<Vec<Rc<dyn Source>>>;

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Pops the frame it pushed, even if the tracked closure panics.
struct FrameGuard;

impl FrameGuard {
    fn push(frame: Frame) -> Self {
        FRAMES.with(|frames| frames.borrow_mut().push(frame));
        Self
    }

    fn pop(self) -> Frame {
        let frame = FRAMES.with(|frames| frames.borrow_mut().pop()).flatten();
        std::mem::forget(self);
        frame
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAMES.with(|frames| {
            frames.borrow_mut().pop();
        });
    }
}

/// Record a read of `id`. `make` is only called when a frame is listening and
/// the source has not been seen in that frame yet.
pub(crate) fn record(id: u64, make: impl FnOnce() -> Rc<dyn Source>) {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        if let Some(Some(frame)) = frames.last_mut() {
            if !frame.iter().any(|s| s.source_id() == id) {
                frame.push(make());
            }
        }
    });
}

/// Run `f` inside a fresh tracking frame and return its result along with
/// every source read, in first-read order.
pub(crate) fn track<R>(f: impl FnOnce() -> R) -> (R, Vec<Rc<dyn Source>>) {
    let guard = FrameGuard::push(Some(Vec::new()));
    let value = f();
    let sources = guard.pop().unwrap_or_default();
    (value, sources)
}

/// Run `f` without recording any reads into the enclosing tracking frame.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let guard = FrameGuard::push(None);
    let value = f();
    drop(guard);
    value
}

/// Whether reads on this thread are currently being recorded.
#[must_use]
pub fn is_tracking() -> bool {
    FRAMES.with(|frames| matches!(frames.borrow().last(), Some(Some(_))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Observable;

    #[test]
    fn track_records_reads_once() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let (sum, sources) = track(|| a.get() + b.get() + a.get());
        assert_eq!(sum, 4);
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn untracked_hides_reads() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let (_, sources) = track(|| {
            let _ = a.get();
            untracked(|| b.get())
        });
        assert_eq!(sources.len(), 1);
    }

    #[test]
    fn nested_frames_are_isolated() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let (inner_len, outer) = track(|| {
            let _ = a.get();
            let (_, inner) = track(|| b.get());
            inner.len()
        });
        assert_eq!(inner_len, 1);
        assert_eq!(outer.len(), 1);
    }

    #[test]
    fn is_tracking_reflects_frame_stack() {
        assert!(!is_tracking());
        let (inside, _) = track(is_tracking);
        assert!(inside);
        let (paused, _) = track(|| untracked(is_tracking));
        assert!(!paused);
        assert!(!is_tracking());
    }

    #[test]
    fn frame_is_popped_after_panic() {
        let result = std::panic::catch_unwind(|| {
            let _ = track(|| panic!("boom"));
        });
        assert!(result.is_err());
        assert!(!is_tracking());
    }
}
