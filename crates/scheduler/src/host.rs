//! Frame host primitive and the FIFO registry behind it
//!
//! ## Model
//!
//! ```text
//! request_frame(cb) ─→ FrameQueue [#1][#2][#3] ─→ run_boundary()
//!                                  ↑ ids grow     runs only what was
//!                                                 queued when it began
//! ```
//!
//! A callback registered while a boundary runs lands behind the boundary
//! cut-off and waits for the next one. That is what lets a chain consume
//! exactly one boundary per step.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::types::{FrameCallback, FrameRequestId, FrameTime};

/// Host-provided per-frame callback registration
///
/// Contract: each registered callback runs once, at the next boundary,
/// in FIFO order relative to other callbacks for the same boundary.
/// Registration never fails.
///
/// Implementors are cheap handles (`Clone`) so a chain can carry its host
/// into the next registration.
pub trait FrameHost: Send + Sync {
    /// Register `callback` for the next boundary
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId;

    /// Drop a registration that has not run yet
    ///
    /// Returns `false` if it already ran, was cancelled, or never existed.
    fn cancel_frame(&self, id: FrameRequestId) -> bool;
}

/// FIFO registry of pending frame callbacks
///
/// Both bundled hosts store their registrations here. The lock is only held
/// to push or pop; callbacks always run unlocked so they may register
/// (or cancel) on the same queue.
pub struct FrameQueue {
    /// Monotonic registration counter (also the next id), never rewound
    next_id: AtomicU64,

    /// Registrations made before the last `clear`
    base: AtomicU64,

    /// Pending registrations in request order
    pending: Mutex<VecDeque<(FrameRequestId, FrameCallback)>>,

    /// Boundaries run so far
    frames: AtomicU64,

    /// Set by `close`: new registrations are dropped on arrival
    closed: AtomicBool,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            base: AtomicU64::new(0),
            pending: Mutex::new(VecDeque::new()),
            frames: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    // A panicking callback never runs under the lock, so poisoning only
    // means some other thread panicked mid push/pop. The deque is still valid.
    fn lock(&self) -> MutexGuard<'_, VecDeque<(FrameRequestId, FrameCallback)>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, callback: FrameCallback) -> FrameRequestId {
        let mut pending = self.lock();
        // Allocate under the lock so queue order always matches id order
        let id = FrameRequestId(self.next_id.fetch_add(1, Ordering::SeqCst));
        if self.closed.load(Ordering::SeqCst) {
            drop(pending);
            tracing::trace!("Frame request {} dropped: queue closed", id);
            drop(callback);
            return id;
        }
        pending.push_back((id, callback));
        id
    }

    pub fn remove(&self, id: FrameRequestId) -> bool {
        let mut pending = self.lock();
        match pending.iter().position(|(queued, _)| *queued == id) {
            Some(pos) => {
                pending.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Pop the oldest registration
    pub fn pop(&self) -> Option<(FrameRequestId, FrameCallback)> {
        self.lock().pop_front()
    }

    /// Run one boundary: every callback queued right now, oldest first
    ///
    /// `invoke` decides how a callback is run (directly, or under a panic
    /// guard). If `invoke` unwinds, the callbacks not yet popped stay queued.
    /// Returns the number of callbacks that ran.
    pub fn run_boundary<F>(&self, time: FrameTime, mut invoke: F) -> usize
    where
        F: FnMut(FrameRequestId, FrameCallback, FrameTime),
    {
        let cutoff = self.next_id.load(Ordering::SeqCst);
        let frame = self.frames.fetch_add(1, Ordering::SeqCst) + 1;
        let mut ran = 0;

        loop {
            let next = {
                let mut pending = self.lock();
                match pending.front() {
                    Some((id, _)) if id.0 < cutoff => pending.pop_front(),
                    _ => None,
                }
            };

            let Some((id, callback)) = next else {
                break;
            };

            invoke(id, callback, time);
            ran += 1;
        }

        tracing::trace!("Frame boundary {} ran {} callbacks", frame, ran);
        ran
    }

    /// Total registrations since creation or the last `clear`
    pub fn request_count(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst) - 1 - self.base.load(Ordering::SeqCst)
    }

    /// Registrations still waiting for a boundary
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Boundaries run so far
    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop all pending registrations and restart the counters
    ///
    /// Ids keep growing: a stale id from before the clear can never match a
    /// newer registration.
    pub fn clear(&self) {
        let dropped = {
            let mut pending = self.lock();
            self.base
                .store(self.next_id.load(Ordering::SeqCst) - 1, Ordering::SeqCst);
            self.frames.store(0, Ordering::SeqCst);
            std::mem::take(&mut *pending)
        };
        // Callbacks may own host handles; drop them with the lock released
        drop(dropped);
    }

    /// Drop all pending registrations and refuse new ones
    ///
    /// Returns how many registrations were dropped. Counters are kept.
    pub fn close(&self) -> usize {
        let dropped = {
            let mut pending = self.lock();
            self.closed.store(true, Ordering::SeqCst);
            std::mem::take(&mut *pending)
        };
        dropped.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("request_count", &self.request_count())
            .field("pending", &self.pending_count())
            .field("frames", &self.frame_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder(log: &Arc<Mutex<Vec<u32>>>, tag: u32) -> FrameCallback {
        let log = log.clone();
        Box::new(move |_| log.lock().unwrap().push(tag))
    }

    #[test]
    fn test_ids_are_monotonic() {
        let queue = FrameQueue::new();
        let a = queue.push(Box::new(|_| {}));
        let b = queue.push(Box::new(|_| {}));
        assert_eq!(a, FrameRequestId(1));
        assert_eq!(b, FrameRequestId(2));
        assert_eq!(queue.request_count(), 2);
    }

    #[test]
    fn test_boundary_runs_fifo() {
        let queue = FrameQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in 1..=3 {
            queue.push(recorder(&log, tag));
        }

        let ran = queue.run_boundary(FrameTime::default(), |_, cb, t| cb(t));
        assert_eq!(ran, 3);
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(queue.frame_count(), 1);
    }

    #[test]
    fn test_registration_during_boundary_waits_for_next() {
        let queue = Arc::new(FrameQueue::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_queue = queue.clone();
        let inner_log = log.clone();
        queue.push(Box::new(move |_| {
            inner_log.lock().unwrap().push(1);
            inner_queue.push(recorder(&inner_log, 2));
        }));

        assert_eq!(queue.run_boundary(FrameTime::default(), |_, cb, t| cb(t)), 1);
        assert_eq!(*log.lock().unwrap(), vec![1]);
        assert_eq!(queue.pending_count(), 1);

        assert_eq!(queue.run_boundary(FrameTime::default(), |_, cb, t| cb(t)), 1);
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_pending() {
        let queue = FrameQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        queue.push(recorder(&log, 1));
        let id = queue.push(recorder(&log, 2));

        assert!(queue.remove(id));
        assert!(!queue.remove(id));
        queue.run_boundary(FrameTime::default(), |_, cb, t| cb(t));
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_clear_resets_counters() {
        let queue = FrameQueue::new();
        queue.push(Box::new(|_| {}));
        queue.run_boundary(FrameTime::default(), |_, cb, t| cb(t));
        queue.push(Box::new(|_| {}));

        queue.clear();
        assert_eq!(queue.request_count(), 0);
        assert_eq!(queue.frame_count(), 0);
        assert!(queue.is_empty());

        // Ids are not reused after a clear
        assert_eq!(queue.push(Box::new(|_| {})), FrameRequestId(3));
        assert_eq!(queue.request_count(), 1);
    }

    #[test]
    fn test_stale_id_misses_after_clear() {
        let queue = FrameQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let stale = queue.push(recorder(&log, 1));
        queue.clear();
        queue.push(recorder(&log, 2));

        assert!(!queue.remove(stale));
        queue.run_boundary(FrameTime::default(), |_, cb, t| cb(t));
        assert_eq!(*log.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_close_drops_pending_and_new_callbacks() {
        let queue = FrameQueue::new();
        let owned = Arc::new(());

        let held = owned.clone();
        queue.push(Box::new(move |_| drop(held)));
        assert_eq!(queue.close(), 1);
        assert!(queue.is_closed());

        let held = owned.clone();
        let id = queue.push(Box::new(move |_| drop(held)));
        assert_eq!(id, FrameRequestId(2));
        assert!(queue.is_empty());
        assert_eq!(Arc::strong_count(&owned), 1);
        assert_eq!(queue.run_boundary(FrameTime::default(), |_, cb, t| cb(t)), 0);
    }
}
