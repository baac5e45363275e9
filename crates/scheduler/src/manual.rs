//! Manually driven frame host
//!
//! Nothing runs until the owner says so. Used to drive chains frame by frame
//! in tests and in embedders that already own a render loop (call
//! `trigger_frame` once per repaint).

use std::sync::Arc;
use std::time::Instant;

use crate::host::{FrameHost, FrameQueue};
use crate::types::{FrameCallback, FrameRequestId, FrameTime};

/// Frame host with manual trigger control
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone)]
pub struct ManualFrameHost {
    queue: Arc<FrameQueue>,
    started: Instant,
}

impl ManualFrameHost {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(FrameQueue::new()),
            started: Instant::now(),
        }
    }

    fn now(&self) -> FrameTime {
        FrameTime(self.started.elapsed())
    }

    /// Run the single oldest registration
    ///
    /// Returns `false` if nothing was queued.
    pub fn trigger_next(&self) -> bool {
        match self.queue.pop() {
            Some((id, callback)) => {
                tracing::trace!("Manual trigger of frame request {}", id);
                callback(self.now());
                true
            }
            None => false,
        }
    }

    /// Run one full boundary, returns how many callbacks ran
    pub fn trigger_frame(&self) -> usize {
        self.queue
            .run_boundary(self.now(), |_, callback, time| callback(time))
    }

    /// Run callbacks until the queue is empty, returns how many ran
    ///
    /// Chains re-register while this runs, so every pending chain completes.
    pub fn trigger_all(&self) -> usize {
        let mut ran = 0;
        while self.trigger_next() {
            ran += 1;
        }
        ran
    }

    /// Registrations since creation or the last `reset`
    pub fn request_count(&self) -> u64 {
        self.queue.request_count()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.pending_count()
    }

    /// Full boundaries run through `trigger_frame`
    pub fn frame_count(&self) -> u64 {
        self.queue.frame_count()
    }

    /// Drop pending registrations and restart counters
    ///
    /// Request ids are not reused, so handles from before the reset cannot
    /// reach chains started after it.
    pub fn reset(&self) {
        self.queue.clear();
    }
}

impl Default for ManualFrameHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameHost for ManualFrameHost {
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId {
        self.queue.push(callback)
    }

    fn cancel_frame(&self, id: FrameRequestId) -> bool {
        self.queue.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_trigger_next_runs_one() {
        let host = ManualFrameHost::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let count = count.clone();
            host.request_frame(Box::new(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            }));
        }

        assert!(host.trigger_next());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(host.trigger_next());
        assert!(!host.trigger_next());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cancel_frame() {
        let host = ManualFrameHost::new();
        let id = host.request_frame(Box::new(|_| panic!("cancelled callback ran")));

        assert!(host.cancel_frame(id));
        assert_eq!(host.trigger_all(), 0);
    }

    #[test]
    fn test_reset() {
        let host = ManualFrameHost::new();
        host.request_frame(Box::new(|_| {}));
        host.reset();

        assert_eq!(host.request_count(), 0);
        assert_eq!(host.pending_count(), 0);
    }

    #[test]
    fn test_panic_propagates_and_keeps_rest_queued() {
        let host = ManualFrameHost::new();
        host.request_frame(Box::new(|_| panic!("boom")));
        host.request_frame(Box::new(|_| {}));

        let trigger = host.clone();
        let result =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || trigger.trigger_frame()));

        assert!(result.is_err());
        assert_eq!(host.pending_count(), 1);
    }
}
