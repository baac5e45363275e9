//! Ticker Frame Host - frame boundaries on a fixed-rate tokio interval
//!
//! Design decisions:
//! 1. One tokio task per host runs every boundary, so boundaries never overlap
//! 2. The task holds a `Weak` reference: dropping every handle ends it
//! 3. A panicking callback is logged and the boundary moves on

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use scheduler::{FrameCallback, FrameHost, FrameQueue, FrameRequestId, FrameTime};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::TickerConfig;
use crate::error::{Result, TickerError};
use crate::events::{EventBus, FrameEvent};

struct Inner {
    config: TickerConfig,
    queue: FrameQueue,
    events: EventBus,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Frame host driven by a tokio interval
///
/// Cloning yields another handle to the same host.
#[derive(Clone)]
pub struct TickerFrameHost {
    inner: Arc<Inner>,
}

impl TickerFrameHost {
    /// Start ticking on the current tokio runtime
    pub fn start(config: TickerConfig) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TickerError::NoRuntime)?;

        let inner = Arc::new(Inner {
            config,
            queue: FrameQueue::new(),
            events: EventBus::new(),
            task: Mutex::new(None),
        });

        let task = runtime.spawn(run(Arc::downgrade(&inner)));
        *inner.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);

        tracing::info!(
            "[TickerFrameHost] Started at {} Hz ({:?})",
            inner.config.frame_rate,
            inner.config.missed_frames
        );

        Ok(Self { inner })
    }

    /// Stop ticking
    ///
    /// Queued registrations are dropped and later ones are refused, so none
    /// of them ever runs. Futures waiting on them stay pending. Queued chains
    /// hold host handles; dropping them is what lets the host be freed.
    pub fn stop(&self) -> Result<()> {
        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or(TickerError::Stopped)?;

        task.abort();
        let dropped = self.inner.queue.close();
        self.inner.events.publish(FrameEvent::Stopped);
        tracing::info!(
            "[TickerFrameHost] Stopped after {} frames, dropped {} registrations",
            self.inner.queue.frame_count(),
            dropped
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn config(&self) -> &TickerConfig {
        &self.inner.config
    }

    /// Boundaries run so far
    pub fn frame_count(&self) -> u64 {
        self.inner.queue.frame_count()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.queue.pending_count()
    }

    /// Subscribe to boundary events
    pub fn subscribe(&self) -> broadcast::Receiver<FrameEvent> {
        self.inner.events.subscribe()
    }
}

impl std::fmt::Debug for TickerFrameHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickerFrameHost")
            .field("config", &self.inner.config)
            .field("queue", &self.inner.queue)
            .field("running", &self.is_running())
            .finish()
    }
}

impl FrameHost for TickerFrameHost {
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId {
        self.inner.queue.push(callback)
    }

    fn cancel_frame(&self, id: FrameRequestId) -> bool {
        self.inner.queue.remove(id)
    }
}

async fn run(weak: Weak<Inner>) {
    let (period, missed) = match weak.upgrade() {
        Some(inner) => (inner.config.frame_interval(), inner.config.missed_frames),
        None => return,
    };

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(missed.into());
    let started = Instant::now();

    loop {
        interval.tick().await;

        let Some(inner) = weak.upgrade() else {
            tracing::debug!("[TickerFrameHost] All handles dropped, ending ticker");
            break;
        };

        let frame = inner.queue.frame_count() + 1;
        let time = FrameTime(started.elapsed());
        let callbacks = inner.queue.run_boundary(time, |id, callback, time| {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(time))) {
                tracing::error!(
                    "[TickerFrameHost] Frame callback {} panicked in frame {}: {}",
                    id,
                    frame,
                    panic_message(panic.as_ref())
                );
            }
        });

        inner
            .events
            .publish(FrameEvent::Boundary { frame, callbacks });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "<non-string panic>"
    }
}
