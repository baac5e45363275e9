//! Deferred frame scheduling
//!
//! `defer_frames(host, n, f)` runs `f` after `n` frame boundaries:
//!
//! ```text
//! n = 0:  request ─→ [boundary 1] ─→ f()
//! n = 2:  request ─→ [boundary 1] ─→ request ─→ [boundary 2] ─→ request ─→ [boundary 3] ─→ f()
//! ```
//!
//! A chain is a value carrying its own countdown. Each boundary moves it into
//! the next registration, so the host drives it one step per frame and the
//! call stack never grows with `n`.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures_util::future::FusedFuture;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{FrameError, Result};
use crate::host::FrameHost;
use crate::types::{clamp_frames, ChainId, ChainState, FrameRequestId};

type Handler = Box<dyn FnOnce() + Send + 'static>;

/// State shared between a running chain and its (optional) handle
#[derive(Debug)]
struct ChainControl {
    id: ChainId,
    state: AtomicU8,
    /// Most recent registration, the only one that can still be pending
    latest: Mutex<Option<FrameRequestId>>,
}

impl ChainControl {
    fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            state: AtomicU8::new(ChainState::Pending as u8),
            latest: Mutex::new(None),
        }
    }

    fn state(&self) -> ChainState {
        ChainState::from_u8(self.state.load(Ordering::SeqCst)).unwrap_or(ChainState::Pending)
    }

    /// Single exit from `Pending`. Exactly one caller wins.
    fn settle(&self, to: ChainState) -> std::result::Result<(), ChainState> {
        self.state
            .compare_exchange(
                ChainState::Pending as u8,
                to as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map(|_| ())
            .map_err(|current| ChainState::from_u8(current).unwrap_or(ChainState::Pending))
    }

    fn record(&self, id: FrameRequestId) {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        // A fast host may run the step (and record its successor) before we get here
        if latest.map_or(true, |current| id > current) {
            *latest = Some(id);
        }
    }

    fn latest(&self) -> Option<FrameRequestId> {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One deferred invocation in flight
struct FrameChain<H> {
    host: H,
    remaining: u64,
    handler: Handler,
    control: Arc<ChainControl>,
}

impl<H> FrameChain<H>
where
    H: FrameHost + Clone + 'static,
{
    fn schedule(self) {
        let host = self.host.clone();
        let control = self.control.clone();
        let id = host.request_frame(Box::new(move |_| self.step()));
        control.record(id);
    }

    fn step(mut self) {
        if self.control.state() != ChainState::Pending {
            tracing::trace!("Frame chain {} dropped: {:?}", self.control.id, self.control.state());
            return;
        }

        if self.remaining > 0 {
            self.remaining -= 1;
            tracing::trace!(
                "Frame chain {} stepping, {} frames remaining",
                self.control.id,
                self.remaining
            );
            self.schedule();
            return;
        }

        if self.control.settle(ChainState::Fired).is_ok() {
            tracing::debug!("Frame chain {} fired", self.control.id);
            (self.handler)();
        }
    }
}

fn start<H, F>(host: &H, n: i64, handler: F) -> Arc<ChainControl>
where
    H: FrameHost + Clone + 'static,
    F: FnOnce() + Send + 'static,
{
    let control = Arc::new(ChainControl::new());
    let remaining = clamp_frames(n);
    tracing::debug!("Deferring {} frames (chain {})", remaining, control.id);

    FrameChain {
        host: host.clone(),
        remaining,
        handler: Box::new(handler),
        control: control.clone(),
    }
    .schedule();

    control
}

/// Run `handler` after `n` frame boundaries have passed
///
/// Negative `n` is treated as 0. The chain uses exactly `n + 1`
/// registrations and `handler` runs once, never synchronously.
/// Fire-and-forget: there is no way to cancel it. Use
/// [`defer_frames_cancelable`] if you need one.
///
/// ```ignore
/// // These two are equivalent:
/// defer_frames(&host, 0, f);
/// host.request_frame(Box::new(move |_| f()));
/// ```
pub fn defer_frames<H, F>(host: &H, n: i64, handler: F)
where
    H: FrameHost + Clone + 'static,
    F: FnOnce() + Send + 'static,
{
    start(host, n, handler);
}

/// Like [`defer_frames`], but returns a handle that can cancel the chain
pub fn defer_frames_cancelable<H, F>(host: &H, n: i64, handler: F) -> FrameChainHandle<H>
where
    H: FrameHost + Clone + 'static,
    F: FnOnce() + Send + 'static,
{
    let control = start(host, n, handler);
    FrameChainHandle {
        host: host.clone(),
        control,
    }
}

/// Future that resolves after `n` frame boundaries
///
/// Resolves at exactly the point [`defer_frames`] would run its handler.
/// Every call schedules its own chain.
///
/// ```ignore
/// async fn fade_in(host: &ManualFrameHost) {
///     // Do something immediately...
///     defer_frames_p(host, 10).await;
///     // ...and something else 10 frames later
/// }
/// ```
pub fn defer_frames_p<H>(host: &H, n: i64) -> DeferredFrames
where
    H: FrameHost + Clone + 'static,
{
    let (tx, rx) = oneshot::channel();
    let control = start(host, n, move || {
        let _ = tx.send(()); // Receiver may be gone, nobody is waiting then
    });

    DeferredFrames {
        rx,
        chain: control.id,
        done: false,
        orphaned: false,
    }
}

/// Returned by [`defer_frames_p`]
///
/// Never errors. If the host drops the registration without running it,
/// this stays pending forever.
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct DeferredFrames {
    rx: oneshot::Receiver<()>,
    chain: ChainId,
    done: bool,
    orphaned: bool,
}

impl DeferredFrames {
    pub fn chain_id(&self) -> ChainId {
        self.chain
    }
}

impl Future for DeferredFrames {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(());
        }
        if this.orphaned {
            return Poll::Pending;
        }

        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(())) => {
                this.done = true;
                Poll::Ready(())
            }
            Poll::Ready(Err(_)) => {
                tracing::warn!(
                    "Frame chain {} was dropped by its host before firing",
                    this.chain
                );
                this.orphaned = true;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl FusedFuture for DeferredFrames {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

/// Handle to a chain started with [`defer_frames_cancelable`]
///
/// Dropping the handle does not cancel the chain.
#[derive(Debug, Clone)]
pub struct FrameChainHandle<H> {
    host: H,
    control: Arc<ChainControl>,
}

impl<H> FrameChainHandle<H>
where
    H: FrameHost,
{
    pub fn id(&self) -> ChainId {
        self.control.id
    }

    pub fn state(&self) -> ChainState {
        self.control.state()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == ChainState::Pending
    }

    /// Host id of the chain's most recent registration
    pub fn latest_request(&self) -> Option<FrameRequestId> {
        self.control.latest()
    }

    /// Stop the chain before its handler runs
    ///
    /// Fails if the handler already ran or the chain was already cancelled.
    pub fn cancel(&self) -> Result<()> {
        match self.control.settle(ChainState::Cancelled) {
            Ok(()) => {
                if let Some(id) = self.control.latest() {
                    self.host.cancel_frame(id);
                }
                tracing::debug!("Frame chain {} cancelled", self.control.id);
                Ok(())
            }
            Err(ChainState::Fired) => Err(FrameError::AlreadyFired(self.control.id)),
            Err(_) => Err(FrameError::AlreadyCancelled(self.control.id)),
        }
    }
}
