//! Deferred Frame Scheduling
//!
//! Run a callback after N rendering-frame boundaries, or await a future that
//! resolves at the same point.
//!
//! ## Core Design
//!
//! ```text
//! defer_frames(n, f) → FrameChain { remaining: n } → FrameHost::request_frame
//!                            ↑                                 │
//!                            └──── remaining - 1 ←── boundary ─┘
//!                                  remaining == 0 → f()
//! ```
//!
//! - **The host owns time**: anything implementing [`FrameHost`] provides the
//!   boundaries. [`ManualFrameHost`] is driven by hand; a tokio-driven host
//!   lives in the `ticker` crate.
//! - **No shared state between calls**: every call builds its own chain.
//! - **Fire-and-forget by default**: cancellation is opt-in through
//!   [`defer_frames_cancelable`].

pub mod defer;
pub mod error;
pub mod host;
pub mod manual;
pub mod types;

pub use defer::{
    defer_frames, defer_frames_cancelable, defer_frames_p, DeferredFrames, FrameChainHandle,
};
pub use error::{FrameError, Result};
pub use host::{FrameHost, FrameQueue};
pub use manual::ManualFrameHost;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports_compose() {
        let host = ManualFrameHost::new();
        defer_frames(&host, 1, || {});
        assert_eq!(host.trigger_all(), 2);
    }
}
