//! Ticker Frame Host - tokio-driven frame boundaries
//!
//! Pairs the `scheduler` crate with a real clock: a [`TickerFrameHost`]
//! runs one frame boundary per interval tick, so `defer_frames` and
//! `defer_frames_p` work inside any tokio application.
//!
//! ```ignore
//! let host = TickerFrameHost::start(TickerConfig::default())?;
//! scheduler::defer_frames_p(&host, 10).await; // ~166ms at 60 Hz
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod host;

pub use config::{MissedFramePolicy, TickerConfig};
pub use error::{Result, TickerError};
pub use events::{EventBus, FrameEvent};
pub use host::TickerFrameHost;
