//! Core type definitions shared by hosts and chains
//!
//! Key design principles:
//! 1. Ids are plain integers handed out by the host, never reused
//! 2. Callbacks are boxed `FnOnce`: run at most once, then dropped
//! 3. Chain state fits in a byte so it can live in an atomic

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Handle returned by a host for each registration
///
/// Monotonic per host, starts at 1. Plays the role of the
/// `requestAnimationFrame` return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameRequestId(pub u64);

impl fmt::Display for FrameRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Timestamp of a frame boundary, relative to when the host started
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct FrameTime(pub Duration);

impl FrameTime {
    pub fn as_millis_f64(&self) -> f64 {
        self.0.as_secs_f64() * 1000.0
    }
}

/// Identifier of a single deferred chain (used in logs and errors)
pub type ChainId = Uuid;

/// Host-level callback: receives the boundary timestamp
pub type FrameCallback = Box<dyn FnOnce(FrameTime) + Send + 'static>;

/// Lifecycle of one deferred chain
///
/// `Pending` is the only state with outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ChainState {
    Pending = 0,
    Fired = 1,
    Cancelled = 2,
}

impl ChainState {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ChainState::Pending),
            1 => Some(ChainState::Fired),
            2 => Some(ChainState::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChainState::Pending)
    }
}

/// Clamp a caller-supplied frame count: negative means "next frame"
pub fn clamp_frames(n: i64) -> u64 {
    n.max(0) as u64
}
