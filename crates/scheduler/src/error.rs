//! Error types for frame scheduling
//!
//! Deferring never fails. Only the opt-in cancel handle can report
//! that a chain already reached a terminal state.

use crate::types::ChainId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FrameError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame chain already fired: {0}")]
    AlreadyFired(ChainId),

    #[error("Frame chain already cancelled: {0}")]
    AlreadyCancelled(ChainId),
}
