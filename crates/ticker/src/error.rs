//! Error types for the ticker host

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TickerError>;

#[derive(Debug, Error)]
pub enum TickerError {
    #[error("Invalid frame rate: {0} (expected 1..=1000 Hz)")]
    InvalidFrameRate(u32),

    #[error("No tokio runtime available to drive frames")]
    NoRuntime,

    #[error("Ticker already stopped")]
    Stopped,

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}
