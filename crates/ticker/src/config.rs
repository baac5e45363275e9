//! Ticker configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::error::{Result, TickerError};

/// Highest accepted frame rate
pub const MAX_FRAME_RATE: u32 = 1000;

/// What to do when boundaries fall behind the interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissedFramePolicy {
    /// Run the missed boundaries back to back
    Burst,
    /// Restart the interval from the late boundary
    Delay,
    /// Drop missed boundaries, stay on the original grid
    #[default]
    Skip,
}

impl From<MissedFramePolicy> for MissedTickBehavior {
    fn from(policy: MissedFramePolicy) -> Self {
        match policy {
            MissedFramePolicy::Burst => MissedTickBehavior::Burst,
            MissedFramePolicy::Delay => MissedTickBehavior::Delay,
            MissedFramePolicy::Skip => MissedTickBehavior::Skip,
        }
    }
}

/// Ticker host configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerConfig {
    /// Boundaries per second
    pub frame_rate: u32,
    pub missed_frames: MissedFramePolicy,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            missed_frames: MissedFramePolicy::Skip,
        }
    }
}

impl TickerConfig {
    pub fn with_frame_rate(frame_rate: u32) -> Self {
        Self {
            frame_rate,
            ..Self::default()
        }
    }

    /// Parse from JSON, missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 || self.frame_rate > MAX_FRAME_RATE {
            return Err(TickerError::InvalidFrameRate(self.frame_rate));
        }
        Ok(())
    }

    /// Time between two boundaries
    pub fn frame_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.frame_rate.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_60hz() {
        let config = TickerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_interval(), Duration::from_nanos(16_666_666));
    }

    #[test]
    fn test_from_json_partial() {
        let config = TickerConfig::from_json(r#"{ "frame_rate": 120 }"#).unwrap();
        assert_eq!(config.frame_rate, 120);
        assert_eq!(config.missed_frames, MissedFramePolicy::Skip);

        let config = TickerConfig::from_json(r#"{ "missed_frames": "burst" }"#).unwrap();
        assert_eq!(config.frame_rate, 60);
        assert_eq!(config.missed_frames, MissedFramePolicy::Burst);
    }

    #[test]
    fn test_rejects_bad_rates() {
        for rate in [0, MAX_FRAME_RATE + 1] {
            match TickerConfig::with_frame_rate(rate).validate() {
                Err(TickerError::InvalidFrameRate(r)) => assert_eq!(r, rate),
                other => panic!("Expected InvalidFrameRate, got {:?}", other),
            }
        }

        assert!(matches!(
            TickerConfig::from_json(r#"{ "frame_rate": 0 }"#),
            Err(TickerError::InvalidFrameRate(0))
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            TickerConfig::from_json(r#"{ "missed_frames": "sometimes" }"#),
            Err(TickerError::Config(_))
        ));
    }
}
