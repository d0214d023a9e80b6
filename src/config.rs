//! Flow Configuration
//!
//! Settings for the continue offer and the ad unit it monetizes.
//! Loaded from defaults, environment variables or a JSON document.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{FailCount, DEFAULT_FAIL_LIMIT, DEFAULT_FRAME_RATE_HZ, DEFAULT_TIMEOUT_SECONDS};

/// Ad unit used when no production unit is configured.
pub const TEST_AD_UNIT_ID: &str = "ait-ad-test-rewarded-id";

/// Configuration for the continue-or-end flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Countdown before the offer times out (seconds).
    pub timeout_seconds: f64,
    /// Fail count at which the offer is skipped and the run ends.
    pub fail_limit: FailCount,
    /// Rewarded ad unit requested on every presentation.
    pub ad_unit_id: String,
    /// Master switch for ad monetization.
    pub ads_enabled: bool,
    /// High-frequency clock rate. `None` runs on the 1 s fallback only.
    pub frame_rate_hz: Option<u32>,
    /// Give up waiting for the ad to be dismissed after this long (seconds).
    pub ad_show_timeout_secs: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            fail_limit: DEFAULT_FAIL_LIMIT,
            ad_unit_id: TEST_AD_UNIT_ID.to_string(),
            ads_enabled: true,
            frame_rate_hz: Some(DEFAULT_FRAME_RATE_HZ),
            ad_show_timeout_secs: 90,
        }
    }
}

impl FlowConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let ad_unit_id = match std::env::var("CONTINUE_AD_UNIT_ID") {
            Ok(id) if !id.trim().is_empty() => {
                if id == TEST_AD_UNIT_ID {
                    info!("Using test ad unit");
                } else {
                    info!("Using production ad unit");
                }
                id
            }
            _ => {
                warn!("CONTINUE_AD_UNIT_ID not set, falling back to test ad unit");
                defaults.ad_unit_id.clone()
            }
        };

        Self {
            timeout_seconds: std::env::var("CONTINUE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_seconds),
            fail_limit: std::env::var("CONTINUE_FAIL_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fail_limit),
            ad_unit_id,
            ads_enabled: std::env::var("CONTINUE_ADS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.ads_enabled),
            ..defaults
        }
    }

    /// Parse and validate a JSON document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values the flow relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timeout()?;
        if self.fail_limit == 0 {
            return Err(ConfigError::ZeroFailLimit);
        }
        if self.frame_rate_hz == Some(0) {
            return Err(ConfigError::ZeroFrameRate);
        }
        if self.ad_unit_id.trim().is_empty() {
            return Err(ConfigError::EmptyAdUnit);
        }
        Ok(())
    }

    /// Countdown duration.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        if self.timeout_seconds <= 0.0 {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }
        Duration::try_from_secs_f64(self.timeout_seconds)
            .map_err(|_| ConfigError::InvalidTimeout(self.timeout_seconds))
    }

    /// Frame interval of the high-frequency clock, if enabled.
    pub fn frame_interval(&self) -> Option<Duration> {
        self.frame_rate_hz
            .filter(|hz| *hz > 0)
            .map(|hz| Duration::from_micros(1_000_000 / hz as u64))
    }

    /// Maximum wait for an ad presentation to finish.
    pub fn ad_show_timeout(&self) -> Duration {
        Duration::from_secs(self.ad_show_timeout_secs)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Document is not valid JSON for this config.
    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),
    /// Countdown must be a positive, finite number of seconds.
    #[error("invalid timeout: {0} seconds")]
    InvalidTimeout(f64),
    /// A zero fail limit would skip every offer.
    #[error("fail limit must be at least 1")]
    ZeroFailLimit,
    /// Frame rate must be positive when set.
    #[error("frame rate must be positive")]
    ZeroFrameRate,
    /// Ad unit id is blank.
    #[error("ad unit id is empty")]
    EmptyAdUnit,
}
