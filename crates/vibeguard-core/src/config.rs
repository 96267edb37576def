//! Session and analyzer configuration.

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::motion::Axis;

/// Environment variable consulted for the analyzer base URL.
pub const ANALYZER_URL_ENV: &str = "VIBEGUARD_ANALYZER_URL";

/// Analyzer used when nothing else is configured (a locally running backend).
pub const DEFAULT_ANALYZER_URL: &str = "http://127.0.0.1:8000";

/// The analysis service refuses submissions shorter than this.
pub const MIN_ANALYSIS_SAMPLES: usize = 50;

/// Event rates a motion source can be driven at, in Hz.
pub const SAMPLE_RATE_RANGE: RangeInclusive<f64> = 1.0..=1000.0;

/// Accept `rate_hz` only if it lies within [`SAMPLE_RATE_RANGE`].
pub fn check_sample_rate(rate_hz: f64) -> Result<f64, ConfigError> {
    if SAMPLE_RATE_RANGE.contains(&rate_hz) {
        Ok(rate_hz)
    } else {
        Err(ConfigError::RateOutOfRange(rate_hz))
    }
}

/// Tunables for one monitoring session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Raw samples retained for analysis.
    pub buffer_capacity: usize,
    /// Smoothed points retained for display.
    pub display_capacity: usize,
    /// Exponential smoothing factor for the display filter, in (0, 1).
    pub smoothing_alpha: f64,
    /// Length of one baseline/tracking sampling window.
    pub window: Duration,
    /// Acceleration axis used as the scalar channel.
    pub axis: Axis,
    /// Subtract standard gravity when falling back to the gravity-inclusive reading.
    pub subtract_gravity: bool,
    /// Submit the idle buffer for a non-recorded reading at this interval.
    pub live_sync: Option<Duration>,
    /// Poll the analyzer's health endpoint at this interval.
    pub health_probe: Option<Duration>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 300,
            display_capacity: 60,
            smoothing_alpha: 0.2,
            window: Duration::from_secs(5),
            axis: Axis::Z,
            subtract_gravity: true,
            live_sync: None,
            health_probe: None,
        }
    }
}

impl MonitorConfig {
    /// Check invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("buffer"));
        }
        if self.display_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("display"));
        }
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha < 1.0) {
            return Err(ConfigError::AlphaOutOfRange(self.smoothing_alpha));
        }
        if self.window.is_zero() {
            return Err(ConfigError::ZeroDuration("sampling window"));
        }
        if self.live_sync.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::ZeroDuration("live sync interval"));
        }
        if self.health_probe.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::ZeroDuration("health probe interval"));
        }
        if self.buffer_capacity < MIN_ANALYSIS_SAMPLES {
            log::warn!(
                "buffer capacity {} is below the analyzer minimum of {} samples; captures will be rejected",
                self.buffer_capacity,
                MIN_ANALYSIS_SAMPLES
            );
        }
        Ok(())
    }
}

/// Where and how to reach the analysis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ANALYZER_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Base URL from [`ANALYZER_URL_ENV`], falling back to the default.
    pub fn from_env() -> Self {
        match std::env::var(ANALYZER_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        }
    }

    /// Parse the base URL, normalizing away a trailing slash.
    pub fn parsed_base(&self) -> Result<reqwest::Url, ConfigError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        let url = reqwest::Url::parse(trimmed)
            .map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(self.base_url.clone()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("gateway timeout"));
        }
        Ok(url)
    }
}
