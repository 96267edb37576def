//! Motion source implementations.

pub mod iio;
pub mod manual;
pub mod simulated;

use crate::error::ConfigError;
use crate::source::MotionSource;

pub use iio::IioSource;
pub use manual::{ManualGrant, ManualSource};
pub use simulated::{SimulatedConfig, SimulatedSource};

/// Every built-in source that can be constructed without host input.
pub fn all_sources(rate_hz: f64) -> Result<Vec<Box<dyn MotionSource>>, ConfigError> {
    Ok(vec![
        Box::new(IioSource::new(rate_hz)?),
        Box::new(SimulatedSource::new(SimulatedConfig {
            rate_hz,
            ..SimulatedConfig::default()
        })?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_hardware_then_simulation() {
        let sources = all_sources(60.0).unwrap();
        let names: Vec<_> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["iio_accel", "simulated"]);
    }

    #[test]
    fn bad_rate_fails_listing() {
        assert!(matches!(all_sources(0.0), Err(ConfigError::RateOutOfRange(_))));
    }
}
