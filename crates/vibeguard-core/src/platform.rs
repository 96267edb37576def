//! Motion source selection for the current machine.

use crate::error::ConfigError;
use crate::source::{Capability, MotionSource};
use crate::sources::{IioSource, SimulatedConfig, SimulatedSource};

/// Which motion source a session should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceSelection {
    /// Hardware when present, simulation otherwise.
    #[default]
    Auto,
    Simulated,
    Iio,
}

impl std::str::FromStr for SourceSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "simulated" | "sim" => Ok(Self::Simulated),
            "iio" => Ok(Self::Iio),
            other => Err(format!(
                "unknown motion source '{other}' (expected auto, simulated or iio)"
            )),
        }
    }
}

/// Build the motion source for `selection`.
///
/// `Iio` is returned even when no accelerometer exists, so that the
/// permission gate reports `Unsupported` instead of silently simulating.
/// The rate in `simulated` drives hardware polling too, and is validated
/// whichever source is picked.
pub fn detect_motion_source(
    selection: SourceSelection,
    simulated: SimulatedConfig,
) -> Result<Box<dyn MotionSource>, ConfigError> {
    simulated.validate()?;
    Ok(match selection {
        SourceSelection::Simulated => Box::new(SimulatedSource::new(simulated)?),
        SourceSelection::Iio => Box::new(IioSource::new(simulated.rate_hz)?),
        SourceSelection::Auto => {
            let iio = IioSource::new(simulated.rate_hz)?;
            if iio.capability() == Capability::Unsupported {
                log::warn!("no hardware accelerometer found, using simulated motion");
                Box::new(SimulatedSource::new(simulated)?)
            } else {
                log::info!("using accelerometer at {:?}", iio.device().map(|d| &d.dir));
                Box::new(iio)
            }
        }
    })
}
