//! SimulatedSource: synthetic structural response for bench use and demos.
//!
//! Produces a single dominant mode (a sine at `modal_hz`) on the vertical axis
//! plus uniform sensor noise on all three axes, at a fixed event rate. The
//! default mode sits at 6.2 Hz, a typical first bending mode for a short span.

use std::f64::consts::TAU;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::config::check_sample_rate;
use crate::error::ConfigError;
use crate::motion::{MotionEvent, STANDARD_GRAVITY, Vector3};
use crate::source::{
    Capability, GrantDecision, MotionSource, SUBSCRIPTION_QUEUE, SourceInfo, SourceKind,
    Subscription, offer,
};

static SIMULATED_INFO: SourceInfo = SourceInfo {
    name: "simulated",
    description: "Synthetic single-mode bridge response with sensor noise",
    kind: SourceKind::Simulated,
    nominal_rate_hz: 60.0,
};

/// Parameters of the synthetic response.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Event rate in Hz.
    pub rate_hz: f64,
    /// Frequency of the dominant mode in Hz.
    pub modal_hz: f64,
    /// Peak modal acceleration in m/s².
    pub amplitude: f64,
    /// Half-width of the uniform noise in m/s².
    pub noise: f64,
    /// Whether events carry the gravity-compensated reading. When `false`,
    /// only the gravity-inclusive vector is emitted.
    pub gravity_compensated: bool,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
    /// Mimic platforms that gate motion data behind an explicit prompt.
    pub requires_grant: bool,
    /// Answer given when a grant is requested.
    pub grant: GrantDecision,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            rate_hz: 60.0,
            modal_hz: 6.2,
            amplitude: 0.35,
            noise: 0.05,
            gravity_compensated: true,
            seed: None,
            requires_grant: false,
            grant: GrantDecision::Granted,
        }
    }
}

impl SimulatedConfig {
    /// Reject rates and signal parameters the generator cannot produce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_sample_rate(self.rate_hz)?;
        for (name, value) in [
            ("modal frequency", self.modal_hz),
            ("amplitude", self.amplitude),
            ("noise", self.noise),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidParameter(name, value));
            }
        }
        Ok(())
    }

    /// Build the event for sample index `n`.
    fn event<R: Rng>(&self, n: u64, rng: &mut R, timestamp_ms: u64) -> MotionEvent {
        let t = n as f64 / self.rate_hz;
        let mut jitter = || {
            if self.noise > 0.0 {
                rng.random_range(-self.noise..=self.noise)
            } else {
                0.0
            }
        };
        let x = jitter();
        let y = jitter();
        let z = self.amplitude * (TAU * self.modal_hz * t).sin() + jitter();

        let including_gravity = Vector3::new(x, y, z + STANDARD_GRAVITY);
        if self.gravity_compensated {
            MotionEvent {
                timestamp_ms,
                acceleration: Some(Vector3::new(x, y, z)),
                acceleration_including_gravity: Some(including_gravity),
            }
        } else {
            MotionEvent::with_gravity(timestamp_ms, including_gravity)
        }
    }
}

/// Motion source backed by a synthetic signal generator.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSource {
    config: SimulatedConfig,
}

impl SimulatedSource {
    pub fn new(config: SimulatedConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulatedConfig {
        &self.config
    }
}

impl MotionSource for SimulatedSource {
    fn info(&self) -> &SourceInfo {
        &SIMULATED_INFO
    }

    fn capability(&self) -> Capability {
        if self.config.requires_grant {
            Capability::RequiresGrant
        } else {
            Capability::Immediate
        }
    }

    fn request_grant(&self) -> std::io::Result<GrantDecision> {
        Ok(self.config.grant)
    }

    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_QUEUE);
        let config = self.config.clone();

        let producer = tokio::spawn(async move {
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let period = Duration::from_secs_f64(1.0 / config.rate_hz);
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut n: u64 = 0;
            loop {
                ticker.tick().await;
                let event = config.event(n, &mut rng, crate::now_ms());
                if !offer(&tx, event) {
                    break;
                }
                n += 1;
            }
            log::debug!("simulated source stopped after {n} events");
        });

        Subscription::new(rx, Some(producer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noiseless_signal_follows_sine() {
        let config = SimulatedConfig {
            noise: 0.0,
            amplitude: 1.0,
            modal_hz: 1.0,
            rate_hz: 4.0,
            ..SimulatedConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let quarter = config.event(1, &mut rng, 0);
        let z = quarter.acceleration.unwrap().z.unwrap();
        assert!((z - 1.0).abs() < 1e-9, "expected crest at t=0.25s, got {z}");

        let g = quarter.acceleration_including_gravity.unwrap().z.unwrap();
        assert!((g - (1.0 + STANDARD_GRAVITY)).abs() < 1e-9);
    }

    #[test]
    fn noise_stays_within_bounds() {
        let config = SimulatedConfig {
            amplitude: 0.0,
            noise: 0.1,
            ..SimulatedConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(42);
        for n in 0..500 {
            let a = config.event(n, &mut rng, 0).acceleration.unwrap();
            for v in [a.x, a.y, a.z] {
                assert!(v.unwrap().abs() <= 0.1 + 1e-12);
            }
        }
    }

    #[test]
    fn uncompensated_mode_only_reports_gravity_vector() {
        let config = SimulatedConfig {
            gravity_compensated: false,
            ..SimulatedConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let event = config.event(0, &mut rng, 0);
        assert!(event.acceleration.is_none());
        assert!(event.acceleration_including_gravity.is_some());
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let config = SimulatedConfig {
            seed: Some(9),
            ..SimulatedConfig::default()
        };
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        for n in 0..20 {
            assert_eq!(config.event(n, &mut a, 0), config.event(n, &mut b, 0));
        }
    }

    #[test]
    fn grant_settings_are_reported() {
        let source = SimulatedSource::new(SimulatedConfig {
            requires_grant: true,
            grant: GrantDecision::Denied,
            ..SimulatedConfig::default()
        })
        .unwrap();
        assert_eq!(source.capability(), Capability::RequiresGrant);
        assert_eq!(source.request_grant().unwrap(), GrantDecision::Denied);
        assert_eq!(SimulatedSource::default().capability(), Capability::Immediate);
    }

    #[test]
    fn out_of_range_rates_are_rejected() {
        for rate_hz in [0.0, -10.0, 1e10, f64::NAN, f64::INFINITY] {
            let result = SimulatedSource::new(SimulatedConfig {
                rate_hz,
                ..SimulatedConfig::default()
            });
            assert!(
                matches!(result, Err(ConfigError::RateOutOfRange(_))),
                "rate {rate_hz} should be rejected"
            );
        }
        for rate_hz in [1.0, 1000.0] {
            let config = SimulatedConfig {
                rate_hz,
                ..SimulatedConfig::default()
            };
            assert!(SimulatedSource::new(config).is_ok());
        }
    }

    #[test]
    fn non_finite_signal_parameters_are_rejected() {
        let config = SimulatedConfig {
            modal_hz: f64::NAN,
            ..SimulatedConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter("modal frequency", _))
        ));

        let config = SimulatedConfig {
            noise: -0.1,
            ..SimulatedConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter("noise", _))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slowest_rate_still_delivers() {
        let source = SimulatedSource::new(SimulatedConfig {
            rate_hz: 1.0,
            seed: Some(5),
            ..SimulatedConfig::default()
        })
        .unwrap();
        let mut sub = source.subscribe();
        for _ in 0..3 {
            let event = sub.recv().await.unwrap();
            assert!(event.acceleration.unwrap().z.unwrap().is_finite());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn subscription_delivers_at_rate() {
        let source = SimulatedSource::new(SimulatedConfig {
            seed: Some(3),
            ..SimulatedConfig::default()
        })
        .unwrap();
        let mut sub = source.subscribe();
        let mut received = 0;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while tokio::time::Instant::now() < deadline {
            if sub.recv().await.is_some() {
                received += 1;
            }
        }
        assert!((58..=62).contains(&received), "got {received} events in 1s");
    }
}
