//! IioSource: Linux Industrial I/O accelerometer via sysfs.
//!
//! Tablets, convertibles and many phones running mainline Linux expose their
//! accelerometer under `/sys/bus/iio/devices/iio:deviceN/` as
//! `in_accel_{x,y,z}_raw` plus a scale (and optional offset) that converts raw
//! counts to m/s². Readings include gravity, so the channel selector's
//! gravity fallback applies.
//!
//! Sysfs has no push interface without a configured trigger, so the source
//! polls at its nominal rate.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::config::check_sample_rate;
use crate::error::ConfigError;
use crate::motion::{Axis, MotionEvent, Vector3};
use crate::source::{
    Capability, GrantDecision, MotionSource, SUBSCRIPTION_QUEUE, SourceInfo, SourceKind,
    Subscription, offer,
};

/// Default sysfs location of IIO devices.
pub const IIO_ROOT: &str = "/sys/bus/iio/devices";

/// Consecutive failed polls after which the subscription ends.
const MAX_READ_FAILURES: u32 = 5;

static IIO_INFO: SourceInfo = SourceInfo {
    name: "iio_accel",
    description: "Linux IIO accelerometer (sysfs, polled)",
    kind: SourceKind::Iio,
    nominal_rate_hz: 60.0,
};

/// A discovered accelerometer.
#[derive(Debug, Clone, PartialEq)]
pub struct IioDevice {
    pub dir: PathBuf,
    /// Raw channel file per axis, X/Y/Z order.
    pub channels: [Option<PathBuf>; 3],
    pub scale: [f64; 3],
    pub offset: [f64; 3],
}

impl IioDevice {
    /// Inspect one `iio:deviceN` directory.
    pub fn probe(dir: &Path) -> Option<Self> {
        let mut channels: [Option<PathBuf>; 3] = [None, None, None];
        let mut scale = [1.0; 3];
        let mut offset = [0.0; 3];
        let shared_scale = read_value(&dir.join("in_accel_scale"));
        let shared_offset = read_value(&dir.join("in_accel_offset"));

        for (i, axis) in [Axis::X, Axis::Y, Axis::Z].into_iter().enumerate() {
            let raw = dir.join(format!("in_accel_{axis}_raw"));
            if !raw.exists() {
                continue;
            }
            channels[i] = Some(raw);
            scale[i] = read_value(&dir.join(format!("in_accel_{axis}_scale")))
                .or(shared_scale)
                .unwrap_or(1.0);
            offset[i] = read_value(&dir.join(format!("in_accel_{axis}_offset")))
                .or(shared_offset)
                .unwrap_or(0.0);
        }

        channels.iter().any(Option::is_some).then(|| Self {
            dir: dir.to_path_buf(),
            channels,
            scale,
            offset,
        })
    }

    /// First channel file present, used for the access check.
    fn first_channel(&self) -> Option<&Path> {
        self.channels.iter().flatten().map(PathBuf::as_path).next()
    }

    /// Convert a raw count to m/s².
    fn convert(&self, index: usize, raw: f64) -> f64 {
        (raw + self.offset[index]) * self.scale[index]
    }

    /// Read one gravity-inclusive vector.
    async fn read(&self) -> std::io::Result<Vector3> {
        let mut out = [None; 3];
        for (i, channel) in self.channels.iter().enumerate() {
            let Some(path) = channel else { continue };
            let text = tokio::fs::read_to_string(path).await?;
            let raw = parse_value(&text).ok_or_else(|| {
                std::io::Error::new(
                    ErrorKind::InvalidData,
                    format!("unparseable reading in {}", path.display()),
                )
            })?;
            out[i] = Some(self.convert(i, raw));
        }
        Ok(Vector3 {
            x: out[0],
            y: out[1],
            z: out[2],
        })
    }
}

/// Parse a sysfs numeric attribute.
fn parse_value(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn read_value(path: &Path) -> Option<f64> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| parse_value(&s))
}

/// Find the first accelerometer under `root`.
pub fn discover(root: &Path) -> Option<IioDevice> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("iio:device"))
        })
        .collect();
    dirs.sort();
    dirs.iter().find_map(|d| IioDevice::probe(d))
}

/// Motion source backed by a sysfs IIO accelerometer.
#[derive(Debug, Clone)]
pub struct IioSource {
    device: Option<IioDevice>,
    rate_hz: f64,
}

impl IioSource {
    /// Discover a device under the standard sysfs root.
    pub fn new(rate_hz: f64) -> Result<Self, ConfigError> {
        Self::with_root(Path::new(IIO_ROOT), rate_hz)
    }

    pub fn with_root(root: &Path, rate_hz: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            device: discover(root),
            rate_hz: check_sample_rate(rate_hz)?,
        })
    }

    pub fn device(&self) -> Option<&IioDevice> {
        self.device.as_ref()
    }
}

impl MotionSource for IioSource {
    fn info(&self) -> &SourceInfo {
        &IIO_INFO
    }

    fn capability(&self) -> Capability {
        match &self.device {
            Some(_) => Capability::RequiresGrant,
            None => Capability::Unsupported,
        }
    }

    fn request_grant(&self) -> std::io::Result<GrantDecision> {
        let Some(path) = self.device.as_ref().and_then(IioDevice::first_channel) else {
            return Err(std::io::Error::new(
                ErrorKind::NotFound,
                "accelerometer disappeared",
            ));
        };
        match std::fs::File::open(path) {
            Ok(_) => Ok(GrantDecision::Granted),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Ok(GrantDecision::Denied),
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_QUEUE);
        let Some(device) = self.device.clone() else {
            // Sender dropped here: the subscription ends immediately.
            return Subscription::new(rx, None);
        };
        let period = Duration::from_secs_f64(1.0 / self.rate_hz);

        let producer = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut failures = 0u32;
            loop {
                ticker.tick().await;
                match device.read().await {
                    Ok(v) => {
                        failures = 0;
                        if !offer(&tx, MotionEvent::with_gravity(crate::now_ms(), v)) {
                            break;
                        }
                    }
                    Err(e) => {
                        failures += 1;
                        log::debug!("iio read failed ({failures}/{MAX_READ_FAILURES}): {e}");
                        if failures >= MAX_READ_FAILURES {
                            log::warn!(
                                "accelerometer at {} stopped responding: {e}",
                                device.dir.display()
                            );
                            break;
                        }
                    }
                }
            }
        });

        Subscription::new(rx, Some(producer))
    }
}
