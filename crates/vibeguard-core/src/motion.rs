//! Motion events and scalar channel extraction.
//!
//! A motion event carries up to two acceleration vectors: the gravity
//! compensated ("linear") reading and the raw, gravity-inclusive one. Only a
//! single axis of one of them is used downstream.

use serde::{Deserialize, Serialize};

/// Standard gravity in m/s².
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Acceleration vector in m/s².
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    /// Component along `axis`, if the platform reported one.
    pub fn component(&self, axis: Axis) -> Option<f64> {
        let v = match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        };
        v.filter(|v| v.is_finite())
    }
}

/// Device axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
            Self::Z => write!(f, "z"),
        }
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "z" => Ok(Self::Z),
            other => Err(format!("unknown axis '{other}' (expected x, y or z)")),
        }
    }
}

/// One hardware motion event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Gravity-compensated acceleration, when the platform provides it.
    pub acceleration: Option<Vector3>,
    /// Raw acceleration including gravity.
    pub acceleration_including_gravity: Option<Vector3>,
}

impl MotionEvent {
    pub fn linear(timestamp_ms: u64, acceleration: Vector3) -> Self {
        Self {
            timestamp_ms,
            acceleration: Some(acceleration),
            acceleration_including_gravity: None,
        }
    }

    pub fn with_gravity(timestamp_ms: u64, acceleration: Vector3) -> Self {
        Self {
            timestamp_ms,
            acceleration: None,
            acceleration_including_gravity: Some(acceleration),
        }
    }
}

/// Picks the scalar sample out of each event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSelector {
    pub axis: Axis,
    pub subtract_gravity: bool,
}

impl Default for ChannelSelector {
    fn default() -> Self {
        Self {
            axis: Axis::Z,
            subtract_gravity: true,
        }
    }
}

impl ChannelSelector {
    pub fn new(axis: Axis, subtract_gravity: bool) -> Self {
        Self {
            axis,
            subtract_gravity,
        }
    }

    /// Extract the scalar sample, preferring the gravity-compensated reading.
    ///
    /// Returns `None` when neither reading carries the selected axis.
    pub fn extract(&self, event: &MotionEvent) -> Option<f64> {
        if let Some(v) = event
            .acceleration
            .and_then(|a| a.component(self.axis))
        {
            return Some(v);
        }
        let raw = event
            .acceleration_including_gravity
            .and_then(|a| a.component(self.axis))?;
        if self.subtract_gravity {
            Some(raw - STANDARD_GRAVITY)
        } else {
            Some(raw)
        }
    }
}
