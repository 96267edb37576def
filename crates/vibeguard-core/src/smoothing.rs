//! Display smoothing filter.
//!
//! Exponential moving average over the raw channel, kept in its own bounded
//! window for charts. Its output is for display only and is never submitted
//! for analysis.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One smoothed point for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySample {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub value: f64,
}

/// `value = value * (1 - alpha) + raw * alpha`, starting from 0.
#[derive(Debug, Clone)]
pub struct DisplayFilter {
    alpha: f64,
    value: f64,
    window: VecDeque<DisplaySample>,
    capacity: usize,
}

impl DisplayFilter {
    /// `alpha` is clamped into (0, 1]; validate config upstream for strictness.
    pub fn new(alpha: f64, capacity: usize) -> Self {
        let alpha = if alpha.is_finite() {
            alpha.clamp(f64::EPSILON, 1.0)
        } else {
            0.2
        };
        let capacity = capacity.max(1);
        Self {
            alpha,
            value: 0.0,
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Fold one raw reading in and append the smoothed point.
    pub fn push(&mut self, timestamp_ms: u64, raw: f64) -> DisplaySample {
        self.value = self.value * (1.0 - self.alpha) + raw * self.alpha;
        let sample = DisplaySample {
            timestamp_ms,
            value: self.value,
        };
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
        sample
    }

    /// Current smoothed value.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Display window, oldest first.
    pub fn samples(&self) -> Vec<DisplaySample> {
        self.window.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Forget history and restart from 0.
    pub fn reset(&mut self) {
        self.value = 0.0;
        self.window.clear();
    }
}
