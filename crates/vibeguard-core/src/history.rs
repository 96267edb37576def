//! Integrity records and the bounded tracking history.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Tracking sets kept per baseline.
pub const HISTORY_CAPACITY: usize = 3;

/// Confidence label attached by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Low,
    /// The service sent no label or one this client does not know.
    Unknown,
}

impl Confidence {
    /// Map the service's free-form label, case-insensitively.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("high") => Self::High,
            Some("low") => Self::Low,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Low => write!(f, "Low"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of one completed tracking set. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityRecord {
    /// Structural similarity to the baseline condition, 0 to 100.
    pub score: f64,
    /// Dominant frequency of this set in Hz.
    pub frequency_hz: f64,
    /// Uncertainty of `frequency_hz` in Hz.
    pub error_margin_hz: f64,
    pub confidence: Confidence,
    /// Milliseconds since the Unix epoch.
    pub captured_at_ms: u64,
}

/// Newest-first list of at most [`HISTORY_CAPACITY`] records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultHistory {
    records: VecDeque<IntegrityRecord>,
}

impl ResultHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a record, evicting the oldest when at capacity.
    /// Returns the evicted record, if any.
    pub fn record(&mut self, record: IntegrityRecord) -> Option<IntegrityRecord> {
        let evicted = if self.records.len() >= HISTORY_CAPACITY {
            self.records.pop_back()
        } else {
            None
        };
        self.records.push_front(record);
        evicted
    }

    /// Records, newest first.
    pub fn records(&self) -> Vec<IntegrityRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IntegrityRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&IntegrityRecord> {
        self.records.front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= HISTORY_CAPACITY
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
