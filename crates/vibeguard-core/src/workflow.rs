//! Baseline/tracking workflow state machine.
//!
//! ```text
//!            start_capture(kind)             close_window            complete
//!   Idle ───────────────────────► Sampling(kind) ─────────► Sampling(kind) ─────► Idle
//!     ▲                           [Collecting]               [Analyzing]
//!     └──────────── abandon ────────────┘
//! ```
//!
//! The controller is pure: it owns no timers and performs no I/O. The session
//! driver opens the window, closes it when the deadline passes, ships the
//! returned request to the analyzer, and feeds the answer back through
//! [`WorkflowController::complete`]. Tickets tie each answer to the window
//! that produced it so a stale answer can never be applied twice.

use serde::{Deserialize, Serialize};

use crate::buffer::AcquisitionBuffer;
use crate::error::{CaptureRejected, GatewayError};
use crate::gateway::{AnalysisOutcome, AnalysisRequest};
use crate::history::{IntegrityRecord, ResultHistory};

/// Which kind of window is being sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    Baseline,
    Tracking,
}

impl std::fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::Tracking => write!(f, "tracking"),
        }
    }
}

impl std::str::FromStr for CaptureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" | "b" => Ok(Self::Baseline),
            "tracking" | "t" => Ok(Self::Tracking),
            other => Err(format!("unknown capture kind '{other}'")),
        }
    }
}

/// Externally visible workflow state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "kind", rename_all = "snake_case")]
pub enum WorkflowPhase {
    #[default]
    Idle,
    Sampling(CaptureKind),
}

/// Progress inside a sampling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStage {
    /// Timer running, buffer filling.
    Collecting,
    /// Snapshot submitted, awaiting the analyzer.
    Analyzing,
}

/// Identity of one sampling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptureTicket {
    pub seq: u64,
    pub kind: CaptureKind,
}

/// What a finished (or abandoned) window did to the workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CaptureOutcome {
    /// New reference frequency stored; `cleared` tracking records dropped.
    BaselineSet { frequency_hz: f64, cleared: usize },
    /// Tracking record prepended to the history.
    Recorded {
        record: IntegrityRecord,
        evicted: bool,
    },
    /// Nothing changed.
    Failed { kind: CaptureKind, reason: String },
    /// Window cancelled before it was submitted.
    Abandoned { kind: CaptureKind },
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    ticket: CaptureTicket,
    stage: WindowStage,
}

/// Workflow state owned by one monitoring session.
#[derive(Debug, Default)]
pub struct WorkflowController {
    pending: Option<Pending>,
    baseline: Option<f64>,
    history: ResultHistory,
    next_seq: u64,
}

impl WorkflowController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> WorkflowPhase {
        match self.pending {
            Some(p) => WorkflowPhase::Sampling(p.ticket.kind),
            None => WorkflowPhase::Idle,
        }
    }

    pub fn stage(&self) -> Option<WindowStage> {
        self.pending.map(|p| p.stage)
    }

    /// Ticket of the open window, if any.
    pub fn ticket(&self) -> Option<CaptureTicket> {
        self.pending.map(|p| p.ticket)
    }

    /// Reference frequency in Hz.
    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    pub fn history(&self) -> &ResultHistory {
        &self.history
    }

    /// Whether `start_capture(kind)` would be accepted right now.
    pub fn check_start(&self, kind: CaptureKind, monitoring: bool) -> Result<(), CaptureRejected> {
        if !monitoring {
            return Err(CaptureRejected::NotMonitoring);
        }
        if self.pending.is_some() {
            return Err(CaptureRejected::Busy);
        }
        if kind == CaptureKind::Tracking {
            if self.baseline.is_none() {
                return Err(CaptureRejected::NoBaseline);
            }
            if self.history.is_full() {
                return Err(CaptureRejected::HistoryFull);
            }
        }
        Ok(())
    }

    /// Open a sampling window. A guard violation changes nothing.
    pub fn start_capture(
        &mut self,
        kind: CaptureKind,
        monitoring: bool,
    ) -> Result<CaptureTicket, CaptureRejected> {
        self.check_start(kind, monitoring)?;
        self.next_seq += 1;
        let ticket = CaptureTicket {
            seq: self.next_seq,
            kind,
        };
        self.pending = Some(Pending {
            ticket,
            stage: WindowStage::Collecting,
        });
        log::info!("{kind} window #{} opened", ticket.seq);
        Ok(ticket)
    }

    /// Close the collecting window and build the submission from a snapshot
    /// of `buffer`. Returns `None` when `ticket` is not the collecting window.
    pub fn close_window(
        &mut self,
        ticket: CaptureTicket,
        buffer: &AcquisitionBuffer,
    ) -> Option<AnalysisRequest> {
        let pending = self.pending.as_mut()?;
        if pending.ticket != ticket || pending.stage != WindowStage::Collecting {
            return None;
        }
        pending.stage = WindowStage::Analyzing;
        let values = buffer.snapshot();
        log::info!(
            "{} window #{} closed with {} samples",
            ticket.kind,
            ticket.seq,
            values.len()
        );
        Some(AnalysisRequest {
            values,
            is_baseline: ticket.kind == CaptureKind::Baseline,
        })
    }

    /// Cancel a window that has not been submitted yet.
    pub fn abandon(&mut self) -> Option<CaptureOutcome> {
        let pending = self.pending?;
        if pending.stage != WindowStage::Collecting {
            return None;
        }
        self.pending = None;
        log::info!("{} window #{} abandoned", pending.ticket.kind, pending.ticket.seq);
        Some(CaptureOutcome::Abandoned {
            kind: pending.ticket.kind,
        })
    }

    /// Fold the analyzer's answer for `ticket` into the workflow and return
    /// to `Idle`. Answers for any other window are ignored (`None`).
    pub fn complete(
        &mut self,
        ticket: CaptureTicket,
        result: Result<AnalysisOutcome, GatewayError>,
        captured_at_ms: u64,
    ) -> Option<CaptureOutcome> {
        let pending = self.pending?;
        if pending.ticket != ticket || pending.stage != WindowStage::Analyzing {
            log::debug!("ignoring stale answer for window #{}", ticket.seq);
            return None;
        }
        self.pending = None;

        let outcome = match (ticket.kind, result) {
            (CaptureKind::Baseline, Ok(AnalysisOutcome::Baseline(b))) => {
                let cleared = self.history.len();
                self.baseline = Some(b.frequency_hz);
                self.history.clear();
                log::info!(
                    "baseline set to {:.3} Hz ({cleared} tracking records cleared)",
                    b.frequency_hz
                );
                CaptureOutcome::BaselineSet {
                    frequency_hz: b.frequency_hz,
                    cleared,
                }
            }
            (CaptureKind::Tracking, Ok(AnalysisOutcome::Tracking(t))) => {
                let record = IntegrityRecord {
                    score: t.integrity_score,
                    frequency_hz: t.current_hz,
                    error_margin_hz: t.error_margin_hz,
                    confidence: t.confidence,
                    captured_at_ms,
                };
                let evicted = self.history.record(record.clone()).is_some();
                log::info!(
                    "tracking set recorded: score {:.1} at {:.3} Hz (±{:.4})",
                    record.score,
                    record.frequency_hz,
                    record.error_margin_hz
                );
                CaptureOutcome::Recorded { record, evicted }
            }
            (kind, Ok(_)) => {
                let reason = format!("analyzer answered a {kind} request with the wrong result kind");
                log::warn!("{kind} window #{} failed: {reason}", ticket.seq);
                CaptureOutcome::Failed { kind, reason }
            }
            (kind, Err(e)) => {
                log::warn!("{kind} window #{} failed: {e}", ticket.seq);
                CaptureOutcome::Failed {
                    kind,
                    reason: e.to_string(),
                }
            }
        };
        Some(outcome)
    }

    /// Explicit user reset of the tracking history.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
