//! Error types shared across the acquisition pipeline, the workflow and the
//! analysis gateway.
//!
//! None of these are fatal: every failure leaves the session in a state from
//! which the same action can simply be retried.

use thiserror::Error;

/// Why motion sampling could not start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The runtime has no motion-sensing capability at all.
    #[error("motion sensing is not supported on this device")]
    Unsupported,
    /// The user (or the OS on their behalf) declined the grant.
    #[error("permission to read motion data was denied")]
    PermissionDenied,
    /// The grant request itself failed before an answer was obtained.
    #[error("permission request failed: {0}")]
    Transport(String),
}

/// Failure of one request to the analysis service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// Connection refused, DNS failure, timeout and similar.
    #[error("analysis service unreachable: {0}")]
    Network(String),
    /// The service answered with a non-success HTTP status.
    #[error("analysis service returned HTTP {0}")]
    Status(u16),
    /// The service answered but refused the payload (e.g. too few samples).
    #[error("analysis service rejected the request: {0}")]
    Rejected(String),
    /// The response body did not have the expected shape.
    #[error("malformed analysis response: {0}")]
    Malformed(String),
    /// The request task ended without producing a response.
    #[error("analysis request aborted: {0}")]
    Aborted(String),
}

impl GatewayError {
    /// Whether this failure says anything about reachability of the service.
    ///
    /// A rejected or malformed answer still proves the service is up.
    pub fn is_connectivity_failure(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Status(_) | Self::Aborted(_))
    }
}

/// Invalid [`MonitorConfig`](crate::config::MonitorConfig) or
/// [`GatewayConfig`](crate::config::GatewayConfig).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{0} capacity must be at least 1")]
    ZeroCapacity(&'static str),
    #[error("smoothing factor must lie strictly between 0 and 1, got {0}")]
    AlphaOutOfRange(f64),
    #[error("{0} must be longer than zero")]
    ZeroDuration(&'static str),
    #[error("sampling rate must lie between 1 and 1000 Hz, got {0}")]
    RateOutOfRange(f64),
    #[error("{0} must be a finite, non-negative number, got {1}")]
    InvalidParameter(&'static str, f64),
    #[error("invalid analyzer URL '{0}'")]
    InvalidUrl(String),
    #[error("cannot build HTTP client: {0}")]
    HttpClient(String),
}

/// Why a capture request was ignored by the workflow guard.
///
/// This is not a failure: the boundary uses it to render a disabled control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureRejected {
    #[error("monitoring is not active")]
    NotMonitoring,
    #[error("a sampling window is already open")]
    Busy,
    #[error("no baseline has been captured yet")]
    NoBaseline,
    #[error("tracking history is full")]
    HistoryFull,
}

/// Errors surfaced by a [`SessionHandle`](crate::session::SessionHandle).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The session task has shut down.
    #[error("monitor session is closed")]
    Closed,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Rejected(#[from] CaptureRejected),
}
