//! # vibeguard-core
//!
//! **Turn a motion sensor into a vibration-analysis front end.**
//!
//! `vibeguard-core` samples a continuous accelerometer stream into a bounded
//! buffer and drives a small integrity-test workflow on top of it: capture a
//! reference ("baseline") vibration frequency, then record up to three
//! comparison ("tracking") sets scored against it by a remote analyzer.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use vibeguard_core::{
//!     CaptureKind, GatewayConfig, HttpGateway, MonitorConfig, MonitorSession,
//!     SimulatedConfig, SourceSelection, detect_motion_source,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let source = detect_motion_source(SourceSelection::Auto, SimulatedConfig::default())?;
//! let gateway = Arc::new(HttpGateway::new(&GatewayConfig::from_env())?);
//! let session = MonitorSession::spawn(source, gateway, MonitorConfig::default())?;
//!
//! session.start_monitoring().await?;
//! let report = session.capture(CaptureKind::Baseline).await?;
//! println!("{:?}", report.outcome);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Motion source → channel extraction → acquisition buffer ⇄ workflow → analyzer → history
//!
//! The display filter reads the same channel but only feeds the snapshot's
//! chart data; it never reaches the analyzer.
//!
//! Every event provider implements the [`MotionSource`] trait. A
//! [`MonitorSession`] owns all mutable state on one task and is driven through
//! a [`SessionHandle`].

pub mod buffer;
pub mod config;
pub mod error;
pub mod gate;
pub mod gateway;
pub mod history;
pub mod motion;
pub mod platform;
pub mod session;
pub mod smoothing;
pub mod source;
pub mod sources;
pub mod workflow;

pub use buffer::AcquisitionBuffer;
pub use config::{
    ANALYZER_URL_ENV, DEFAULT_ANALYZER_URL, GatewayConfig, MIN_ANALYSIS_SAMPLES, MonitorConfig,
    SAMPLE_RATE_RANGE, check_sample_rate,
};
pub use error::{AccessError, CaptureRejected, ConfigError, GatewayError, SessionError};
pub use gate::{Granted, PermissionGate};
pub use gateway::{
    AnalysisGateway, AnalysisOutcome, AnalysisRequest, BaselineResult, GatewayHealth, HttpGateway,
    TrackingResult, decode_response,
};
pub use history::{Confidence, HISTORY_CAPACITY, IntegrityRecord, ResultHistory};
pub use motion::{Axis, ChannelSelector, MotionEvent, STANDARD_GRAVITY, Vector3};
pub use platform::{SourceSelection, detect_motion_source};
pub use session::{
    CaptureReport, Connectivity, LiveReading, MonitorSession, PUBLISH_INTERVAL, SessionHandle,
    SessionSnapshot,
};
pub use smoothing::{DisplayFilter, DisplaySample};
pub use source::{Capability, GrantDecision, MotionSource, SourceInfo, SourceKind, Subscription};
pub use sources::{
    IioSource, ManualGrant, ManualSource, SimulatedConfig, SimulatedSource, all_sources,
};
pub use workflow::{
    CaptureKind, CaptureOutcome, CaptureTicket, WindowStage, WorkflowController, WorkflowPhase,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
