//! Abstract motion source trait and its subscription handle.
//!
//! Every motion provider implements [`MotionSource`], which provides metadata
//! via [`SourceInfo`], capability checking, the optional grant step, and a
//! continuous event subscription.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::motion::MotionEvent;

/// Bound on undelivered events per subscription. Producers drop on overflow.
pub const SUBSCRIPTION_QUEUE: usize = 256;

/// Kind of motion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Synthetic structural response.
    Simulated,
    /// Linux Industrial I/O accelerometer.
    Iio,
    /// Events pushed in by the embedding host.
    Manual,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulated => write!(f, "simulated"),
            Self::Iio => write!(f, "iio"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Metadata about a motion source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    /// Unique identifier (e.g. `"iio_accel"`).
    pub name: &'static str,
    /// One-line human-readable description.
    pub description: &'static str,
    pub kind: SourceKind,
    /// Nominal event rate in Hz.
    pub nominal_rate_hz: f64,
}

/// What the runtime can offer before any grant is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// No motion sensing at all.
    Unsupported,
    /// Sampling may start without asking.
    Immediate,
    /// An explicit grant must be obtained first.
    RequiresGrant,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "unsupported"),
            Self::Immediate => write!(f, "available"),
            Self::RequiresGrant => write!(f, "requires grant"),
        }
    }
}

/// Answer to an explicit grant request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantDecision {
    Granted,
    Denied,
}

/// Trait that every motion source must implement.
pub trait MotionSource: Send + Sync {
    /// Source metadata.
    fn info(&self) -> &SourceInfo;

    /// Check what this source can offer on the current machine.
    fn capability(&self) -> Capability;

    /// Ask for access. Only called when [`capability`](Self::capability)
    /// reports [`Capability::RequiresGrant`]. An `Err` means the request
    /// itself could not be carried out.
    fn request_grant(&self) -> std::io::Result<GrantDecision>;

    /// Start delivering events. Must be called from within a tokio runtime.
    fn subscribe(&self) -> Subscription;

    /// Convenience: name from info.
    fn name(&self) -> &'static str {
        self.info().name
    }
}

/// Live event subscription.
///
/// Dropping the handle releases the source: the producer task (if any) is
/// aborted and the channel is closed, so a host-fed source sees its sender
/// fail on the next emit.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<MotionEvent>,
    producer: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<MotionEvent>, producer: Option<JoinHandle<()>>) -> Self {
        Self { events, producer }
    }

    /// Next event, or `None` once the source has ended.
    pub async fn recv(&mut self) -> Option<MotionEvent> {
        self.events.recv().await
    }

    /// Whether a producer task is still running.
    pub fn is_active(&self) -> bool {
        self.producer.as_ref().is_none_or(|p| !p.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
        self.events.close();
    }
}

/// Non-blocking send used by producers. Returns `false` once the subscriber is gone.
pub(crate) fn offer(tx: &mpsc::Sender<MotionEvent>, event: MotionEvent) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            log::debug!("subscriber lagging, dropped motion event at {}", event.timestamp_ms);
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}
