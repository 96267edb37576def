//! Monitor session: the cooperative event loop tying acquisition, smoothing,
//! the workflow and the analysis gateway together.
//!
//! One tokio task owns every piece of mutable state. The outside world talks
//! to it through a cloneable [`SessionHandle`] (commands over `mpsc`, replies
//! over `oneshot`) and observes it through a `watch` channel of
//! [`SessionSnapshot`]s.
//!
//! Policies:
//! - Stopping monitoring while a window is collecting abandons the window.
//! - A window already submitted keeps its request; the answer is applied
//!   when it arrives, even if monitoring has stopped in between.
//! - The acquisition buffer and display window restart empty on every start.
//! - Motion events are folded into the published snapshot at most once per
//!   [`PUBLISH_INTERVAL`]; every other state change is published at once.

use std::future::{Future, pending};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::buffer::AcquisitionBuffer;
use crate::config::{MIN_ANALYSIS_SAMPLES, MonitorConfig};
use crate::error::{AccessError, CaptureRejected, ConfigError, GatewayError, SessionError};
use crate::gate::{Granted, PermissionGate};
use crate::gateway::{AnalysisGateway, AnalysisOutcome, AnalysisRequest, GatewayHealth, TrackingResult};
use crate::history::IntegrityRecord;
use crate::motion::{ChannelSelector, MotionEvent};
use crate::smoothing::{DisplayFilter, DisplaySample};
use crate::source::{MotionSource, Subscription};
use crate::workflow::{
    CaptureKind, CaptureOutcome, CaptureTicket, WindowStage, WorkflowController, WorkflowPhase,
};

const COMMAND_QUEUE: usize = 32;

/// Minimum spacing between snapshots caused only by new motion samples.
pub const PUBLISH_INTERVAL: Duration = Duration::from_millis(50);

/// Reachability of the analysis service as last observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// No request has completed yet.
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Non-recorded reading from a live sync of the idle buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveReading {
    pub integrity_score: f64,
    pub current_hz: f64,
    pub error_margin_hz: f64,
    pub confidence: crate::history::Confidence,
    pub received_at_ms: u64,
}

impl LiveReading {
    fn from_tracking(t: TrackingResult, received_at_ms: u64) -> Self {
        Self {
            integrity_score: t.integrity_score,
            current_hz: t.current_hz,
            error_margin_hz: t.error_margin_hz,
            confidence: t.confidence,
            received_at_ms,
        }
    }
}

/// How a capture window ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureReport {
    pub seq: u64,
    pub kind: CaptureKind,
    pub outcome: CaptureOutcome,
    pub finished_at_ms: u64,
}

/// Everything an observer needs to render the session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub source: String,
    pub phase: WorkflowPhase,
    pub stage: Option<WindowStage>,
    pub baseline_hz: Option<f64>,
    /// Newest first.
    pub history: Vec<IntegrityRecord>,
    /// Oldest first.
    pub display: Vec<DisplaySample>,
    pub buffered: usize,
    pub buffer_capacity: usize,
    pub samples_seen: u64,
    pub monitoring: bool,
    pub error: Option<String>,
    pub connectivity: Connectivity,
    pub analyzer: Option<GatewayHealth>,
    pub live: Option<LiveReading>,
    pub last_capture: Option<CaptureReport>,
}

enum Command {
    StartMonitoring(oneshot::Sender<Result<Granted, AccessError>>),
    StopMonitoring(oneshot::Sender<()>),
    StartCapture {
        kind: CaptureKind,
        reply: oneshot::Sender<Result<CaptureTicket, CaptureRejected>>,
        notify: Option<oneshot::Sender<CaptureReport>>,
    },
    ClearHistory(oneshot::Sender<()>),
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
enum AuxKind {
    Live,
    Health,
}

enum AuxResult {
    Live(Result<AnalysisOutcome, GatewayError>),
    Health(Result<GatewayHealth, GatewayError>),
}

/// The task-side state of one session.
pub struct MonitorSession<G> {
    id: String,
    source: Box<dyn MotionSource>,
    gateway: Arc<G>,
    config: MonitorConfig,
    channel: ChannelSelector,
    gate: PermissionGate,
    buffer: AcquisitionBuffer,
    display: DisplayFilter,
    workflow: WorkflowController,
    connectivity: Connectivity,
    analyzer: Option<GatewayHealth>,
    live: Option<LiveReading>,
    last_capture: Option<CaptureReport>,

    commands: mpsc::Receiver<Command>,
    state: watch::Sender<SessionSnapshot>,
    subscription: Option<Subscription>,
    deadline: Option<(CaptureTicket, Instant)>,
    in_flight: Option<(CaptureTicket, JoinHandle<Result<AnalysisOutcome, GatewayError>>)>,
    aux: Option<(AuxKind, JoinHandle<AuxResult>)>,
    waiters: Vec<(u64, oneshot::Sender<CaptureReport>)>,
    live_tick: Option<Interval>,
    health_tick: Option<Interval>,
    pending_publish: Option<Instant>,
}

impl<G: AnalysisGateway> MonitorSession<G> {
    /// Validate `config` and start the session task on the current runtime.
    ///
    /// The session begins idle and not monitoring. It runs until
    /// [`SessionHandle::shutdown`] or until every handle is dropped.
    pub fn spawn(
        source: Box<dyn MotionSource>,
        gateway: Arc<G>,
        config: MonitorConfig,
    ) -> Result<SessionHandle, ConfigError> {
        config.validate()?;
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);

        let session = Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel: ChannelSelector::new(config.axis, config.subtract_gravity),
            buffer: AcquisitionBuffer::new(config.buffer_capacity),
            display: DisplayFilter::new(config.smoothing_alpha, config.display_capacity),
            live_tick: config.live_sync.map(ticker),
            health_tick: config.health_probe.map(ticker),
            source,
            gateway,
            config,
            gate: PermissionGate::new(),
            workflow: WorkflowController::new(),
            connectivity: Connectivity::Unknown,
            analyzer: None,
            live: None,
            last_capture: None,
            commands: cmd_rx,
            state: watch::Sender::new(SessionSnapshot::default()),
            subscription: None,
            deadline: None,
            in_flight: None,
            aux: None,
            waiters: Vec::new(),
            pending_publish: None,
        };
        session.state.send_replace(session.snapshot());
        let state = session.state.subscribe();
        let window = session.config.window;
        log::info!(
            "session {} created on source '{}' (buffer {}, window {:?})",
            session.id,
            session.source.name(),
            session.config.buffer_capacity,
            session.config.window
        );

        tokio::spawn(session.run());
        Ok(SessionHandle {
            commands: cmd_tx,
            state,
            window,
        })
    }

    async fn run(mut self) {
        loop {
            let mut sample_only = false;
            tokio::select! {
                biased;
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.handle(cmd),
                },
                event = next_event(&mut self.subscription) => match event {
                    Some(event) => {
                        self.ingest(&event);
                        sample_only = true;
                    }
                    None => self.source_ended(),
                },
                (ticket, joined) = join_slot(&mut self.in_flight) => {
                    self.in_flight = None;
                    let result = joined.unwrap_or_else(|e| Err(GatewayError::Aborted(e.to_string())));
                    self.finish_capture(ticket, result);
                }
                (kind, joined) = join_slot(&mut self.aux) => {
                    self.aux = None;
                    log::trace!("{kind:?} request finished");
                    self.finish_aux(joined);
                }
                _ = wait_until(self.deadline.map(|(_, at)| at)) => self.close_window(),
                _ = tick(&mut self.live_tick) => self.live_sync(),
                _ = tick(&mut self.health_tick) => self.probe_health(),
                _ = wait_until(self.pending_publish) => {}
            }
            let flush_due = self.pending_publish.is_some_and(|at| Instant::now() >= at);
            if !sample_only || flush_due {
                self.publish();
            } else if self.pending_publish.is_none() {
                self.pending_publish = Some(Instant::now() + PUBLISH_INTERVAL);
            }
        }

        self.subscription = None;
        self.gate.stop();
        if let Some((_, handle)) = self.in_flight.take() {
            handle.abort();
        }
        if let Some((_, handle)) = self.aux.take() {
            handle.abort();
        }
        self.publish();
        log::info!("session {} shut down", self.id);
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::StartMonitoring(reply) => {
                let _ = reply.send(self.start_monitoring());
            }
            Command::StopMonitoring(reply) => {
                self.stop_monitoring();
                let _ = reply.send(());
            }
            Command::StartCapture {
                kind,
                reply,
                notify,
            } => {
                let result = self.start_capture(kind);
                if let (Ok(ticket), Some(notify)) = (&result, notify) {
                    self.waiters.push((ticket.seq, notify));
                }
                let _ = reply.send(result);
            }
            Command::ClearHistory(reply) => {
                self.workflow.clear_history();
                log::info!("tracking history cleared");
                let _ = reply.send(());
            }
            Command::Shutdown => {}
        }
    }

    fn start_monitoring(&mut self) -> Result<Granted, AccessError> {
        if self.gate.is_monitoring() && self.subscription.is_some() {
            return Ok(Granted { prompted: false });
        }
        let granted = self.gate.request_access(self.source.as_ref())?;
        self.buffer.clear();
        self.display.reset();
        self.subscription = Some(self.source.subscribe());
        log::info!("monitoring started on '{}'", self.source.name());
        Ok(granted)
    }

    fn stop_monitoring(&mut self) {
        if self.subscription.take().is_some() {
            log::info!("monitoring stopped on '{}'", self.source.name());
        }
        self.gate.stop();
        self.abandon_window();
    }

    fn source_ended(&mut self) {
        self.subscription = None;
        log::warn!("motion source '{}' ended", self.source.name());
        self.gate.fail("motion source ended");
        self.abandon_window();
    }

    fn abandon_window(&mut self) {
        let Some((ticket, _)) = self.deadline.take() else {
            return;
        };
        if let Some(outcome) = self.workflow.abandon() {
            self.report(ticket, outcome);
        }
    }

    fn ingest(&mut self, event: &MotionEvent) {
        let Some(value) = self.channel.extract(event) else {
            log::debug!("motion event at {} carried no usable reading", event.timestamp_ms);
            return;
        };
        self.buffer.push(value);
        self.display.push(event.timestamp_ms, value);
    }

    fn start_capture(&mut self, kind: CaptureKind) -> Result<CaptureTicket, CaptureRejected> {
        let ticket = self.workflow.start_capture(kind, self.gate.is_monitoring())?;
        self.deadline = Some((ticket, Instant::now() + self.config.window));
        Ok(ticket)
    }

    fn close_window(&mut self) {
        let Some((ticket, _)) = self.deadline.take() else {
            return;
        };
        let Some(request) = self.workflow.close_window(ticket, &self.buffer) else {
            return;
        };
        if request.values.len() < MIN_ANALYSIS_SAMPLES {
            log::warn!(
                "{} window #{} holds only {} samples; the analyzer may refuse it",
                ticket.kind,
                ticket.seq,
                request.values.len()
            );
        }
        let gateway = Arc::clone(&self.gateway);
        let handle = tokio::spawn(async move { gateway.analyze(request).await });
        self.in_flight = Some((ticket, handle));
    }

    fn finish_capture(&mut self, ticket: CaptureTicket, result: Result<AnalysisOutcome, GatewayError>) {
        self.observe(result.as_ref().err());
        if let Some(outcome) = self.workflow.complete(ticket, result, crate::now_ms()) {
            self.report(ticket, outcome);
        }
    }

    fn report(&mut self, ticket: CaptureTicket, outcome: CaptureOutcome) {
        let report = CaptureReport {
            seq: ticket.seq,
            kind: ticket.kind,
            outcome,
            finished_at_ms: crate::now_ms(),
        };
        let mut i = 0;
        while i < self.waiters.len() {
            if self.waiters[i].0 == ticket.seq {
                let (_, tx) = self.waiters.swap_remove(i);
                let _ = tx.send(report.clone());
            } else {
                i += 1;
            }
        }
        self.last_capture = Some(report);
    }

    fn live_sync(&mut self) {
        if self.aux.is_some()
            || !self.gate.is_monitoring()
            || self.workflow.phase() != WorkflowPhase::Idle
            || self.workflow.baseline().is_none()
            || self.buffer.len() < MIN_ANALYSIS_SAMPLES
        {
            return;
        }
        let request = AnalysisRequest {
            values: self.buffer.snapshot(),
            is_baseline: false,
        };
        let gateway = Arc::clone(&self.gateway);
        let handle = tokio::spawn(async move { AuxResult::Live(gateway.analyze(request).await) });
        self.aux = Some((AuxKind::Live, handle));
    }

    fn probe_health(&mut self) {
        if self.aux.is_some() {
            return;
        }
        let gateway = Arc::clone(&self.gateway);
        let handle = tokio::spawn(async move { AuxResult::Health(gateway.health().await) });
        self.aux = Some((AuxKind::Health, handle));
    }

    fn finish_aux(&mut self, joined: Result<AuxResult, JoinError>) {
        match joined {
            Ok(AuxResult::Live(result)) => {
                self.observe(result.as_ref().err());
                match result {
                    Ok(AnalysisOutcome::Tracking(t)) => {
                        self.live = Some(LiveReading::from_tracking(t, crate::now_ms()));
                    }
                    Ok(AnalysisOutcome::Baseline(_)) => {
                        log::debug!("live sync answered with a baseline result, ignored");
                    }
                    Err(e) => log::debug!("live sync failed: {e}"),
                }
            }
            Ok(AuxResult::Health(result)) => {
                self.observe(result.as_ref().err());
                match result {
                    Ok(health) => self.analyzer = Some(health),
                    Err(e) => log::debug!("health probe failed: {e}"),
                }
            }
            Err(e) => self.observe(Some(&GatewayError::Aborted(e.to_string()))),
        }
    }

    /// Fold the result of any gateway call into the connectivity indicator.
    fn observe(&mut self, error: Option<&GatewayError>) {
        let next = match error {
            Some(e) if e.is_connectivity_failure() => Connectivity::Disconnected,
            _ => Connectivity::Connected,
        };
        if next != self.connectivity {
            match next {
                Connectivity::Disconnected => log::warn!("analysis service is now {next}"),
                _ => log::info!("analysis service is now {next}"),
            }
            self.connectivity = next;
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            source: self.source.name().to_string(),
            phase: self.workflow.phase(),
            stage: self.workflow.stage(),
            baseline_hz: self.workflow.baseline(),
            history: self.workflow.history().records(),
            display: self.display.samples(),
            buffered: self.buffer.len(),
            buffer_capacity: self.buffer.capacity(),
            samples_seen: self.buffer.total_pushed(),
            monitoring: self.gate.is_monitoring(),
            error: self.gate.error().map(str::to_string),
            connectivity: self.connectivity,
            analyzer: self.analyzer.clone(),
            live: self.live.clone(),
            last_capture: self.last_capture.clone(),
        }
    }

    fn publish(&mut self) {
        self.pending_publish = None;
        self.state.send_replace(self.snapshot());
    }
}

fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn next_event(subscription: &mut Option<Subscription>) -> Option<MotionEvent> {
    match subscription {
        Some(s) => s.recv().await,
        None => pending().await,
    }
}

async fn join_slot<K: Copy, T>(slot: &mut Option<(K, JoinHandle<T>)>) -> (K, Result<T, JoinError>) {
    match slot {
        Some((key, handle)) => {
            let key = *key;
            (key, handle.await)
        }
        None => pending().await,
    }
}

fn wait_until(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => pending().await,
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(i) => {
            i.tick().await;
        }
        None => pending().await,
    }
}

/// Cloneable control surface of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SessionSnapshot>,
    window: Duration,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StartMonitoring(_) => write!(f, "StartMonitoring"),
            Self::StopMonitoring(_) => write!(f, "StopMonitoring"),
            Self::StartCapture { kind, .. } => write!(f, "StartCapture({kind})"),
            Self::ClearHistory(_) => write!(f, "ClearHistory"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

impl SessionHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Negotiate access and subscribe to the motion source.
    pub async fn start_monitoring(&self) -> Result<Granted, SessionError> {
        Ok(self.request(Command::StartMonitoring).await??)
    }

    /// Release the subscription. A collecting window is abandoned.
    pub async fn stop_monitoring(&self) -> Result<(), SessionError> {
        self.request(Command::StopMonitoring).await
    }

    /// Open a sampling window and return immediately.
    pub async fn start_capture(&self, kind: CaptureKind) -> Result<CaptureTicket, SessionError> {
        let ticket = self
            .request(|reply| Command::StartCapture {
                kind,
                reply,
                notify: None,
            })
            .await??;
        Ok(ticket)
    }

    /// Open a sampling window and wait until it is analyzed or abandoned.
    pub async fn capture(&self, kind: CaptureKind) -> Result<CaptureReport, SessionError> {
        let (notify, done) = oneshot::channel();
        self.request(|reply| Command::StartCapture {
            kind,
            reply,
            notify: Some(notify),
        })
        .await??;
        done.await.map_err(|_| SessionError::Closed)
    }

    pub async fn clear_history(&self) -> Result<(), SessionError> {
        self.request(Command::ClearHistory).await
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Length of one sampling window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether the session task is still running.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Stop the session task. Pending requests are cancelled.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::BaselineResult;
    use crate::history::Confidence;
    use crate::sources::{ManualGrant, ManualSource};

    /// Answers every request the same way.
    struct FixedGateway {
        hz: f64,
    }

    impl AnalysisGateway for FixedGateway {
        async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutcome, GatewayError> {
            if request.is_baseline {
                Ok(AnalysisOutcome::Baseline(BaselineResult {
                    frequency_hz: self.hz,
                    snr: None,
                }))
            } else {
                Ok(AnalysisOutcome::Tracking(TrackingResult {
                    integrity_score: 97.0,
                    current_hz: self.hz,
                    error_margin_hz: 0.01,
                    confidence: Confidence::High,
                    baseline_hz: None,
                }))
            }
        }

        async fn health(&self) -> Result<GatewayHealth, GatewayError> {
            Ok(GatewayHealth {
                status: "online".into(),
                system: None,
                baseline_set: None,
            })
        }
    }

    fn spawn(source: &ManualSource) -> SessionHandle {
        MonitorSession::spawn(
            Box::new(source.clone()),
            Arc::new(FixedGateway { hz: 6.2 }),
            MonitorConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn starts_idle_and_not_monitoring() {
        let handle = spawn(&ManualSource::new());
        let snap = handle.snapshot();
        assert_eq!(snap.phase, WorkflowPhase::Idle);
        assert!(!snap.monitoring);
        assert_eq!(snap.buffer_capacity, 300);
        assert_eq!(snap.connectivity, Connectivity::Unknown);
        assert!(!snap.session_id.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_config_is_refused() {
        let config = MonitorConfig {
            smoothing_alpha: 1.5,
            ..MonitorConfig::default()
        };
        let err = MonitorSession::spawn(
            Box::new(ManualSource::new()),
            Arc::new(FixedGateway { hz: 1.0 }),
            config,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::AlphaOutOfRange(1.5));
    }

    #[tokio::test(start_paused = true)]
    async fn capture_before_monitoring_is_rejected() {
        let handle = spawn(&ManualSource::new());
        let err = handle.start_capture(CaptureKind::Baseline).await.unwrap_err();
        assert_eq!(err, SessionError::Rejected(CaptureRejected::NotMonitoring));
    }

    #[tokio::test(start_paused = true)]
    async fn denied_grant_surfaces_access_error() {
        let source = ManualSource::requiring_grant(ManualGrant::Deny);
        let handle = spawn(&source);
        let err = handle.start_monitoring().await.unwrap_err();
        assert_eq!(err, SessionError::Access(AccessError::PermissionDenied));
        let snap = handle.snapshot();
        assert!(!snap.monitoring);
        assert!(snap.error.is_some());
        assert!(!source.is_subscribed());
    }

    #[tokio::test(start_paused = true)]
    async fn events_fill_buffer_and_display() {
        let source = ManualSource::new();
        let handle = spawn(&source);
        handle.start_monitoring().await.unwrap();
        for v in [1.0, 2.0, 3.0] {
            assert!(source.emit_vertical(v));
        }
        let mut rx = handle.subscribe();
        let snap = rx.wait_for(|s| s.buffered == 3).await.unwrap().clone();
        assert_eq!(snap.display.len(), 3);
        assert!(snap.display[2].value < 3.0);
        assert_eq!(snap.samples_seen, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sample_burst_is_published_once() {
        let source = ManualSource::new();
        let handle = spawn(&source);
        handle.start_monitoring().await.unwrap();
        let mut rx = handle.subscribe();
        rx.borrow_and_update();

        let started = Instant::now();
        for i in 0..10 {
            assert!(source.emit_vertical(f64::from(i)));
        }
        rx.changed().await.unwrap();
        assert!(started.elapsed() >= PUBLISH_INTERVAL);
        assert_eq!(rx.borrow_and_update().buffered, 10);
        assert!(!rx.has_changed().unwrap());

        // Commands still publish immediately.
        handle.stop_monitoring().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().monitoring);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_releases_source() {
        let source = ManualSource::new();
        let handle = spawn(&source);
        handle.start_monitoring().await.unwrap();
        assert!(source.is_subscribed());
        handle.shutdown().await;
        let mut rx = handle.subscribe();
        rx.wait_for(|s| !s.monitoring).await.unwrap();
        assert!(!source.is_subscribed());
        assert!(matches!(
            handle.clear_history().await,
            Err(SessionError::Closed)
        ));
    }
}
