//! HTTP status and control API for a monitor session.
//!
//! The presentation boundary: every route reads the latest session snapshot
//! or forwards one command to the session task. No state lives here.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;

use vibeguard_core::{
    AccessError, CaptureKind, CaptureRejected, DisplaySample, HISTORY_CAPACITY, IntegrityRecord,
    SessionError, SessionHandle,
};

/// Shared server state.
struct AppState {
    session: SessionHandle,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    /// Machine-readable guard that refused a capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<CaptureRejected>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    monitoring: bool,
    connectivity: String,
    phase: vibeguard_core::WorkflowPhase,
}

#[derive(Serialize)]
struct HistoryResponse {
    records: Vec<IntegrityRecord>,
    count: usize,
    capacity: usize,
    baseline_hz: Option<f64>,
}

#[derive(Serialize)]
struct DisplayResponse {
    samples: Vec<DisplaySample>,
    count: usize,
}

#[derive(Serialize)]
struct MonitoringResponse {
    monitoring: bool,
    /// Whether an explicit grant prompt was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    prompted: Option<bool>,
}

#[derive(Serialize)]
struct CaptureResponse {
    seq: u64,
    kind: CaptureKind,
    window_ms: u64,
}

type ApiResult<T> = Result<(StatusCode, Json<T>), (StatusCode, Json<ErrorResponse>)>;

trait JsonWithStatus<T> {
    fn with_status(self, status: StatusCode) -> (StatusCode, Json<T>);
}

impl<T> JsonWithStatus<T> for Json<T> {
    fn with_status(self, status: StatusCode) -> (StatusCode, Json<T>) {
        (status, self)
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    Json(ErrorResponse {
        error: message.into(),
        reason: None,
    })
    .with_status(status)
}

/// Map a session error onto an HTTP status.
fn session_error(err: SessionError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        SessionError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Access(AccessError::Unsupported) => StatusCode::NOT_IMPLEMENTED,
        SessionError::Access(AccessError::PermissionDenied) => StatusCode::FORBIDDEN,
        SessionError::Access(AccessError::Transport(_)) => StatusCode::BAD_GATEWAY,
        SessionError::Rejected(_) => StatusCode::CONFLICT,
    };
    let reason = match &err {
        SessionError::Rejected(r) => Some(*r),
        _ => None,
    };
    Json(ErrorResponse {
        error: err.to_string(),
        reason,
    })
    .with_status(status)
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.session.snapshot();
    Json(serde_json::json!({
        "name": "VibeGuard Monitor",
        "version": vibeguard_core::VERSION,
        "session": snapshot.session_id,
        "source": snapshot.source,
        "endpoints": {
            "/": "This API index",
            "/health": "Liveness, monitoring flag and analyzer connectivity",
            "/status": "Full session snapshot",
            "/history": {
                "GET": format!("Tracking records, newest first (at most {HISTORY_CAPACITY})"),
                "DELETE": "Clear the tracking history",
            },
            "/display": "Smoothed samples for charting, oldest first",
            "/monitoring/start": { "method": "POST", "description": "Request motion access and start sampling" },
            "/monitoring/stop": { "method": "POST", "description": "Stop sampling" },
            "/capture/{kind}": {
                "method": "POST",
                "description": "Open a sampling window",
                "params": { "kind": "baseline or tracking" },
            },
        },
    }))
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.session.snapshot();
    Json(HealthResponse {
        status: if state.session.is_running() { "ok" } else { "stopped" },
        monitoring: snapshot.monitoring,
        connectivity: snapshot.connectivity.to_string(),
        phase: snapshot.phase,
    })
}

async fn handle_status(State(state): State<Arc<AppState>>) -> Json<vibeguard_core::SessionSnapshot> {
    Json(state.session.snapshot())
}

async fn handle_history(State(state): State<Arc<AppState>>) -> Json<HistoryResponse> {
    let snapshot = state.session.snapshot();
    Json(HistoryResponse {
        count: snapshot.history.len(),
        records: snapshot.history,
        capacity: HISTORY_CAPACITY,
        baseline_hz: snapshot.baseline_hz,
    })
}

async fn handle_clear_history(State(state): State<Arc<AppState>>) -> ApiResult<HistoryResponse> {
    state.session.clear_history().await.map_err(session_error)?;
    let snapshot = state.session.snapshot();
    Ok(Json(HistoryResponse {
        count: snapshot.history.len(),
        records: snapshot.history,
        capacity: HISTORY_CAPACITY,
        baseline_hz: snapshot.baseline_hz,
    })
    .with_status(StatusCode::OK))
}

async fn handle_display(State(state): State<Arc<AppState>>) -> Json<DisplayResponse> {
    let samples = state.session.snapshot().display;
    Json(DisplayResponse {
        count: samples.len(),
        samples,
    })
}

async fn handle_start(State(state): State<Arc<AppState>>) -> ApiResult<MonitoringResponse> {
    let granted = state
        .session
        .start_monitoring()
        .await
        .map_err(session_error)?;
    Ok(Json(MonitoringResponse {
        monitoring: true,
        prompted: Some(granted.prompted),
    })
    .with_status(StatusCode::OK))
}

async fn handle_stop(State(state): State<Arc<AppState>>) -> ApiResult<MonitoringResponse> {
    state.session.stop_monitoring().await.map_err(session_error)?;
    Ok(Json(MonitoringResponse {
        monitoring: false,
        prompted: None,
    })
    .with_status(StatusCode::OK))
}

async fn handle_capture(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> ApiResult<CaptureResponse> {
    let kind: CaptureKind = match kind.as_str() {
        "baseline" => CaptureKind::Baseline,
        "tracking" => CaptureKind::Tracking,
        other => {
            return Err(error_response(
                StatusCode::NOT_FOUND,
                format!("Unknown capture kind: {other}. Use baseline or tracking."),
            ));
        }
    };
    let ticket = state
        .session
        .start_capture(kind)
        .await
        .map_err(session_error)?;
    Ok(Json(CaptureResponse {
        seq: ticket.seq,
        kind: ticket.kind,
        window_ms: state.window_ms(),
    })
    .with_status(StatusCode::ACCEPTED))
}

impl AppState {
    fn window_ms(&self) -> u64 {
        self.session.window().as_millis() as u64
    }
}

/// Build the axum router over a running session.
pub fn build_router(session: SessionHandle) -> Router {
    let state = Arc::new(AppState { session });

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .route("/history", get(handle_history).delete(handle_clear_history))
        .route("/display", get(handle_display))
        .route("/monitoring/start", post(handle_start))
        .route("/monitoring/stop", post(handle_stop))
        .route("/capture/{kind}", post(handle_capture))
        .with_state(state)
}

/// Serve the status/control API until `shutdown` resolves.
pub async fn run_server(
    session: SessionHandle,
    host: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = build_router(session);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("status API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
