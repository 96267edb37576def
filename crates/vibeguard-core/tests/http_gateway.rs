//! HttpGateway against a throwaway analyzer served by axum on a local port.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use vibeguard_core::{
    AnalysisGateway, AnalysisOutcome, AnalysisRequest, Confidence, GatewayConfig, GatewayError,
    HttpGateway, MIN_ANALYSIS_SAMPLES,
};

/// Mimics the analyzer backend: a fixed 6.2 Hz baseline, a fixed tracking score.
async fn analyze(Json(req): Json<AnalysisRequest>) -> Json<Value> {
    if req.values.len() < MIN_ANALYSIS_SAMPLES {
        return Json(json!({"error": "Insufficient data points"}));
    }
    if req.is_baseline {
        Json(json!({"status": "baseline_set", "hz": 6.2, "snr": 3.5}))
    } else {
        Json(json!({
            "integrity_score": 88.4,
            "current_hz": 5.95,
            "baseline_hz": 6.2,
            "error_margin_hz": 0.0142,
            "confidence": "High"
        }))
    }
}

async fn index() -> Json<Value> {
    Json(json!({
        "status": "online",
        "system": "VibeGuard Structural Engine",
        "baseline_set": false
    }))
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn analyzer() -> HttpGateway {
    let app = Router::new()
        .route("/", get(index))
        .route("/analyze", post(analyze));
    let addr = serve(app).await;
    HttpGateway::new(&GatewayConfig::new(format!("http://{addr}/"))).unwrap()
}

fn window(n: usize, is_baseline: bool) -> AnalysisRequest {
    AnalysisRequest {
        values: (0..n).map(|i| (i as f64 * 0.65).sin()).collect(),
        is_baseline,
    }
}

#[tokio::test]
async fn baseline_round_trip() {
    let gateway = analyzer().await;
    let outcome = gateway.analyze(window(300, true)).await.unwrap();
    match outcome {
        AnalysisOutcome::Baseline(b) => {
            assert_eq!(b.frequency_hz, 6.2);
            assert_eq!(b.snr, Some(3.5));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn tracking_round_trip() {
    let gateway = analyzer().await;
    let outcome = gateway.analyze(window(120, false)).await.unwrap();
    let AnalysisOutcome::Tracking(t) = outcome else {
        panic!("expected tracking result");
    };
    assert_eq!(t.integrity_score, 88.4);
    assert_eq!(t.current_hz, 5.95);
    assert_eq!(t.confidence, Confidence::High);
    assert_eq!(t.baseline_hz, Some(6.2));
}

#[tokio::test]
async fn short_window_is_rejected() {
    let gateway = analyzer().await;
    let err = gateway.analyze(window(10, true)).await.unwrap_err();
    assert_eq!(err, GatewayError::Rejected("Insufficient data points".into()));
    assert!(!err.is_connectivity_failure());
}

#[tokio::test]
async fn health_reports_online() {
    let gateway = analyzer().await;
    let health = gateway.health().await.unwrap();
    assert_eq!(health.status, "online");
    assert_eq!(health.system.as_deref(), Some("VibeGuard Structural Engine"));
    assert_eq!(health.baseline_set, Some(false));
}

#[tokio::test]
async fn server_error_maps_to_status() {
    let app = Router::new().route(
        "/analyze",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance") }),
    );
    let addr = serve(app).await;
    let gateway = HttpGateway::new(&GatewayConfig::new(format!("http://{addr}"))).unwrap();
    let err = gateway.analyze(window(100, true)).await.unwrap_err();
    assert_eq!(err, GatewayError::Status(503));
    assert!(err.is_connectivity_failure());
}

#[tokio::test]
async fn unreachable_service_is_network_error() {
    // Bind then release a port so nothing is listening on it.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let config = GatewayConfig {
        timeout: Duration::from_secs(2),
        ..GatewayConfig::new(format!("http://{addr}"))
    };
    let gateway = HttpGateway::new(&config).unwrap();
    let err = gateway.analyze(window(100, false)).await.unwrap_err();
    assert!(matches!(err, GatewayError::Network(_)), "got {err:?}");
}
