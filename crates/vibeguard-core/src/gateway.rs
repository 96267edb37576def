//! Analysis gateway: the request/response boundary to the remote analyzer.
//!
//! The analyzer estimates the dominant vibration frequency of a submitted
//! window and, for tracking submissions, scores it against the baseline. Its
//! algorithm is not part of this crate; only the wire contract is.
//!
//! # Wire format
//!
//! `POST {base}/analyze` with `{"values": [..], "is_baseline": bool}`.
//!
//! Baseline answer: `{"status": "baseline_set", "hz": 6.2, "snr": 3.1}`.
//!
//! Tracking answer: `{"integrity_score": 91.4, "current_hz": 6.05,
//! "baseline_hz": 6.2, "error_margin_hz": 0.0123, "confidence": "High"}`.
//!
//! A refused submission still answers 200 with `{"error": "..."}`.
//!
//! `GET {base}/` reports `{"status": "online", "system": "...", "baseline_set": bool}`.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::error::{ConfigError, GatewayError};
use crate::history::Confidence;

/// One submission of raw samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub values: Vec<f64>,
    pub is_baseline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineResult {
    /// Reference frequency in Hz.
    pub frequency_hz: f64,
    pub snr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingResult {
    pub integrity_score: f64,
    pub current_hz: f64,
    pub error_margin_hz: f64,
    pub confidence: Confidence,
    /// Baseline the service compared against, when it reports one.
    pub baseline_hz: Option<f64>,
}

/// Typed analyzer answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Baseline(BaselineResult),
    Tracking(TrackingResult),
}

/// Analyzer liveness report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayHealth {
    pub status: String,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub baseline_set: Option<bool>,
}

/// Anything that can analyze a submission.
pub trait AnalysisGateway: Send + Sync + 'static {
    fn analyze(
        &self,
        request: AnalysisRequest,
    ) -> impl Future<Output = Result<AnalysisOutcome, GatewayError>> + Send;

    fn health(&self) -> impl Future<Output = Result<GatewayHealth, GatewayError>> + Send;
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    hz: Option<f64>,
    baseline_hz: Option<f64>,
    snr: Option<f64>,
    integrity_score: Option<f64>,
    current_hz: Option<f64>,
    error_margin_hz: Option<f64>,
    confidence: Option<String>,
    error: Option<String>,
}

fn finite(name: &str, v: Option<f64>) -> Result<f64, GatewayError> {
    match v {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(GatewayError::Malformed(format!("'{name}' is not a finite number"))),
        None => Err(GatewayError::Malformed(format!("missing '{name}'"))),
    }
}

/// Decode an analyzer response body for a request of the given kind.
pub fn decode_response(is_baseline: bool, body: &[u8]) -> Result<AnalysisOutcome, GatewayError> {
    let raw: RawResponse =
        serde_json::from_slice(body).map_err(|e| GatewayError::Malformed(e.to_string()))?;

    if let Some(reason) = raw.error {
        return Err(GatewayError::Rejected(reason));
    }

    if is_baseline {
        let frequency_hz = finite("hz", raw.hz.or(raw.baseline_hz))?;
        if frequency_hz <= 0.0 {
            return Err(GatewayError::Malformed(format!(
                "baseline frequency must be positive, got {frequency_hz}"
            )));
        }
        return Ok(AnalysisOutcome::Baseline(BaselineResult {
            frequency_hz,
            snr: raw.snr.filter(|v| v.is_finite()),
        }));
    }

    let integrity_score = finite("integrity_score", raw.integrity_score)?.clamp(0.0, 100.0);
    let current_hz = finite("current_hz", raw.current_hz)?;
    let error_margin_hz = match raw.error_margin_hz {
        None => 0.0,
        some => finite("error_margin_hz", some)?.abs(),
    };
    Ok(AnalysisOutcome::Tracking(TrackingResult {
        integrity_score,
        current_hz,
        error_margin_hz,
        confidence: Confidence::from_label(raw.confidence.as_deref()),
        baseline_hz: raw.baseline_hz.filter(|v| v.is_finite() && *v > 0.0),
    }))
}

/// HTTP/JSON client for the analyzer.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    analyze_url: reqwest::Url,
    health_url: reqwest::Url,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let base = config.parsed_base()?;
        let root = base.as_str().trim_end_matches('/');
        let analyze_url = reqwest::Url::parse(&format!("{root}/analyze"))
            .map_err(|_| ConfigError::InvalidUrl(config.base_url.clone()))?;
        let health_url = reqwest::Url::parse(&format!("{root}/"))
            .map_err(|_| ConfigError::InvalidUrl(config.base_url.clone()))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("vibeguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            analyze_url,
            health_url,
        })
    }

    pub fn analyze_url(&self) -> &str {
        self.analyze_url.as_str()
    }

    pub fn health_url(&self) -> &str {
        self.health_url.as_str()
    }
}

fn network(e: reqwest::Error) -> GatewayError {
    GatewayError::Network(e.to_string())
}

impl AnalysisGateway for HttpGateway {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutcome, GatewayError> {
        let is_baseline = request.is_baseline;
        log::debug!(
            "submitting {} samples (baseline: {is_baseline}) to {}",
            request.values.len(),
            self.analyze_url
        );
        let response = self
            .client
            .post(self.analyze_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }
        let body = response.bytes().await.map_err(network)?;
        decode_response(is_baseline, &body)
    }

    async fn health(&self) -> Result<GatewayHealth, GatewayError> {
        let response = self
            .client
            .get(self.health_url.clone())
            .send()
            .await
            .map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }
        let body = response.bytes().await.map_err(network)?;
        serde_json::from_slice(&body).map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_hz() {
        let out = decode_response(true, br#"{"status":"baseline_set","hz":6.2,"snr":2.5}"#).unwrap();
        assert_eq!(
            out,
            AnalysisOutcome::Baseline(BaselineResult {
                frequency_hz: 6.2,
                snr: Some(2.5)
            })
        );
    }

    #[test]
    fn baseline_accepts_baseline_hz_alias() {
        let out = decode_response(true, br#"{"baseline_hz":4.75}"#).unwrap();
        match out {
            AnalysisOutcome::Baseline(b) => assert_eq!(b.frequency_hz, 4.75),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn baseline_without_frequency_is_malformed() {
        let err = decode_response(true, br#"{"status":"baseline_set"}"#).unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(_)));
        let err = decode_response(true, br#"{"hz":0.0}"#).unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(_)));
    }

    #[test]
    fn tracking_full_payload() {
        let body = br#"{"integrity_score":91.4,"current_hz":6.05,"baseline_hz":6.2,
                        "error_margin_hz":0.0123,"confidence":"High"}"#;
        let out = decode_response(false, body).unwrap();
        assert_eq!(
            out,
            AnalysisOutcome::Tracking(TrackingResult {
                integrity_score: 91.4,
                current_hz: 6.05,
                error_margin_hz: 0.0123,
                confidence: Confidence::High,
                baseline_hz: Some(6.2),
            })
        );
    }

    #[test]
    fn tracking_degenerate_payload_defaults() {
        let out = decode_response(false, br#"{"integrity_score":0,"current_hz":0}"#).unwrap();
        let AnalysisOutcome::Tracking(t) = out else {
            panic!("expected tracking");
        };
        assert_eq!(t.error_margin_hz, 0.0);
        assert_eq!(t.confidence, Confidence::Unknown);
        assert_eq!(t.baseline_hz, None);
    }

    #[test]
    fn tracking_score_is_clamped() {
        let out = decode_response(false, br#"{"integrity_score":140,"current_hz":6}"#).unwrap();
        let AnalysisOutcome::Tracking(t) = out else {
            panic!("expected tracking");
        };
        assert_eq!(t.integrity_score, 100.0);
    }

    #[test]
    fn tracking_missing_score_is_malformed() {
        let err = decode_response(false, br#"{"current_hz":6}"#).unwrap_err();
        assert_eq!(err, GatewayError::Malformed("missing 'integrity_score'".into()));
    }

    #[test]
    fn error_field_is_rejection() {
        let err = decode_response(false, br#"{"error":"Insufficient data points"}"#).unwrap_err();
        assert_eq!(err, GatewayError::Rejected("Insufficient data points".into()));
    }

    #[test]
    fn non_json_is_malformed() {
        let err = decode_response(true, b"<html>502</html>").unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(_)));
    }

    #[test]
    fn request_wire_shape() {
        let req = AnalysisRequest {
            values: vec![0.5, -0.25],
            is_baseline: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"values": [0.5, -0.25], "is_baseline": true}));
    }

    #[test]
    fn endpoints_from_base() {
        let gw = HttpGateway::new(&GatewayConfig::new("https://analyzer.example.com/api/")).unwrap();
        assert_eq!(gw.analyze_url(), "https://analyzer.example.com/api/analyze");
        assert_eq!(gw.health_url(), "https://analyzer.example.com/api/");

        let gw = HttpGateway::new(&GatewayConfig::new("http://127.0.0.1:8000")).unwrap();
        assert_eq!(gw.analyze_url(), "http://127.0.0.1:8000/analyze");
    }

    #[test]
    fn invalid_base_is_config_error() {
        assert!(HttpGateway::new(&GatewayConfig::new("::nope::")).is_err());
    }
}
