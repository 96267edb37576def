pub mod capture;
pub mod monitor;
pub mod probe;
pub mod scan;
pub mod serve;

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use vibeguard_core::{
    Axis, GatewayConfig, HttpGateway, MonitorConfig, MonitorSession, SessionHandle,
    SimulatedConfig, SourceSelection, detect_motion_source,
};

/// Flags shared by every command that runs a session.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Motion source: auto, simulated or iio
    #[arg(long, default_value = "auto")]
    pub source: SourceSelection,

    /// Analyzer base URL
    #[arg(long, env = vibeguard_core::ANALYZER_URL_ENV, default_value = vibeguard_core::DEFAULT_ANALYZER_URL)]
    pub analyzer_url: String,

    /// Analyzer request timeout
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Raw samples kept for analysis
    #[arg(long, default_value = "300")]
    pub buffer: usize,

    /// Length of one sampling window (e.g. "5s", "2500ms")
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub window: Duration,

    /// Display smoothing factor, strictly between 0 and 1
    #[arg(long, default_value = "0.2")]
    pub alpha: f64,

    /// Acceleration axis used as the scalar channel
    #[arg(long, default_value = "z")]
    pub axis: Axis,

    /// Sampling rate in Hz (1-1000)
    #[arg(long, default_value = "60", value_parser = parse_rate)]
    pub rate: f64,

    /// Seed for the simulated source (reproducible runs)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Modal frequency of the simulated structure, in Hz
    #[arg(long, default_value = "6.2")]
    pub modal_hz: f64,
}

impl SessionArgs {
    pub fn monitor_config(
        &self,
        live_sync: Option<Duration>,
        health_probe: Option<Duration>,
    ) -> MonitorConfig {
        MonitorConfig {
            buffer_capacity: self.buffer,
            smoothing_alpha: self.alpha,
            window: self.window,
            axis: self.axis,
            live_sync,
            health_probe,
            ..MonitorConfig::default()
        }
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.analyzer_url.clone(),
            timeout: self.timeout,
        }
    }

    pub fn simulated_config(&self) -> SimulatedConfig {
        SimulatedConfig {
            rate_hz: self.rate,
            modal_hz: self.modal_hz,
            seed: self.seed,
            ..SimulatedConfig::default()
        }
    }
}

/// Spawn a session for `args` on the current runtime, exiting on bad configuration.
pub fn spawn_session(
    args: &SessionArgs,
    live_sync: Option<Duration>,
    health_probe: Option<Duration>,
) -> SessionHandle {
    let gateway = HttpGateway::new(&args.gateway_config()).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    let source = detect_motion_source(args.source, args.simulated_config()).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    MonitorSession::spawn(
        source,
        Arc::new(gateway),
        args.monitor_config(live_sync, health_probe),
    )
    .unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    })
}

/// Single-threaded runtime: the session is a cooperative event loop.
pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: cannot start async runtime: {e}");
            std::process::exit(1);
        })
}

/// Parse "5s", "250ms", "2m" or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let (numeric, multiplier) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, 1u64)
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, 1000)
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, 60_000)
    } else {
        (s, 1000)
    };

    let value: u64 = numeric
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration '{s}'"))?;
    let millis = value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("duration too large '{s}'"))?;
    Ok(Duration::from_millis(millis))
}

/// Parse a sampling rate in Hz, refusing values the motion sources cannot run at.
pub fn parse_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid rate '{s}'"))?;
    vibeguard_core::check_sample_rate(rate).map_err(|e| e.to_string())
}

/// Format a timestamp in ms since the epoch as UTC wall-clock time.
pub fn clock(timestamp_ms: u64) -> String {
    let secs = timestamp_ms / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // parse_duration tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_millis_and_minutes() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_duration("five seconds").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_parse_overflow_is_an_error() {
        let err = parse_duration("18446744073709551615m").unwrap_err();
        assert!(err.contains("too large"), "{err}");
        assert!(parse_duration("18446744073709551615s").is_err());
        assert_eq!(
            parse_duration("18446744073709551615ms").unwrap(),
            Duration::from_millis(u64::MAX)
        );
    }

    // -----------------------------------------------------------------------
    // parse_rate tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_rate_bounds() {
        assert_eq!(parse_rate("60").unwrap(), 60.0);
        assert_eq!(parse_rate(" 1 ").unwrap(), 1.0);
        assert_eq!(parse_rate("1000").unwrap(), 1000.0);
    }

    #[test]
    fn test_parse_rate_rejects_unusable() {
        for bad in ["0", "-5", "1e10", "NaN", "inf", "fast"] {
            assert!(parse_rate(bad).is_err(), "{bad} should be rejected");
        }
    }

    // -----------------------------------------------------------------------
    // SessionArgs -> configuration
    // -----------------------------------------------------------------------

    fn args() -> SessionArgs {
        SessionArgs {
            source: SourceSelection::Simulated,
            analyzer_url: "http://analyzer.local:8000".into(),
            timeout: Duration::from_secs(3),
            buffer: 120,
            window: Duration::from_secs(2),
            alpha: 0.3,
            axis: Axis::X,
            rate: 50.0,
            seed: Some(7),
            modal_hz: 4.5,
        }
    }

    #[test]
    fn test_monitor_config_from_args() {
        let config = args().monitor_config(Some(Duration::from_secs(1)), None);
        assert_eq!(config.buffer_capacity, 120);
        assert_eq!(config.window, Duration::from_secs(2));
        assert_eq!(config.axis, Axis::X);
        assert_eq!(config.live_sync, Some(Duration::from_secs(1)));
        assert_eq!(config.display_capacity, MonitorConfig::default().display_capacity);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_simulated_config_from_args() {
        let sim = args().simulated_config();
        assert_eq!(sim.rate_hz, 50.0);
        assert_eq!(sim.modal_hz, 4.5);
        assert_eq!(sim.seed, Some(7));
    }

    #[test]
    fn test_gateway_config_from_args() {
        let gw = args().gateway_config();
        assert_eq!(gw.base_url, "http://analyzer.local:8000");
        assert_eq!(gw.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_clock_format() {
        assert_eq!(clock(0), "00:00:00");
        assert_eq!(clock(3_723_000), "01:02:03");
    }
}
