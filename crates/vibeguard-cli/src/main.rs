//! CLI for vibeguard: vibration-based integrity tests from a motion sensor.

mod commands;

use std::time::Duration;

use clap::{Parser, Subcommand};

use commands::{SessionArgs, parse_duration, parse_rate};

#[derive(Parser)]
#[command(name = "vibeguard")]
#[command(about = "vibeguard: turn a motion sensor into a bridge-integrity vibration probe")]
#[command(version = vibeguard_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List motion sources on this machine and whether they can be used
    Scan {
        /// Sampling rate the sources would be driven at, in Hz (1-1000)
        #[arg(long, default_value = "60", value_parser = parse_rate)]
        rate: f64,
    },

    /// Check that the analysis service is reachable
    Probe {
        /// Analyzer base URL
        #[arg(long, env = vibeguard_core::ANALYZER_URL_ENV, default_value = vibeguard_core::DEFAULT_ANALYZER_URL)]
        analyzer_url: String,

        /// Request timeout (e.g. "3s", "500ms")
        #[arg(long, default_value = "5s", value_parser = parse_duration)]
        timeout: Duration,
    },

    /// Interactive session: b = baseline, t = tracking, c = clear, s = stop/start, q = quit
    Monitor {
        #[command(flatten)]
        session: SessionArgs,

        /// Submit the idle buffer for a live (unrecorded) reading at this interval
        #[arg(long, value_parser = parse_duration)]
        live_sync: Option<Duration>,

        /// Poll the analyzer's health endpoint at this interval
        #[arg(long, value_parser = parse_duration)]
        health_probe: Option<Duration>,
    },

    /// Scripted run: one baseline, then up to three tracking sets
    Capture {
        #[command(flatten)]
        session: SessionArgs,

        /// Number of tracking sets after the baseline (0-3)
        #[arg(long, default_value = "3", value_parser = clap::value_parser!(u8).range(0..=3))]
        tracking: u8,

        /// Wait this long after monitoring starts before the baseline window
        #[arg(long, default_value = "0s", value_parser = parse_duration)]
        settle: Duration,

        /// Print the result as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run a session behind the HTTP status/control API
    Serve {
        #[command(flatten)]
        session: SessionArgs,

        /// Port to listen on
        #[arg(long, default_value = "8042")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Start monitoring immediately instead of waiting for POST /monitoring/start
        #[arg(long)]
        start: bool,

        /// Submit the idle buffer for a live (unrecorded) reading at this interval
        #[arg(long, value_parser = parse_duration)]
        live_sync: Option<Duration>,

        /// Poll the analyzer's health endpoint at this interval
        #[arg(long, value_parser = parse_duration)]
        health_probe: Option<Duration>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { rate } => commands::scan::run(rate),
        Commands::Probe {
            analyzer_url,
            timeout,
        } => commands::probe::run(&analyzer_url, timeout),
        Commands::Monitor {
            session,
            live_sync,
            health_probe,
        } => commands::monitor::run(&session, live_sync, health_probe),
        Commands::Capture {
            session,
            tracking,
            settle,
            json,
        } => commands::capture::run(&session, usize::from(tracking), settle, json),
        Commands::Serve {
            session,
            port,
            host,
            start,
            live_sync,
            health_probe,
        } => commands::serve::run(commands::serve::ServeCommandConfig {
            session: &session,
            host: &host,
            port,
            start,
            live_sync,
            health_probe,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn capture_flags_parse() {
        let cli = Cli::try_parse_from([
            "vibeguard",
            "capture",
            "--source",
            "simulated",
            "--window",
            "2s",
            "--tracking",
            "2",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Capture {
                session,
                tracking,
                json,
                ..
            } => {
                assert_eq!(tracking, 2);
                assert!(json);
                assert_eq!(session.window, Duration::from_secs(2));
            }
            _ => panic!("expected capture"),
        }
    }

    #[test]
    fn out_of_range_rate_is_refused() {
        for rate in ["0", "1e10"] {
            assert!(Cli::try_parse_from(["vibeguard", "monitor", "--rate", rate]).is_err());
            assert!(Cli::try_parse_from(["vibeguard", "scan", "--rate", rate]).is_err());
        }
        assert!(Cli::try_parse_from(["vibeguard", "serve", "--rate", "250"]).is_ok());
    }

    #[test]
    fn more_than_three_tracking_sets_is_refused() {
        assert!(Cli::try_parse_from(["vibeguard", "capture", "--tracking", "4"]).is_err());
    }
}
