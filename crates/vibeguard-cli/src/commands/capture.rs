use std::time::Duration;

use serde::Serialize;
use vibeguard_core::{CaptureKind, CaptureOutcome, CaptureReport, IntegrityRecord, SessionHandle};

use super::SessionArgs;

#[derive(Serialize)]
struct CaptureRun {
    source: String,
    baseline_hz: Option<f64>,
    /// Newest first.
    history: Vec<IntegrityRecord>,
    reports: Vec<CaptureReport>,
}

pub fn run(args: &SessionArgs, tracking: usize, settle: Duration, json: bool) {
    let rt = super::runtime();
    let run = rt.block_on(async {
        let session = super::spawn_session(args, None, None);
        if let Err(e) = session.start_monitoring().await {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        let mut reports = Vec::new();
        let baseline = capture(&session, CaptureKind::Baseline, args.window).await;
        let baseline_ok = matches!(baseline.outcome, CaptureOutcome::BaselineSet { .. });
        reports.push(baseline);

        if baseline_ok {
            for _ in 0..tracking {
                reports.push(capture(&session, CaptureKind::Tracking, args.window).await);
            }
        }

        let snapshot = session.snapshot();
        session.shutdown().await;
        CaptureRun {
            source: snapshot.source,
            baseline_hz: snapshot.baseline_hz,
            history: snapshot.history,
            reports,
        }
    });

    if json {
        match serde_json::to_string_pretty(&run) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print_table(&run);
    }

    if run.baseline_hz.is_none() {
        std::process::exit(1);
    }
}

async fn capture(session: &SessionHandle, kind: CaptureKind, window: Duration) -> CaptureReport {
    eprintln!("Sampling {kind} for {:.1}s ...", window.as_secs_f64());
    match session.capture(kind).await {
        Ok(report) => {
            if let CaptureOutcome::Failed { reason, .. } = &report.outcome {
                eprintln!("  {kind} failed: {reason}");
            }
            report
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn print_table(run: &CaptureRun) {
    println!();
    println!("Source: {}", run.source);
    match run.baseline_hz {
        Some(hz) => println!("Baseline: {hz:.3} Hz"),
        None => {
            println!("Baseline: not set");
            return;
        }
    }
    println!();

    if run.history.is_empty() {
        println!("  (no tracking sets recorded)");
        return;
    }

    println!(
        "  {:<6} {:>8} {:>12} {:>10} {:>11} {:>10}",
        "Set", "Score", "Frequency", "\u{00B1} Hz", "Confidence", "Time"
    );
    println!("  {}", "\u{2500}".repeat(62));
    let total = run.history.len();
    for (i, rec) in run.history.iter().enumerate() {
        println!(
            "  #{:<5} {:>7.1}% {:>9.3} Hz {:>10.4} {:>11} {:>10}",
            total - i,
            rec.score,
            rec.frequency_hz,
            rec.error_margin_hz,
            rec.confidence.to_string(),
            super::clock(rec.captured_at_ms)
        );
    }
}
