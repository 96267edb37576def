use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use vibeguard_core::{
    CaptureKind, CaptureOutcome, CaptureReport, Connectivity, SessionHandle, SessionSnapshot,
};

use super::SessionArgs;

const HELP: &str = "commands: b = baseline, t = tracking, c = clear history, s = stop/start, p = status, q = quit";

pub fn run(args: &SessionArgs, live_sync: Option<Duration>, health_probe: Option<Duration>) {
    let rt = super::runtime();
    rt.block_on(async {
        let session = super::spawn_session(args, live_sync, health_probe);
        println!("VibeGuard monitor v{}", vibeguard_core::VERSION);
        println!("  source:   {}", session.snapshot().source);
        println!("  analyzer: {}", args.analyzer_url);
        println!("  {HELP}");
        println!();

        if let Err(e) = session.start_monitoring().await {
            eprintln!("  monitoring unavailable: {e}");
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut state = session.subscribe();
        let mut seen_seq = 0u64;
        let mut connectivity = Connectivity::Unknown;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Ok(Some(line)) = line else { break };
                    if !handle_line(&session, line.trim()).await {
                        break;
                    }
                }
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = state.borrow_and_update().clone();
                    if let Some(report) = &snapshot.last_capture {
                        if report.seq > seen_seq {
                            seen_seq = report.seq;
                            print_report(report);
                        }
                    }
                    if snapshot.connectivity != connectivity {
                        connectivity = snapshot.connectivity;
                        println!("  analyzer {connectivity}");
                    }
                }
                _ = &mut ctrl_c => {
                    println!();
                    break;
                }
            }
        }

        session.shutdown().await;
    });
}

/// Returns `false` when the user asked to quit.
async fn handle_line(session: &SessionHandle, line: &str) -> bool {
    match line {
        "b" => start(session, CaptureKind::Baseline).await,
        "t" => start(session, CaptureKind::Tracking).await,
        "c" => match session.clear_history().await {
            Ok(()) => println!("  history cleared"),
            Err(e) => eprintln!("  {e}"),
        },
        "s" => {
            if session.snapshot().monitoring {
                match session.stop_monitoring().await {
                    Ok(()) => println!("  monitoring stopped"),
                    Err(e) => eprintln!("  {e}"),
                }
            } else {
                match session.start_monitoring().await {
                    Ok(_) => println!("  monitoring started"),
                    Err(e) => eprintln!("  {e}"),
                }
            }
        }
        "p" => print_status(&session.snapshot()),
        "q" => return false,
        "" => {}
        _ => println!("  {HELP}"),
    }
    true
}

async fn start(session: &SessionHandle, kind: CaptureKind) {
    match session.start_capture(kind).await {
        Ok(ticket) => println!(
            "  {kind} #{} sampling for {:.1}s ...",
            ticket.seq,
            session.window().as_secs_f64()
        ),
        Err(e) => println!("  cannot start {kind}: {e}"),
    }
}

fn print_report(report: &CaptureReport) {
    match &report.outcome {
        CaptureOutcome::BaselineSet {
            frequency_hz,
            cleared,
        } => {
            println!("  baseline set: {frequency_hz:.3} Hz");
            if *cleared > 0 {
                println!("  ({cleared} tracking set(s) cleared)");
            }
        }
        CaptureOutcome::Recorded { record, .. } => println!(
            "  tracking #{}: score {:.1}%  {:.3} Hz \u{00B1} {:.4}  confidence {}",
            report.seq, record.score, record.frequency_hz, record.error_margin_hz, record.confidence
        ),
        CaptureOutcome::Failed { kind, reason } => println!("  {kind} failed: {reason}"),
        CaptureOutcome::Abandoned { kind } => println!("  {kind} abandoned"),
    }
}

fn print_status(s: &SessionSnapshot) {
    let smoothed = s.display.last().map(|d| d.value).unwrap_or(0.0);
    println!(
        "  monitoring: {}  phase: {:?}  buffer: {}/{}  smoothed: {smoothed:+.4}",
        s.monitoring, s.phase, s.buffered, s.buffer_capacity
    );
    match s.baseline_hz {
        Some(hz) => println!("  baseline: {hz:.3} Hz  tracking sets: {}", s.history.len()),
        None => println!("  baseline: not set"),
    }
    if let Some(live) = &s.live {
        println!(
            "  live: score {:.1}%  {:.3} Hz",
            live.integrity_score, live.current_hz
        );
    }
    if let Some(err) = &s.error {
        println!("  error: {err}");
    }
    println!("  analyzer: {}", s.connectivity);
}
