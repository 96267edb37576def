use vibeguard_core::{Capability, SimulatedConfig, SourceSelection, all_sources, detect_motion_source};

pub fn run(rate_hz: f64) {
    let sources = all_sources(rate_hz).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    println!("Found {} motion source(s):\n", sources.len());
    for src in &sources {
        let info = src.info();
        let marker = match src.capability() {
            Capability::Unsupported => "\u{274C}",
            Capability::Immediate => "\u{2705}",
            Capability::RequiresGrant => "\u{1F512}",
        };
        println!(
            "  {marker} {:<12} {:<10} {:<16} {}",
            info.name,
            info.kind.to_string(),
            src.capability().to_string(),
            info.description
        );
    }

    let chosen = detect_motion_source(
        SourceSelection::Auto,
        SimulatedConfig {
            rate_hz,
            ..SimulatedConfig::default()
        },
    );
    match chosen {
        Ok(src) => println!("\n  --source auto would use: {}", src.name()),
        Err(e) => eprintln!("\n  --source auto unavailable: {e}"),
    }
}
