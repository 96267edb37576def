use std::time::Duration;

use vibeguard_core::{AnalysisGateway, GatewayConfig, HttpGateway};

pub fn run(analyzer_url: &str, timeout: Duration) {
    let config = GatewayConfig {
        base_url: analyzer_url.to_string(),
        timeout,
    };
    let gateway = HttpGateway::new(&config).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    println!("Probing {} ...", gateway.health_url());
    let rt = super::runtime();
    match rt.block_on(gateway.health()) {
        Ok(health) => {
            println!("  status:       {}", health.status);
            if let Some(system) = &health.system {
                println!("  system:       {system}");
            }
            match health.baseline_set {
                Some(true) => println!("  baseline set: yes"),
                Some(false) => println!("  baseline set: no"),
                None => {}
            }
            println!("  analyze at:   {}", gateway.analyze_url());
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
