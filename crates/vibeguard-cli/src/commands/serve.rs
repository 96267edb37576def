use std::time::Duration;

use super::SessionArgs;

pub struct ServeCommandConfig<'a> {
    pub session: &'a SessionArgs,
    pub host: &'a str,
    pub port: u16,
    pub start: bool,
    pub live_sync: Option<Duration>,
    pub health_probe: Option<Duration>,
}

pub fn run(cfg: ServeCommandConfig<'_>) {
    let base = format!("http://{}:{}", cfg.host, cfg.port);

    println!("VibeGuard Monitor Server v{}", vibeguard_core::VERSION);
    println!("   {base}");
    println!("   analyzer: {}", cfg.session.analyzer_url);
    println!();
    println!("   Endpoints:");
    println!("     GET    /                   API index (try: curl {base})");
    println!("     GET    /health             Liveness and analyzer connectivity");
    println!("     GET    /status             Full session snapshot");
    println!("     GET    /history            Tracking records, newest first");
    println!("     DELETE /history            Clear tracking records");
    println!("     GET    /display            Smoothed samples for charting");
    println!("     POST   /monitoring/start   Request motion access and start sampling");
    println!("     POST   /monitoring/stop    Stop sampling");
    println!("     POST   /capture/baseline   Open a baseline window");
    println!("     POST   /capture/tracking   Open a tracking window");
    println!();
    println!("   Examples:");
    println!("     curl -X POST {base}/monitoring/start");
    println!("     curl -X POST {base}/capture/baseline");
    println!("     curl {base}/history");
    println!();

    let rt = super::runtime();
    let result = rt.block_on(async {
        let session = super::spawn_session(cfg.session, cfg.live_sync, cfg.health_probe);
        if cfg.start {
            match session.start_monitoring().await {
                Ok(_) => println!("   monitoring started on {}", session.snapshot().source),
                Err(e) => eprintln!("   monitoring unavailable: {e}"),
            }
        }

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        let served = vibeguard_server::run_server(session.clone(), cfg.host, cfg.port, shutdown).await;
        session.shutdown().await;
        served
    });

    if let Err(e) = result {
        eprintln!("Error: cannot serve on {base}: {e}");
        std::process::exit(1);
    }
}
