use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use overview_scout::api::build_router;
use overview_scout::core::config;
use overview_scout::{AppState, OverviewScraper};

fn parse_port_from_args() -> Option<u16> {
    let mut args = std::env::args().peekable();
    while let Some(a) = args.next() {
        if a == "--port" {
            if let Some(v) = args.next() {
                if let Ok(p) = v.parse::<u16>() {
                    return Some(p);
                }
            }
        } else if let Some(rest) = a.strip_prefix("--port=") {
            if let Ok(p) = rest.parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let scraper = Arc::new(OverviewScraper::from_env());
    let state = AppState::new(scraper.clone());
    let app = build_router(state);

    let port = parse_port_from_args().unwrap_or_else(config::port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {}. Stop the existing process or run with --port {} (or set PORT).",
                bind_addr,
                port.saturating_add(1)
            )
        }
        Err(e) => return Err(e.into()),
    };

    info!("AI Overview API listening on http://{}", bind_addr);
    info!("API documentation: http://localhost:{}/", port);
    info!("Health check: http://localhost:{}/api/health", port);
    info!(
        "AI Overview: http://localhost:{}/api/ai-overview?q=your+search+query",
        port
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(scraper))
    .await?;

    Ok(())
}

/// Wait for a termination signal, then tear the browser session down before
/// the server exits.
async fn shutdown_signal(scraper: Arc<OverviewScraper>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received, closing browser session...");
    scraper.shutdown().await;
}
