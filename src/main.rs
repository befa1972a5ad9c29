//! KUDE Server
//!
//! Accepts electronic invoice XML over HTTP, renders it to PDF with the
//! external report tool and answers with the generated file name.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;

use kude_server::config::Config;
use kude_server::logging;
use kude_server::report::{JarRenderer, RendererCommand};
use kude_server::routes;
use kude_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("failed to load configuration")?;

    let _log_guards = logging::init(&config.logging)?;

    tracing::info!("Starting KUDE Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Output folder: {}", config.output.dir.display());
    tracing::info!("Report template: {}", config.renderer.template_path.display());
    tracing::info!(
        "Renderer: {} -jar {} (timeout {:?}, max {} concurrent)",
        config.renderer.java_path.display(),
        config.renderer.jar_path.display(),
        config.renderer.timeout,
        config.renderer.max_concurrent
    );

    tokio::fs::create_dir_all(&config.output.dir)
        .await
        .with_context(|| format!("failed to create output folder {}", config.output.dir.display()))?;
    for (label, path) in [
        ("Renderer jar", &config.renderer.jar_path),
        ("Report template", &config.renderer.template_path),
    ] {
        if !path.exists() {
            tracing::warn!("{} not found at {}", label, path.display());
        }
    }

    let renderer = JarRenderer::new(
        RendererCommand::java_jar(&config.renderer.java_path, &config.renderer.jar_path),
        config.renderer.timeout,
    );

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("invalid SERVER_HOST {}", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);

    let app = routes::app(AppState::new(config, Arc::new(renderer)));

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Server started at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
