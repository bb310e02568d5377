use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warden::conf::WardenConfig;
use warden::docker::client::DockerCli;
use warden::http;
use warden::security::SecurityRules;
use warden::state::Warden;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warden=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Warden container supervisor");

    // Load configuration (directory from env, default ./config)
    let config_dir = PathBuf::from(
        std::env::var("WARDEN_CONFIG_DIR").unwrap_or_else(|_| "config".to_string()),
    );
    let config = WardenConfig::load(&config_dir).map_err(|e| {
        error!("Failed to load configuration: {e}");
        e
    })?;
    let rules = SecurityRules::load(&config_dir);

    info!("Watching {} containers", config.containers.len());
    for container in &config.containers {
        info!("  - {}", container.name);
    }

    // Fatal init check: the runtime must be reachable
    let docker_host = std::env::var("DOCKER_HOST").unwrap_or_default();
    let docker = DockerCli::new(&docker_host);
    docker.ping().await.map_err(|e| {
        error!("Cannot reach the container runtime: {e}");
        e
    })?;
    info!("Container runtime is reachable");

    let bind = std::env::var("WARDEN_BIND").unwrap_or_else(|_| {
        format!("{}:{}", config.executor.host, config.executor.port)
    });
    let addr: SocketAddr = bind.parse().map_err(|e| {
        error!("Invalid bind address {bind}: {e}");
        e
    })?;

    // config → notifier → runtime adapter → executor → graph → queue → monitor
    let warden = Warden::bootstrap(config, rules, docker);
    warden.start();

    let app = http::router(warden.api_state());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP facade listening on http://{addr}");
    info!("Press Ctrl+C to shut down gracefully");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    warden.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
/// Listens for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
