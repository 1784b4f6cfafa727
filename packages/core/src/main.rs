use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tokio::{net::TcpListener, signal};

use clickcrate_actions::api::{create_router, ActionsApiState};
use clickcrate_actions::cli::Cli;
use clickcrate_actions::config::Config;
use clickcrate_actions::error::AppError;
use clickcrate_actions::logging::init_logging;
use clickcrate_actions::metrics::AppMetrics;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let config = Config::from_env()
        .and_then(|config| config.with_overrides(&cli))
        .map_err(AppError::Config)
        .unwrap_or_else(|err| {
            tracing::error!("{}", err);
            std::process::exit(1);
        });

    if let Err(err) = run(config).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    let metrics = AppMetrics::new()
        .map(Arc::new)
        .map_err(|e| AppError::Config(format!("metrics registry: {}", e)))?;
    let state = Arc::new(ActionsApiState::from_config(&config, metrics)?);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Network(format!("failed to bind {}: {}", addr, e)))?;

    tracing::info!(
        "ClickCrate Actions listening on {} (network: {}, relay wallet: {})",
        addr,
        config.solana_network.as_str(),
        config.relay_wallet
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received. Stopping server.");
            }
        })
        .await
        .map_err(|e| AppError::Network(format!("server error: {}", e)))?;

    tracing::info!("Server stopped cleanly");
    Ok(())
}
