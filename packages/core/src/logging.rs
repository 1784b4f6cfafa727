use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Used when `RUST_LOG` is unset. The Solana RPC client logs every request
/// at debug level, so it is held back to warnings.
const DEFAULT_FILTER: &str = "info,solana_rpc_client=warn,solana_client=warn,hyper=warn";

/// Initialize structured logging for the service.
///
/// Must be called once at startup, before the router is built.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Logging initialized");
}
