//! HTTP surface: the Actions endpoints plus health and metrics.

pub mod creator;
pub mod headers;
pub mod health;
pub mod merch;
pub mod purchase;
pub mod storefront;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use solana_sdk::pubkey::Pubkey;
use tokio::sync::RwLock;

use crate::blink::{ActionRule, ActionsJson};
use crate::config::{Config, SolanaNetwork};
use crate::error::AppError;
use crate::metrics::{track_metrics, AppMetrics};
use crate::services::{
    clickcrate::{ClickCrateClient, MerchantApi},
    das::{AssetReader, DasClient},
    email::{EmailClient, EmailSender},
    minting::{MintClient, ProductMinter},
    price::{CoinGeckoClient, PriceFeed, PRICE_CACHE_TTL},
    solana::{BlockhashSource, RpcBlockhashSource},
};
use crate::store::PendingProductStore;

/// Shared state type for every actions route.
pub type ActionsState = Arc<ActionsApiState>;

pub struct ActionsApiState {
    pub network: SolanaNetwork,
    pub relay_wallet: Pubkey,
    pub blink_base_url: String,
    pub merchant: Arc<dyn MerchantApi + Send + Sync>,
    pub minter: Arc<dyn ProductMinter + Send + Sync>,
    pub assets: Arc<dyn AssetReader + Send + Sync>,
    pub email: Arc<dyn EmailSender + Send + Sync>,
    pub blockhash: Arc<dyn BlockhashSource + Send + Sync>,
    pub price: Arc<dyn PriceFeed + Send + Sync>,
    pub pending: Arc<RwLock<PendingProductStore>>,
    pub metrics: Arc<AppMetrics>,
}

impl ActionsApiState {
    /// Wire the production HTTP and RPC clients from configuration.
    pub fn from_config(config: &Config, metrics: Arc<AppMetrics>) -> Result<Self, AppError> {
        Ok(Self {
            network: config.solana_network,
            relay_wallet: config.relay_wallet,
            blink_base_url: config.blink_base_url.trim_end_matches('/').to_string(),
            merchant: Arc::new(ClickCrateClient::new(
                config.clickcrate_api_url.as_str(),
                config.clickcrate_api_key.as_str(),
            )?),
            minter: Arc::new(MintClient::new(
                config.mint_api_url.as_str(),
                config.mint_api_key.as_str(),
                config.solana_network,
            )?),
            assets: Arc::new(DasClient::new(config.das_rpc_url.as_str())?),
            email: Arc::new(EmailClient::new(
                config.email_api_url.as_str(),
                config.email_api_key.as_str(),
                config.email_from.as_str(),
            )?),
            blockhash: Arc::new(RpcBlockhashSource::new(config.solana_rpc_url.as_str())),
            price: Arc::new(CoinGeckoClient::new(
                config.price_api_url.as_str(),
                PRICE_CACHE_TTL,
            )?),
            pending: Arc::new(RwLock::new(PendingProductStore::new())),
            metrics,
        })
    }

    /// Count failed collaborator calls before passing the result on.
    pub fn observe<T>(&self, service: &'static str, result: Result<T, AppError>) -> Result<T, AppError> {
        if let Err(err) = &result {
            tracing::error!("{} call failed: {}", service, err);
            self.metrics.record_upstream_error(service);
        }
        result
    }

    pub async fn refresh_pending_gauge(&self) {
        let pending = self.pending.read().await.len();
        self.metrics.pending_submissions.set(pending as f64);
    }
}

/// Assemble the full router: routes, action headers, metrics and CORS.
pub fn create_router(state: ActionsState) -> Router {
    let network = state.network;
    let metrics = state.metrics.clone();

    Router::new()
        .route("/", get(root))
        .route("/health", get(health::health))
        .route("/metrics", get(metrics_handler))
        .route("/actions.json", get(actions_json))
        .merge(creator::routes())
        .merge(merch::routes())
        .merge(storefront::routes())
        .with_state(state)
        .layer(middleware::from_fn_with_state(network, headers::action_headers))
        .layer(middleware::from_fn_with_state(metrics, track_metrics))
        .layer(headers::cors_layer())
}

async fn root() -> &'static str {
    "Welcome to ClickCrate Actions API!"
}

async fn actions_json() -> Json<ActionsJson> {
    let rules = ["/creator/**", "/merch/**", "/storefront/**"]
        .into_iter()
        .map(|pattern| ActionRule {
            path_pattern: pattern.to_string(),
            api_path: pattern.to_string(),
        })
        .collect();
    Json(ActionsJson { rules })
}

async fn metrics_handler(State(state): State<ActionsState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Failed to render metrics: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics error").into_response()
        }
    }
}

/// Unwrap a JSON body, turning axum's rejection into a 400 action error.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::validation(format!("Invalid request body: {}", rejection.body_text())))
}
