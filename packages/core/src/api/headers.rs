use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{Any, CorsLayer};

use crate::config::SolanaNetwork;

/// Solana Actions protocol version this service speaks.
pub const ACTION_VERSION: &str = "2.1.3";

pub const X_ACTION_VERSION: HeaderName = HeaderName::from_static("x-action-version");
pub const X_BLOCKCHAIN_IDS: HeaderName = HeaderName::from_static("x-blockchain-ids");

/// Permissive CORS so any wallet or blink client can call the actions.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::CONTENT_ENCODING,
            header::ACCEPT_ENCODING,
        ])
        .expose_headers([X_ACTION_VERSION, X_BLOCKCHAIN_IDS])
}

/// Stamp every response with the action version and the cluster id.
pub async fn action_headers(
    State(network): State<SolanaNetwork>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(X_ACTION_VERSION, HeaderValue::from_static(ACTION_VERSION));
    headers.insert(X_BLOCKCHAIN_IDS, HeaderValue::from_static(network.chain_id()));
    response
}
