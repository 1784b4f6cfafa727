//! Clients for the external collaborators the actions orchestrate.
//!
//! Each collaborator sits behind an `#[async_trait]` trait so handlers hold
//! `Arc<dyn Trait + Send + Sync>` and tests can swap in stubs.

pub mod clickcrate;
pub mod das;
pub mod email;
pub mod minting;
pub mod price;
pub mod solana;

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::AppError;

/// Per-request timeout for every outbound HTTP call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn http_client() -> Result<Client, AppError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|err| AppError::Config(format!("Failed to build HTTP client: {}", err)))
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Turn a non-2xx response into `AppError::Upstream`, preferring the
/// body's `message` field over the raw text.
pub(crate) async fn ensure_success(
    service: &'static str,
    response: Response,
) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or(text);

    Err(AppError::Upstream {
        service,
        status: status.as_u16(),
        message,
    })
}

/// Check the status, then decode the JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, AppError> {
    ensure_success(service, response)
        .await?
        .json::<T>()
        .await
        .map_err(|err| AppError::Parse(err.to_string()))
}

pub(crate) fn network_error(err: reqwest::Error) -> AppError {
    AppError::Network(err.to_string())
}
