use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::cache::ResponseCache;
use crate::error::AppError;

use super::{http_client, network_error, read_json};

const SERVICE: &str = "price";
pub const PRICE_CACHE_TTL: Duration = Duration::from_secs(60);

#[async_trait]
pub trait PriceFeed {
    /// Current SOL price in US dollars.
    async fn sol_usd_price(&self) -> Result<f64, AppError>;
}

#[derive(Deserialize)]
struct SimplePrice {
    solana: SolanaQuote,
}

#[derive(Deserialize)]
struct SolanaQuote {
    usd: f64,
}

/// CoinGecko simple-price client with a short-lived cache.
pub struct CoinGeckoClient {
    base_url: String,
    http: Client,
    cache: Mutex<ResponseCache<f64>>,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>, ttl: Duration) -> Result<Self, AppError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: http_client()?,
            cache: Mutex::new(ResponseCache::new(ttl)),
        })
    }

    async fn fetch(&self) -> Result<f64, AppError> {
        let url = format!("{}/api/v3/simple/price", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("ids", "solana"), ("vs_currencies", "usd")])
            .send()
            .await
            .map_err(network_error)?;
        let price: SimplePrice = read_json(SERVICE, response).await?;
        Ok(price.solana.usd)
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoClient {
    async fn sol_usd_price(&self) -> Result<f64, AppError> {
        let mut cache = self.cache.lock().await;
        if let Some(price) = cache.get() {
            return Ok(price);
        }
        let price = self.fetch().await?;
        cache.set(price);
        Ok(price)
    }
}

/// `sol * usd_per_sol`, rounded to cents.
pub fn usd_value(sol: f64, usd_per_sol: f64) -> f64 {
    (sol * usd_per_sol * 100.0).round() / 100.0
}
