use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::blink::lenient_string;
use crate::error::AppError;

use super::{ensure_success, http_client, network_error, read_json};

const SERVICE: &str = "clickcrate";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterClickCrateRequest {
    pub clickcrate_id: String,
    pub eligible_placement_type: String,
    pub eligible_product_category: String,
    pub manager: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProductListingRequest {
    pub product_listing_id: String,
    pub origin: String,
    pub eligible_placement_type: String,
    pub eligible_product_category: String,
    pub manager: String,
    /// Lamports.
    pub price: u64,
    pub order_manager: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceProductListingRequest {
    pub product_listing_id: String,
    pub clickcrate_id: String,
    /// Lamports.
    pub price: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredClickCrate {
    #[serde(default)]
    pub product: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredProductListing {
    /// Lamports.
    pub price: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub in_stock: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkPurchaseRequest {
    pub clickcrate_id: String,
    pub size: String,
    pub quantity: u32,
    pub buyer: String,
    pub payer: String,
    pub payment_processor: String,
    pub shipping_name: String,
    pub shipping_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_phone: Option<String>,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_state_province: String,
    pub shipping_country_region: String,
    pub shipping_zip_code: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlinkPurchaseResponse {
    pub transaction: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// The merchant bookkeeping API: point-of-sale and listing records plus
/// purchase initiation.
#[async_trait]
pub trait MerchantApi {
    async fn register_clickcrate(&self, request: &RegisterClickCrateRequest) -> Result<(), AppError>;
    async fn activate_clickcrate(&self, clickcrate_id: &str) -> Result<(), AppError>;
    async fn register_product_listing(
        &self,
        request: &RegisterProductListingRequest,
    ) -> Result<(), AppError>;
    async fn activate_product_listing(&self, product_listing_id: &str) -> Result<(), AppError>;
    async fn place_product_listing(&self, request: &PlaceProductListingRequest) -> Result<(), AppError>;
    async fn fetch_registered_clickcrate(&self, clickcrate_id: &str) -> Result<RegisteredClickCrate, AppError>;
    async fn fetch_registered_product_listing(
        &self,
        product_listing_id: &str,
    ) -> Result<RegisteredProductListing, AppError>;
    async fn make_blink_purchase(&self, request: &BlinkPurchaseRequest) -> Result<BlinkPurchaseResponse, AppError>;
}

#[derive(Clone)]
pub struct ClickCrateClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl ClickCrateClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, AppError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: http_client()?,
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response, AppError> {
        tracing::debug!("POST {}{}", self.base_url, path);
        self.http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(network_error)
    }

    /// Base URL extended with `segments`, each percent-encoded as a single
    /// path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| AppError::Config(format!("Invalid ClickCrate API URL: {}", err)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config("ClickCrate API URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, segments: &[&str]) -> Result<reqwest::Response, AppError> {
        let url = self.endpoint(segments)?;
        tracing::debug!("GET {}", url);
        self.http
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(network_error)
    }
}

#[async_trait]
impl MerchantApi for ClickCrateClient {
    async fn register_clickcrate(&self, request: &RegisterClickCrateRequest) -> Result<(), AppError> {
        let response = self.post("/v1/clickcrate/register", request).await?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }

    async fn activate_clickcrate(&self, clickcrate_id: &str) -> Result<(), AppError> {
        let body = serde_json::json!({ "clickcrateId": clickcrate_id });
        let response = self.post("/v1/clickcrate/activate", &body).await?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }

    async fn register_product_listing(
        &self,
        request: &RegisterProductListingRequest,
    ) -> Result<(), AppError> {
        let response = self.post("/v1/product-listing/register", request).await?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }

    async fn activate_product_listing(&self, product_listing_id: &str) -> Result<(), AppError> {
        let body = serde_json::json!({ "productListingId": product_listing_id });
        let response = self.post("/v1/product-listing/activate", &body).await?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }

    async fn place_product_listing(&self, request: &PlaceProductListingRequest) -> Result<(), AppError> {
        let response = self.post("/v1/product-listing/place", request).await?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }

    async fn fetch_registered_clickcrate(&self, clickcrate_id: &str) -> Result<RegisteredClickCrate, AppError> {
        let response = self.get(&["v1", "clickcrate", clickcrate_id]).await?;
        read_json(SERVICE, response).await
    }

    async fn fetch_registered_product_listing(
        &self,
        product_listing_id: &str,
    ) -> Result<RegisteredProductListing, AppError> {
        let response = self
            .get(&["v1", "product-listing", product_listing_id])
            .await?;
        read_json(SERVICE, response).await
    }

    async fn make_blink_purchase(&self, request: &BlinkPurchaseRequest) -> Result<BlinkPurchaseResponse, AppError> {
        let response = self.post("/v1/blink/purchase", request).await?;
        read_json(SERVICE, response).await
    }
}
