//! Listing lookup and checkout shared by the merch and storefront blinks.

use serde::Deserialize;

use crate::blink::{
    Action, ActionBody, ActionParameter, ActionPostResponse, ParameterType, SelectOption,
};
use crate::error::AppError;
use crate::services::clickcrate::{BlinkPurchaseRequest, RegisteredProductListing};
use crate::services::das::CollectionAsset;
use crate::services::price::usd_value;
use crate::validation::{lamports_to_sol, parse_account, ShippingForm};

use super::ActionsApiState;

pub const PLACEHOLDER_ICON: &str = "https://shdw-drive.genesysgo.net/3CjrSiTMjg73qjNb9Phpd54sT2ZNXM6YmUudRHvwwppx/clickcrate%20pos%20placeholder.svg";
pub const SIZE_ATTRIBUTE: &str = "Size(s)";
pub const PAYMENT_PROCESSOR: &str = "solana";
/// Size sent when the buyer was not shown a size select.
pub const DEFAULT_SIZE: &str = "One Size";

/// Everything a blink needs to present one ClickCrate's product.
#[derive(Debug, Clone)]
pub struct ListingView {
    pub clickcrate_id: String,
    pub collection: CollectionAsset,
    pub listing: RegisteredProductListing,
    pub icon: String,
    pub sizes: Vec<SelectOption>,
    pub usd_per_sol: Option<f64>,
}

impl ListingView {
    pub fn name(&self) -> &str {
        &self.collection.name
    }

    pub fn price_sol(&self) -> f64 {
        lamports_to_sol(self.listing.price)
    }

    pub fn price_usd(&self) -> Option<f64> {
        self.usd_per_sol.map(|rate| usd_value(self.price_sol(), rate))
    }

    /// Units left; `None` when the merchant reports something unparseable.
    pub fn in_stock(&self) -> Option<i64> {
        self.listing
            .in_stock
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
    }

    /// Stock exactly as the merchant reported it.
    pub fn stock_label(&self) -> &str {
        self.listing
            .in_stock
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .unwrap_or("N/A")
    }

    pub fn sold_out(&self) -> bool {
        self.in_stock().map(|units| units < 1).unwrap_or(true)
    }

    pub fn size_label(&self) -> Option<&str> {
        self.collection.attribute(SIZE_ATTRIBUTE)
    }
}

/// Split a `Size(s)` attribute into select options.
pub fn parse_sizes(raw: &str) -> Vec<SelectOption> {
    raw.split(',')
        .map(str::trim)
        .filter(|size| !size.is_empty())
        .map(|size| SelectOption::new(size, size))
        .collect()
}

/// Resolve a ClickCrate to its listing collection, listing record, icon and
/// sizes.
pub async fn load_listing(
    state: &ActionsApiState,
    clickcrate_id: &str,
) -> Result<ListingView, AppError> {
    let clickcrate = state.observe(
        "clickcrate",
        state.merchant.fetch_registered_clickcrate(clickcrate_id).await,
    )?;
    let product_id = clickcrate
        .product
        .filter(|product| !product.is_empty())
        .ok_or_else(|| AppError::not_found("Product not found in ClickCrate"))?;

    let collection = state.observe("das", state.assets.fetch_collection(&product_id).await)?;
    let listing = state.observe(
        "clickcrate",
        state.merchant.fetch_registered_product_listing(&product_id).await,
    )?;

    let icon = if collection.json_uri.is_empty() {
        None
    } else {
        match state.assets.fetch_metadata_image(&collection.json_uri).await {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!("Could not read metadata for {}: {}", product_id, err);
                None
            }
        }
    }
    .unwrap_or_else(|| PLACEHOLDER_ICON.to_string());

    let sizes = collection
        .attribute(SIZE_ATTRIBUTE)
        .map(parse_sizes)
        .unwrap_or_default();

    let usd_per_sol = match state.price.sol_usd_price().await {
        Ok(rate) => Some(rate),
        Err(err) => {
            tracing::warn!("SOL/USD price unavailable: {}", err);
            None
        }
    };

    Ok(ListingView {
        clickcrate_id: clickcrate_id.to_string(),
        collection,
        listing,
        icon,
        sizes,
        usd_per_sol,
    })
}

/// Form fields collected before checkout, after the size select.
pub fn shipping_parameters() -> Vec<ActionParameter> {
    vec![
        ActionParameter::required(ParameterType::Text, "buyerName", "First & Last name"),
        ActionParameter::required(ParameterType::Email, "shippingEmail", "Email"),
        ActionParameter::required(
            ParameterType::Text,
            "shippingAddress",
            "Address (including Apt., Suite, etc.)",
        ),
        ActionParameter::required(ParameterType::Text, "shippingCity", "City"),
        ActionParameter::required(ParameterType::Text, "shippingStateProvince", "State/Province"),
        ActionParameter::required(ParameterType::Text, "shippingCountryRegion", "Country/Region"),
        ActionParameter::required(ParameterType::Text, "shippingZipCode", "ZIP code"),
    ]
}

pub fn size_parameter(sizes: Vec<SelectOption>) -> ActionParameter {
    ActionParameter::required(ParameterType::Select, "size", "Select a size").with_options(sizes)
}

/// Identifies what is being bought, from the path or query string.
#[derive(Debug, Clone)]
pub struct PurchaseTarget {
    pub clickcrate_id: String,
    pub product_name: String,
    pub product_icon: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub clickcrate_id: Option<String>,
    pub product_name: Option<String>,
    pub product_icon: Option<String>,
}

/// Validate the buyer's form, start the purchase with the merchant, and
/// hand the returned transaction to the wallet.
pub async fn complete_purchase(
    state: &ActionsApiState,
    target: PurchaseTarget,
    account: &str,
    form: ShippingForm,
) -> Result<ActionPostResponse, AppError> {
    let buyer = parse_account(account)?;
    let size = form
        .size
        .as_deref()
        .map(str::trim)
        .filter(|size| !size.is_empty())
        .unwrap_or(DEFAULT_SIZE)
        .to_string();
    let shipping = form.validate()?;

    tracing::info!(
        "Purchasing {} from ClickCrate {} for {}",
        target.product_name,
        target.clickcrate_id,
        buyer
    );

    let request = BlinkPurchaseRequest {
        clickcrate_id: target.clickcrate_id.clone(),
        size,
        quantity: 1,
        buyer: buyer.to_string(),
        payer: buyer.to_string(),
        payment_processor: PAYMENT_PROCESSOR.to_string(),
        shipping_name: shipping.name,
        shipping_email: shipping.email.clone(),
        shipping_phone: shipping.phone,
        shipping_address: shipping.address,
        shipping_city: shipping.city,
        shipping_state_province: shipping.state_province,
        shipping_country_region: shipping.country_region,
        shipping_zip_code: shipping.zip_code,
    };
    let purchase = state.observe("clickcrate", state.merchant.make_blink_purchase(&request).await)?;

    let confirmed = Action::Completed(ActionBody::new(
        target.product_icon,
        "Order Confirmed",
        format!(
            "Your purchase of {} is confirmed! An order confirmation has been emailed to: {}",
            target.product_name, shipping.email
        ),
        "Purchase Complete",
    ));

    Ok(ActionPostResponse::transaction(
        purchase.transaction,
        format!(
            "Your purchase of {} is confirmed. Order confirmation emailed to: {}",
            target.product_name, shipping.email
        ),
    )
    .then_inline(confirmed))
}
