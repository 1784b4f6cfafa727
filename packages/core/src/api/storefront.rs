//! Multi-product storefront blink built from up to six ClickCrates.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::blink::{
    relative_href, Action, ActionBody, ActionPostRequest, ActionPostResponse, LinkedAction,
    LinkedActionType,
};
use crate::error::AppError;
use crate::validation::{parse_clickcrate_id, ShippingForm};

use super::purchase::{
    complete_purchase, load_listing, shipping_parameters, size_parameter, ListingView,
    PurchaseTarget,
};
use super::{json_body, ActionsState};

pub const STOREFRONT_ICON: &str = "https://shdw-drive.genesysgo.net/3CjrSiTMjg73qjNb9Phpd54sT2ZNXM6YmUudRHvwwppx/clickcrate_storefront.svg";
pub const MAX_STOREFRONT_POS: usize = 6;

pub fn routes() -> Router<ActionsState> {
    Router::new()
        .route("/storefront", get(storefront_action))
        .route("/storefront/purchase/:clickcrate_id", post(purchase))
}

/// ClickCrate ids from every `pos*` query parameter, in key order.
pub fn pos_values(query: &BTreeMap<String, String>) -> Result<Vec<String>, AppError> {
    let values: Vec<String> = query
        .iter()
        .filter(|(key, _)| key.starts_with("pos"))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();

    if values.len() > MAX_STOREFRONT_POS {
        return Err(AppError::validation(format!(
            "Too many POS values. Maximum allowed is {}.",
            MAX_STOREFRONT_POS
        )));
    }
    if values.is_empty() {
        return Err(AppError::validation("At least one POS value is required"));
    }
    values.iter().map(|value| parse_clickcrate_id(value)).collect()
}

fn product_link(view: &ListingView) -> LinkedAction {
    let href = relative_href(
        &format!("/storefront/purchase/{}", view.clickcrate_id),
        &[("productName", view.name()), ("productIcon", view.icon.as_str())],
    );
    let mut parameters = Vec::new();
    if !view.sizes.is_empty() {
        parameters.push(size_parameter(view.sizes.clone()));
    }
    parameters.extend(shipping_parameters());

    LinkedAction::new(href, format!("{} - {} SOL", view.name(), view.price_sol()))
        .of_type(LinkedActionType::Transaction)
        .with_parameters(parameters)
}

/// `GET /storefront?pos1=…&pos2=…`: one purchase button per ClickCrate.
pub async fn storefront_action(
    State(state): State<ActionsState>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<Action>, AppError> {
    let clickcrate_ids = pos_values(&query)?;

    let mut actions = Vec::with_capacity(clickcrate_ids.len());
    for clickcrate_id in &clickcrate_ids {
        let view = load_listing(&state, clickcrate_id).await?;
        if view.sold_out() {
            tracing::info!("Skipping sold out ClickCrate {}", clickcrate_id);
            continue;
        }
        actions.push(product_link(&view));
    }

    let body = ActionBody::new(
        STOREFRONT_ICON,
        "ClickCrate Storefront",
        "Collection of physical ClickCrate products for sale! Select a product to purchase below:",
        "Choose a product",
    );
    let body = if actions.is_empty() {
        ActionBody {
            label: "Sold Out".to_string(),
            ..body
        }
        .disabled(true)
    } else {
        body.with_actions(actions)
    };

    Ok(Json(Action::Action(body)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontProductQuery {
    pub product_name: Option<String>,
    pub product_icon: Option<String>,
}

/// `POST /storefront/purchase/:clickcrate_id?productName=…&productIcon=…`
pub async fn purchase(
    State(state): State<ActionsState>,
    Path(clickcrate_id): Path<String>,
    Query(query): Query<StorefrontProductQuery>,
    payload: Result<Json<ActionPostRequest<ShippingForm>>, JsonRejection>,
) -> Result<Json<ActionPostResponse>, AppError> {
    let request = json_body(payload)?;
    let target = match (query.product_name, query.product_icon) {
        (Some(product_name), Some(product_icon)) => PurchaseTarget {
            clickcrate_id: parse_clickcrate_id(&clickcrate_id)?,
            product_name,
            product_icon,
        },
        _ => return Err(AppError::validation("Missing required parameters")),
    };
    let form = request.data.unwrap_or_default();

    let response = complete_purchase(&state, target, &request.account, form).await?;
    Ok(Json(response))
}
