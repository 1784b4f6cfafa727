//! Product creation blink: form, email verification, then mint and list.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::blink::{
    lenient_string, relative_href, Action, ActionBody, ActionParameter, ActionPostRequest,
    ActionPostResponse, LinkedAction, LinkedActionType, ParameterType, SelectOption,
};
use crate::error::AppError;
use crate::services::clickcrate::{
    PlaceProductListingRequest, RegisterClickCrateRequest, RegisterProductListingRequest,
};
use crate::services::minting::ProductMintRequest;
use crate::services::solana::build_payment_transaction;
use crate::validation::{
    parse_account, sol_to_lamports, CreateProductForm, ProductInfo, MAX_QUANTITY, PRODUCT_TYPES,
};

use super::{json_body, ActionsState};

pub const CREATOR_ICON: &str = "https://shdw-drive.genesysgo.net/CiJnYeRgNUptSKR4MmsAPn7Zhp6LSv91ncWTuNqDLo7T/horizontalmerchcreatoricon.png";
const CREATOR_TITLE: &str = "ClickCrate Merch Creator";

pub fn routes() -> Router<ActionsState> {
    Router::new()
        .route("/creator", get(creator_form))
        .route("/creator/create-product", post(create_product))
        .route("/creator/verify", post(verify_product))
}

/// `GET /creator`: the product creation form.
pub async fn creator_form() -> Json<Action> {
    let product_types = PRODUCT_TYPES
        .iter()
        .map(|pt| SelectOption::new(pt.label, pt.value))
        .collect();
    let quantities = (1..=MAX_QUANTITY)
        .map(|q| SelectOption::new(q.to_string(), q.to_string()))
        .collect();

    let create = LinkedAction::new("/creator/create-product", "CREATE")
        .of_type(LinkedActionType::Post)
        .with_parameters(vec![
            ActionParameter::required(ParameterType::Select, "type", "Select a product")
                .with_options(product_types),
            ActionParameter::required(ParameterType::Url, "imageUri", "Product Image URL"),
            ActionParameter::required(ParameterType::Text, "name", "Product Name"),
            ActionParameter::required(ParameterType::Textarea, "description", "Product Description"),
            ActionParameter::required(ParameterType::Select, "quantity", "Quantity (1-3)")
                .with_options(quantities),
            ActionParameter::required(ParameterType::Number, "unitPrice", "Unit Price (in SOL)"),
            ActionParameter::required(ParameterType::Email, "email", "Email"),
        ]);

    Json(Action::Action(
        ActionBody::new(
            CREATOR_ICON,
            CREATOR_TITLE,
            "Start selling your own branded merch directly on Twitter in just a few clicks using blinks! To get started simply select a product to create below:",
            "CREATE",
        )
        .with_actions(vec![create]),
    ))
}

/// `POST /creator/create-product`: validate, stash, and email a code.
pub async fn create_product(
    State(state): State<ActionsState>,
    payload: Result<Json<ActionPostRequest<CreateProductForm>>, JsonRejection>,
) -> Result<Json<ActionPostResponse>, AppError> {
    let request = json_body(payload)?;
    let form = request.data.unwrap_or_default();
    let info = ProductInfo::parse(&form, &request.account)?;
    let email = info.email.clone();

    let (id, code) = state.pending.write().await.insert(info);
    tracing::info!("Stored pending product {} for {}", id, request.account);

    let sent = state.email.send_verification_email(&email, &code).await;
    if let Err(err) = state.observe("email", sent) {
        state.pending.write().await.remove(&id);
        state.refresh_pending_gauge().await;
        return Err(err);
    }
    state.metrics.verification_emails_sent_total.inc();
    state.refresh_pending_gauge().await;

    let verify = LinkedAction::new(
        relative_href("/creator/verify", &[("id", id.as_str())]),
        "Verify and Place Product",
    )
    .of_type(LinkedActionType::Transaction)
    .with_parameters(vec![ActionParameter::required(
        ParameterType::Text,
        "code",
        "6-digit Verification Code",
    )
    .with_pattern("^[0-9]{6}$", "The 6-digit code from your email")]);

    let next = Action::Action(
        ActionBody::new(
            CREATOR_ICON,
            "Enter Verification Code",
            format!("Please enter the 6-digit code sent to: {}", email),
            "Verify Email",
        )
        .with_actions(vec![verify]),
    );

    Ok(Json(
        ActionPostResponse::post("Please check your email for the verification code.")
            .then_inline(next),
    ))
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyForm {
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: Option<String>,
}

/// `POST /creator/verify?id=…`: check the code, then mint, register,
/// activate and place the product, and charge the creator the mint cost.
pub async fn verify_product(
    State(state): State<ActionsState>,
    Query(query): Query<VerifyQuery>,
    payload: Result<Json<ActionPostRequest<VerifyForm>>, JsonRejection>,
) -> Result<Json<ActionPostResponse>, AppError> {
    let request = json_body(payload)?;
    let code = request.data.and_then(|form| form.code).filter(|c| !c.trim().is_empty());
    let (id, code) = match (query.id.filter(|id| !id.is_empty()), code) {
        (Some(id), Some(code)) => (id, code),
        _ => return Err(AppError::validation("Missing required parameters")),
    };
    let account = parse_account(&request.account)?;

    let verified = state.pending.write().await.verify(&id, &account, &code);
    let pending = match verified {
        Ok(pending) => pending,
        Err(err) => {
            state.metrics.verification_failures_total.inc();
            state.refresh_pending_gauge().await;
            tracing::warn!("Verification of {} failed: {}", id, err);
            return Err(AppError::validation(err.to_string()));
        }
    };
    state.refresh_pending_gauge().await;
    let info = pending.info;

    let price = sol_to_lamports(info.unit_price_sol)
        .ok_or_else(|| AppError::validation("Unit price must be a positive number"))?;
    let manager = account.to_string();

    let minted = state.observe(
        "mint",
        state
            .minter
            .create_products(&ProductMintRequest {
                name: info.name.clone(),
                description: info.description.clone(),
                image_uri: info.image_uri.clone(),
                quantity: info.quantity,
                creator: account,
                fee_payer: state.relay_wallet,
            })
            .await,
    )?;
    let pos = minted.pos.address.clone();
    let listing = minted.listing.address.clone();
    tracing::info!(
        "Minted POS {} and listing {} with {} units for {}",
        pos,
        listing,
        minted.products.len(),
        manager
    );

    let merchant = &state.merchant;
    state.observe(
        "clickcrate",
        merchant
            .register_clickcrate(&RegisterClickCrateRequest {
                clickcrate_id: pos.clone(),
                eligible_placement_type: "digitalreplica".to_string(),
                eligible_product_category: "clothing".to_string(),
                manager: manager.clone(),
            })
            .await,
    )?;
    state.observe("clickcrate", merchant.activate_clickcrate(&pos).await)?;
    state.observe(
        "clickcrate",
        merchant
            .register_product_listing(&RegisterProductListingRequest {
                product_listing_id: listing.clone(),
                origin: "clickcrate".to_string(),
                eligible_placement_type: "relatedpurchase".to_string(),
                eligible_product_category: "clothing".to_string(),
                manager,
                price,
                order_manager: "clickcrate".to_string(),
            })
            .await,
    )?;
    state.observe("clickcrate", merchant.activate_product_listing(&listing).await)?;
    state.observe(
        "clickcrate",
        merchant
            .place_product_listing(&PlaceProductListingRequest {
                product_listing_id: listing.clone(),
                clickcrate_id: pos.clone(),
                price,
            })
            .await,
    )?;

    let blockhash = state.observe("solana", state.blockhash.latest_blockhash().await)?;
    let transaction = build_payment_transaction(
        &account,
        &state.relay_wallet,
        minted.total_cost_lamports,
        blockhash,
    )?;
    state.metrics.products_created_total.inc();

    let blink_url = format!("{}/{}", state.blink_base_url, pos);
    tracing::info!("Product {} ready at {}", info.name, blink_url);

    let created = Action::Completed(ActionBody::new(
        CREATOR_ICON,
        CREATOR_TITLE,
        format!(
            "Your product is ready for sale! Share this Blink URL to start selling: {}",
            blink_url
        ),
        "Created!",
    ));

    Ok(Json(
        ActionPostResponse::transaction(transaction, "Product creation completed successfully!")
            .then_inline(created),
    ))
}
