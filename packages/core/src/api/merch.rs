//! Single-product merch blink.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::blink::{
    relative_href, Action, ActionBody, ActionPostRequest, ActionPostResponse, LinkedAction,
    LinkedActionType,
};
use crate::error::AppError;
use crate::validation::{parse_clickcrate_id, ShippingForm};

use super::purchase::{
    complete_purchase, load_listing, shipping_parameters, size_parameter, ListingView,
    ProductQuery, PurchaseTarget,
};
use super::{json_body, ActionsState};

pub fn routes() -> Router<ActionsState> {
    Router::new()
        .route("/merch/purchase", post(purchase))
        .route("/merch/:clickcrate_id", get(merch_action))
}

fn merch_description(view: &ListingView) -> String {
    format!(
        "IN STOCK: {} | SIZE: {} | DELIVERY: ~2 weeks\n{}\nOrder confirmations and updates will be sent to your provided email address. To avoid delays ensure all information is correct.\nNeed help? Send us a DM @click_crate on Twitter or email us at support@clickcrate.xyz",
        view.stock_label(),
        view.size_label().unwrap_or("N/A"),
        view.collection.description
    )
}

fn buy_label(view: &ListingView) -> String {
    let mut label = format!("Buy for {} SOL", view.price_sol());
    if let Some(usd) = view.price_usd() {
        label.push_str(&format!(" (~${:.2})", usd));
    }
    label
}

/// `GET /merch/:clickcrate_id`: product card with the checkout form.
pub async fn merch_action(
    State(state): State<ActionsState>,
    Path(clickcrate_id): Path<String>,
) -> Result<Json<Action>, AppError> {
    let clickcrate_id = parse_clickcrate_id(&clickcrate_id)?;
    let view = load_listing(&state, &clickcrate_id).await?;
    let body = ActionBody::new(
        view.icon.clone(),
        view.name().to_string(),
        merch_description(&view),
        format!("Purchase {}", view.name()),
    );

    if view.sold_out() {
        tracing::info!("ClickCrate {} is sold out", clickcrate_id);
        return Ok(Json(Action::Action(
            ActionBody {
                label: "Sold Out".to_string(),
                ..body
            }
            .disabled(true),
        )));
    }

    let href = relative_href(
        "/merch/purchase",
        &[
            ("clickcrateId", clickcrate_id.as_str()),
            ("productName", view.name()),
            ("productIcon", view.icon.as_str()),
        ],
    );
    let mut parameters = Vec::new();
    if !view.sizes.is_empty() {
        parameters.push(size_parameter(view.sizes.clone()));
    }
    parameters.extend(shipping_parameters());

    let buy = LinkedAction::new(href, buy_label(&view))
        .of_type(LinkedActionType::Transaction)
        .with_parameters(parameters);

    Ok(Json(Action::Action(body.with_actions(vec![buy]))))
}

/// `POST /merch/purchase?clickcrateId=…&productName=…&productIcon=…`
pub async fn purchase(
    State(state): State<ActionsState>,
    Query(query): Query<ProductQuery>,
    payload: Result<Json<ActionPostRequest<ShippingForm>>, JsonRejection>,
) -> Result<Json<ActionPostResponse>, AppError> {
    let request = json_body(payload)?;
    let target = match (query.clickcrate_id, query.product_name, query.product_icon) {
        (Some(clickcrate_id), Some(product_name), Some(product_icon)) => PurchaseTarget {
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

#[cfg(test)]
mod tests {
    use crate::api::test_support::*;
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn stocked(in_stock: &str, price: Option<f64>, sizes: Option<&str>) -> Stubs {
        Stubs {
            merchant: Arc::new(StubMerchant::default().with_listing(
                POS,
                "listing1",
                250_000_000,
                in_stock,
            )),
            assets: Arc::new(StubAssets::default().with_collection("listing1", "Crate Cap", sizes)),
            price,
            ..Stubs::default()
        }
    }

    fn listed(in_stock: &str, price: Option<f64>) -> Stubs {
        stocked(in_stock, price, Some("S, M, L"))
    }

    fn merch_uri() -> String {
        format!("/merch/{}", POS)
    }

    fn purchase_uri(query: &str) -> String {
        format!("/merch/purchase?clickcrateId={}{}", POS, query)
    }

    fn shipping() -> Value {
        json!({
            "size": "M",
            "buyerName": "Ada Lovelace",
            "shippingEmail": "ada@example.com",
            "shippingAddress": "12 Analytical Row",
            "shippingCity": "London",
            "shippingStateProvince": "Greater London",
            "shippingCountryRegion": "UK",
            "shippingZipCode": "SW1A 1AA"
        })
    }

    #[tokio::test]
    async fn merch_card_shows_stock_sizes_and_price() {
        let app = make_app(make_state(&listed("3", Some(150.0))));
        let resp = app.oneshot(get(&merch_uri())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["type"], "action");
        assert_eq!(json["title"], "Crate Cap");
        assert_eq!(json["icon"], "https://meta.example.com/listing1.png");
        assert_eq!(json["label"], "Purchase Crate Cap");
        let description = json["description"].as_str().unwrap();
        assert!(description.starts_with("IN STOCK: 3 | SIZE: S, M, L | DELIVERY: ~2 weeks\nCrate Cap description\n"));

        let buy = &json["links"]["actions"][0];
        assert_eq!(buy["type"], "transaction");
        assert_eq!(buy["label"], "Buy for 0.25 SOL (~$37.50)");
        let href = buy["href"].as_str().unwrap();
        assert!(href.starts_with(&format!(
            "/merch/purchase?clickcrateId={}&productName=Crate+Cap&productIcon=",
            POS
        )));

        let params = buy["parameters"].as_array().unwrap();
        assert_eq!(params.len(), 8);
        assert_eq!(params[0]["name"], "size");
        assert_eq!(params[0]["options"].as_array().unwrap().len(), 3);
        assert_eq!(params[7]["name"], "shippingZipCode");
    }

    #[tokio::test]
    async fn card_without_sizes_has_no_size_select() {
        let app = make_app(make_state(&stocked("3", None, None)));
        let json = body_json(app.oneshot(get(&merch_uri())).await.unwrap()).await;

        assert!(json["description"]
            .as_str()
            .unwrap()
            .starts_with("IN STOCK: 3 | SIZE: N/A |"));
        let params = json["links"]["actions"][0]["parameters"].as_array().unwrap();
        assert_eq!(params.len(), 7);
        assert!(params.iter().all(|p| p["name"] != "size"));
    }

    #[tokio::test]
    async fn label_omits_usd_without_a_price_feed() {
        let app = make_app(make_state(&listed("3", None)));
        let json = body_json(app.oneshot(get(&merch_uri())).await.unwrap()).await;
        assert_eq!(json["links"]["actions"][0]["label"], "Buy for 0.25 SOL");
    }

    #[tokio::test]
    async fn sold_out_card_is_disabled() {
        let app = make_app(make_state(&listed("0", Some(150.0))));
        let resp = app.oneshot(get(&merch_uri())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["label"], "Sold Out");
        assert_eq!(json["disabled"], true);
        assert!(json.get("links").map(|l| l.is_null()).unwrap_or(true));
    }

    #[tokio::test]
    async fn unreadable_stock_is_shown_as_reported() {
        let app = make_app(make_state(&listed("lots", Some(150.0))));
        let json = body_json(app.oneshot(get(&merch_uri())).await.unwrap()).await;

        assert!(json["description"]
            .as_str()
            .unwrap()
            .starts_with("IN STOCK: lots | SIZE: S, M, L |"));
        assert_eq!(json["disabled"], true);
    }

    #[tokio::test]
    async fn unknown_clickcrate_is_404() {
        let app = make_app(make_state(&Stubs::default()));
        let resp = app.oneshot(get(&format!("/merch/{}", POS_B))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["message"], "Product not found in ClickCrate");
    }

    #[tokio::test]
    async fn traversal_in_clickcrate_id_is_400_without_merchant_call() {
        let stubs = listed("3", Some(150.0));
        let app = make_app(make_state(&stubs));
        let resp = app.oneshot(get("/merch/..%2F..%2Fx")).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["message"], "Invalid ClickCrate id: ../../x");
        assert!(stubs.merchant.calls().is_empty());
    }

    #[tokio::test]
    async fn purchase_rejects_malformed_clickcrate_id() {
        let stubs = listed("3", Some(150.0));
        let app = make_app(make_state(&stubs));
        let resp = app
            .oneshot(post_json(
                "/merch/purchase?clickcrateId=..%2Fadmin&productName=Cap&productIcon=x",
                json!({ "account": BUYER, "data": shipping() }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(stubs.merchant.calls().is_empty());
    }

    #[tokio::test]
    async fn purchase_returns_merchant_transaction() {
        let stubs = listed("3", Some(150.0));
        let app = make_app(make_state(&stubs));
        let resp = app
            .oneshot(post_json(
                &purchase_uri("&productName=Crate%20Cap&productIcon=https%3A%2F%2Fcdn.example.com%2Fcap.png"),
                json!({ "account": BUYER, "data": shipping() }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["type"], "transaction");
        assert_eq!(json["transaction"], "cHVyY2hhc2UtdHg=");
        assert_eq!(
            json["message"],
            "Your purchase of Crate Cap is confirmed. Order confirmation emailed to: ada@example.com"
        );
        let next = &json["links"]["next"]["action"];
        assert_eq!(next["type"], "completed");
        assert_eq!(next["icon"], "https://cdn.example.com/cap.png");

        let purchases = stubs.merchant.purchases.lock().unwrap();
        assert_eq!(purchases[0].clickcrate_id, POS);
        assert_eq!(purchases[0].size, "M");
    }

    #[tokio::test]
    async fn purchase_needs_every_query_parameter() {
        let stubs = listed("3", Some(150.0));
        let app = make_app(make_state(&stubs));
        let resp = app
            .oneshot(post_json(
                &purchase_uri(""),
                json!({ "account": BUYER, "data": shipping() }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["message"], "Missing required parameters");
        assert!(stubs.merchant.calls().is_empty());
    }

    #[tokio::test]
    async fn purchase_without_size_buys_one_size() {
        let stubs = stocked("3", Some(150.0), None);
        let mut data = shipping();
        data.as_object_mut().unwrap().remove("size");

        let app = make_app(make_state(&stubs));
        let resp = app
            .oneshot(post_json(
                &purchase_uri("&productName=Cap&productIcon=x"),
                json!({ "account": BUYER, "data": data }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(stubs.merchant.purchases.lock().unwrap()[0].size, "One Size");
    }

    #[tokio::test]
    async fn invalid_account_is_rejected() {
        let app = make_app(make_state(&listed("3", Some(150.0))));
        let resp = app
            .oneshot(post_json(
                &purchase_uri("&productName=Cap&productIcon=x"),
                json!({ "account": "not-a-key", "data": shipping() }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
