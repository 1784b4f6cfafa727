//! Integration tests for the Actions endpoints.
//!
//! Each test boots the full Axum router (same assembly as `main.rs`) using
//! `tower::ServiceExt::oneshot`. Every outside collaborator is the real
//! reqwest-backed client pointed at one wiremock server:
//! - merchant API under `/v1/clickcrate/*`, `/v1/product-listing/*`,
//!   `/v1/blink/purchase`
//! - minting relay under `/v1/collections` and `/v1/assets`
//! - email provider at `/emails`
//! - DAS JSON-RPC at `/das` and off-chain metadata under `/meta`
//! - CoinGecko at `/api/v3/simple/price`
//!
//! Only the blockhash comes from a local stub, so no Solana node is needed.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use solana_sdk::{hash::Hash, pubkey::Pubkey};
use tokio::sync::RwLock;
use tower::ServiceExt;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use clickcrate_actions::{
    api::{create_router, ActionsApiState},
    config::SolanaNetwork,
    error::AppError,
    metrics::AppMetrics,
    services::{
        clickcrate::ClickCrateClient, das::DasClient, email::EmailClient, minting::MintClient,
        price::CoinGeckoClient, solana::BlockhashSource,
    },
    store::PendingProductStore,
};

// ---- Helpers ----------------------------------------------------------------

const CREATOR: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";
const RELAY: &str = "11111111111111111111111111111111";
const CLICKCRATE: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

struct FixedBlockhash;

#[async_trait]
impl BlockhashSource for FixedBlockhash {
    async fn latest_blockhash(&self) -> Result<Hash, AppError> {
        Ok(Hash::new_unique())
    }
}

/// Build the full application router against `server`.
fn build_test_app(server: &MockServer) -> (Router, Arc<ActionsApiState>) {
    let uri = server.uri();
    let state = Arc::new(ActionsApiState {
        network: SolanaNetwork::Devnet,
        relay_wallet: Pubkey::from_str(RELAY).unwrap(),
        blink_base_url: "https://api.clickcrate.xyz/blink".to_string(),
        merchant: Arc::new(ClickCrateClient::new(uri.as_str(), "merchant-key").unwrap()),
        minter: Arc::new(MintClient::new(uri.as_str(), "mint-key", SolanaNetwork::Devnet).unwrap()),
        assets: Arc::new(DasClient::new(format!("{}/das", uri)).unwrap()),
        email: Arc::new(
            EmailClient::new(format!("{}/emails", uri), "mail-key", "shop@example.com").unwrap(),
        ),
        blockhash: Arc::new(FixedBlockhash),
        price: Arc::new(CoinGeckoClient::new(uri.as_str(), Duration::from_secs(60)).unwrap()),
        pending: Arc::new(RwLock::new(PendingProductStore::new())),
        metrics: Arc::new(AppMetrics::new().unwrap()),
    });
    (create_router(state.clone()), state)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn ok_json(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

async fn mount_email(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer mail-key"))
        .and(body_partial_json(json!({
            "from": "shop@example.com",
            "to": ["maker@example.com"],
            "subject": "ClickCrate Product Creation Verification"
        })))
        .respond_with(ok_json(json!({ "id": "email-1" })))
        .mount(server)
        .await;
}

async fn mount_minting(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/collections"))
        .and(body_partial_json(json!({ "metadata": { "symbol": "CPOS" } })))
        .respond_with(ok_json(json!({ "address": "posAddr", "signature": "s1", "costLamports": 3000 })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/collections"))
        .and(body_partial_json(json!({ "metadata": { "symbol": "PLCC" } })))
        .respond_with(ok_json(json!({ "address": "listingAddr", "signature": "s2", "costLamports": 2000 })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/assets"))
        .and(body_partial_json(json!({ "collection": "listingAddr" })))
        .respond_with(ok_json(json!({ "address": "unit", "signature": "s3", "costLamports": 1000 })))
        .expect(2)
        .mount(server)
        .await;
}

async fn mount_merchant_writes(server: &MockServer) {
    for (route, body) in [
        (
            "/v1/clickcrate/register",
            json!({
                "clickcrateId": "posAddr",
                "eligiblePlacementType": "digitalreplica",
                "eligibleProductCategory": "clothing",
                "manager": CREATOR
            }),
        ),
        ("/v1/clickcrate/activate", json!({ "clickcrateId": "posAddr" })),
        (
            "/v1/product-listing/register",
            json!({
                "productListingId": "listingAddr",
                "origin": "clickcrate",
                "eligiblePlacementType": "relatedpurchase",
                "price": 500_000_000u64,
                "orderManager": "clickcrate"
            }),
        ),
        ("/v1/product-listing/activate", json!({ "productListingId": "listingAddr" })),
        (
            "/v1/product-listing/place",
            json!({
                "productListingId": "listingAddr",
                "clickcrateId": "posAddr",
                "price": 500_000_000u64
            }),
        ),
    ] {
        Mock::given(method("POST"))
            .and(path(route))
            .and(header("authorization", "Bearer merchant-key"))
            .and(body_partial_json(body))
            .respond_with(ok_json(json!({ "ok": true })))
            .expect(1)
            .mount(server)
            .await;
    }
}

async fn mount_listing(server: &MockServer, in_stock: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/clickcrate/{}", CLICKCRATE)))
        .respond_with(ok_json(json!({ "product": "listing1", "isActive": true })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/product-listing/listing1"))
        .respond_with(ok_json(json!({ "price": 250_000_000u64, "inStock": in_stock })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/das"))
        .and(body_partial_json(json!({ "method": "getAsset", "params": { "id": "listing1" } })))
        .respond_with(ok_json(json!({
            "jsonrpc": "2.0",
            "id": "clickcrate-actions",
            "result": {
                "id": "listing1",
                "content": {
                    "json_uri": format!("{}/meta/listing1.json", server.uri()),
                    "metadata": {
                        "name": "Crate Cap",
                        "description": "A very good hat",
                        "attributes": [{ "trait_type": "Type", "value": "Product Listing" }]
                    }
                },
                "plugins": {
                    "attributes": {
                        "data": { "attribute_list": [{ "key": "Size(s)", "value": "S, M" }] }
                    }
                }
            }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/meta/listing1.json"))
        .respond_with(ok_json(json!({ "image": "https://cdn.example.com/cap.png" })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/simple/price"))
        .respond_with(ok_json(json!({ "solana": { "usd": 150.0 } })))
        .mount(server)
        .await;
}

/// The code from the last verification email the provider received.
async fn emailed_code(server: &MockServer) -> String {
    let requests = server.received_requests().await.unwrap();
    let email = requests
        .iter()
        .rev()
        .find(|r| r.url.path() == "/emails")
        .expect("a verification email was sent");
    let body: Value = serde_json::from_slice(&email.body).unwrap();
    let html = body["html"].as_str().unwrap();
    let start = html.find("<strong>").unwrap() + "<strong>".len();
    html[start..start + 6].to_string()
}

// ---- Health -----------------------------------------------------------------

#[tokio::test]
async fn health_is_ok_with_action_headers() {
    let server = MockServer::start().await;
    let (app, _) = build_test_app(&server);
    let resp = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-action-version"], "2.1.3");
    assert_eq!(
        resp.headers()["x-blockchain-ids"],
        "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1"
    );
}

// ---- Creator flow -------------------------------------------------------------

#[tokio::test]
async fn creator_flow_mints_registers_and_returns_payment() {
    let server = MockServer::start().await;
    mount_email(&server).await;
    mount_minting(&server).await;
    mount_merchant_writes(&server).await;
    let (app, state) = build_test_app(&server);

    let (status, json) = send(
        app.clone(),
        post_json(
            "/creator/create-product",
            json!({
                "account": CREATOR,
                "data": {
                    "type": "hat",
                    "imageUri": "https://cdn.example.com/cap.png",
                    "name": "Crate Cap",
                    "description": "A very good hat",
                    "quantity": "2",
                    "unitPrice": "0.5",
                    "email": "maker@example.com"
                }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["type"], "post");
    let verify_href = json["links"]["next"]["action"]["links"]["actions"][0]["href"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(state.pending.read().await.len(), 1);

    let code = emailed_code(&server).await;
    let (status, json) = send(
        app,
        post_json(&verify_href, json!({ "account": CREATOR, "data": { "code": code } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "verify failed: {}", json);
    assert_eq!(json["type"], "transaction");
    assert!(!json["transaction"].as_str().unwrap().is_empty());
    assert!(json["links"]["next"]["action"]["description"]
        .as_str()
        .unwrap()
        .contains("https://api.clickcrate.xyz/blink/posAddr"));
    assert!(state.pending.read().await.is_empty());
}

#[tokio::test]
async fn wrong_code_is_rejected_and_nothing_is_minted() {
    let server = MockServer::start().await;
    mount_email(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/collections"))
        .respond_with(ok_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    let (app, state) = build_test_app(&server);

    let (_, json) = send(
        app.clone(),
        post_json(
            "/creator/create-product",
            json!({
                "account": CREATOR,
                "data": {
                    "type": "hat",
                    "imageUri": "https://cdn.example.com/cap.svg",
                    "name": "Crate Cap",
                    "description": "",
                    "quantity": 1,
                    "unitPrice": 1,
                    "email": "maker@example.com"
                }
            }),
        ),
    )
    .await;
    let verify_href = json["links"]["next"]["action"]["links"]["actions"][0]["href"]
        .as_str()
        .unwrap()
        .to_string();
    let code = emailed_code(&server).await;
    let wrong = if code == "123456" { "654321" } else { "123456" };

    let (status, json) = send(
        app,
        post_json(&verify_href, json!({ "account": CREATOR, "data": { "code": wrong } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid verification code");
    assert_eq!(state.pending.read().await.len(), 1);
}

#[tokio::test]
async fn email_provider_failure_is_a_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "message": "bad sender" })))
        .mount(&server)
        .await;
    let (app, state) = build_test_app(&server);

    let (status, json) = send(
        app,
        post_json(
            "/creator/create-product",
            json!({
                "account": CREATOR,
                "data": {
                    "type": "hat",
                    "imageUri": "https://cdn.example.com/cap.png",
                    "name": "Crate Cap",
                    "description": "A hat",
                    "quantity": "1",
                    "unitPrice": "0.1",
                    "email": "maker@example.com"
                }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["message"], "email returned HTTP 422: bad sender");
    assert!(state.pending.read().await.is_empty());
}

// ---- Merch ------------------------------------------------------------------

#[tokio::test]
async fn merch_action_reads_merchant_das_and_price() {
    let server = MockServer::start().await;
    mount_listing(&server, "3").await;
    let (app, _) = build_test_app(&server);

    let (status, json) = send(app, get(&format!("/merch/{}", CLICKCRATE))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Crate Cap");
    assert_eq!(json["icon"], "https://cdn.example.com/cap.png");
    assert!(json["description"]
        .as_str()
        .unwrap()
        .starts_with("IN STOCK: 3 | SIZE: S, M | DELIVERY: ~2 weeks\nA very good hat"));
    assert_eq!(json["links"]["actions"][0]["label"], "Buy for 0.25 SOL (~$37.50)");
    assert_eq!(
        json["links"]["actions"][0]["parameters"][0]["options"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn sold_out_merch_is_disabled() {
    let server = MockServer::start().await;
    mount_listing(&server, "0").await;
    let (app, _) = build_test_app(&server);

    let (status, json) = send(app, get(&format!("/merch/{}", CLICKCRATE))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["disabled"], true);
    assert_eq!(json["label"], "Sold Out");
}

#[tokio::test]
async fn merch_rejects_traversal_id_before_calling_merchant() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ok_json(json!({ "product": "listing1" })))
        .expect(0)
        .mount(&server)
        .await;
    let (app, _) = build_test_app(&server);

    let (status, json) = send(app, get("/merch/..%2F..%2Fx")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid ClickCrate id: ../../x");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn merch_purchase_forwards_to_merchant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/blink/purchase"))
        .and(header("authorization", "Bearer merchant-key"))
        .and(body_partial_json(json!({
            "clickcrateId": CLICKCRATE,
            "size": "M",
            "quantity": 1,
            "buyer": CREATOR,
            "payer": CREATOR,
            "paymentProcessor": "solana",
            "shippingName": "Ada Lovelace",
            "shippingEmail": "ada@example.com",
            "shippingZipCode": "SW1A 1AA"
        })))
        .respond_with(ok_json(json!({ "transaction": "cHVyY2hhc2U=", "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;
    let (app, _) = build_test_app(&server);

    let (status, json) = send(
        app,
        post_json(
            &format!(
                "/merch/purchase?clickcrateId={}&productName=Crate%20Cap&productIcon=https%3A%2F%2Fcdn.example.com%2Fcap.png",
                CLICKCRATE
            ),
            json!({
                "account": CREATOR,
                "data": {
                    "size": "M",
                    "buyerName": "Ada Lovelace",
                    "shippingEmail": "ada@example.com",
                    "shippingAddress": "12 Analytical Row",
                    "shippingCity": "London",
                    "shippingStateProvince": "Greater London",
                    "shippingCountryRegion": "UK",
                    "shippingZipCode": "SW1A 1AA"
                }
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "purchase failed: {}", json);
    assert_eq!(json["transaction"], "cHVyY2hhc2U=");
    assert_eq!(json["links"]["next"]["action"]["title"], "Order Confirmed");
}

// ---- Storefront -------------------------------------------------------------

#[tokio::test]
async fn storefront_lists_registered_products() {
    let server = MockServer::start().await;
    mount_listing(&server, "3").await;
    let (app, _) = build_test_app(&server);

    let (status, json) = send(app, get(&format!("/storefront?pos1={}", CLICKCRATE))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "ClickCrate Storefront");
    assert_eq!(json["links"]["actions"][0]["label"], "Crate Cap - 0.25 SOL");
}

#[tokio::test]
async fn storefront_rejects_seven_pos_values() {
    let server = MockServer::start().await;
    let (app, _) = build_test_app(&server);

    let (status, json) = send(
        app,
        get("/storefront?pos1=a&pos2=b&pos3=c&pos4=d&pos5=e&pos6=f&pos7=g"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Too many POS values. Maximum allowed is 6.");
}
