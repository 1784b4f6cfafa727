//! Digital Asset Standard (DAS) reads: collection metadata for listings.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;

use super::minting::PluginAttribute;
use super::{http_client, network_error, read_json};

const SERVICE: &str = "das";

/// The parts of a listing collection the merch and storefront pages show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionAsset {
    pub id: String,
    pub name: String,
    pub description: String,
    pub json_uri: String,
    pub metadata_attributes: Vec<(String, String)>,
    pub plugin_attributes: Vec<PluginAttribute>,
}

impl CollectionAsset {
    /// Attribute lookup: JSON metadata first, then the on-chain plugin.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.metadata_attributes
            .iter()
            .find(|(trait_type, _)| trait_type == name)
            .map(|(_, value)| value.as_str())
            .or_else(|| {
                self.plugin_attributes
                    .iter()
                    .find(|attr| attr.key == name)
                    .map(|attr| attr.value.as_str())
            })
    }
}

#[async_trait]
pub trait AssetReader {
    async fn fetch_collection(&self, id: &str) -> Result<CollectionAsset, AppError>;

    /// The `image` field of an off-chain metadata document, if any.
    async fn fetch_metadata_image(&self, uri: &str) -> Result<Option<String>, AppError>;
}

// ---- DAS JSON-RPC shapes ----

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<DasAsset>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct DasAsset {
    id: String,
    #[serde(default)]
    content: DasContent,
    #[serde(default)]
    plugins: DasPlugins,
}

#[derive(Deserialize, Default)]
struct DasContent {
    #[serde(default)]
    json_uri: String,
    #[serde(default)]
    metadata: DasMetadata,
}

#[derive(Deserialize, Default)]
struct DasMetadata {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    attributes: Vec<DasAttribute>,
}

#[derive(Deserialize)]
struct DasAttribute {
    trait_type: String,
    value: Value,
}

#[derive(Deserialize, Default)]
struct DasPlugins {
    attributes: Option<DasAttributesPlugin>,
}

#[derive(Deserialize)]
struct DasAttributesPlugin {
    data: DasAttributeList,
}

#[derive(Deserialize)]
struct DasAttributeList {
    #[serde(default)]
    attribute_list: Vec<PluginAttribute>,
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl From<DasAsset> for CollectionAsset {
    fn from(asset: DasAsset) -> Self {
        Self {
            id: asset.id,
            name: asset.content.metadata.name,
            description: asset.content.metadata.description,
            json_uri: asset.content.json_uri,
            metadata_attributes: asset
                .content
                .metadata
                .attributes
                .into_iter()
                .map(|attr| (attr.trait_type, value_to_string(attr.value)))
                .collect(),
            plugin_attributes: asset
                .plugins
                .attributes
                .map(|plugin| plugin.data.attribute_list)
                .unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct DasClient {
    rpc_url: String,
    http: Client,
}

impl DasClient {
    pub fn new(rpc_url: impl Into<String>) -> Result<Self, AppError> {
        Ok(Self {
            rpc_url: rpc_url.into(),
            http: http_client()?,
        })
    }
}

#[async_trait]
impl AssetReader for DasClient {
    async fn fetch_collection(&self, id: &str) -> Result<CollectionAsset, AppError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": "clickcrate-actions",
            "method": "getAsset",
            "params": { "id": id },
        });
        let response = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(network_error)?;
        let rpc: RpcResponse = read_json(SERVICE, response).await?;

        if let Some(error) = rpc.error {
            return Err(AppError::Upstream {
                service: SERVICE,
                status: 200,
                message: format!("{} (code {})", error.message, error.code),
            });
        }
        rpc.result
            .map(CollectionAsset::from)
            .ok_or_else(|| AppError::not_found(format!("Asset not found: {}", id)))
    }

    async fn fetch_metadata_image(&self, uri: &str) -> Result<Option<String>, AppError> {
        let response = self.http.get(uri).send().await.map_err(network_error)?;
        let document: Value = read_json(SERVICE, response).await?;
        Ok(document
            .get("image")
            .and_then(Value::as_str)
            .filter(|image| !image.is_empty())
            .map(str::to_string))
    }
}
