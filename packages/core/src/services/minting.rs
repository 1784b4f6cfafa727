//! NFT minting through a relay service.
//!
//! Creating a product mints three kinds of asset: a point-of-sale
//! collection, a listing collection, and one asset per unit inside the
//! listing collection. The relay signs and pays; it reports the lamports
//! it spent so the creator can be charged back.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::config::SolanaNetwork;
use crate::error::AppError;
use crate::validation::{mime_type, validate_image_uri};

use super::{http_client, network_error, read_json};

const SERVICE: &str = "mint";
const CLICKCRATE_SITE: &str = "https://www.clickcrate.xyz/";

/// One entry of the on-chain attributes plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginAttribute {
    pub key: String,
    pub value: String,
}

/// The same attribute in off-chain JSON metadata form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    pub trait_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataFile {
    pub uri: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataCreator {
    pub address: String,
    pub share: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataProperties {
    pub files: Vec<MetadataFile>,
    pub category: String,
    pub creators: Vec<MetadataCreator>,
}

/// Off-chain JSON metadata attached to every minted asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub symbol: String,
    pub description: String,
    pub image: String,
    pub animation_url: String,
    pub external_url: String,
    pub creator_url: String,
    pub attributes: Vec<MetadataAttribute>,
    pub properties: MetadataProperties,
}

impl NftMetadata {
    pub fn build(
        symbol: &str,
        description: &str,
        image_uri: &str,
        attributes: &[PluginAttribute],
        creator: &Pubkey,
    ) -> Result<Self, AppError> {
        let extension = validate_image_uri(image_uri)?;
        Ok(Self {
            symbol: symbol.to_string(),
            description: description.to_string(),
            image: image_uri.to_string(),
            animation_url: String::new(),
            external_url: CLICKCRATE_SITE.to_string(),
            creator_url: CLICKCRATE_SITE.to_string(),
            attributes: attributes
                .iter()
                .map(|attr| MetadataAttribute {
                    trait_type: attr.key.clone(),
                    value: attr.value.clone(),
                })
                .collect(),
            properties: MetadataProperties {
                files: vec![MetadataFile {
                    uri: image_uri.to_string(),
                    mime_type: mime_type(extension)?.to_string(),
                }],
                category: "image".to_string(),
                creators: vec![MetadataCreator {
                    address: creator.to_string(),
                    share: 100,
                }],
            },
        })
    }
}

fn attributes(pairs: &[(&str, &str)]) -> Vec<PluginAttribute> {
    pairs
        .iter()
        .map(|(key, value)| PluginAttribute {
            key: key.to_string(),
            value: value.to_string(),
        })
        .collect()
}

pub fn pos_attributes() -> Vec<PluginAttribute> {
    attributes(&[
        ("Type", "ClickCrate"),
        ("Placement Type", "Related Purchase"),
        ("Additional Placement Requirements", "None"),
        ("Placement Fee (USDC)", "0"),
        ("User Profile Uri", "None"),
    ])
}

pub fn listing_attributes() -> Vec<PluginAttribute> {
    attributes(&[
        ("Type", "Product Listing"),
        ("Product Category", "Clothing"),
        ("Brand", "ClickCrate"),
        ("Size(s)", "Unisex"),
        ("Placement Type", "Related Purchase"),
        ("Additional Placement Requirements", "None"),
        ("Discount", "None"),
        ("Customer Profile Uri", "None"),
    ])
}

pub fn product_attributes() -> Vec<PluginAttribute> {
    attributes(&[
        ("Type", "Product"),
        ("Product Category", "Clothing"),
        ("Brand", "ClickCrate"),
        ("Size", "Unisex"),
    ])
}

/// What to mint for one creator submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductMintRequest {
    pub name: String,
    pub description: String,
    pub image_uri: String,
    pub quantity: u8,
    pub creator: Pubkey,
    pub fee_payer: Pubkey,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintedAsset {
    pub address: String,
    pub signature: String,
    pub cost_lamports: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedProducts {
    pub pos: MintedAsset,
    pub listing: MintedAsset,
    pub products: Vec<MintedAsset>,
    pub total_cost_lamports: u64,
}

#[async_trait]
pub trait ProductMinter {
    async fn create_products(&self, request: &ProductMintRequest) -> Result<MintedProducts, AppError>;
}

/// Body of `POST /v1/collections` and `POST /v1/assets`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct MintBody<'a> {
    name: String,
    metadata: NftMetadata,
    attributes: Vec<PluginAttribute>,
    creator: String,
    fee_payer: String,
    network: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection: Option<String>,
}

#[derive(Clone)]
pub struct MintClient {
    base_url: String,
    api_key: String,
    network: SolanaNetwork,
    http: Client,
}

impl MintClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        network: SolanaNetwork,
    ) -> Result<Self, AppError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            network,
            http: http_client()?,
        })
    }

    async fn mint(&self, path: &str, body: &MintBody<'_>) -> Result<MintedAsset, AppError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(network_error)?;
        let minted: MintedAsset = read_json(SERVICE, response).await?;
        tracing::info!("Minted {} at {} ({})", body.name, minted.address, minted.signature);
        Ok(minted)
    }

    fn body(
        &self,
        request: &ProductMintRequest,
        name: String,
        symbol: &str,
        description: &str,
        attributes: Vec<PluginAttribute>,
        collection: Option<String>,
    ) -> Result<MintBody<'static>, AppError> {
        let metadata = NftMetadata::build(
            symbol,
            description,
            &request.image_uri,
            &attributes,
            &request.creator,
        )?;
        Ok(MintBody {
            name,
            metadata,
            attributes,
            creator: request.creator.to_string(),
            fee_payer: request.fee_payer.to_string(),
            network: self.network.as_str(),
            collection,
        })
    }
}

#[async_trait]
impl ProductMinter for MintClient {
    async fn create_products(&self, request: &ProductMintRequest) -> Result<MintedProducts, AppError> {
        let pos_name = format!("{} ClickCrate POS", request.name);
        let pos_body = self.body(request, pos_name.clone(), "CPOS", &pos_name, pos_attributes(), None)?;
        let pos = self.mint("/v1/collections", &pos_body).await?;

        let listing_body = self.body(
            request,
            request.name.clone(),
            "PLCC",
            &request.description,
            listing_attributes(),
            None,
        )?;
        let listing = self.mint("/v1/collections", &listing_body).await?;

        let mut products = Vec::with_capacity(request.quantity as usize);
        for i in 1..=request.quantity {
            let body = self.body(
                request,
                format!("{} #{}", request.name, i),
                &format!("PCC{}", i - 1),
                &request.description,
                product_attributes(),
                Some(listing.address.clone()),
            )?;
            products.push(self.mint("/v1/assets", &body).await?);
        }

        let total_cost_lamports = products
            .iter()
            .chain([&pos, &listing])
            .map(|asset| asset.cost_lamports)
            .sum();

        Ok(MintedProducts {
            pos,
            listing,
            products,
            total_cost_lamports,
        })
    }
}
