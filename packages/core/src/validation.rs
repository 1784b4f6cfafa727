//! Request-shape validation for the creator and purchase forms.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use solana_sdk::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey};

use crate::blink::lenient_string;
use crate::error::AppError;

/// Image extensions accepted for product artwork.
pub const SUPPORTED_MEDIA_FILES: &[&str] = &["png", "svg"];

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_QUANTITY: u8 = 3;

/// A product type offered in the creator form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductType {
    pub value: &'static str,
    pub label: &'static str,
}

pub const PRODUCT_TYPES: &[ProductType] = &[ProductType {
    value: "hat",
    label: "Embroidered Dad Hat",
}];

pub fn find_product_type(value: &str) -> Option<ProductType> {
    PRODUCT_TYPES.iter().copied().find(|pt| pt.value == value)
}

/// Returns the lower-cased extension of a supported image URI.
pub fn validate_image_uri(image_uri: &str) -> Result<&'static str, AppError> {
    let url = Url::parse(image_uri)
        .map_err(|_| AppError::validation(format!("Invalid image URL: {}", image_uri)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(AppError::validation("Image URL must use http or https"));
    }

    let last_segment = image_uri.rsplit('/').next().unwrap_or_default();
    let file_parts: Vec<&str> = last_segment.split('.').collect();
    if file_parts.len() == 1 {
        return Err(AppError::validation("Wrong file type provided"));
    }

    let extension = file_parts[file_parts.len() - 1].to_lowercase();
    SUPPORTED_MEDIA_FILES
        .iter()
        .copied()
        .find(|supported| *supported == extension)
        .ok_or_else(|| {
            AppError::validation(format!(
                "Unsupported image type: {}. Supported types are: {}",
                extension,
                SUPPORTED_MEDIA_FILES.join(", ")
            ))
        })
}

pub fn mime_type(extension: &str) -> Result<&'static str, AppError> {
    match extension.to_lowercase().as_str() {
        "png" => Ok("image/png"),
        "svg" => Ok("image/svg"),
        other => Err(AppError::validation(format!("Unsupported file type: {}", other))),
    }
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("validation pattern should compile"))
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    regex(&EMAIL, r"^[^\s@]+@[^\s@]+\.[^\s@]+$").is_match(email.trim())
}

pub fn parse_account(account: &str) -> Result<Pubkey, AppError> {
    Pubkey::from_str(account.trim())
        .map_err(|_| AppError::validation(format!("Invalid account: {}", account)))
}

/// Round a SOL amount to the nearest lamport.
/// A ClickCrate id must be a base58 public key; it ends up in merchant URL paths.
pub fn parse_clickcrate_id(clickcrate_id: &str) -> Result<String, AppError> {
    let trimmed = clickcrate_id.trim();
    Pubkey::from_str(trimmed)
        .map(|_| trimmed.to_string())
        .map_err(|_| AppError::validation(format!("Invalid ClickCrate id: {}", clickcrate_id)))
}

pub fn sol_to_lamports(sol: f64) -> Option<u64> {
    if !sol.is_finite() || sol < 0.0 {
        return None;
    }
    let lamports = (sol * LAMPORTS_PER_SOL as f64).round();
    if lamports > u64::MAX as f64 {
        return None;
    }
    Some(lamports as u64)
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Raw creator form as submitted by the wallet.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductForm {
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub image_uri: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quantity: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit_price: Option<String>,
    pub email: Option<String>,
}

/// A creator submission that passed every field check.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInfo {
    pub product_type: ProductType,
    pub image_uri: String,
    pub name: String,
    pub description: String,
    pub quantity: u8,
    pub unit_price_sol: f64,
    pub email: String,
    pub account: Pubkey,
}

fn required_field<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(format!("Missing required field: {}", field)))
}

impl ProductInfo {
    pub fn parse(form: &CreateProductForm, account: &str) -> Result<Self, AppError> {
        let account = parse_account(account)?;

        let type_value = required_field(&form.product_type, "type")?;
        let product_type = find_product_type(type_value)
            .ok_or_else(|| AppError::validation("Invalid product type"))?;

        let image_uri = required_field(&form.image_uri, "imageUri")?;
        validate_image_uri(image_uri)?;

        let name = required_field(&form.name, "name")?;
        if name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::validation(format!(
                "Product name must be at most {} characters",
                MAX_NAME_LEN
            )));
        }

        // Description may be empty, only its length is bounded.
        let description = form.description.as_deref().unwrap_or_default().trim();
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(AppError::validation(format!(
                "Product description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }

        let quantity = required_field(&form.quantity, "quantity")?
            .parse::<u8>()
            .ok()
            .filter(|q| (1..=MAX_QUANTITY).contains(q))
            .ok_or_else(|| {
                AppError::validation(format!("Quantity must be between 1 and {}", MAX_QUANTITY))
            })?;

        let unit_price_sol = required_field(&form.unit_price, "unitPrice")?
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| AppError::validation("Unit price must be a positive number"))?;

        let email = required_field(&form.email, "email")?;
        if !is_valid_email(email) {
            return Err(AppError::validation(format!("Invalid email: {}", email)));
        }

        Ok(Self {
            product_type,
            image_uri: image_uri.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            quantity,
            unit_price_sol,
            email: email.to_string(),
            account,
        })
    }
}

/// Shipping fields collected by the purchase forms.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingForm {
    pub size: Option<String>,
    pub buyer_name: Option<String>,
    pub shipping_email: Option<String>,
    pub shipping_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state_province: Option<String>,
    pub shipping_country_region: Option<String>,
    pub shipping_zip_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShippingDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
    pub city: String,
    pub state_province: String,
    pub country_region: String,
    pub zip_code: String,
}

pub fn is_valid_shipping_name(name: &str) -> bool {
    static NAME: OnceLock<Regex> = OnceLock::new();
    regex(&NAME, r"^[a-zA-Z\s]+$").is_match(name.trim())
}

pub fn is_valid_shipping_phone(phone: &str) -> bool {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    regex(&PHONE, r"^[+]?[(]?[0-9]{1,4}[)]?[-\s./0-9]*$").is_match(phone.trim())
}

pub fn is_valid_shipping_city(city: &str) -> bool {
    static CITY: OnceLock<Regex> = OnceLock::new();
    regex(&CITY, r"^[a-zA-Z\s]+$").is_match(city.trim())
}

pub fn is_valid_shipping_zip_code(zip_code: &str) -> bool {
    static ZIP: OnceLock<Regex> = OnceLock::new();
    let trimmed = zip_code.trim();
    !trimmed.is_empty() && regex(&ZIP, r"^[a-zA-Z0-9\s-]+$").is_match(trimmed)
}

impl ShippingForm {
    /// Check presence and format of every shipping field.
    pub fn validate(&self) -> Result<ShippingDetails, AppError> {
        let name = required_field(&self.buyer_name, "buyerName")?;
        let email = required_field(&self.shipping_email, "shippingEmail")?;
        let address = required_field(&self.shipping_address, "shippingAddress")?;
        let city = required_field(&self.shipping_city, "shippingCity")?;
        let state_province = required_field(&self.shipping_state_province, "shippingStateProvince")?;
        let country_region = required_field(&self.shipping_country_region, "shippingCountryRegion")?;
        let zip_code = required_field(&self.shipping_zip_code, "shippingZipCode")?;
        let phone = self
            .shipping_phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());

        if !is_valid_shipping_name(name) {
            return Err(AppError::validation("Invalid shipping name"));
        }
        if !is_valid_email(email) {
            return Err(AppError::validation("Invalid shipping email"));
        }
        if let Some(phone) = phone {
            if !is_valid_shipping_phone(phone) {
                return Err(AppError::validation("Invalid shipping phone"));
            }
        }
        if !is_valid_shipping_city(city) {
            return Err(AppError::validation("Invalid shipping city"));
        }
        if !is_valid_shipping_zip_code(zip_code) {
            return Err(AppError::validation("Invalid shipping zip code"));
        }

        Ok(ShippingDetails {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            address: address.to_string(),
            city: city.to_string(),
            state_province: state_province.to_string(),
            country_region: country_region.to_string(),
            zip_code: zip_code.to_string(),
        })
    }
}
