use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::AppError;

use super::{ensure_success, http_client, network_error};

const SERVICE: &str = "email";
pub const VERIFICATION_SUBJECT: &str = "ClickCrate Product Creation Verification";

#[async_trait]
pub trait EmailSender {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), AppError>;

    async fn send_verification_email(&self, to: &str, code: &str) -> Result<(), AppError> {
        self.send_email(to, VERIFICATION_SUBJECT, &verification_html(code))
            .await
    }
}

pub fn verification_html(code: &str) -> String {
    format!(
        "<h1>{}</h1>\
         <p>Your verification code is: <strong>{}</strong></p>\
         <p>Please enter this code to complete your product creation process.</p>",
        VERIFICATION_SUBJECT, code
    )
}

#[derive(Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Transactional email over an HTTP provider API.
#[derive(Clone)]
pub struct EmailClient {
    api_url: String,
    api_key: String,
    from: String,
    http: Client,
}

impl EmailClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
            http: http_client()?,
        })
    }
}

#[async_trait]
impl EmailSender for EmailClient {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), AppError> {
        tracing::info!("Sending email to {}: {}", to, subject);
        let body = OutgoingEmail {
            from: &self.from,
            to: [to],
            subject,
            html,
        };
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }
}
