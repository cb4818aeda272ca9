//! # Azure Communication Services backend
//!
//! REST implementation of the commskit channel traits on top of Azure
//! Communication Services (ACS).
//!
//! - [`AzureEmailClient`] sends email and waits for the long-running operation
//! - [`AzureSmsClient`] sends single-recipient SMS
//! - [`AzureMessagesClient`] sends WhatsApp template notifications
//!
//! Every request is signed with the HMAC scheme ACS expects, using the access
//! key from the connection string.
//!
//! ## Example
//!
//! ```rust,ignore
//! use comms_azure::AzureSmsClient;
//! use comms_core::{SendRequest, SmsClient};
//!
//! let client = AzureSmsClient::new(
//!     "endpoint=https://contoso.communication.azure.com/;accesskey=...",
//! )?;
//! let response = client.send(SendRequest {
//!     to: "+14255550123",
//!     from: "+18005550100",
//!     text: "Hello from commskit!"
//! }).await?;
//! ```

pub mod auth;
pub mod email;
pub mod messages;
pub mod sms;

pub use auth::AcsCredential;
pub use email::{AzureEmailClient, EmailPolling};
pub use messages::AzureMessagesClient;
pub use sms::AzureSmsClient;

use comms_core::CommsError;
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;
use url::Url;

pub(crate) const PROVIDER: &str = "azure";

/// Signed HTTP plumbing shared by the three channel clients.
#[derive(Clone, Debug)]
pub(crate) struct Transport {
    credential: AcsCredential,
    http: reqwest::Client,
}

impl Transport {
    pub(crate) fn new(credential: AcsCredential) -> Self {
        Self {
            credential,
            http: reqwest::Client::new(),
        }
    }

    pub(crate) fn credential(&self) -> &AcsCredential {
        &self.credential
    }

    pub(crate) async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        api_version: &str,
        payload: &T,
    ) -> Result<Response, CommsError> {
        let url = self.credential.url(path, api_version)?;
        let body = serde_json::to_vec(payload)
            .map_err(|e| CommsError::Invalid(format!("payload encode: {e}")))?;
        self.execute(Method::POST, url, body).await
    }

    pub(crate) async fn get(&self, url: Url) -> Result<Response, CommsError> {
        self.execute(Method::GET, url, Vec::new()).await
    }

    async fn execute(&self, method: Method, url: Url, body: Vec<u8>) -> Result<Response, CommsError> {
        let signed = self
            .credential
            .sign(method.as_str(), &url, &body, OffsetDateTime::now_utc())?;
        debug!(method = %method, url = %url, "calling ACS");

        let mut req = self
            .http
            .request(method, url)
            .header("x-ms-date", signed.date)
            .header("x-ms-content-sha256", signed.content_hash)
            .header("Authorization", signed.authorization);
        if !body.is_empty() {
            req = req.header("Content-Type", "application/json").body(body);
        }

        let res = req
            .send()
            .await
            .map_err(|e| CommsError::Http(e.to_string()))?;
        ensure_success(res).await
    }
}

async fn ensure_success(res: Response) -> Result<Response, CommsError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> CommsError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CommsError::Auth(format!("HTTP {status}: {detail}"))
        }
        _ => CommsError::Provider(format!("HTTP {status}: {detail}")),
    }
}

/// Read the body of a successful response as JSON, keeping the raw text when
/// it is not JSON.
pub(crate) async fn read_json(res: Response) -> Result<serde_json::Value, CommsError> {
    let raw_text = res
        .text()
        .await
        .map_err(|e| CommsError::Http(e.to_string()))?;
    Ok(serde_json::from_str(&raw_text).unwrap_or_else(|_| serde_json::json!({ "raw": raw_text })))
}
