//! # Comms Core
//!
//! Core traits and types for the commskit notification gateway.
//!
//! This crate provides the building blocks shared by the provider backend and
//! the web adapters:
//! - [`EmailClient`], [`SmsClient`] and [`MessagesClient`] traits, one per channel
//! - Request and result types for each channel
//! - [`MessageTemplate::positional`] for building WhatsApp template payloads
//! - [`DispatchResponse`], a framework-agnostic HTTP response
//!
//! ## Example
//!
//! ```rust,ignore
//! use comms_core::{SendRequest, SmsClient};
//!
//! // Any provider implements SmsClient
//! let response = client.send(SendRequest {
//!     to: "+1234567890",
//!     from: "+0987654321",
//!     text: "Hello world!"
//! }).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur while talking to a provider
#[derive(Debug, thiserror::Error)]
pub enum CommsError {
    /// HTTP communication error
    #[error("http error: {0}")]
    Http(String),
    /// Authentication/authorization error
    #[error("authentication error: {0}")]
    Auth(String),
    /// Invalid request parameters
    #[error("invalid request: {0}")]
    Invalid(String),
    /// Provider returned an error
    #[error("provider error: {0}")]
    Provider(String),
    /// A long-running provider operation did not finish in time
    #[error("timed out: {0}")]
    Timeout(String),
    /// Unexpected error occurred
    #[error("unexpected: {0}")]
    Unexpected(String),
}

/// Errors raised while dispatching an inbound HTTP request to a provider
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("delivery rejected: {0}")]
    Rejected(String),
    #[error("provider call failed: {0}")]
    Comms(#[from] CommsError),
}

/// HTTP status code for web responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok = 200,
    BadRequest = 400,
    InternalServerError = 500,
    BadGateway = 502,
}

impl HttpStatus {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl From<&DispatchError> for HttpStatus {
    fn from(err: &DispatchError) -> Self {
        match err {
            DispatchError::Malformed(_) => HttpStatus::BadRequest,
            DispatchError::Rejected(_) => HttpStatus::BadGateway,
            DispatchError::Comms(_) => HttpStatus::InternalServerError,
        }
    }
}

/// A single outbound email.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub subject: &'a str,
    pub html: &'a str,
}

/// Status of a provider-side email send operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl EmailStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EmailStatus::Succeeded | EmailStatus::Failed | EmailStatus::Canceled
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSendResult {
    /// Provider operation id.
    pub id: String,
    pub status: EmailStatus,
    /// Name of the backend/provider that produced the result, e.g. "azure".
    pub provider: &'static str,
    /// Raw provider payload for debugging / audit.
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest<'a> {
    pub to: &'a str,
    pub from: &'a str,
    pub text: &'a str,
}

/// Per-recipient outcome of an SMS send.
///
/// A provider may accept the request and still report `successful == false`
/// for the recipient (e.g. a carrier rejection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub id: String,
    pub to: String,
    pub successful: bool,
    /// Per-recipient status code reported by the provider.
    pub http_status: u16,
    pub error_message: Option<String>,
    pub provider: &'static str,
    pub raw: serde_json::Value,
}

/// A named template value. Only text values are produced by this gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateValue {
    pub name: String,
    pub text: String,
}

/// WhatsApp binding of template placeholders, in body order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppBindings {
    pub body: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub name: String,
    pub language: String,
    pub values: Vec<TemplateValue>,
    pub bindings: WhatsAppBindings,
}

impl MessageTemplate {
    /// Build a template whose placeholders are named `value1..valueN` after the
    /// position of each parameter. The placeholder count is not checked against
    /// the registered template.
    pub fn positional<S: AsRef<str>>(
        name: impl Into<String>,
        language: impl Into<String>,
        parameters: &[S],
    ) -> Self {
        let values: Vec<TemplateValue> = parameters
            .iter()
            .enumerate()
            .map(|(index, parameter)| TemplateValue {
                name: format!("value{}", index + 1),
                text: parameter.as_ref().to_string(),
            })
            .collect();
        let bindings = WhatsAppBindings {
            body: values.iter().map(|v| v.name.clone()).collect(),
        };
        Self {
            name: name.into(),
            language: language.into(),
            values,
            bindings,
        }
    }
}

/// A template notification to one or more recipients.
#[derive(Debug, Clone)]
pub struct TemplateMessage<'a> {
    /// Sender channel (WhatsApp channel registration id).
    pub from: &'a str,
    pub to: Vec<&'a str>,
    pub template: MessageTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub message_id: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResult {
    pub receipts: Vec<MessageReceipt>,
    pub provider: &'static str,
    pub raw: serde_json::Value,
}

#[async_trait]
pub trait EmailClient: Send + Sync {
    /// Send an email and wait until the provider reports a terminal status.
    async fn send_email(&self, msg: EmailMessage<'_>) -> Result<EmailSendResult, CommsError>;
}

#[async_trait]
pub trait SmsClient: Send + Sync {
    /// Send a single text SMS.
    async fn send(&self, req: SendRequest<'_>) -> Result<SendResponse, CommsError>;
}

#[async_trait]
pub trait MessagesClient: Send + Sync {
    /// Send a template notification.
    async fn send_template(
        &self,
        msg: TemplateMessage<'_>,
    ) -> Result<SendMessageResult, CommsError>;
}

/// Utility to create a pseudo id if a provider doesn't return one.
pub fn fallback_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lightweight header representation to avoid tying the core to any HTTP framework.
pub type Headers = Vec<(String, String)>;

/// Header carrying the provider message or operation id on success.
pub const MESSAGE_ID_HEADER: &str = "x-message-id";
/// Header carrying the SMS per-recipient delivery flag.
pub const DELIVERY_SUCCESSFUL_HEADER: &str = "x-delivery-successful";

/// Generic response that can be converted to any framework's response type
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub status: HttpStatus,
    pub body: String,
    pub content_type: String,
    pub headers: Headers,
}

impl DispatchResponse {
    pub fn success(message: &str, headers: Headers) -> Self {
        Self {
            status: HttpStatus::Ok,
            body: message.to_string(),
            content_type: "text/plain; charset=utf-8".to_string(),
            headers,
        }
    }

    pub fn error(status: HttpStatus, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message }).to_string(),
            content_type: "application/json".to_string(),
            headers: Vec::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
