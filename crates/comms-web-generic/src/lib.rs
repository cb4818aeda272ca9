//! Framework-agnostic request dispatch for the commskit gateway.
//!
//! [`Dispatcher`] takes a raw request body, decodes it explicitly, calls the
//! matching channel client and returns a [`DispatchResponse`] that any web
//! framework adapter can convert into its own response type. Bodies that fail
//! to decode never reach a provider client.

pub mod requests;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

use std::sync::Arc;

use comms_core::{
    DELIVERY_SUCCESSFUL_HEADER, DispatchError, DispatchResponse, EmailClient, EmailMessage,
    Headers, HttpStatus, MESSAGE_ID_HEADER, MessageTemplate, MessagesClient, SendRequest,
    SmsClient, TemplateMessage,
};
use tracing::{error, info, warn};

pub use requests::{EmailRequest, RequestBody, SmsRequest, WhatsAppRequest};

pub const EMAIL_SENT: &str = "Email sent successfully";
pub const SMS_SENT: &str = "SMS sent successfully";
pub const WHATSAPP_SENT: &str = "WhatsApp sent successfully";

/// Long-lived provider handles, one per channel.
#[derive(Clone)]
pub struct Channels {
    pub email: Arc<dyn EmailClient>,
    pub sms: Arc<dyn SmsClient>,
    pub messages: Arc<dyn MessagesClient>,
}

/// Sender identities configured at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Senders {
    pub email: String,
    pub sms: String,
    /// WhatsApp channel registration id
    pub whatsapp: String,
}

#[derive(Clone)]
pub struct Dispatcher {
    channels: Channels,
    senders: Arc<Senders>,
    strict_delivery_status: bool,
}

impl Dispatcher {
    pub fn new(channels: Channels, senders: Senders) -> Self {
        Self {
            channels,
            senders: Arc::new(senders),
            strict_delivery_status: false,
        }
    }

    /// When set, an SMS the provider accepted but flagged as failed for the
    /// recipient is reported as 502 instead of success.
    pub fn strict_delivery_status(mut self, strict: bool) -> Self {
        self.strict_delivery_status = strict;
        self
    }

    pub async fn send_email(&self, body: &[u8]) -> DispatchResponse {
        respond("email", self.send_email_internal(body).await, EMAIL_SENT)
    }

    pub async fn send_sms(&self, body: &[u8]) -> DispatchResponse {
        respond("sms", self.send_sms_internal(body).await, SMS_SENT)
    }

    pub async fn send_whatsapp(&self, body: &[u8]) -> DispatchResponse {
        respond("whatsapp", self.send_whatsapp_internal(body).await, WHATSAPP_SENT)
    }

    async fn send_email_internal(&self, body: &[u8]) -> Result<Headers, DispatchError> {
        let req: EmailRequest = decode(body)?;
        let result = self
            .channels
            .email
            .send_email(EmailMessage {
                from: &self.senders.email,
                to: &req.recipient,
                subject: &req.subject,
                html: &req.html_content,
            })
            .await?;
        Ok(vec![(MESSAGE_ID_HEADER.to_string(), result.id)])
    }

    async fn send_sms_internal(&self, body: &[u8]) -> Result<Headers, DispatchError> {
        let req: SmsRequest = decode(body)?;
        let result = self
            .channels
            .sms
            .send(SendRequest {
                to: &req.phone_number,
                from: &self.senders.sms,
                text: &req.message,
            })
            .await?;

        if !result.successful && self.strict_delivery_status {
            return Err(DispatchError::Rejected(format!(
                "recipient {} rejected with status {}: {}",
                result.to,
                result.http_status,
                result.error_message.as_deref().unwrap_or("no detail")
            )));
        }
        Ok(vec![
            (MESSAGE_ID_HEADER.to_string(), result.id),
            (
                DELIVERY_SUCCESSFUL_HEADER.to_string(),
                result.successful.to_string(),
            ),
        ])
    }

    async fn send_whatsapp_internal(&self, body: &[u8]) -> Result<Headers, DispatchError> {
        let req: WhatsAppRequest = decode(body)?;
        let template = MessageTemplate::positional(
            req.template_name,
            req.template_language,
            &req.template_parameters,
        );
        let result = self
            .channels
            .messages
            .send_template(TemplateMessage {
                from: &self.senders.whatsapp,
                to: vec![req.phone_number.as_str()],
                template,
            })
            .await?;

        Ok(result
            .receipts
            .into_iter()
            .next()
            .map(|r| vec![(MESSAGE_ID_HEADER.to_string(), r.message_id)])
            .unwrap_or_default())
    }
}

fn decode<T: RequestBody>(body: &[u8]) -> Result<T, DispatchError> {
    T::from_json(body).map_err(|e| DispatchError::Malformed(e.to_string()))
}

fn respond(
    channel: &str,
    outcome: Result<Headers, DispatchError>,
    confirmation: &str,
) -> DispatchResponse {
    match outcome {
        Ok(headers) => {
            info!(channel, "dispatched");
            DispatchResponse::success(confirmation, headers)
        }
        Err(e) => error_to_response(channel, e),
    }
}

fn error_to_response(channel: &str, error: DispatchError) -> DispatchResponse {
    let status = HttpStatus::from(&error);
    match &error {
        DispatchError::Malformed(_) => warn!(channel, %error, "rejected request body"),
        DispatchError::Rejected(_) => warn!(channel, %error, "provider rejected delivery"),
        DispatchError::Comms(_) => error!(channel, %error, "provider call failed"),
    }
    DispatchResponse::error(status, &error.to_string())
}
