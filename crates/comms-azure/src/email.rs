use std::time::Duration;

use async_trait::async_trait;
use comms_core::{CommsError, EmailClient, EmailMessage, EmailSendResult, EmailStatus};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::{read_json, AcsCredential, Transport, PROVIDER};

const API_VERSION: &str = "2023-03-31";

/// How long to wait for an email operation to reach a terminal status.
#[derive(Debug, Clone, Copy)]
pub struct EmailPolling {
    /// Delay between status checks when the service sends no `Retry-After`.
    pub interval: Duration,
    /// Upper bound on the total wait.
    pub timeout: Duration,
}

impl Default for EmailPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(120),
        }
    }
}

/// ACS email client.
#[derive(Clone, Debug)]
pub struct AzureEmailClient {
    transport: Transport,
    polling: EmailPolling,
}

impl AzureEmailClient {
    pub fn new(connection_string: &str) -> Result<Self, CommsError> {
        Ok(Self::with_credential(connection_string.parse()?))
    }

    pub fn with_credential(credential: AcsCredential) -> Self {
        Self {
            transport: Transport::new(credential),
            polling: EmailPolling::default(),
        }
    }

    pub fn with_polling(mut self, polling: EmailPolling) -> Self {
        self.polling = polling;
        self
    }

    fn operation_url(&self, headers: &HeaderMap, id: &str) -> Result<Url, CommsError> {
        if let Some(location) = headers
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
        {
            return Url::parse(location)
                .map_err(|e| CommsError::Provider(format!("operation-location {location}: {e}")));
        }
        self.transport
            .credential()
            .url(&format!("emails/operations/{id}"), API_VERSION)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcsEmailRequest<'a> {
    sender_address: &'a str,
    recipients: AcsRecipients<'a>,
    content: AcsEmailContent<'a>,
}

#[derive(Debug, Serialize)]
struct AcsRecipients<'a> {
    to: Vec<AcsEmailAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct AcsEmailAddress<'a> {
    address: &'a str,
}

#[derive(Debug, Serialize)]
struct AcsEmailContent<'a> {
    subject: &'a str,
    html: &'a str,
}

impl<'a> From<&EmailMessage<'a>> for AcsEmailRequest<'a> {
    fn from(msg: &EmailMessage<'a>) -> Self {
        Self {
            sender_address: msg.from,
            recipients: AcsRecipients {
                to: vec![AcsEmailAddress { address: msg.to }],
            },
            content: AcsEmailContent {
                subject: msg.subject,
                html: msg.html,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct AcsEmailOperation {
    id: String,
    status: EmailStatus,
    #[serde(default)]
    error: Option<AcsOperationError>,
}

#[derive(Debug, Deserialize)]
struct AcsOperationError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn parse_operation(raw: &serde_json::Value) -> Result<AcsEmailOperation, CommsError> {
    serde_json::from_value(raw.clone())
        .map_err(|e| CommsError::Provider(format!("unexpected email operation payload: {e}")))
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn finish(op: AcsEmailOperation, raw: serde_json::Value) -> Result<EmailSendResult, CommsError> {
    match op.status {
        EmailStatus::Succeeded => Ok(EmailSendResult {
            id: op.id,
            status: op.status,
            provider: PROVIDER,
            raw,
        }),
        status => {
            let reason = op
                .error
                .map(|e| {
                    format!(
                        "{}: {}",
                        e.code.unwrap_or_default(),
                        e.message.unwrap_or_default()
                    )
                })
                .unwrap_or_else(|| "no detail".to_string());
            Err(CommsError::Provider(format!(
                "email operation {} ended as {:?} ({})",
                op.id, status, reason
            )))
        }
    }
}

#[async_trait]
impl EmailClient for AzureEmailClient {
    async fn send_email(&self, msg: EmailMessage<'_>) -> Result<EmailSendResult, CommsError> {
        let payload = AcsEmailRequest::from(&msg);
        let res = self
            .transport
            .post_json("emails:send", API_VERSION, &payload)
            .await?;

        let headers = res.headers().clone();
        let mut raw = read_json(res).await?;
        let mut op = parse_operation(&raw)?;
        let url = self.operation_url(&headers, &op.id)?;
        let mut wait = retry_after(&headers).unwrap_or(self.polling.interval);
        let deadline = Instant::now() + self.polling.timeout;
        info!(operation_id = %op.id, "email accepted");

        while !op.status.is_terminal() {
            if Instant::now() + wait > deadline {
                warn!(operation_id = %op.id, "email operation did not finish in time");
                return Err(CommsError::Timeout(format!(
                    "email operation {} still {:?} after {:?}",
                    op.id, op.status, self.polling.timeout
                )));
            }
            sleep(wait).await;

            let res = self.transport.get(url.clone()).await?;
            wait = retry_after(res.headers()).unwrap_or(self.polling.interval);
            raw = read_json(res).await?;
            op = parse_operation(&raw)?;
            debug!(operation_id = %op.id, status = ?op.status, "email operation polled");
        }

        finish(op, raw)
    }
}
