use async_trait::async_trait;
use comms_core::{CommsError, SendRequest, SendResponse, SmsClient};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::auth::http_date;
use crate::{read_json, AcsCredential, Transport, PROVIDER};

const API_VERSION: &str = "2021-03-07";

/// ACS SMS client.
#[derive(Clone, Debug)]
pub struct AzureSmsClient {
    transport: Transport,
}

impl AzureSmsClient {
    pub fn new(connection_string: &str) -> Result<Self, CommsError> {
        Ok(Self::with_credential(connection_string.parse()?))
    }

    pub fn with_credential(credential: AcsCredential) -> Self {
        Self {
            transport: Transport::new(credential),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcsSmsRequest<'a> {
    from: &'a str,
    sms_recipients: Vec<AcsSmsRecipient<'a>>,
    message: &'a str,
    sms_send_options: AcsSmsSendOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcsSmsRecipient<'a> {
    to: &'a str,
    repeatability_request_id: String,
    repeatability_first_sent: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcsSmsSendOptions {
    enable_delivery_report: bool,
}

impl<'a> AcsSmsRequest<'a> {
    fn new(req: &SendRequest<'a>, first_sent: String) -> Self {
        Self {
            from: req.from,
            sms_recipients: vec![AcsSmsRecipient {
                to: req.to,
                repeatability_request_id: comms_core::fallback_id(),
                repeatability_first_sent: first_sent,
            }],
            message: req.text,
            sms_send_options: AcsSmsSendOptions {
                enable_delivery_report: false,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct AcsSmsSendResponse {
    value: Vec<AcsSmsSendResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcsSmsSendResult {
    to: String,
    #[serde(default)]
    message_id: Option<String>,
    http_status_code: u16,
    successful: bool,
    #[serde(default)]
    error_message: Option<String>,
}

fn to_response(raw: serde_json::Value) -> Result<SendResponse, CommsError> {
    let parsed: AcsSmsSendResponse = serde_json::from_value(raw.clone())
        .map_err(|e| CommsError::Provider(format!("unexpected sms payload: {e}")))?;
    let first = parsed
        .value
        .into_iter()
        .next()
        .ok_or_else(|| CommsError::Provider("sms response has no recipient results".into()))?;

    Ok(SendResponse {
        id: first.message_id.unwrap_or_else(comms_core::fallback_id),
        to: first.to,
        successful: first.successful,
        http_status: first.http_status_code,
        error_message: first.error_message,
        provider: PROVIDER,
        raw,
    })
}

#[async_trait]
impl SmsClient for AzureSmsClient {
    async fn send(&self, req: SendRequest<'_>) -> Result<SendResponse, CommsError> {
        let payload = AcsSmsRequest::new(&req, http_date(OffsetDateTime::now_utc())?);
        let res = self.transport.post_json("sms", API_VERSION, &payload).await?;
        let response = to_response(read_json(res).await?)?;

        if response.successful {
            info!(message_id = %response.id, "sms accepted");
        } else {
            warn!(
                message_id = %response.id,
                status = response.http_status,
                error = response.error_message.as_deref().unwrap_or_default(),
                "sms rejected for recipient"
            );
        }
        Ok(response)
    }
}
