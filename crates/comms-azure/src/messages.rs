use async_trait::async_trait;
use comms_core::{
    CommsError, MessageReceipt, MessageTemplate, MessagesClient, SendMessageResult,
    TemplateMessage,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{read_json, AcsCredential, Transport, PROVIDER};

const API_VERSION: &str = "2024-02-01";

/// ACS Advanced Messaging client (WhatsApp templates).
#[derive(Clone, Debug)]
pub struct AzureMessagesClient {
    transport: Transport,
}

impl AzureMessagesClient {
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
struct AcsNotificationRequest<'a> {
    channel_registration_id: &'a str,
    to: &'a [&'a str],
    kind: &'static str,
    template: AcsTemplate<'a>,
}

#[derive(Debug, Serialize)]
struct AcsTemplate<'a> {
    name: &'a str,
    language: &'a str,
    values: Vec<AcsTemplateValue<'a>>,
    bindings: AcsBindings<'a>,
}

#[derive(Debug, Serialize)]
struct AcsTemplateValue<'a> {
    kind: &'static str,
    name: &'a str,
    text: AcsText<'a>,
}

#[derive(Debug, Serialize)]
struct AcsText<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct AcsBindings<'a> {
    kind: &'static str,
    body: Vec<AcsBindingRef<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcsBindingRef<'a> {
    ref_value: &'a str,
}

impl<'a> From<&'a MessageTemplate> for AcsTemplate<'a> {
    fn from(t: &'a MessageTemplate) -> Self {
        Self {
            name: &t.name,
            language: &t.language,
            values: t
                .values
                .iter()
                .map(|v| AcsTemplateValue {
                    kind: "text",
                    name: &v.name,
                    text: AcsText { text: &v.text },
                })
                .collect(),
            bindings: AcsBindings {
                kind: "whatsApp",
                body: t
                    .bindings
                    .body
                    .iter()
                    .map(|name| AcsBindingRef { ref_value: name })
                    .collect(),
            },
        }
    }
}

impl<'a> AcsNotificationRequest<'a> {
    fn new(msg: &'a TemplateMessage<'a>) -> Self {
        Self {
            channel_registration_id: msg.from,
            to: &msg.to,
            kind: "template",
            template: AcsTemplate::from(&msg.template),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AcsSendMessageResult {
    #[serde(default)]
    receipts: Vec<AcsReceipt>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcsReceipt {
    message_id: String,
    to: String,
}

fn to_result(raw: serde_json::Value) -> Result<SendMessageResult, CommsError> {
    let parsed: AcsSendMessageResult = serde_json::from_value(raw.clone())
        .map_err(|e| CommsError::Provider(format!("unexpected messages payload: {e}")))?;
    Ok(SendMessageResult {
        receipts: parsed
            .receipts
            .into_iter()
            .map(|r| MessageReceipt {
                message_id: r.message_id,
                to: r.to,
            })
            .collect(),
        provider: PROVIDER,
        raw,
    })
}

#[async_trait]
impl MessagesClient for AzureMessagesClient {
    async fn send_template(
        &self,
        msg: TemplateMessage<'_>,
    ) -> Result<SendMessageResult, CommsError> {
        let payload = AcsNotificationRequest::new(&msg);
        let res = self
            .transport
            .post_json("messages/notifications:send", API_VERSION, &payload)
            .await?;
        let result = to_result(read_json(res).await?)?;
        info!(
            template = %msg.template.name,
            receipts = result.receipts.len(),
            "template message accepted"
        );
        Ok(result)
    }
}
