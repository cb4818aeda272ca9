//! Recording stand-ins for the channel clients, for use in tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use comms_core::{
    CommsError, EmailClient, EmailMessage, EmailSendResult, EmailStatus, MessageReceipt,
    MessageTemplate, MessagesClient, SendMessageResult, SendRequest, SendResponse, SmsClient,
    TemplateMessage,
};

use crate::{Channels, Senders};

/// A provider call as seen by [`RecordingClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Email {
        from: String,
        to: String,
        subject: String,
        html: String,
    },
    Sms {
        from: String,
        to: String,
        text: String,
    },
    Template {
        from: String,
        to: Vec<String>,
        template: MessageTemplate,
    },
}

/// Implements every channel trait and records each call in order.
#[derive(Debug, Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<Recorded>>,
    failure: Option<String>,
    sms_rejection: Option<String>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call is recorded and then fails with a provider error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// SMS calls succeed at the HTTP level but report a per-recipient failure.
    pub fn rejecting_sms(message: impl Into<String>) -> Self {
        Self {
            sms_rejection: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    /// Use this client for all three channels.
    pub fn channels(self: &Arc<Self>) -> Channels {
        Channels {
            email: self.clone(),
            sms: self.clone(),
            messages: self.clone(),
        }
    }

    fn record(&self, call: Recorded) -> Result<(), CommsError> {
        self.calls.lock().unwrap().push(call);
        match &self.failure {
            Some(msg) => Err(CommsError::Provider(msg.clone())),
            None => Ok(()),
        }
    }

    fn next_id(&self) -> String {
        format!("msg-{}", self.calls.lock().unwrap().len())
    }
}

/// Sender identities used across the test suites.
pub fn test_senders() -> Senders {
    Senders {
        email: "donotreply@contoso.com".into(),
        sms: "+18005550100".into(),
        whatsapp: "3b5c2a8e-0000-4f1b-9d55-1a2b3c4d5e6f".into(),
    }
}

#[async_trait]
impl EmailClient for RecordingClient {
    async fn send_email(&self, msg: EmailMessage<'_>) -> Result<EmailSendResult, CommsError> {
        self.record(Recorded::Email {
            from: msg.from.into(),
            to: msg.to.into(),
            subject: msg.subject.into(),
            html: msg.html.into(),
        })?;
        Ok(EmailSendResult {
            id: self.next_id(),
            status: EmailStatus::Succeeded,
            provider: "recording",
            raw: serde_json::Value::Null,
        })
    }
}

#[async_trait]
impl SmsClient for RecordingClient {
    async fn send(&self, req: SendRequest<'_>) -> Result<SendResponse, CommsError> {
        self.record(Recorded::Sms {
            from: req.from.into(),
            to: req.to.into(),
            text: req.text.into(),
        })?;
        let (successful, http_status) = match self.sms_rejection {
            Some(_) => (false, 400),
            None => (true, 202),
        };
        Ok(SendResponse {
            id: self.next_id(),
            to: req.to.into(),
            successful,
            http_status,
            error_message: self.sms_rejection.clone(),
            provider: "recording",
            raw: serde_json::Value::Null,
        })
    }
}

#[async_trait]
impl MessagesClient for RecordingClient {
    async fn send_template(
        &self,
        msg: TemplateMessage<'_>,
    ) -> Result<SendMessageResult, CommsError> {
        let to: Vec<String> = msg.to.iter().map(|s| s.to_string()).collect();
        self.record(Recorded::Template {
            from: msg.from.into(),
            to: to.clone(),
            template: msg.template,
        })?;
        let id = self.next_id();
        Ok(SendMessageResult {
            receipts: to
                .into_iter()
                .map(|to| MessageReceipt {
                    message_id: id.clone(),
                    to,
                })
                .collect(),
            provider: "recording",
            raw: serde_json::Value::Null,
        })
    }
}
