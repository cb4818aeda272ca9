//! Wires configuration, provider clients and routes together.

use std::sync::Arc;

use axum::Router;
use comms_azure::{AzureEmailClient, AzureMessagesClient, AzureSmsClient};
use comms_web_axum::AppState;
use comms_web_generic::{Channels, Dispatcher, Senders};
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, ConfigError};

/// Build the three ACS clients from one parsed credential.
pub fn azure_channels(config: &AppConfig) -> Result<Channels, ConfigError> {
    let credential = config.azure.credential()?;
    Ok(Channels {
        email: Arc::new(
            AzureEmailClient::with_credential(credential.clone())
                .with_polling(config.azure.email_polling()),
        ),
        sms: Arc::new(AzureSmsClient::with_credential(credential.clone())),
        messages: Arc::new(AzureMessagesClient::with_credential(credential)),
    })
}

pub fn senders(config: &AppConfig) -> Senders {
    Senders {
        email: config.azure.sender_email.clone(),
        sms: config.azure.sender_sms.clone(),
        whatsapp: config.azure.sender_whatsapp.clone(),
    }
}

/// Build the router around the given channels.
pub fn build_router(config: &AppConfig, channels: Channels) -> Router {
    let dispatcher = Dispatcher::new(channels, senders(config))
        .strict_delivery_status(config.azure.strict_delivery_status);
    comms_web_axum::router(AppState {
        dispatcher,
        expose_openapi: !config.server.is_production(),
    })
    .layer(TraceLayer::new_for_http())
}

/// Build the production router backed by Azure Communication Services.
pub fn build_app(config: &AppConfig) -> Result<Router, ConfigError> {
    let channels = azure_channels(config)?;
    Ok(build_router(config, channels))
}
