//! # commskit
//!
//! A small HTTP gateway that sends email, SMS and WhatsApp template messages
//! through Azure Communication Services.
//!
//! ## Features
//!
//! - **Three endpoints**: `POST /sendEmail`, `POST /sendSms`, `POST /sendWhatsAppMessage`
//! - **Explicit decoding**: malformed bodies are rejected before any provider call
//! - **Provider results surfaced**: message ids and SMS delivery flags come back as headers
//! - **Layered configuration**: defaults, `config/*` files, then `COMMSKIT__*` environment variables
//! - **Structured logging**: `tracing` with pretty or JSON output
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use commskit::{app, config::AppConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     let router = app::build_app(&config)?;
//!     let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```text
//! COMMSKIT__AZURE__CONNECTION_STRING="endpoint=https://<resource>.communication.azure.com/;accesskey=<key>"
//! COMMSKIT__AZURE__SENDER_EMAIL="donotreply@<domain>"
//! COMMSKIT__AZURE__SENDER_SMS="+18005550100"
//! COMMSKIT__AZURE__SENDER_WHATSAPP="<channel registration id>"
//! ```

pub mod app;
pub mod config;
pub mod telemetry;

pub use crate::config::{AppConfig, ConfigError};

/// Common imports for commskit usage
pub mod prelude {
    pub use crate::app::{build_app, build_router};
    pub use crate::config::{AppConfig, AzureSettings, LoggingConfig, ServerConfig};
    pub use comms_core::*;
    pub use comms_web_generic::{Channels, Dispatcher, Senders};
}
