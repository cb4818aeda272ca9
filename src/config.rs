use std::env;
use std::time::Duration;

use comms_azure::{AcsCredential, EmailPolling};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating configuration. All of them are
/// fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration source error: {0}")]
    Source(#[from] config::ConfigError),
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Azure Communication Services settings
    pub azure: AzureSettings,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
    /// Deployment mode, taken from `RUN_MODE` (default: development)
    pub run_mode: String,
}

/// Azure Communication Services settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AzureSettings {
    /// `endpoint=https://...;accesskey=...`
    pub connection_string: String,
    /// Sender email address
    pub sender_email: String,
    /// Sender SMS phone number
    pub sender_sms: String,
    /// WhatsApp channel registration id
    pub sender_whatsapp: String,
    /// Email status poll interval when the service gives no Retry-After (default: 1)
    pub email_poll_interval_seconds: u64,
    /// Give up waiting for an email operation after this long (default: 120)
    pub email_poll_timeout_seconds: u64,
    /// Report SMS recipient rejections as 502 (default: false)
    pub strict_delivery_status: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level, used when RUST_LOG is unset (default: info)
    pub level: String,
    /// Log format: json or pretty (default: pretty)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            run_mode: "development".to_string(),
        }
    }
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            sender_email: String::new(),
            sender_sms: String::new(),
            sender_whatsapp: String::new(),
            email_poll_interval_seconds: 1,
            email_poll_timeout_seconds: 120,
            strict_delivery_status: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.run_mode.eq_ignore_ascii_case("production")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AzureSettings {
    /// Parse the connection string. Fails on a missing endpoint or a bad key.
    pub fn credential(&self) -> Result<AcsCredential, ConfigError> {
        self.connection_string
            .parse::<AcsCredential>()
            .map_err(|e| ConfigError::Invalid {
                key: "azure.connection_string",
                reason: e.to_string(),
            })
    }

    pub fn email_polling(&self) -> EmailPolling {
        EmailPolling {
            interval: Duration::from_secs(self.email_poll_interval_seconds),
            timeout: Duration::from_secs(self.email_poll_timeout_seconds),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(Config::try_from(&AppConfig::default())?)
            // Add configuration file based on environment
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local configuration file (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables, e.g. COMMSKIT__AZURE__CONNECTION_STRING
            .add_source(Environment::with_prefix("COMMSKIT").separator("__"))
            .set_override("server.run_mode", run_mode)?
            .build()?;

        Self::from_config(s)
    }

    /// Deserialize and validate an already-built [`Config`].
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Check that every required setting is present and the credential parses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("azure.connection_string", &self.azure.connection_string),
            ("azure.sender_email", &self.azure.sender_email),
            ("azure.sender_sms", &self.azure.sender_sms),
            ("azure.sender_whatsapp", &self.azure.sender_whatsapp),
        ];
        if let Some((key, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ConfigError::Missing(*key));
        }
        self.azure.credential()?;
        let polling = [
            ("azure.email_poll_interval_seconds", self.azure.email_poll_interval_seconds),
            ("azure.email_poll_timeout_seconds", self.azure.email_poll_timeout_seconds),
        ];
        if let Some((key, _)) = polling.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::Invalid {
                key: *key,
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const VALID: &str = r#"
        [azure]
        connection_string = "endpoint=https://contoso.communication.azure.com/;accesskey=Y29tbXNraXQtdGVzdC1rZXk="
        sender_email = "donotreply@contoso.com"
        sender_sms = "+18005550100"
        sender_whatsapp = "3b5c2a8e-0000-4f1b-9d55-1a2b3c4d5e6f"
    "#;

    fn build(toml: &str) -> Result<AppConfig, ConfigError> {
        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        AppConfig::from_config(config)
    }

    #[test]
    fn loads_valid_settings_with_defaults() {
        let config = build(VALID).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.bind_address(), "0.0.0.0:3000");
        assert!(!config.server.is_production());
        assert_eq!(config.azure.sender_sms, "+18005550100");
        assert_eq!(config.azure.email_polling().timeout, Duration::from_secs(120));
        assert!(!config.azure.strict_delivery_status);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn file_values_override_defaults() {
        let toml = format!(
            "{VALID}\nstrict_delivery_status = true\n[server]\nport = 8080\nrun_mode = \"Production\"\n"
        );
        let config = build(&toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(config.server.is_production());
        assert!(config.azure.strict_delivery_status);
    }

    #[test]
    fn missing_sender_is_fatal() {
        let toml = VALID.replace("sender_sms = \"+18005550100\"", "");
        match build(&toml) {
            Err(ConfigError::Missing(key)) => assert_eq!(key, "azure.sender_sms"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn blank_connection_string_is_fatal() {
        assert!(matches!(
            build(""),
            Err(ConfigError::Missing("azure.connection_string"))
        ));
    }

    #[test]
    fn invalid_connection_string_is_fatal() {
        let toml = VALID.replace("accesskey=Y29tbXNraXQtdGVzdC1rZXk=", "accesskey=***");
        assert!(matches!(
            build(&toml),
            Err(ConfigError::Invalid {
                key: "azure.connection_string",
                ..
            })
        ));
    }

    #[test]
    fn zero_poll_timeout_is_rejected() {
        let toml = format!("{VALID}\nemail_poll_timeout_seconds = 0\n");
        assert!(matches!(build(&toml), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let toml = format!("{VALID}\nemail_poll_interval_seconds = 0\n");
        match build(&toml) {
            Err(ConfigError::Invalid { key, .. }) => {
                assert_eq!(key, "azure.email_poll_interval_seconds")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
