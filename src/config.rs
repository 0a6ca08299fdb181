use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

use smsgate_core::backends::CONSOLE_BACKEND;

/// Application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Default backend identifier used when a send does not name one
    pub backend: String,
    /// Sender id applied to messages that do not set one
    pub default_sender: String,
    /// Gateway provider configuration
    pub providers: ProvidersConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Gateway provider configuration; absent sections stay unregistered
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    /// BulkSMS configuration
    pub bulksms: Option<BulkSmsConfig>,
    /// Vonage configuration
    pub vonage: Option<VonageConfig>,
    /// OVH configuration
    pub ovh: Option<OvhConfig>,
    /// Esendex configuration
    pub esendex: Option<EsendexConfig>,
    /// AWS SNS configuration
    pub aws_sns: Option<AwsSnsConfig>,
}

/// BulkSMS provider configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BulkSmsConfig {
    /// API token id
    pub token_id: String,
    /// API token secret
    pub token_secret: String,
    /// Request UNICODE encoding (default: true)
    pub unicode: bool,
}

/// Vonage provider configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VonageConfig {
    /// API key
    pub api_key: String,
    /// API secret
    pub api_secret: String,
}

/// OVH provider configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OvhConfig {
    /// SMS account, e.g. sms-ab1234-1
    pub account: String,
    /// API login
    pub login: String,
    /// API password
    pub password: String,
    /// Suppress the STOP marketing footer (default: true)
    pub no_stop: bool,
}

/// Esendex provider configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EsendexConfig {
    /// Account username
    pub username: String,
    /// Account password
    pub password: String,
    /// Account reference, e.g. EX0000000
    pub account: String,
    /// Acknowledge without delivering (default: false)
    pub sandbox: bool,
}

/// AWS SNS provider configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AwsSnsConfig {
    /// AWS Access Key ID
    pub access_key_id: String,
    /// AWS Secret Access Key
    pub secret_access_key: String,
    /// AWS Region
    pub region: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: json or pretty (default: json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: CONSOLE_BACKEND.to_string(),
            default_sender: String::new(),
            providers: ProvidersConfig::default(),
            logging: LoggingConfig::default(),
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
            // Add environment variables (prefixed with SMSGATE_)
            .add_source(Environment::with_prefix("SMSGATE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_console_backend() {
        let config = AppConfig::default();
        assert_eq!(config.backend, CONSOLE_BACKEND);
        assert!(config.default_sender.is_empty());
        assert!(config.providers.bulksms.is_none());
        assert_eq!(config.logging.level, "info");
    }
}
