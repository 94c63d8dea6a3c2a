//! Server configuration.

use serde::{Deserialize, Serialize};
use session_otp_adapter_twilio::{
    TwilioConfig, DEFAULT_API_BASE, ENV_ACCOUNT_SID, ENV_AUTH_TOKEN, ENV_FROM_NUMBER,
};
use session_otp_phone::PhoneOtpConfig;
use std::path::Path;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server settings.
    pub server: ServerConfig,
    /// OTP lifecycle settings.
    pub otp: OtpSection,
    /// SMS gateway settings.
    pub twilio: TwilioSection,
}

/// Server-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Base path for OTP routes.
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            base_path: "/otp".to_string(),
        }
    }
}

/// `[otp]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpSection {
    /// OTP lifetime in seconds.
    pub ttl_seconds: u64,
    /// Attempt ceiling.
    pub max_attempts: u32,
    /// Return the code from `issue` responses (development only).
    pub expose_code: bool,
    /// Message template; must contain `{code}`.
    pub message_template: String,
    /// Delivery timeout in milliseconds.
    pub delivery_timeout_ms: u64,
    /// Reject identities that are not E.164 numbers.
    pub require_e164: bool,
}

impl Default for OtpSection {
    fn default() -> Self {
        let defaults = PhoneOtpConfig::default();
        Self {
            ttl_seconds: defaults.ttl_seconds,
            max_attempts: defaults.max_attempts,
            expose_code: defaults.expose_code,
            message_template: defaults.message_template,
            delivery_timeout_ms: defaults.delivery_timeout_ms,
            require_e164: false,
        }
    }
}

impl OtpSection {
    /// Builds the plugin configuration.
    pub fn to_plugin_config(&self) -> PhoneOtpConfig {
        let config = PhoneOtpConfig::new()
            .ttl_seconds(self.ttl_seconds)
            .max_attempts(self.max_attempts)
            .expose_code(self.expose_code)
            .message_template(self.message_template.clone())
            .delivery_timeout_ms(self.delivery_timeout_ms);

        if self.require_e164 {
            config.require_e164()
        } else {
            config
        }
    }
}

/// `[twilio]` section. Missing credentials fall back to the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioSection {
    /// Account SID.
    pub account_sid: Option<String>,
    /// Auth token. Never serialized.
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    /// Sender phone number.
    pub from_number: Option<String>,
    /// REST API base URL.
    pub api_base: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl TwilioSection {
    /// Resolves the gateway config, reading missing values from the process
    /// environment. Returns `None` unless every credential is known.
    pub fn resolve(&self) -> Option<TwilioConfig> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolves the gateway config with a custom environment lookup.
    pub fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> Option<TwilioConfig> {
        let pick = |value: &Option<String>, key: &str| {
            value
                .clone()
                .or_else(|| env(key))
                .filter(|v| !v.trim().is_empty())
        };

        let config = TwilioConfig::new(
            pick(&self.account_sid, ENV_ACCOUNT_SID)?,
            pick(&self.auth_token, ENV_AUTH_TOKEN)?,
            pick(&self.from_number, ENV_FROM_NUMBER)?,
        );
        let config = config.with_api_base(
            self.api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        );
        Some(match self.timeout_ms {
            Some(timeout_ms) => config.with_timeout_ms(timeout_ms),
            None => config,
        })
    }
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Loads configuration from a TOML file. A missing file yields defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
    parse_config(&content)
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}
