//! # Session OTP Twilio Adapter
//!
//! Delivers OTP messages as SMS through the Twilio Messages REST API.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use session_otp_adapter_twilio::{TwilioConfig, TwilioNotifier};
//!
//! let notifier = TwilioNotifier::new(TwilioConfig::from_env()?)?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use session_otp_core::error::{OtpError, OtpResult};
use session_otp_core::traits::Notifier;
use std::time::Duration;

/// Default Twilio REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Environment variable holding the account SID.
pub const ENV_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
/// Environment variable holding the auth token.
pub const ENV_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
/// Environment variable holding the sender number.
pub const ENV_FROM_NUMBER: &str = "TWILIO_PHONE_NUMBER";

/// Twilio account configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    /// Account SID.
    pub account_sid: String,
    /// Auth token. Never serialized.
    #[serde(default, skip_serializing)]
    pub auth_token: String,
    /// Sender phone number.
    pub from_number: String,
    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl TwilioConfig {
    /// Creates a new config.
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            api_base: default_api_base(),
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Reads the config from `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`
    /// and `TWILIO_PHONE_NUMBER`.
    pub fn from_env() -> OtpResult<Self> {
        let var = |key: &str| {
            std::env::var(key)
                .map_err(|_| OtpError::config(format!("Missing environment variable {}", key)))
        };
        Ok(Self::new(
            var(ENV_ACCOUNT_SID)?,
            var(ENV_AUTH_TOKEN)?,
            var(ENV_FROM_NUMBER)?,
        ))
    }

    /// Sets the API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Sets the request timeout in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Checks that every credential is present.
    pub fn validate(&self) -> OtpResult<()> {
        for (name, value) in [
            ("account_sid", &self.account_sid),
            ("auth_token", &self.auth_token),
            ("from_number", &self.from_number),
            ("api_base", &self.api_base),
        ] {
            if value.trim().is_empty() {
                return Err(OtpError::config(format!("twilio.{} must not be empty", name)));
            }
        }
        Ok(())
    }

    /// Returns the Messages resource URL for the account.
    pub fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("api_base", &self.api_base)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Subset of the message resource Twilio returns on success.
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioMessage {
    /// Message SID.
    pub sid: String,
    /// Initial delivery status (e.g. "queued").
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body Twilio returns on failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwilioErrorBody {
    /// Twilio error code.
    #[serde(default)]
    pub code: Option<i64>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

/// SMS notifier backed by Twilio.
#[derive(Debug, Clone)]
pub struct TwilioNotifier {
    config: TwilioConfig,
    client: reqwest::Client,
}

impl TwilioNotifier {
    /// Creates a new notifier.
    pub fn new(config: TwilioConfig) -> OtpResult<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| OtpError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// Gets the notifier configuration.
    pub fn config(&self) -> &TwilioConfig {
        &self.config
    }

    /// Builds the form body for a message.
    pub fn form_fields<'a>(&'a self, address: &'a str, message: &'a str) -> [(&'static str, &'a str); 3] {
        [
            ("To", address),
            ("From", self.config.from_number.as_str()),
            ("Body", message),
        ]
    }

    /// Sends a message and returns the created message resource.
    pub async fn send_message(&self, address: &str, message: &str) -> OtpResult<TwilioMessage> {
        let response = self
            .client
            .post(self.config.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&self.form_fields(address, message))
            .send()
            .await
            .map_err(|e| OtpError::delivery(format!("Request to Twilio failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<TwilioErrorBody>(&body).unwrap_or_default();
            return Err(OtpError::delivery(format!(
                "Twilio returned {} (code {}): {}",
                status.as_u16(),
                detail.code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
                detail.message.unwrap_or(body),
            )));
        }

        response
            .json::<TwilioMessage>()
            .await
            .map_err(|e| OtpError::delivery(format!("Failed to parse Twilio response: {}", e)))
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    fn id(&self) -> &'static str {
        "twilio"
    }

    async fn send(&self, address: &str, message: &str) -> OtpResult<()> {
        let sent = self.send_message(address, message).await?;
        tracing::debug!(
            address = %address,
            sid = %sent.sid,
            status = sent.status.as_deref().unwrap_or("unknown"),
            "Twilio accepted message"
        );
        Ok(())
    }
}
