//! Configuration for the phone OTP plugin.

use chrono::Duration;
use session_otp_core::{OtpError, OtpResult};
use std::sync::Arc;

/// Placeholder replaced by the code in the message template.
pub const CODE_PLACEHOLDER: &str = "{code}";

/// Longest accepted OTP lifetime (one day).
pub const MAX_TTL_SECONDS: u64 = 86_400;

/// Type alias for identity validator.
pub type IdentityValidatorFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Configuration for the phone OTP plugin.
#[derive(Clone)]
pub struct PhoneOtpConfig {
    /// OTP lifetime in seconds. Default: 300 (5 minutes).
    pub ttl_seconds: u64,
    /// Failed comparisons allowed before the OTP is discarded. Default: 5.
    pub max_attempts: u32,
    /// Whether the issue response carries the plaintext code. Default: false.
    pub expose_code: bool,
    /// Message sent to the identity. Default: "Your OTP is {code}".
    pub message_template: String,
    /// Upper bound on a single delivery in milliseconds. Default: 10000.
    pub delivery_timeout_ms: u64,
    /// Optional identity validator.
    pub identity_validator: Option<IdentityValidatorFn>,
}

impl Default for PhoneOtpConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300, // 5 minutes
            max_attempts: 5,
            expose_code: false,
            message_template: format!("Your OTP is {}", CODE_PLACEHOLDER),
            delivery_timeout_ms: 10_000,
            identity_validator: None,
        }
    }
}

impl PhoneOtpConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the OTP lifetime in seconds.
    pub fn ttl_seconds(mut self, seconds: u64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    /// Sets the attempt ceiling.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Returns the plaintext code from `issue` responses.
    ///
    /// This defeats out-of-band delivery and is meant for local development.
    pub fn expose_code(mut self, expose: bool) -> Self {
        self.expose_code = expose;
        self
    }

    /// Sets the message template. Must contain `{code}`.
    pub fn message_template(mut self, template: impl Into<String>) -> Self {
        self.message_template = template.into();
        self
    }

    /// Sets the delivery timeout in milliseconds.
    pub fn delivery_timeout_ms(mut self, millis: u64) -> Self {
        self.delivery_timeout_ms = millis;
        self
    }

    /// Sets an identity validator.
    pub fn identity_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.identity_validator = Some(Arc::new(validator));
        self
    }

    /// Accepts only E.164-shaped numbers: `+` followed by 8 to 15 digits.
    pub fn require_e164(self) -> Self {
        self.identity_validator(is_e164)
    }

    /// Returns the OTP lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_seconds.min(MAX_TTL_SECONDS) as i64)
    }

    /// Returns the delivery timeout.
    pub fn delivery_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.delivery_timeout_ms)
    }

    /// Renders the outbound message for a code.
    pub fn render_message(&self, code: &str) -> String {
        self.message_template.replace(CODE_PLACEHOLDER, code)
    }

    /// Validates an identity.
    pub fn validate_identity(&self, identity: &str) -> bool {
        match self.identity_validator {
            Some(ref validator) => validator(identity),
            None => true,
        }
    }

    /// Checks the policy values for consistency.
    pub fn validate(&self) -> OtpResult<()> {
        if self.ttl_seconds == 0 {
            return Err(OtpError::config("ttl_seconds must be greater than zero"));
        }
        if self.ttl_seconds > MAX_TTL_SECONDS {
            return Err(OtpError::config(format!(
                "ttl_seconds must be at most {}",
                MAX_TTL_SECONDS
            )));
        }
        if self.max_attempts == 0 {
            return Err(OtpError::config("max_attempts must be greater than zero"));
        }
        if !self.message_template.contains(CODE_PLACEHOLDER) {
            return Err(OtpError::config(format!(
                "message_template must contain {}",
                CODE_PLACEHOLDER
            )));
        }
        if self.delivery_timeout_ms == 0 {
            return Err(OtpError::config("delivery_timeout_ms must be greater than zero"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for PhoneOtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhoneOtpConfig")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("max_attempts", &self.max_attempts)
            .field("expose_code", &self.expose_code)
            .field("message_template", &self.message_template)
            .field("delivery_timeout_ms", &self.delivery_timeout_ms)
            .field("identity_validator", &self.identity_validator.is_some())
            .finish()
    }
}

/// Returns true for `+` followed by 8 to 15 ASCII digits.
pub fn is_e164(identity: &str) -> bool {
    identity
        .strip_prefix('+')
        .is_some_and(|digits| (8..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()))
}
