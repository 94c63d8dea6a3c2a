//! Error types for session OTP operations.
//!
//! This module defines the `OtpError` enum which represents every way an
//! issuance or verification can fail, together with the machine-readable
//! kind and HTTP-class status each failure maps to.

use thiserror::Error;

/// The main error type for OTP operations.
///
/// The verification-state variants are surfaced to callers verbatim;
/// `DeliveryFailed` is only ever logged by the manager and never fails
/// an issuance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    // ==================== Session Errors ====================
    /// No session is bound to the request, or the session has ended.
    #[error("Session not initialized")]
    SessionUnavailable,

    // ==================== Input Errors ====================
    /// A required field is missing or malformed.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    // ==================== Verification State Errors ====================
    /// The session holds no live OTP.
    #[error("OTP not generated, request again")]
    NotIssued,

    /// The live OTP outlived its TTL and has been discarded.
    #[error("OTP has expired, request a new one")]
    Expired,

    /// The attempt ceiling was reached and the OTP has been discarded.
    #[error("Too many attempts, request a new OTP")]
    TooManyAttempts,

    /// The candidate did not match the live OTP.
    #[error("Invalid OTP, {remaining_attempts} attempt(s) remaining")]
    Mismatch { remaining_attempts: u32 },

    // ==================== Delivery Errors ====================
    /// The notifier could not deliver the OTP.
    #[error("Failed to deliver OTP: {reason}")]
    DeliveryFailed { reason: String },

    // ==================== Infrastructure Errors ====================
    /// The session store failed.
    #[error("Session store error: {message}")]
    StorageError { message: String },

    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// An internal error occurred.
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl OtpError {
    /// Creates a new invalid input error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new delivery error.
    pub fn delivery(reason: impl Into<String>) -> Self {
        Self::DeliveryFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new session store error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageError {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Creates a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Returns the machine-readable kind reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionUnavailable => "SessionUnavailable",
            Self::InvalidInput { .. } => "InvalidInput",
            Self::NotIssued => "NotIssued",
            Self::Expired => "Expired",
            Self::TooManyAttempts => "TooManyAttempts",
            Self::Mismatch { .. } => "Mismatch",
            Self::DeliveryFailed { .. } => "DeliveryFailed",
            Self::StorageError { .. } => "StorageError",
            Self::ConfigurationError { .. } => "ConfigurationError",
            Self::InternalError { .. } => "InternalError",
        }
    }

    /// Returns true if this is a user-facing error (vs internal).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::SessionUnavailable
                | Self::InvalidInput { .. }
                | Self::NotIssued
                | Self::Expired
                | Self::TooManyAttempts
                | Self::Mismatch { .. }
        )
    }

    /// Returns an HTTP status code appropriate for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SessionUnavailable
            | Self::InvalidInput { .. }
            | Self::NotIssued
            | Self::Expired
            | Self::Mismatch { .. } => 400,
            Self::TooManyAttempts => 429,
            Self::DeliveryFailed { .. } => 502,
            _ => 500,
        }
    }
}

/// A Result type alias using OtpError.
pub type OtpResult<T> = Result<T, OtpError>;

impl From<serde_json::Error> for OtpError {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError {
            message: err.to_string(),
        }
    }
}
