//! Core data types for session OTPs.
//!
//! This module defines the opaque `SessionId` handed in by the transport
//! layer and the `OtpRecord` each session owns.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a client session.
///
/// The transport layer resolves it (typically from a cookie); the core
/// never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an existing session identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random session identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The OTP state owned by a single session.
///
/// A record is *live* while both `code` and `expires_at` are present.
/// Terminal outcomes (success, expiry, attempt ceiling) clear it back to
/// the not-issued shape; `verified` survives a successful clear.
///
/// # Example
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use session_otp_core::OtpRecord;
///
/// let now = Utc::now();
/// let record = OtpRecord::issued("482913", "+15551234567", now, Duration::minutes(5));
/// assert!(record.is_live());
/// assert_eq!(record.attempts, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRecord {
    /// The 6-digit code in canonical string form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// The address the code was sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,

    /// When the code was generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,

    /// When the code stops being accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Failed comparisons since the last issuance.
    #[serde(default)]
    pub attempts: u32,

    /// Whether a code issued to this session has been verified.
    #[serde(default)]
    pub verified: bool,
}

impl OtpRecord {
    /// Creates a freshly issued record.
    pub fn issued(
        code: impl Into<String>,
        identity: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            code: Some(code.into()),
            identity: Some(identity.into()),
            issued_at: Some(now),
            expires_at: Some(now + ttl),
            attempts: 0,
            verified: false,
        }
    }

    /// Returns true if the record holds a code that can still be checked.
    pub fn is_live(&self) -> bool {
        self.code.is_some() && self.expires_at.is_some()
    }

    /// Returns true if the record has expired at the given instant.
    ///
    /// A record without an expiry is never considered expired; callers
    /// check `is_live` first.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// Increments the attempt counter and returns the new value.
    pub fn record_failed_attempt(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    /// Discards the code, its timestamps and the attempt counter.
    pub fn clear(&mut self) {
        self.code = None;
        self.issued_at = None;
        self.expires_at = None;
        self.attempts = 0;
    }

    /// Marks the record verified and discards the code.
    pub fn mark_verified(&mut self) {
        self.clear();
        self.verified = true;
    }
}

/// Read-only view of a session's OTP state. Never carries the code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpStatus {
    /// Whether a code is waiting to be verified.
    pub pending: bool,
    /// When the pending code expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Verification attempts left for the pending code.
    pub remaining_attempts: u32,
    /// Whether the session has completed a verification.
    pub verified: bool,
}

impl OtpStatus {
    /// Derives the status of a (possibly absent) record.
    pub fn from_record(record: Option<&OtpRecord>, max_attempts: u32, now: DateTime<Utc>) -> Self {
        match record {
            Some(record) if record.is_live() && !record.is_expired_at(now) => Self {
                pending: true,
                expires_at: record.expires_at,
                remaining_attempts: max_attempts.saturating_sub(record.attempts),
                verified: record.verified,
            },
            Some(record) => Self {
                pending: false,
                expires_at: None,
                remaining_attempts: 0,
                verified: record.verified,
            },
            None => Self {
                pending: false,
                expires_at: None,
                remaining_attempts: 0,
                verified: false,
            },
        }
    }
}
