//! The session-scoped OTP state machine.

use chrono::{DateTime, Utc};
use session_otp_core::{
    Clock, Notifier, OtpError, OtpRecord, OtpResult, OtpStatus, SessionId, SessionStore,
    SystemClock,
};
use session_otp_utils::{canonicalize, constant_time_eq, CodeSource, OtpGenerator};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::PhoneOtpConfig;

/// Result of a successful issuance.
#[derive(Debug)]
pub struct IssuedOtp {
    /// The generated code.
    pub code: String,
    /// The address the code is being delivered to.
    pub identity: String,
    /// When the code stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// The in-flight delivery.
    pub delivery: DeliveryHandle,
}

/// Handle on a spawned delivery.
///
/// Dropping the handle detaches the delivery; it still runs to completion
/// and its outcome is logged either way.
#[derive(Debug)]
pub struct DeliveryHandle {
    handle: JoinHandle<OtpResult<()>>,
}

impl DeliveryHandle {
    /// Waits for the delivery and returns its outcome.
    pub async fn outcome(self) -> OtpResult<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(OtpError::delivery(e.to_string())),
        }
    }

    /// Returns true once the delivery has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedOtp {
    /// The address the verified code was issued to.
    pub identity: Option<String>,
    /// When the verification happened.
    pub verified_at: DateTime<Utc>,
}

/// Issues and verifies OTPs bound to a session.
///
/// Every operation is a get-modify-set over the session's [`OtpRecord`].
/// The store must serialize requests for the same session; see
/// [`SessionStore`].
pub struct OtpManager {
    config: PhoneOtpConfig,
    store: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    codes: Arc<dyn CodeSource>,
    clock: Arc<dyn Clock>,
}

impl OtpManager {
    /// Creates a manager with an entropy-seeded generator and wall-clock time.
    pub fn new(
        config: PhoneOtpConfig,
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> OtpResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            notifier,
            codes: Arc::new(OtpGenerator::from_entropy()),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the code source.
    pub fn with_code_source(mut self, codes: Arc<dyn CodeSource>) -> Self {
        self.codes = codes;
        self
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Gets the manager configuration.
    pub fn config(&self) -> &PhoneOtpConfig {
        &self.config
    }

    /// Issues a fresh OTP for the session and starts delivering it.
    ///
    /// Any earlier record of the session is replaced. Delivery runs on a
    /// spawned task; its failure is logged and does not fail the issuance.
    pub async fn issue(&self, session: Option<&SessionId>, identity: &str) -> OtpResult<IssuedOtp> {
        let session = session.ok_or(OtpError::SessionUnavailable)?;

        let identity = identity.trim();
        if identity.is_empty() {
            return Err(OtpError::invalid_input("identity", "Mobile number is required"));
        }
        if !self.config.validate_identity(identity) {
            return Err(OtpError::invalid_input("identity", "Invalid mobile number format"));
        }

        let code = self.codes.generate();
        let now = self.clock.now();
        let record = OtpRecord::issued(code.clone(), identity, now, self.config.ttl());
        let expires_at = now + self.config.ttl();

        self.store.set(session, Some(record)).await?;
        tracing::info!(session = %session, identity = %identity, %expires_at, "OTP issued");

        let delivery = self.deliver(session, identity, &code);

        Ok(IssuedOtp {
            code,
            identity: identity.to_string(),
            expires_at,
            delivery,
        })
    }

    /// Verifies a candidate against the session's live OTP.
    ///
    /// Checks run in a fixed order: session, input, presence, expiry,
    /// attempt ceiling, then the comparison itself. Expiry and the ceiling
    /// discard the record; a mismatch keeps it live until the ceiling is
    /// reached.
    pub async fn verify(&self, session: Option<&SessionId>, candidate: &str) -> OtpResult<VerifiedOtp> {
        let session = session.ok_or(OtpError::SessionUnavailable)?;

        let candidate = canonicalize(candidate)
            .ok_or_else(|| OtpError::invalid_input("candidate", "OTP is required"))?;

        let mut record = match self.store.get(session).await? {
            Some(record) if record.is_live() => record,
            _ => {
                tracing::debug!(session = %session, "Verification without a live OTP");
                return Err(OtpError::NotIssued);
            }
        };

        let now = self.clock.now();
        if record.is_expired_at(now) {
            record.clear();
            self.store.set(session, Some(record)).await?;
            tracing::info!(session = %session, "OTP expired");
            return Err(OtpError::Expired);
        }

        let max_attempts = self.config.max_attempts;
        if record.attempts >= max_attempts {
            record.clear();
            self.store.set(session, Some(record)).await?;
            tracing::warn!(session = %session, "OTP attempt ceiling already reached");
            return Err(OtpError::TooManyAttempts);
        }

        let matches = record
            .code
            .as_deref()
            .is_some_and(|code| constant_time_eq(candidate, code));

        if !matches {
            let attempts = record.record_failed_attempt();
            if attempts >= max_attempts {
                record.clear();
                self.store.set(session, Some(record)).await?;
                tracing::warn!(session = %session, attempts, "OTP discarded after too many attempts");
                return Err(OtpError::TooManyAttempts);
            }

            self.store.set(session, Some(record)).await?;
            tracing::debug!(session = %session, attempts, "OTP mismatch");
            return Err(OtpError::Mismatch {
                remaining_attempts: max_attempts - attempts,
            });
        }

        let identity = record.identity.clone();
        record.mark_verified();
        self.store.set(session, Some(record)).await?;
        tracing::info!(session = %session, "OTP verified");

        Ok(VerifiedOtp {
            identity,
            verified_at: now,
        })
    }

    /// Returns the session's OTP status without touching it.
    pub async fn status(&self, session: Option<&SessionId>) -> OtpResult<OtpStatus> {
        let session = session.ok_or(OtpError::SessionUnavailable)?;
        let record = self.store.get(session).await?;
        Ok(OtpStatus::from_record(
            record.as_ref(),
            self.config.max_attempts,
            self.clock.now(),
        ))
    }

    fn deliver(&self, session: &SessionId, identity: &str, code: &str) -> DeliveryHandle {
        let notifier = Arc::clone(&self.notifier);
        let session = session.clone();
        let address = identity.to_string();
        let message = self.config.render_message(code);
        let timeout = self.config.delivery_timeout();

        let handle = tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, notifier.send(&address, &message)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e @ OtpError::DeliveryFailed { .. })) => Err(e),
                Ok(Err(e)) => Err(OtpError::delivery(e.to_string())),
                Err(_) => Err(OtpError::delivery(format!(
                    "timed out after {}ms",
                    timeout.as_millis()
                ))),
            };

            match &outcome {
                Ok(()) => {
                    tracing::debug!(session = %session, notifier = notifier.id(), "OTP delivered");
                }
                Err(e) => {
                    tracing::warn!(
                        session = %session,
                        notifier = notifier.id(),
                        error = %e,
                        "OTP delivery failed"
                    );
                }
            }

            outcome
        });

        DeliveryHandle { handle }
    }
}

impl std::fmt::Debug for OtpManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpManager")
            .field("config", &self.config)
            .field("notifier", &self.notifier.id())
            .finish()
    }
}
