//! Core traits for session OTPs.
//!
//! This module defines the collaborator interfaces the OTP manager is
//! built on. Hosts implement them to plug in their own session layer and
//! delivery channel.

use async_trait::async_trait;

use crate::error::OtpResult;
use crate::router::Router;
use crate::types::{OtpRecord, SessionId};

/// Trait for per-session OTP storage.
///
/// Implementations scope every read and write to one session. Reads and
/// writes for the same session must not interleave between concurrent
/// requests: the manager performs a get-modify-set sequence and relies on
/// the store (or the host around it) to serialize requests per session.
///
/// A session the store does not know about is reported as
/// [`OtpError::SessionUnavailable`](crate::OtpError::SessionUnavailable).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Gets the OTP record of a session, if one was ever stored.
    async fn get(&self, session: &SessionId) -> OtpResult<Option<OtpRecord>>;

    /// Replaces the OTP record of a session. `None` removes it.
    async fn set(&self, session: &SessionId, record: Option<OtpRecord>) -> OtpResult<()>;
}

/// Trait for outbound message delivery.
///
/// The manager observes the result only for logging; a failed send never
/// fails the operation that triggered it and is never retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns a short identifier used in log output.
    fn id(&self) -> &'static str;

    /// Sends a message to an address.
    async fn send(&self, address: &str, message: &str) -> OtpResult<()>;
}

/// Trait for components that expose routes.
pub trait OtpPlugin: Send + Sync {
    /// Returns the unique identifier for this plugin.
    fn id(&self) -> &'static str;

    /// Returns a human-readable name for this plugin.
    fn name(&self) -> &'static str;

    /// Registers routes for this plugin.
    fn register_routes(&self, _router: &mut Router) {}
}
