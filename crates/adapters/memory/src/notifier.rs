//! Notifiers that keep messages in-process.

use async_trait::async_trait;
use session_otp_core::error::{OtpError, OtpResult};
use session_otp_core::traits::Notifier;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// A message handed to a notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Destination address.
    pub address: String,
    /// Message body.
    pub message: String,
}

/// Notifier that records every message it is asked to send.
///
/// Can be configured to fail or to stall, to exercise delivery errors.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<RwLock<Vec<SentMessage>>>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    /// Creates a notifier that accepts every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier that records and then rejects every message.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Creates a notifier that waits before accepting each message.
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    /// Returns the messages handed over so far.
    pub async fn messages(&self) -> Vec<SentMessage> {
        self.sent.read().await.clone()
    }

    /// Returns the most recent message sent to an address.
    pub async fn last_message_to(&self, address: &str) -> Option<SentMessage> {
        self.sent
            .read()
            .await
            .iter()
            .rev()
            .find(|m| m.address == address)
            .cloned()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn id(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, address: &str, message: &str) -> OtpResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.sent.write().await.push(SentMessage {
            address: address.to_string(),
            message: message.to_string(),
        });

        match &self.failure {
            Some(reason) => Err(OtpError::delivery(reason.clone())),
            None => Ok(()),
        }
    }
}

/// Notifier that writes messages to the log instead of sending them.
///
/// The message body includes the code; use only in development.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn id(&self) -> &'static str {
        "log"
    }

    async fn send(&self, address: &str, message: &str) -> OtpResult<()> {
        tracing::info!(address = %address, message = %message, "OTP message (not sent)");
        Ok(())
    }
}
