//! # Session OTP Phone Plugin
//!
//! Issues one-time passcodes to a mobile number and verifies them against
//! the requesting session. The [`OtpManager`] owns the lifecycle; the
//! [`PhoneOtpPlugin`] exposes it as `issue`, `verify` and `status` routes
//! on the framework-agnostic router.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use session_otp_phone::{OtpManager, PhoneOtpConfig, PhoneOtpPlugin};
//!
//! let manager = OtpManager::new(PhoneOtpConfig::default(), store, notifier)?;
//! let mut router = Router::new("/otp");
//! PhoneOtpPlugin::new(Arc::new(manager)).register_routes(&mut router);
//! ```

mod config;
mod handlers;
mod manager;

pub use config::{is_e164, IdentityValidatorFn, PhoneOtpConfig, CODE_PLACEHOLDER, MAX_TTL_SECONDS};
pub use handlers::{
    IssueOtpHandler, IssueOtpRequest, IssueOtpResponse, OtpStatusHandler, StatusResponse,
    VerifyOtpHandler, VerifyOtpRequest,
};
pub use manager::{DeliveryHandle, IssuedOtp, OtpManager, VerifiedOtp};

use session_otp_core::router::{Method, Route, Router};
use session_otp_core::traits::OtpPlugin;
use std::sync::Arc;

/// The phone OTP plugin.
#[derive(Debug, Clone)]
pub struct PhoneOtpPlugin {
    manager: Arc<OtpManager>,
}

impl PhoneOtpPlugin {
    /// Creates a new plugin around a manager.
    pub fn new(manager: Arc<OtpManager>) -> Self {
        Self { manager }
    }

    /// Gets the underlying manager.
    pub fn manager(&self) -> &Arc<OtpManager> {
        &self.manager
    }
}

impl OtpPlugin for PhoneOtpPlugin {
    fn id(&self) -> &'static str {
        "phone_otp"
    }

    fn name(&self) -> &'static str {
        "Phone OTP Verification"
    }

    fn register_routes(&self, router: &mut Router) {
        // POST /issue
        router.route(
            Route::new(
                Method::POST,
                "/issue",
                IssueOtpHandler::new(Arc::clone(&self.manager)),
            )
            .summary("Issue OTP")
            .description("Generates a one-time passcode for the session and sends it to the given mobile number.")
            .tag("otp")
            .requires_session(),
        );

        // POST /verify
        router.route(
            Route::new(
                Method::POST,
                "/verify",
                VerifyOtpHandler::new(Arc::clone(&self.manager)),
            )
            .summary("Verify OTP")
            .description("Checks a candidate code against the session's live OTP.")
            .tag("otp")
            .requires_session(),
        );

        // GET /status
        router.route(
            Route::new(
                Method::GET,
                "/status",
                OtpStatusHandler::new(Arc::clone(&self.manager)),
            )
            .summary("OTP status")
            .description("Reports whether the session has a pending or verified OTP.")
            .tag("otp")
            .requires_session(),
        );
    }
}
