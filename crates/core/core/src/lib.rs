//! # Session OTP Core
//!
//! This crate provides the foundational types and traits for issuing and
//! verifying session-bound one-time passcodes. It defines the per-session
//! `OtpRecord`, the error taxonomy, the collaborator traits (`SessionStore`,
//! `Notifier`, `Clock`) the OTP manager is injected with, and a
//! framework-agnostic router hosts bind to their HTTP layer.

pub mod clock;
pub mod error;
pub mod router;
pub mod traits;
pub mod types;

// Re-export commonly used items at the crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{OtpError, OtpResult};
pub use traits::{Notifier, OtpPlugin, SessionStore};
pub use types::{OtpRecord, OtpStatus, SessionId};

// Re-export router types
pub use router::{Method, Request, RequestHandler, Response, Route, RouteMetadata, Router};
