//! Request handlers for the phone OTP plugin.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use session_otp_core::router::{Request, RequestHandler, Response};
use session_otp_core::{OtpError, OtpStatus};
use std::sync::Arc;

use crate::manager::OtpManager;

/// Request body for issuing an OTP.
#[derive(Debug, Default, Deserialize)]
pub struct IssueOtpRequest {
    /// Address to send the OTP to.
    #[serde(default, alias = "mobileNumber")]
    pub identity: Option<String>,
}

/// Response for issuing an OTP.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOtpResponse {
    pub success: bool,
    pub message: &'static str,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Handler for POST /issue
pub struct IssueOtpHandler {
    manager: Arc<OtpManager>,
}

impl IssueOtpHandler {
    pub fn new(manager: Arc<OtpManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl RequestHandler for IssueOtpHandler {
    async fn handle(&self, req: Request) -> Response {
        let body: IssueOtpRequest = match req.json() {
            Ok(body) => body,
            Err(e) => return error_response(&e),
        };
        let identity = body.identity.unwrap_or_default();

        match self.manager.issue(req.session.as_ref(), &identity).await {
            Ok(issued) => {
                let code = self.manager.config().expose_code.then(|| issued.code.clone());
                Response::ok().json(IssueOtpResponse {
                    success: true,
                    message: "OTP sent",
                    expires_at: issued.expires_at,
                    code,
                })
            }
            Err(e) => error_response(&e),
        }
    }
}

/// Request body for verifying an OTP.
///
/// The candidate may arrive as a JSON string or number; both are reduced
/// to the same decimal string before comparison.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyOtpRequest {
    /// The code entered by the user.
    #[serde(default, alias = "otp")]
    pub candidate: Option<Value>,
}

impl VerifyOtpRequest {
    /// Returns the candidate as a string; anything else is treated as blank.
    pub fn candidate_text(&self) -> String {
        match &self.candidate {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }
}

/// Handler for POST /verify
pub struct VerifyOtpHandler {
    manager: Arc<OtpManager>,
}

impl VerifyOtpHandler {
    pub fn new(manager: Arc<OtpManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl RequestHandler for VerifyOtpHandler {
    async fn handle(&self, req: Request) -> Response {
        let body: VerifyOtpRequest = match req.json() {
            Ok(body) => body,
            Err(e) => return error_response(&e),
        };

        match self
            .manager
            .verify(req.session.as_ref(), &body.candidate_text())
            .await
        {
            Ok(verified) => Response::ok().json(serde_json::json!({
                "success": true,
                "message": "OTP verified successfully",
                "identity": verified.identity,
                "verifiedAt": verified.verified_at,
            })),
            Err(e) => error_response(&e),
        }
    }
}

/// Response for the status route.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub status: OtpStatus,
}

/// Handler for GET /status
pub struct OtpStatusHandler {
    manager: Arc<OtpManager>,
}

impl OtpStatusHandler {
    pub fn new(manager: Arc<OtpManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl RequestHandler for OtpStatusHandler {
    async fn handle(&self, req: Request) -> Response {
        match self.manager.status(req.session.as_ref()).await {
            Ok(status) => Response::ok().json(StatusResponse {
                success: true,
                status,
            }),
            Err(e) => error_response(&e),
        }
    }
}

fn error_response(err: &OtpError) -> Response {
    if !err.is_user_error() {
        tracing::error!(error = %err, "OTP request failed");
    }
    Response::from_error(err)
}
