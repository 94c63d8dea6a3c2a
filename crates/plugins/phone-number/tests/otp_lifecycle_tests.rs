//! Lifecycle tests for the phone OTP manager.
//!
//! This suite covers:
//! - Issuance and replacement
//! - Verification ordering and terminal states
//! - Expiry and the attempt ceiling
//! - Delivery failures
//! - The route surface end to end

use chrono::Duration;
use serde_json::json;
use session_otp_adapter_memory::{MemorySessionStore, RecordingNotifier};
use session_otp_core::{
    Clock, ManualClock, OtpError, OtpPlugin, Request, Router, SessionId, SessionStore,
};
use session_otp_phone::{OtpManager, PhoneOtpConfig, PhoneOtpPlugin};
use session_otp_utils::{FixedCodeSource, OtpGenerator};
use std::sync::Arc;

struct Harness {
    manager: Arc<OtpManager>,
    store: MemorySessionStore,
    notifier: RecordingNotifier,
    clock: ManualClock,
}

impl Harness {
    fn new(codes: &[&str]) -> Self {
        Self::with(PhoneOtpConfig::default(), RecordingNotifier::new(), codes)
    }

    fn with(config: PhoneOtpConfig, notifier: RecordingNotifier, codes: &[&str]) -> Self {
        let store = MemorySessionStore::new();
        let clock = ManualClock::default();
        let manager = OtpManager::new(config, Arc::new(store.clone()), Arc::new(notifier.clone()))
            .expect("valid config")
            .with_code_source(Arc::new(FixedCodeSource::sequence(codes.iter().copied())))
            .with_clock(Arc::new(clock.clone()));

        Self {
            manager: Arc::new(manager),
            store,
            notifier,
            clock,
        }
    }

    async fn session(&self) -> SessionId {
        self.store.open_session().await
    }
}

mod issuance_tests {
    use super::*;

    #[tokio::test]
    async fn test_generated_codes_are_six_digits() {
        let store = MemorySessionStore::new();
        let manager = OtpManager::new(
            PhoneOtpConfig::default(),
            Arc::new(store.clone()),
            Arc::new(RecordingNotifier::new()),
        )
        .unwrap()
        .with_code_source(Arc::new(OtpGenerator::seeded(99)));
        let session = store.open_session().await;

        for _ in 0..200 {
            let issued = manager.issue(Some(&session), "+15551234567").await.unwrap();
            assert_eq!(issued.code.len(), 6);
            assert!(issued.code.bytes().all(|b| b.is_ascii_digit()));
            let value: u32 = issued.code.parse().unwrap();
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[tokio::test]
    async fn test_reissue_replaces_prior_record() {
        let h = Harness::new(&["111111", "222222"]);
        let session = h.session().await;

        h.manager.issue(Some(&session), "+15551234567").await.unwrap();
        h.manager.issue(Some(&session), "+15551234567").await.unwrap();

        let err = h.manager.verify(Some(&session), "111111").await.unwrap_err();
        assert!(matches!(err, OtpError::Mismatch { .. }));

        h.manager.verify(Some(&session), "222222").await.unwrap();
    }

    #[tokio::test]
    async fn test_reissue_resets_attempts() {
        let h = Harness::new(&["111111", "222222"]);
        let session = h.session().await;

        h.manager.issue(Some(&session), "+15551234567").await.unwrap();
        for _ in 0..3 {
            let _ = h.manager.verify(Some(&session), "000000").await;
        }
        h.manager.issue(Some(&session), "+15551234567").await.unwrap();

        let record = h.store.get(&session).await.unwrap().unwrap();
        assert_eq!(record.attempts, 0);
        assert!(!record.verified);
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_fail_issuance() {
        let h = Harness::with(
            PhoneOtpConfig::default(),
            RecordingNotifier::failing("gateway unavailable"),
            &["482913"],
        );
        let session = h.session().await;

        let issued = h.manager.issue(Some(&session), "+15551234567").await.unwrap();
        let outcome = issued.delivery.outcome().await;
        assert!(matches!(outcome, Err(OtpError::DeliveryFailed { .. })));

        h.manager.verify(Some(&session), "482913").await.unwrap();
    }

    #[tokio::test]
    async fn test_issue_does_not_wait_for_slow_delivery() {
        let h = Harness::with(
            PhoneOtpConfig::default().delivery_timeout_ms(50),
            RecordingNotifier::delayed(std::time::Duration::from_secs(30)),
            &["482913"],
        );
        let session = h.session().await;

        let issued = h.manager.issue(Some(&session), "+15551234567").await.unwrap();
        assert!(!issued.delivery.is_finished());

        let outcome = issued.delivery.outcome().await;
        assert!(matches!(outcome, Err(OtpError::DeliveryFailed { .. })));
        assert!(h.store.get(&session).await.unwrap().unwrap().is_live());
    }

    #[tokio::test]
    async fn test_issue_on_ended_session() {
        let h = Harness::new(&["482913"]);
        let session = h.session().await;
        h.store.end_session(&session).await;

        let err = h.manager.issue(Some(&session), "+15551234567").await.unwrap_err();
        assert_eq!(err, OtpError::SessionUnavailable);
        assert!(h.notifier.messages().await.is_empty());
    }
}

mod verification_tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_without_issue_is_not_issued() {
        let h = Harness::new(&["482913"]);
        let session = h.session().await;

        for candidate in ["000000", "482913", "123456"] {
            let err = h.manager.verify(Some(&session), candidate).await.unwrap_err();
            assert_eq!(err, OtpError::NotIssued);
        }
    }

    #[tokio::test]
    async fn test_success_then_replay_is_not_issued() {
        let h = Harness::new(&["482913"]);
        let session = h.session().await;

        let issued = h.manager.issue(Some(&session), "+15551234567").await.unwrap();
        assert_eq!(issued.code, "482913");
        assert_eq!(issued.expires_at, h.clock.now() + Duration::seconds(300));

        let verified = h.manager.verify(Some(&session), "482913").await.unwrap();
        assert_eq!(verified.identity.as_deref(), Some("+15551234567"));

        let record = h.store.get(&session).await.unwrap().unwrap();
        assert!(record.verified);
        assert!(record.code.is_none());
        assert_eq!(record.attempts, 0);

        let err = h.manager.verify(Some(&session), "482913").await.unwrap_err();
        assert_eq!(err, OtpError::NotIssued);
    }

    #[tokio::test]
    async fn test_expiry_at_boundary_clears_record() {
        let h = Harness::new(&["482913"]);
        let session = h.session().await;
        h.manager.issue(Some(&session), "+15551234567").await.unwrap();

        h.clock.advance(Duration::seconds(300));
        let err = h.manager.verify(Some(&session), "482913").await.unwrap_err();
        assert_eq!(err, OtpError::Expired);

        let err = h.manager.verify(Some(&session), "482913").await.unwrap_err();
        assert_eq!(err, OtpError::NotIssued);
    }

    #[tokio::test]
    async fn test_just_before_expiry_still_verifies() {
        let h = Harness::new(&["482913"]);
        let session = h.session().await;
        h.manager.issue(Some(&session), "+15551234567").await.unwrap();

        h.clock.advance(Duration::seconds(299));
        h.manager.verify(Some(&session), "482913").await.unwrap();
    }

    #[tokio::test]
    async fn test_expiry_wins_over_wrong_code() {
        let h = Harness::new(&["482913"]);
        let session = h.session().await;
        h.manager.issue(Some(&session), "+15551234567").await.unwrap();

        h.clock.advance(Duration::minutes(10));
        let err = h.manager.verify(Some(&session), "000000").await.unwrap_err();
        assert_eq!(err, OtpError::Expired);
    }

    #[tokio::test]
    async fn test_attempt_ceiling_boundary() {
        let h = Harness::new(&["482913"]);
        let session = h.session().await;
        h.manager.issue(Some(&session), "+15551234567").await.unwrap();

        for remaining in [4, 3, 2, 1] {
            let err = h.manager.verify(Some(&session), "000000").await.unwrap_err();
            assert_eq!(err, OtpError::Mismatch { remaining_attempts: remaining });
        }

        let err = h.manager.verify(Some(&session), "000000").await.unwrap_err();
        assert_eq!(err, OtpError::TooManyAttempts);
        assert_eq!(err.status_code(), 429);

        // The right code no longer helps.
        let err = h.manager.verify(Some(&session), "482913").await.unwrap_err();
        assert_eq!(err, OtpError::NotIssued);
    }

    #[tokio::test]
    async fn test_fifth_attempt_with_right_code_succeeds() {
        let h = Harness::new(&["482913"]);
        let session = h.session().await;
        h.manager.issue(Some(&session), "+15551234567").await.unwrap();

        for _ in 0..4 {
            let _ = h.manager.verify(Some(&session), "000000").await;
        }
        h.manager.verify(Some(&session), "482913").await.unwrap();
    }

    #[tokio::test]
    async fn test_custom_ceiling() {
        let h = Harness::with(
            PhoneOtpConfig::default().max_attempts(2),
            RecordingNotifier::new(),
            &["482913"],
        );
        let session = h.session().await;
        h.manager.issue(Some(&session), "+15551234567").await.unwrap();

        assert_eq!(
            h.manager.verify(Some(&session), "000000").await.unwrap_err(),
            OtpError::Mismatch { remaining_attempts: 1 }
        );
        assert_eq!(
            h.manager.verify(Some(&session), "000000").await.unwrap_err(),
            OtpError::TooManyAttempts
        );
    }

    #[tokio::test]
    async fn test_candidate_whitespace_is_ignored_but_digits_are_not() {
        let h = Harness::new(&["482913"]);
        let session = h.session().await;
        h.manager.issue(Some(&session), "+15551234567").await.unwrap();

        let err = h.manager.verify(Some(&session), "0482913").await.unwrap_err();
        assert!(matches!(err, OtpError::Mismatch { .. }));

        h.manager.verify(Some(&session), " 482913 ").await.unwrap();
    }

    #[tokio::test]
    async fn test_session_vanished_between_issue_and_verify() {
        let h = Harness::new(&["482913"]);
        let session = h.session().await;
        h.manager.issue(Some(&session), "+15551234567").await.unwrap();
        h.store.end_session(&session).await;

        let err = h.manager.verify(Some(&session), "482913").await.unwrap_err();
        assert_eq!(err, OtpError::SessionUnavailable);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let h = Harness::new(&["111111", "222222"]);
        let alice = h.session().await;
        let bob = h.session().await;

        h.manager.issue(Some(&alice), "+15550000001").await.unwrap();
        h.manager.issue(Some(&bob), "+15550000002").await.unwrap();

        assert!(matches!(
            h.manager.verify(Some(&alice), "222222").await.unwrap_err(),
            OtpError::Mismatch { .. }
        ));
        h.manager.verify(Some(&bob), "222222").await.unwrap();
        h.manager.verify(Some(&alice), "111111").await.unwrap();
    }
}

mod route_tests {
    use super::*;

    fn router(h: &Harness) -> Router {
        let mut router = Router::new("/otp");
        PhoneOtpPlugin::new(Arc::clone(&h.manager)).register_routes(&mut router);
        router
    }

    #[tokio::test]
    async fn test_issue_and_verify_scenario() {
        let h = Harness::new(&["482913"]);
        let router = router(&h);
        let session = h.session().await;

        let res = router
            .dispatch(
                Request::post("/otp/issue", json!({ "identity": "+15551234567" }))
                    .with_session(session.clone()),
            )
            .await;
        assert_eq!(res.status, 200);
        let body = res.body.unwrap();
        assert_eq!(body["success"], true);
        assert!(body.get("code").is_none());

        let res = router
            .dispatch(
                Request::post("/otp/verify", json!({ "candidate": "482913" }))
                    .with_session(session.clone()),
            )
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body.unwrap()["success"], true);

        let res = router
            .dispatch(
                Request::post("/otp/verify", json!({ "candidate": "482913" }))
                    .with_session(session),
            )
            .await;
        assert_eq!(res.status, 400);
        let body = res.body.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "NotIssued");
    }

    #[tokio::test]
    async fn test_exposed_code_and_numeric_candidate() {
        let h = Harness::with(
            PhoneOtpConfig::default().expose_code(true),
            RecordingNotifier::new(),
            &["482913"],
        );
        let router = router(&h);
        let session = h.session().await;

        let res = router
            .dispatch(
                Request::post("/otp/issue", json!({ "mobileNumber": "+15551234567" }))
                    .with_session(session.clone()),
            )
            .await;
        assert_eq!(res.body.unwrap()["code"], "482913");

        let res = router
            .dispatch(
                Request::post("/otp/verify", json!({ "otp": 482913 })).with_session(session),
            )
            .await;
        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn test_too_many_attempts_maps_to_429() {
        let h = Harness::new(&["482913"]);
        let router = router(&h);
        let session = h.session().await;

        router
            .dispatch(
                Request::post("/otp/issue", json!({ "identity": "+15551234567" }))
                    .with_session(session.clone()),
            )
            .await;

        let mut statuses = Vec::new();
        for _ in 0..5 {
            let res = router
                .dispatch(
                    Request::post("/otp/verify", json!({ "candidate": "000000" }))
                        .with_session(session.clone()),
                )
                .await;
            statuses.push(res.status);
        }
        assert_eq!(statuses, vec![400, 400, 400, 400, 429]);
    }

    #[tokio::test]
    async fn test_missing_session_and_missing_input() {
        let h = Harness::new(&["482913"]);
        let router = router(&h);
        let session = h.session().await;

        let res = router
            .dispatch(Request::post("/otp/issue", json!({ "identity": "+15551234567" })))
            .await;
        assert_eq!(res.body.unwrap()["error"], "SessionUnavailable");

        let res = router
            .dispatch(Request::post("/otp/issue", json!({})).with_session(session.clone()))
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body.unwrap()["error"], "InvalidInput");

        let res = router
            .dispatch(Request::post("/otp/verify", json!({})).with_session(session))
            .await;
        assert_eq!(res.body.unwrap()["error"], "InvalidInput");
    }

    #[tokio::test]
    async fn test_malformed_body_reports_parse_failure() {
        let h = Harness::new(&["482913"]);
        let router = router(&h);
        let session = h.session().await;

        router
            .dispatch(
                Request::post("/otp/issue", json!({ "identity": "+15551234567" }))
                    .with_session(session.clone()),
            )
            .await;

        let res = router
            .dispatch(
                Request::post("/otp/verify", json!({ "candidate": "482913", "otp": "482913" }))
                    .with_session(session.clone()),
            )
            .await;
        assert_eq!(res.status, 400);
        let body = res.body.unwrap();
        assert_eq!(body["error"], "InvalidInput");
        let message = body["message"].as_str().unwrap();
        assert!(message.contains("Malformed request body"), "{message}");
        assert!(!message.contains("OTP is required"));

        let res = router
            .dispatch(
                Request::post("/otp/issue", json!({ "identity": 15551234567_u64 }))
                    .with_session(session.clone()),
            )
            .await;
        assert!(res.body.unwrap()["message"]
            .as_str()
            .unwrap()
            .contains("Malformed request body"));

        // The rejected request never reached the comparison.
        let status = h.manager.status(Some(&session)).await.unwrap();
        assert_eq!(status.remaining_attempts, 5);
    }

    #[tokio::test]
    async fn test_status_route_never_reveals_code() {
        let h = Harness::new(&["482913"]);
        let router = router(&h);
        let session = h.session().await;

        router
            .dispatch(
                Request::post("/otp/issue", json!({ "identity": "+15551234567" }))
                    .with_session(session.clone()),
            )
            .await;

        let res = router
            .dispatch(Request::get("/otp/status").with_session(session))
            .await;
        let body = res.body.unwrap();
        assert_eq!(body["pending"], true);
        assert_eq!(body["remainingAttempts"], 5);
        assert!(!body.to_string().contains("482913"));
    }
}
