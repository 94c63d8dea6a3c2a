//! # Session OTP Server
//!
//! Standalone host for the phone OTP routes. It owns the session store,
//! picks a notifier from configuration, and serializes the requests of
//! each session before dispatching them to the router.

mod config;

pub use config::{load_config, parse_config, AppConfig, ConfigError, OtpSection, ServerConfig, TwilioSection};

use session_otp_adapter_memory::{LogNotifier, MemorySessionStore};
use session_otp_adapter_twilio::TwilioNotifier;
use session_otp_core::router::{Request, Response, Router};
use session_otp_core::traits::{Notifier, OtpPlugin};
use session_otp_core::types::SessionId;
use session_otp_core::OtpError;
use session_otp_phone::{OtpManager, PhoneOtpPlugin};
use std::sync::Arc;

/// Server error.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Otp(#[from] OtpError),
}

/// The OTP server.
pub struct OtpServer {
    /// Loaded configuration.
    pub config: AppConfig,
    store: MemorySessionStore,
    manager: Arc<OtpManager>,
    router: Router,
}

impl OtpServer {
    /// Creates a server, sending SMS through Twilio when credentials are
    /// configured and logging messages otherwise.
    pub fn new(config: AppConfig) -> Result<Self, ServerError> {
        let notifier: Arc<dyn Notifier> = match config.twilio.resolve() {
            Some(twilio) => Arc::new(TwilioNotifier::new(twilio)?),
            None => {
                tracing::warn!("Twilio credentials not configured; OTP messages will only be logged");
                Arc::new(LogNotifier)
            }
        };
        Self::with_notifier(config, notifier)
    }

    /// Creates a server with an explicit notifier.
    pub fn with_notifier(config: AppConfig, notifier: Arc<dyn Notifier>) -> Result<Self, ServerError> {
        let store = MemorySessionStore::new();
        let manager = Arc::new(OtpManager::new(
            config.otp.to_plugin_config(),
            Arc::new(store.clone()),
            notifier.clone(),
        )?);

        if manager.config().expose_code {
            tracing::warn!("expose_code is enabled; issue responses include the plaintext OTP");
        }

        let mut router = Router::new(config.server.base_path.clone());
        let plugin = PhoneOtpPlugin::new(manager.clone());
        plugin.register_routes(&mut router);
        tracing::debug!(plugin = plugin.id(), notifier = notifier.id(), "Registered plugin");

        Ok(Self {
            config,
            store,
            manager,
            router,
        })
    }

    /// Gets the session store.
    pub fn store(&self) -> &MemorySessionStore {
        &self.store
    }

    /// Gets the OTP manager.
    pub fn manager(&self) -> &Arc<OtpManager> {
        &self.manager
    }

    /// Gets the router.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Opens a new client session.
    pub async fn open_session(&self) -> SessionId {
        self.store.open_session().await
    }

    /// Ends a client session and discards its OTP state.
    pub async fn end_session(&self, session: &SessionId) -> bool {
        self.store.end_session(session).await
    }

    /// Handles a request. Requests of the same session run one at a time.
    pub async fn handle(&self, req: Request) -> Response {
        tracing::debug!(method = %req.method, path = %req.path, "Handling request");
        let _guard = match &req.session {
            Some(session) => self.store.lock_session(session).await,
            None => None,
        };
        self.router.dispatch(req).await
    }

    /// Lists the registered routes as `METHOD path`.
    pub fn route_table(&self) -> Vec<String> {
        self.router
            .routes()
            .map(|r| format!("{} {}", r.method, self.router.full_path(r)))
            .collect()
    }

    /// Starts the server.
    pub async fn run(&self) -> Result<(), ServerError> {
        tracing::info!(base_path = %self.config.server.base_path, "Starting session OTP server");
        for route in self.route_table() {
            tracing::info!("Route: {}", route);
        }

        // Binding to a transport is left to the embedding HTTP framework.
        tracing::info!("Server ready");

        Ok(())
    }
}

impl std::fmt::Debug for OtpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpServer")
            .field("config", &self.config)
            .field("routes", &self.route_table())
            .finish()
    }
}
