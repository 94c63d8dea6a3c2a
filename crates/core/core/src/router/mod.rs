//! Framework-agnostic router for OTP routes.
//!
//! Hosts translate their framework's request into a [`Request`], resolve
//! the session from their own cookie layer, and hand it to
//! [`Router::dispatch`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{OtpError, OtpResult};
use crate::types::SessionId;

/// HTTP methods used by OTP routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    GET,
    POST,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
        }
    }
}

/// A generic HTTP request representation.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Request body (JSON).
    pub body: Option<Value>,
    /// Session resolved by the transport layer, if any.
    pub session: Option<SessionId>,
}

impl Request {
    /// Creates a new request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            session: None,
        }
    }

    /// Creates a POST request with a JSON body.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Sets the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Binds the request to a session.
    pub fn with_session(mut self, session: impl Into<SessionId>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Deserializes the body to a type.
    ///
    /// A missing or `null` body yields the type's default; a body that does
    /// not fit the type is an `InvalidInput` naming the parse failure.
    pub fn json<T: DeserializeOwned + Default>(&self) -> OtpResult<T> {
        match &self.body {
            None | Some(Value::Null) => Ok(T::default()),
            Some(body) => T::deserialize(body).map_err(|e| {
                OtpError::invalid_input("body", format!("Malformed request body: {}", e))
            }),
        }
    }
}

/// A generic HTTP response representation.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body (JSON).
    pub body: Option<Value>,
}

impl Response {
    /// Creates a new response with status code.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Creates a 200 OK response.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::new(404)
    }
    /// Creates the failure envelope for an error.
    ///
    /// Internal failures are reported by kind only; their details stay in
    /// the logs.
    pub fn from_error(err: &OtpError) -> Self {
        let message = if err.is_user_error() {
            err.to_string()
        } else {
            "Failed to process OTP request".to_string()
        };

        Self::new(err.status_code()).json(serde_json::json!({
            "success": false,
            "error": err.kind(),
            "message": message,
        }))
    }

    /// Sets the response body as JSON.
    pub fn json<T: Serialize>(mut self, body: T) -> Self {
        self.body = serde_json::to_value(body).ok();
        self.headers
            .insert("content-type".to_string(), "application/json".to_string());
        self
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for request handlers.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handles a request and returns a response.
    async fn handle(&self, req: Request) -> Response;
}

/// A route definition.
pub struct Route {
    /// The HTTP method.
    pub method: Method,
    /// The path relative to the router's base path.
    pub path: String,
    /// The handler function.
    pub handler: Box<dyn RequestHandler>,
    /// Route metadata for documentation.
    pub metadata: RouteMetadata,
}

/// Metadata for route documentation.
#[derive(Debug, Clone, Default)]
pub struct RouteMetadata {
    /// Short summary.
    pub summary: Option<String>,
    /// Detailed description.
    pub description: Option<String>,
    /// Tags for grouping.
    pub tags: Vec<String>,
    /// Whether the route needs a session bound to the request.
    pub requires_session: bool,
}

impl Route {
    /// Creates a new route.
    pub fn new(method: Method, path: impl Into<String>, handler: impl RequestHandler + 'static) -> Self {
        Self {
            method,
            path: path.into(),
            handler: Box::new(handler),
            metadata: RouteMetadata::default(),
        }
    }

    /// Sets the summary.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.metadata.summary = Some(summary.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.metadata.description = Some(desc.into());
        self
    }

    /// Adds a tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.push(tag.into());
        self
    }

    /// Marks as requiring a session.
    pub fn requires_session(mut self) -> Self {
        self.metadata.requires_session = true;
        self
    }
}

/// A router that collects routes from plugins.
pub struct Router {
    /// Base path prefix.
    pub base_path: String,
    /// Collected routes.
    routes: Vec<Route>,
}

impl Router {
    /// Creates a new router with a base path.
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: normalize(&base_path.into()),
            routes: Vec::new(),
        }
    }

    /// Adds a route.
    pub fn route(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Adds a GET route.
    pub fn get(&mut self, path: &str, handler: impl RequestHandler + 'static) {
        self.route(Route::new(Method::GET, path, handler));
    }

    /// Adds a POST route.
    pub fn post(&mut self, path: &str, handler: impl RequestHandler + 'static) {
        self.route(Route::new(Method::POST, path, handler));
    }

    /// Returns all routes.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Returns the full path of a route, base path included.
    pub fn full_path(&self, route: &Route) -> String {
        format!("{}{}", self.base_path, normalize(&route.path))
    }

    /// Returns the number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if there are no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Merges another router into this one.
    pub fn merge(&mut self, other: Router) {
        for route in other.routes {
            self.routes.push(route);
        }
    }

    /// Finds the route for a request and runs its handler.
    pub async fn dispatch(&self, req: Request) -> Response {
        let path = normalize(&req.path);
        let Some(route) = self
            .routes
            .iter()
            .find(|r| r.method == req.method && self.full_path(r) == path)
        else {
            tracing::debug!(method = %req.method, path = %path, "No route matched");
            return Response::not_found().json(serde_json::json!({
                "success": false,
                "error": "NotFound",
                "message": format!("No route for {} {}", req.method, path),
            }));
        };

        if route.metadata.requires_session && req.session.is_none() {
            return Response::from_error(&OtpError::SessionUnavailable);
        }

        route.handler.handle(req).await
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new("/otp")
    }
}

/// Ensures a leading slash and strips trailing ones.
fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
