//! Request dispatch.
//!
//! # Responsibilities
//! - Resolve the route for an incoming request
//! - Build the request context (params, query, cookies, body, headers)
//! - Run the auth hook, then the handler
//! - Turn success or failure into exactly one response
//!
//! # Request Lifecycle
//! ```text
//! Received → Resolved ──(no route)──────────────────────────→ 404, empty body
//!               │
//!               ▼
//!         context built → [auth hook] → handler
//!                                          │
//!                         ┌────────────────┴───────────────┐
//!                         ▼                                ▼
//!                     Succeeded                          Failed
//!                 (value → 200, or                 error registry lookup
//!                  builder verbatim)          (first type match → recovery,
//!                         │                    none / recovery fails → 500 {})
//!                         └────────────────┬───────────────┘
//!                                          ▼
//!                                      Responded
//! ```
//!
//! # Design Decisions
//! - Route table and error registry are frozen by `build()`; dispatch only reads them
//! - Handler panics are contained and treated like unmapped errors
//! - Error detail is logged, never sent to the client
//! - No retries: a failed handler gets a single error-resolution pass

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::dispatch::errors::ErrorRegistry;
use crate::dispatch::handler::{AuthHook, Handler, HandlerError, Reply};
use crate::http::request::{
    collect_headers, decode_body, method_has_body, parse_cookies, parse_query, split_target,
    Cookies, RequestContext,
};
use crate::http::response::{self, ResponseBuilder};
use crate::observability::metrics;
use crate::routing::matcher::extract_params;
use crate::routing::router::normalize_method;
use crate::routing::RouteTable;

/// Default cap on buffered request bodies (2 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

type SharedHandler = Arc<dyn Handler>;

/// Why a handler, hook or recovery did not produce a value.
enum Failure {
    Error(HandlerError),
    Panic(String),
}

/// Owns the route table, error registry and auth hook for one server.
pub struct Dispatcher {
    routes: RouteTable<SharedHandler>,
    errors: ErrorRegistry,
    auth: Option<Arc<dyn AuthHook>>,
    max_body_size: usize,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.len())
            .field("errors", &self.errors)
            .field("auth", &self.auth.is_some())
            .field("max_body_size", &self.max_body_size)
            .finish()
    }
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn routes(&self) -> &RouteTable<SharedHandler> {
        &self.routes
    }

    pub fn errors(&self) -> &ErrorRegistry {
        &self.errors
    }

    /// Handle one request from the transport. Always answers.
    pub async fn dispatch(&self, request: Request<Body>) -> Response<Body> {
        let start = Instant::now();
        let (parts, body) = request.into_parts();
        let method = normalize_method(parts.method.as_str());
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| parts.uri.path());
        let (path, query) = split_target(target);

        tracing::debug!(method = %method, uri = %target, "Request received");

        let Some(route) = self.routes.resolve(&method, path) else {
            tracing::warn!(method = %method, path = %path, "No route matched");
            metrics::record_request(&method, 404, "none", start);
            return response::empty(StatusCode::NOT_FOUND);
        };
        let route_label = route.pattern().as_str();

        let body = if method_has_body(&method) {
            match axum::body::to_bytes(body, self.max_body_size).await {
                Ok(bytes) => decode_body(&bytes),
                Err(e) => {
                    tracing::warn!(method = %method, path = %path, error = %e, "Failed to read request body");
                    metrics::record_request(&method, 400, route_label, start);
                    return ResponseBuilder::new().status(400).finalize();
                }
            }
        } else {
            Value::Object(Default::default())
        };

        let headers = collect_headers(&parts.headers);
        let cookies = headers
            .get("cookie")
            .map(|raw| parse_cookies(raw))
            .unwrap_or_default();

        let ctx = RequestContext {
            params: extract_params(route.pattern(), path),
            query: parse_query(query),
            cookies,
            body,
            headers,
            auth: None,
            method: method.clone(),
            path: path.to_string(),
        };

        let builder = match self.run(route.handler(), ctx).await {
            Ok(reply) => reply.into_response_builder(),
            Err(failure) => self.resolve_failure(&method, path, failure).await,
        };

        tracing::debug!(
            method = %method,
            path = %path,
            route = %route_label,
            status = builder.status_code(),
            "Request completed"
        );
        metrics::record_request(&method, builder.status_code(), route_label, start);
        builder.finalize()
    }

    async fn run(&self, handler: &SharedHandler, mut ctx: RequestContext) -> Result<Reply, Failure> {
        if let Some(hook) = &self.auth {
            let cookies = ctx.cookies.clone();
            ctx.auth = Some(guarded(|| hook.authenticate(cookies)).await?);
        }
        guarded(|| handler.invoke(ctx)).await
    }

    async fn resolve_failure(&self, method: &str, path: &str, failure: Failure) -> ResponseBuilder {
        let error = match failure {
            Failure::Error(error) => error,
            Failure::Panic(message) => {
                tracing::error!(method = %method, path = %path, panic = %message, "Handler panicked");
                return internal_error();
            }
        };

        let Some(entry) = self.errors.find(&error) else {
            tracing::error!(method = %method, path = %path, error = ?error, "Unhandled handler error");
            return internal_error();
        };

        tracing::error!(
            method = %method,
            path = %path,
            error_type = entry.type_name(),
            error = ?error,
            "Handler failed, applying error mapping"
        );

        match guarded(|| entry.recover(error)).await {
            Ok(builder) => builder,
            Err(Failure::Error(e)) => {
                tracing::error!(method = %method, path = %path, error = ?e, "Error recovery failed");
                internal_error()
            }
            Err(Failure::Panic(message)) => {
                tracing::error!(method = %method, path = %path, panic = %message, "Error recovery panicked");
                internal_error()
            }
        }
    }
}

/// Fixed response for unrecoverable failures: 500 with `{}`.
fn internal_error() -> ResponseBuilder {
    ResponseBuilder::new().status(500)
}

/// Start and await a fallible future, containing panics in either phase.
async fn guarded<T, S>(start: S) -> Result<T, Failure>
where
    S: FnOnce() -> BoxFuture<'static, Result<T, HandlerError>>,
{
    let future = std::panic::catch_unwind(AssertUnwindSafe(start))
        .map_err(|payload| Failure::Panic(panic_message(payload.as_ref())))?;

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(Failure::Error(error)),
        Err(payload) => Err(Failure::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Collects routes, error mappings and the auth hook before serving.
pub struct DispatcherBuilder {
    routes: RouteTable<SharedHandler>,
    errors: ErrorRegistry,
    auth: Option<Arc<dyn AuthHook>>,
    max_body_size: usize,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self {
            routes: RouteTable::new(),
            errors: ErrorRegistry::new(),
            auth: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl DispatcherBuilder {
    /// Register a handler for `method` and `pattern`.
    pub fn route<F, Fut, R>(mut self, method: &str, pattern: &str, handler: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.routes.insert(method, pattern, Arc::new(handler));
        self
    }

    pub fn get<F, Fut, R>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route("GET", pattern, handler)
    }

    pub fn post<F, Fut, R>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route("POST", pattern, handler)
    }

    pub fn put<F, Fut, R>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route("PUT", pattern, handler)
    }

    pub fn delete<F, Fut, R>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route("DELETE", pattern, handler)
    }

    /// Register a group of routes sharing a root prefix.
    ///
    /// Each full pattern is `root` followed directly by the route's path.
    pub fn resource(mut self, root: &str, define: impl FnOnce(&mut Resource<'_>)) -> Self {
        let mut resource = Resource {
            root: root.to_string(),
            routes: &mut self.routes,
        };
        define(&mut resource);
        self
    }

    /// Map handler errors of type `E` to a recovery function.
    pub fn on_error<E, F, Fut, R>(mut self, recover: F) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<ResponseBuilder>,
    {
        self.errors.register(recover);
        self
    }

    /// Install the auth hook, replacing any previous one.
    pub fn auth<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Cookies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        if self.auth.is_some() {
            tracing::warn!("Replacing previously installed auth hook");
        }
        self.auth = Some(Arc::new(hook));
        self
    }

    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }

    /// Freeze everything into a dispatcher.
    pub fn build(self) -> Dispatcher {
        for route in self.routes.routes() {
            tracing::debug!(method = %route.method(), pattern = %route.pattern(), "Route registered");
        }
        tracing::info!(
            routes = self.routes.len(),
            error_mappings = self.errors.len(),
            auth_hook = self.auth.is_some(),
            "Dispatcher ready"
        );

        Dispatcher {
            routes: self.routes,
            errors: self.errors,
            auth: self.auth,
            max_body_size: self.max_body_size,
        }
    }
}

/// Route group under a common root, see [`DispatcherBuilder::resource`].
pub struct Resource<'a> {
    root: String,
    routes: &'a mut RouteTable<SharedHandler>,
}

impl Resource<'_> {
    pub fn route<F, Fut, R>(&mut self, method: &str, path: &str, handler: F) -> &mut Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<Reply>,
    {
        let full = format!("{}{}", self.root, path);
        self.routes.insert(method, &full, Arc::new(handler));
        self
    }

    pub fn get<F, Fut, R>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route("GET", path, handler)
    }

    pub fn post<F, Fut, R>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route("POST", path, handler)
    }

    pub fn put<F, Fut, R>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route("PUT", path, handler)
    }
}
