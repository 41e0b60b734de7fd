//! Handler and auth hook abstractions.
//!
//! Any async closure `Fn(RequestContext) -> Future<Output = Result<_, HandlerError>>`
//! is a [`Handler`]. Both immediate (`async move { Ok(v) }`) and genuinely
//! deferred futures are awaited the same way by the dispatcher.

use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::http::request::{Cookies, RequestContext};
use crate::http::response::ResponseBuilder;

/// Error raised by a handler, auth hook or recovery function.
///
/// The concrete type inside is what the error registry matches on.
pub type HandlerError = anyhow::Error;

/// Successful handler output.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Plain value: sent as status 200 with this JSON body.
    Json(Value),
    /// Fully described response: sent verbatim.
    Response(ResponseBuilder),
}

impl Reply {
    pub fn into_response_builder(self) -> ResponseBuilder {
        match self {
            Reply::Json(value) => ResponseBuilder::new().body(value),
            Reply::Response(builder) => builder,
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

impl From<ResponseBuilder> for Reply {
    fn from(builder: ResponseBuilder) -> Self {
        Reply::Response(builder)
    }
}

/// A route handler.
pub trait Handler: Send + Sync + 'static {
    fn invoke(&self, ctx: RequestContext) -> BoxFuture<'static, Result<Reply, HandlerError>>;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    R: Into<Reply>,
{
    fn invoke(&self, ctx: RequestContext) -> BoxFuture<'static, Result<Reply, HandlerError>> {
        (self)(ctx).map(|res| res.map(Into::into)).boxed()
    }
}

/// Pre-handler hook given the parsed cookies.
///
/// Its value is attached to [`RequestContext::auth`]; its failure goes
/// through the same error resolution as a handler failure.
pub trait AuthHook: Send + Sync + 'static {
    fn authenticate(&self, cookies: Cookies) -> BoxFuture<'static, Result<Value, HandlerError>>;
}

impl<F, Fut> AuthHook for F
where
    F: Fn(Cookies) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    fn authenticate(&self, cookies: Cookies) -> BoxFuture<'static, Result<Value, HandlerError>> {
        (self)(cookies).boxed()
    }
}
