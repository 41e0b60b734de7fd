//! Route-dispatch core for JSON HTTP services.
//!
//! Register handlers against `/path/:param` templates, map error types to
//! responses, and serve everything through one [`Dispatcher`].

pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ServerConfig;
pub use dispatch::{Dispatcher, DispatcherBuilder, HandlerError, Reply};
pub use http::{HttpServer, RequestContext, ResponseBuilder};
pub use lifecycle::Shutdown;
