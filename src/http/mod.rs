//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → [dispatcher resolves route and runs handler]
//!     → request.rs (context: params, query, cookies, body)
//!     → response.rs (status, headers, JSON body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Cookies, QueryMap, RequestContext};
pub use response::ResponseBuilder;
pub use server::{bind, HttpServer, ServerError, X_REQUEST_ID};
