//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Transport request
//!     → dispatcher.rs (resolve route, build context)
//!     → handler.rs (auth hook, then route handler)
//!     → errors.rs (on failure: type-matched recovery, else 500)
//!     → ResponseBuilder::finalize
//! ```

pub mod dispatcher;
pub mod errors;
pub mod handler;

pub use dispatcher::{Dispatcher, DispatcherBuilder, Resource};
pub use errors::ErrorRegistry;
pub use handler::{AuthHook, Handler, HandlerError, Reply};
