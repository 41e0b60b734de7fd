//! Error-type to recovery mapping.
//!
//! # Responsibilities
//! - Hold recovery functions keyed by concrete error type
//! - Find the first entry accepting a handler error
//!
//! # Design Decisions
//! - Matching is by type identity (`anyhow::Error::is`), not by subtyping
//! - First registered wins; there is no "most specific" ranking
//! - Read-only once the dispatcher is built

use std::any::type_name;
use std::fmt;
use std::future::Future;

use futures_util::future::{self, BoxFuture, FutureExt};

use crate::dispatch::handler::HandlerError;
use crate::http::response::ResponseBuilder;

type RecoverFn =
    dyn Fn(HandlerError) -> BoxFuture<'static, Result<ResponseBuilder, HandlerError>> + Send + Sync;

/// One `(error type, recovery)` pair.
pub struct ErrorEntry {
    type_name: &'static str,
    accepts: fn(&HandlerError) -> bool,
    recover: Box<RecoverFn>,
}

impl ErrorEntry {
    /// Name of the error type this entry handles.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn accepts(&self, error: &HandlerError) -> bool {
        (self.accepts)(error)
    }

    /// Run the recovery function on an error this entry accepts.
    pub fn recover(&self, error: HandlerError) -> BoxFuture<'static, Result<ResponseBuilder, HandlerError>> {
        (self.recover)(error)
    }
}

impl fmt::Debug for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorEntry")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Ordered error-type mappings.
#[derive(Debug, Default)]
pub struct ErrorRegistry {
    entries: Vec<ErrorEntry>,
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map errors of type `E` to `recover`.
    ///
    /// `recover` receives the error by value and returns anything that
    /// converts into a [`ResponseBuilder`], such as `(status, body)`.
    pub fn register<E, F, Fut, R>(&mut self, recover: F)
    where
        E: std::error::Error + Send + Sync + 'static,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<ResponseBuilder>,
    {
        let recover = move |error: HandlerError| -> BoxFuture<'static, Result<ResponseBuilder, HandlerError>> {
            match error.downcast::<E>() {
                Ok(typed) => recover(typed).map(|res| res.map(Into::into)).boxed(),
                // Only reachable if called without checking `accepts` first.
                Err(other) => future::ready(Err(other)).boxed(),
            }
        };

        self.entries.push(ErrorEntry {
            type_name: type_name::<E>(),
            accepts: is_type::<E>,
            recover: Box::new(recover),
        });
    }

    /// First entry whose type matches `error`.
    pub fn find(&self, error: &HandlerError) -> Option<&ErrorEntry> {
        self.entries.iter().find(|entry| entry.accepts(error))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_type<E>(error: &HandlerError) -> bool
where
    E: std::error::Error + Send + Sync + 'static,
{
    error.is::<E>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("not allowed")]
    struct Forbidden;

    #[derive(Debug, Error)]
    #[error("missing {0}")]
    struct Missing(String);

    #[tokio::test]
    async fn test_find_by_type() {
        let mut registry = ErrorRegistry::new();
        registry.register(|_: Forbidden| async { Ok::<_, HandlerError>((403u16, json!({}))) });
        registry.register(|e: Missing| async move {
            Ok::<_, HandlerError>((404u16, json!({ "missing": e.0 })))
        });

        let error = HandlerError::new(Missing("pet".into()));
        let entry = registry.find(&error).expect("entry for Missing");
        assert!(entry.type_name().ends_with("Missing"));

        let builder = entry.recover(error).await.unwrap();
        assert_eq!(builder.status_code(), 404);
        assert_eq!(builder.body_value(), &json!({"missing": "pet"}));
    }

    #[tokio::test]
    async fn test_first_registered_wins() {
        let mut registry = ErrorRegistry::new();
        registry.register(|_: Forbidden| async { Ok::<_, HandlerError>((401u16, json!("first"))) });
        registry.register(|_: Forbidden| async { Ok::<_, HandlerError>((403u16, json!("second"))) });

        let error = HandlerError::new(Forbidden);
        let builder = registry.find(&error).unwrap().recover(error).await.unwrap();
        assert_eq!(builder.status_code(), 401);
    }

    #[test]
    fn test_unmapped_type_is_not_found() {
        let mut registry = ErrorRegistry::new();
        registry.register(|_: Forbidden| async { Ok::<_, HandlerError>((403u16, json!({}))) });

        assert!(registry.find(&HandlerError::new(Missing("x".into()))).is_none());
        assert!(registry.find(&anyhow::anyhow!("plain message")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_recovery_can_return_builder() {
        let mut registry = ErrorRegistry::new();
        registry.register(|_: Forbidden| async {
            Ok::<_, HandlerError>(ResponseBuilder::new().status(302).header("location", "/login"))
        });

        let error = HandlerError::new(Forbidden);
        let builder = registry.find(&error).unwrap().recover(error).await.unwrap();
        assert_eq!(builder.header_value("location"), Some("/login"));
    }
}
