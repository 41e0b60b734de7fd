//! Response building and finalization.
//!
//! # Responsibilities
//! - Describe status, headers and JSON body to emit
//! - Merge headers (later values overwrite same-named keys)
//! - Serialize into a transport response exactly once
//!
//! # Design Decisions
//! - `finalize` consumes the builder, so a response cannot be written twice
//! - `content-type: application/json` is set on every JSON response
//! - Invalid header names/values are dropped with a warning, not a panic

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

/// Media type written on every JSON response.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Chainable description of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseBuilder {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Value,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self {
            status: 200,
            headers: BTreeMap::new(),
            body: Value::Object(Default::default()),
        }
    }
}

impl ResponseBuilder {
    /// Status 200, no headers, body `{}`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set one header. Names are case-insensitive.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Merge several headers, overwriting same-named ones.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self = self.header(name, value);
        }
        self
    }

    /// Replace the body entirely.
    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Replace the body with any serializable value.
    pub fn json<T: Serialize>(self, body: &T) -> Result<Self, serde_json::Error> {
        Ok(self.body(serde_json::to_value(body)?))
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn body_value(&self) -> &Value {
        &self.body
    }

    /// Turn the description into a transport response.
    pub fn finalize(self) -> Response<Body> {
        let (status, body) = match StatusCode::from_u16(self.status) {
            Ok(status) => (status, self.body),
            Err(_) => {
                tracing::warn!(status = self.status, "Invalid status code, sending 500");
                (StatusCode::INTERNAL_SERVER_ERROR, Value::Object(Default::default()))
            }
        };

        let payload = match serde_json::to_vec(&body) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                b"{}".to_vec()
            }
        };

        let mut response = Response::new(Body::from(payload));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping invalid response header"),
            }
        }
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        );

        response
    }
}

impl From<(u16, Value)> for ResponseBuilder {
    fn from((status, body): (u16, Value)) -> Self {
        ResponseBuilder::new().status(status).body(body)
    }
}

impl From<(StatusCode, Value)> for ResponseBuilder {
    fn from((status, body): (StatusCode, Value)) -> Self {
        ResponseBuilder::new().status(status.as_u16()).body(body)
    }
}

/// A response with no body at all (used for 404).
pub fn empty(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
