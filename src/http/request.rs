//! Per-request context handed to handlers.
//!
//! # Responsibilities
//! - Split the request target into path and query string
//! - Parse query string and `cookie` header into flat maps
//! - Decode the request body as JSON, degrading to raw text
//! - Bundle params, query, cookies, body, headers and auth result
//!
//! # Design Decisions
//! - Built fresh for every request and owned by it; never shared
//! - Malformed input never fails the request (parsing is lenient)
//! - Duplicate keys: last occurrence wins

use std::collections::{BTreeMap, HashMap};

use axum::http::HeaderMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::routing::Params;

/// Parsed cookie header.
pub type Cookies = BTreeMap<String, String>;

/// Parsed query string.
///
/// Pairs without `=` keep their key with no value. Such keys are left out
/// when the map is serialized to JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMap(BTreeMap<String, Option<String>>);

impl QueryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `key`, if present and given a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    /// True if `key` appeared at all, with or without a value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.0.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }
}

impl Serialize for QueryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let present: Vec<(&String, &String)> = self
            .0
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k, v)))
            .collect();
        let mut map = serializer.serialize_map(Some(present.len()))?;
        for (k, v) in present {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Everything a handler can see about the current request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Upper-cased HTTP method.
    pub method: String,
    /// Request path without the query string.
    pub path: String,
    pub params: Params,
    pub query: QueryMap,
    pub cookies: Cookies,
    /// JSON body, raw text if it did not decode, `{}` for bodiless methods.
    pub body: Value,
    /// Header names are lower case.
    pub headers: HashMap<String, String>,
    /// Value produced by the auth hook, if one is installed.
    pub auth: Option<Value>,
}

impl RequestContext {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// Split a request target into `(path, query)`.
pub fn split_target(target: &str) -> (&str, &str) {
    target.split_once('?').unwrap_or((target, ""))
}

/// Parse a query string (without the leading `?`).
pub fn parse_query(query: &str) -> QueryMap {
    let mut map = QueryMap::new();
    for item in query.split('&').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once('=') {
            Some((key, value)) => map.insert(decode_component(key), Some(decode_component(value))),
            None => map.insert(decode_component(item), None),
        }
    }
    map
}

/// Parse the value of a `cookie` header. Names without a value map to "".
pub fn parse_cookies(header: &str) -> Cookies {
    header
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (name.to_string(), value.to_string())
        })
        .collect()
}

/// Decode a request body as JSON, falling back to the raw text.
pub fn decode_body(bytes: &[u8]) -> Value {
    match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            let raw = String::from_utf8_lossy(bytes).into_owned();
            tracing::debug!(error = %e, body_len = bytes.len(), "Body is not JSON, using raw text");
            Value::String(raw)
        }
    }
}

/// True for methods whose body is read and decoded.
pub fn method_has_body(method: &str) -> bool {
    method == "POST" || method == "PUT"
}

/// Flatten transport headers into a lower-cased string map.
pub fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut out = HashMap::with_capacity(headers.len());
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        // Repeated headers are joined, as most servers present them.
        out.entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_parse_query() {
        let q = parse_query("query1=foo&query2=bar");
        assert_eq!(q.get("query1"), Some("foo"));
        assert_eq!(q.get("query2"), Some("bar"));
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({"query1": "foo", "query2": "bar"})
        );
    }

    #[test]
    fn test_parse_query_empty() {
        assert!(parse_query("").is_empty());
        assert!(parse_query("&& &").is_empty());
        assert_eq!(serde_json::to_value(parse_query("")).unwrap(), json!({}));
    }

    #[test]
    fn test_parse_query_pair_without_value() {
        let q = parse_query("flag&x=1");
        assert!(q.contains_key("flag"));
        assert_eq!(q.get("flag"), None);
        assert_eq!(serde_json::to_value(&q).unwrap(), json!({"x": "1"}));
    }

    #[test]
    fn test_parse_query_last_wins_and_decodes() {
        let q = parse_query("a=1&a=2&name=hello%20world&greet=good+day&eq=x=y");
        assert_eq!(q.get("a"), Some("2"));
        assert_eq!(q.get("name"), Some("hello world"));
        assert_eq!(q.get("greet"), Some("good day"));
        assert_eq!(q.get("eq"), Some("x=y"));
    }

    #[test]
    fn test_parse_cookies() {
        let c = parse_cookies("ANID=OPT_OUT; SID=abc.def; flag; ; 1P_JAR=2020-05-15-23");
        assert_eq!(c.get("ANID").map(String::as_str), Some("OPT_OUT"));
        assert_eq!(c.get("SID").map(String::as_str), Some("abc.def"));
        assert_eq!(c.get("flag").map(String::as_str), Some(""));
        assert_eq!(c.get("1P_JAR").map(String::as_str), Some("2020-05-15-23"));
        assert_eq!(c.len(), 4);
        assert!(parse_cookies("").is_empty());
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(
            decode_body(br#"{"greet":"hello world."}"#),
            json!({"greet": "hello world."})
        );
        assert_eq!(decode_body(b"not json"), json!("not json"));
        assert_eq!(decode_body(b""), json!(""));
    }

    #[test]
    fn test_split_target() {
        assert_eq!(split_target("/a/b?x=1"), ("/a/b", "x=1"));
        assert_eq!(split_target("/a/b"), ("/a/b", ""));
        assert_eq!(split_target("/a?x=1?y"), ("/a", "x=1?y"));
    }

    #[test]
    fn test_collect_headers_lowercases_and_joins() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Trace", HeaderValue::from_static("abc"));
        headers.append("accept", HeaderValue::from_static("a"));
        headers.append("accept", HeaderValue::from_static("b"));
        let map = collect_headers(&headers);
        assert_eq!(map.get("x-trace").map(String::as_str), Some("abc"));
        assert_eq!(map.get("accept").map(String::as_str), Some("a, b"));
    }

    #[test]
    fn test_method_has_body() {
        assert!(method_has_body("POST"));
        assert!(method_has_body("PUT"));
        assert!(!method_has_body("GET"));
        assert!(!method_has_body("DELETE"));
    }
}
