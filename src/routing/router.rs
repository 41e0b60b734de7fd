//! Route lookup.
//!
//! # Responsibilities
//! - Store registered routes in registration order
//! - Look up the best route for a method and path
//! - Return the matched route or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (shared across requests without locks)
//! - Methods are normalized to upper case on both sides
//! - O(n) scan over routes (acceptable for typical route counts)
//! - Highest score wins; ties go to the earliest registration

use crate::routing::matcher::{fits, score};
use crate::routing::pattern::Pattern;

/// Normalize an HTTP method name for comparison.
pub fn normalize_method(method: &str) -> String {
    method.trim().to_ascii_uppercase()
}

/// A single registered route.
#[derive(Debug, Clone)]
pub struct Route<H> {
    method: String,
    pattern: Pattern,
    handler: H,
    index: usize,
}

impl<H> Route<H> {
    /// Upper-cased HTTP method.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Position in registration order, starting at zero.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Ordered collection of routes.
#[derive(Debug, Clone)]
pub struct RouteTable<H> {
    routes: Vec<Route<H>>,
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. Only called while the table is still being built.
    pub fn insert(&mut self, method: &str, pattern: &str, handler: H) {
        let index = self.routes.len();
        self.routes.push(Route {
            method: normalize_method(method),
            pattern: Pattern::parse(pattern),
            handler,
            index,
        });
    }

    /// Find the most specific route for `method` and `path`.
    ///
    /// `path` must not include the query string.
    pub fn resolve(&self, method: &str, path: &str) -> Option<&Route<H>> {
        let method = normalize_method(method);

        let mut best: Option<(&Route<H>, usize)> = None;
        for route in self
            .routes
            .iter()
            .filter(|r| r.method == method && fits(&r.pattern, path))
        {
            let candidate = score(&route.pattern, path);
            // Strictly greater keeps the earlier route on ties.
            if best.map_or(true, |(_, top)| candidate > top) {
                best = Some((route, candidate));
            }
        }

        best.map(|(route, _)| route)
    }

    pub fn routes(&self) -> &[Route<H>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
