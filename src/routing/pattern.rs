//! Route path templates.
//!
//! # Responsibilities
//! - Parse a raw template such as `/users/:id` into segments
//! - Distinguish literal segments from named parameters
//!
//! # Design Decisions
//! - Parsing never fails; odd input yields odd (but well-defined) segments
//! - A single leading and a single trailing `/` are ignored
//! - Empty segments from `//` are kept as empty literals

use std::fmt;

/// Marker that turns a segment into a named parameter.
pub const PARAM_MARKER: char = ':';

/// Path separator shared by templates and incoming paths.
pub const SEPARATOR: char = '/';

/// One component of a [`Pattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the incoming segment exactly.
    Literal(String),
    /// Captures any single incoming segment under this name.
    Param(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix(PARAM_MARKER) {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(raw.to_string()),
        }
    }

    /// Returns true if this is a named parameter.
    pub fn is_param(&self) -> bool {
        matches!(self, Segment::Param(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(text) => f.write_str(text),
            Segment::Param(name) => write!(f, "{PARAM_MARKER}{name}"),
        }
    }
}

/// A parsed route template. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a route template.
    pub fn parse(raw: &str) -> Self {
        let segments = split_path(raw).map(Segment::parse).collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    /// The template as it was registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of all parameters, in template order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split a template or an incoming path into raw segments.
///
/// Strips at most one separator from each end, then splits on every
/// separator. An empty input yields one empty segment.
pub fn split_path(raw: &str) -> std::str::Split<'_, char> {
    let trimmed = raw.strip_prefix(SEPARATOR).unwrap_or(raw);
    let trimmed = trimmed.strip_suffix(SEPARATOR).unwrap_or(trimmed);
    trimmed.split(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Segment {
        Segment::Literal(s.to_string())
    }

    fn param(s: &str) -> Segment {
        Segment::Param(s.to_string())
    }

    #[test]
    fn test_parse_literals_and_params() {
        let pattern = Pattern::parse("/users/:id/posts");
        assert_eq!(pattern.segments(), &[lit("users"), param("id"), lit("posts")]);
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(pattern.as_str(), "/users/:id/posts");
    }

    #[test]
    fn test_parse_strips_single_separator_each_side() {
        assert_eq!(Pattern::parse("a/b/").segments(), &[lit("a"), lit("b")]);
        assert_eq!(
            Pattern::parse("//a//").segments(),
            &[lit(""), lit("a"), lit("")]
        );
    }

    #[test]
    fn test_parse_root_is_single_empty_literal() {
        assert_eq!(Pattern::parse("/").segments(), &[lit("")]);
        assert_eq!(Pattern::parse("").segments(), &[lit("")]);
    }

    #[test]
    fn test_bare_marker_is_unnamed_param() {
        assert_eq!(Pattern::parse("/a/:").segments(), &[lit("a"), param("")]);
    }

    #[test]
    fn test_segment_display_round_trips() {
        let pattern = Pattern::parse("/v1/:name/:age");
        let rendered: Vec<String> = pattern.segments().iter().map(|s| s.to_string()).collect();
        assert_eq!(rendered.join("/"), "v1/:name/:age");
    }
}
