//! Route matching logic.
//!
//! # Responsibilities
//! - Decide whether a pattern structurally fits an incoming path
//! - Score fitting patterns by specificity
//! - Extract named parameters from a fitting path
//!
//! # Design Decisions
//! - Pure functions over `(Pattern, path)`; no request types involved
//! - Segment count must match exactly; a parameter absorbs one segment
//! - Literal matches outrank parameter matches when scoring
//! - Path matching is case-sensitive
//! - No regex, no globs

use std::collections::BTreeMap;

use crate::routing::pattern::{split_path, Pattern, Segment};

/// Named parameters bound from an incoming path.
pub type Params = BTreeMap<String, String>;

/// Score awarded for an incoming segment matched by an equal literal.
pub const LITERAL_WEIGHT: usize = 2;

/// Score awarded for an incoming segment absorbed by a parameter.
pub const PARAM_WEIGHT: usize = 1;

/// Returns true if `pattern` structurally fits `path`.
///
/// Segments are aligned up to the longer of the two sides. Every aligned
/// position must be present on both sides and either equal or a parameter.
pub fn fits(pattern: &Pattern, path: &str) -> bool {
    let incoming: Vec<&str> = split_path(path).collect();
    let defined = pattern.segments();
    let len = defined.len().max(incoming.len());

    (0..len).all(|i| match (defined.get(i), incoming.get(i)) {
        (Some(Segment::Literal(text)), Some(seg)) => text == seg,
        (Some(Segment::Param(_)), Some(_)) => true,
        _ => false,
    })
}

/// Specificity of `pattern` against `path`. Higher is more specific.
///
/// Only meaningful for pairs that already [`fits`]. Positions where the
/// incoming path has no segment, or where the pattern disagrees, add nothing.
pub fn score(pattern: &Pattern, path: &str) -> usize {
    let incoming: Vec<&str> = split_path(path).collect();
    let defined = pattern.segments();
    let len = defined.len().max(incoming.len());

    (0..len)
        .map(|i| match (defined.get(i), incoming.get(i)) {
            (Some(Segment::Literal(text)), Some(seg)) if text == seg => LITERAL_WEIGHT,
            (Some(Segment::Param(_)), Some(_)) => PARAM_WEIGHT,
            _ => 0,
        })
        .sum()
}

/// Bind every parameter of `pattern` to its incoming segment.
///
/// Aligns only up to the shorter side, so nothing past the end of the
/// incoming path is ever read. A name repeated in the pattern keeps its
/// last binding.
pub fn extract_params(pattern: &Pattern, path: &str) -> Params {
    pattern
        .segments()
        .iter()
        .zip(split_path(path))
        .filter_map(|(segment, value)| match segment {
            Segment::Param(name) => Some((name.clone(), value.to_string())),
            Segment::Literal(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_substituted_params() {
        let pattern = Pattern::parse("/path3/:name/:age");
        assert!(fits(&pattern, "/path3/taro/23"));
        assert!(fits(&pattern, "path3/taro/23/"));
        assert!(!fits(&pattern, "/path4/taro/23"));
    }

    #[test]
    fn test_fits_rejects_segment_count_mismatch() {
        let pattern = Pattern::parse("/users/:id");
        assert!(!fits(&pattern, "/users"));
        assert!(!fits(&pattern, "/users/1/posts"));
        assert!(!fits(&Pattern::parse("/users"), "/users/1"));
    }

    #[test]
    fn test_fits_empty_segments() {
        assert!(fits(&Pattern::parse("/a//b"), "/a//b"));
        assert!(!fits(&Pattern::parse("/a//b"), "/a/x/b"));
        assert!(fits(&Pattern::parse("/"), "/"));
        assert!(fits(&Pattern::parse("/"), ""));
        // A parameter still needs a segment, even an empty one.
        assert!(fits(&Pattern::parse("/a/:id"), "/a//"));
    }

    #[test]
    fn test_fits_is_case_sensitive() {
        assert!(!fits(&Pattern::parse("/Users"), "/users"));
    }

    #[test]
    fn test_score_prefers_literals() {
        let literal = Pattern::parse("/users/me");
        let param = Pattern::parse("/users/:id");
        assert!(score(&literal, "/users/me") > score(&param, "/users/me"));
        assert_eq!(score(&literal, "/users/me"), 2 * LITERAL_WEIGHT);
        assert_eq!(score(&param, "/users/me"), LITERAL_WEIGHT + PARAM_WEIGHT);
    }

    #[test]
    fn test_score_ignores_missing_incoming_segments() {
        let pattern = Pattern::parse("/a/b/c");
        assert_eq!(score(&pattern, "/a"), LITERAL_WEIGHT);
        assert_eq!(score(&Pattern::parse("/a"), "/a/b/c"), LITERAL_WEIGHT);
    }

    #[test]
    fn test_extract_params() {
        let pattern = Pattern::parse("/path3/:name/:age");
        let params = extract_params(&pattern, "/path3/taro/23");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("name").map(String::as_str), Some("taro"));
        assert_eq!(params.get("age").map(String::as_str), Some("23"));
    }

    #[test]
    fn test_extract_params_stops_at_shorter_side() {
        let pattern = Pattern::parse("/a/:x/:y");
        let params = extract_params(&pattern, "/a/1");
        assert_eq!(params.get("x").map(String::as_str), Some("1"));
        assert!(!params.contains_key("y"));
    }

    #[test]
    fn test_extract_params_last_duplicate_wins() {
        let pattern = Pattern::parse("/org/:id/user/:id");
        let params = extract_params(&pattern, "/org/7/user/42");
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
    }
}
