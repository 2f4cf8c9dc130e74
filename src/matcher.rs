//! Route pattern compilation and path matching
//!
//! A pattern is compiled once into an ordered list of segment specs and then
//! matched against concrete paths. Matching is pure: no state, no side
//! effects.
//!
//! Supported syntax:
//! - Literal segments, matched case-sensitively after percent-decoding
//! - `:name` parameter segments, binding the decoded segment value
//! - A single trailing `*`, capturing the rest of the path under `wildcard`
//!
//! Exact segment counts are required: there are no partial or prefix matches
//! except through the trailing wildcard. Route selection is strictly
//! first-registered-wins, so more specific routes should be registered before
//! parameterized ones that would shadow them.

use crate::params::decode_uri_component;
use std::collections::HashMap;

/// Parameter name under which a trailing wildcard captures the path remainder
pub const WILDCARD_PARAM: &str = "wildcard";

/// A single segment in a compiled route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Static text that must match exactly
    Static(String),
    /// Parameter that captures the segment value
    Param(String),
    /// Trailing wildcard that captures the rest of the path
    Wildcard,
}

impl Segment {
    /// Parse a segment from its pattern text
    ///
    /// Examples:
    /// - "items" -> Static("items")
    /// - ":id" -> Param("id")
    /// - "*" -> Wildcard
    pub fn parse(s: &str) -> Self {
        if s == "*" {
            Segment::Wildcard
        } else if let Some(name) = s.strip_prefix(':') {
            Segment::Param(name.to_string())
        } else {
            Segment::Static(s.to_string())
        }
    }
}

/// A compiled route pattern
///
/// # Example
///
/// ```
/// use pagekit::RoutePattern;
///
/// let pattern = RoutePattern::compile("/items/:id/edit");
/// let params = pattern.matches("/items/42/edit").unwrap();
/// assert_eq!(params.get("id"), Some(&"42".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    /// Pattern segments in order
    segments: Vec<Segment>,
    /// Names of the parameters this pattern binds, in segment order
    param_names: Vec<String>,
}

impl RoutePattern {
    /// Compile a pattern string into a matcher
    ///
    /// Empty leading/trailing segments are discarded, so `/items/`,
    /// `items` and `/items` compile to the same matcher.
    pub fn compile(pattern: &str) -> Self {
        let segments: Vec<Segment> = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect();

        let mut param_names = Vec::new();
        for segment in &segments {
            match segment {
                Segment::Param(name) => param_names.push(name.clone()),
                Segment::Wildcard => param_names.push(WILDCARD_PARAM.to_string()),
                Segment::Static(_) => {}
            }
        }

        Self {
            segments,
            param_names,
        }
    }

    /// Names of the parameters this pattern binds
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Whether the pattern ends in a wildcard segment
    pub fn has_wildcard(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Wildcard))
    }

    /// Match this pattern against a concrete path
    ///
    /// Returns the extracted parameters on a match, `None` otherwise.
    /// Path segments are percent-decoded before comparison and binding.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let path_segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode_uri_component)
            .collect();

        let mut params = HashMap::new();

        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(expected) => {
                    if path_segments.get(idx)? != expected {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = path_segments.get(idx)?;
                    params.insert(name.clone(), value.clone());
                }
                Segment::Wildcard => {
                    // Capture the remainder, including an empty one
                    params.insert(WILDCARD_PARAM.to_string(), path_segments[idx..].join("/"));
                    return Some(params);
                }
            }
        }

        // Every pattern segment matched - the path must be fully consumed
        if path_segments.len() == self.segments.len() {
            Some(params)
        } else {
            None
        }
    }
}
