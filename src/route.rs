//! Route definition and registration types

use crate::matcher::RoutePattern;
use crate::params::{QueryParams, RouteParams};
use std::rc::Rc;

/// Error type returned by a route handler
///
/// Handler failures are the handler's problem, not the router's: the router
/// catches them at its boundary, logs them, and stays consistent.
pub type HandlerError = Box<dyn std::error::Error>;

/// A bound route handler
///
/// Invoked with the extracted route parameters and the parsed query whenever
/// its route matches a navigation.
pub type RouteHandler = Rc<dyn Fn(&RouteParams, &QueryParams) -> Result<(), HandlerError>>;

/// Handler invoked when no route matches the current path
pub type NotFoundHandler = Rc<dyn Fn(&str)>;

/// A route registered with the router
///
/// Created at setup time and never mutated; the route table is append-only
/// for the lifetime of the router.
#[derive(Clone)]
pub struct RegisteredRoute {
    /// The original pattern string (e.g. "/items/:id")
    pub pattern: String,
    /// Compiled matcher for the pattern
    pub matcher: RoutePattern,
    /// Handler bound to this route
    pub handler: RouteHandler,
    /// Optional title, for "active route" UI markers
    pub title: Option<String>,
}

impl RegisteredRoute {
    /// Compile a pattern and bind it to a handler
    pub fn new(pattern: impl Into<String>, handler: RouteHandler, title: Option<String>) -> Self {
        let pattern = pattern.into();
        let matcher = RoutePattern::compile(&pattern);
        Self {
            pattern,
            matcher,
            handler,
            title,
        }
    }
}

impl std::fmt::Debug for RegisteredRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredRoute")
            .field("pattern", &self.pattern)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Route Validation
// ============================================================================

/// Validate a route path pattern
///
/// Returns an error message if the path is invalid.
///
/// # Validation Rules
///
/// - No consecutive slashes ('//')
/// - Parameter names must be non-empty, alphanumeric or underscore
/// - No duplicate parameter names
/// - At most one wildcard, and only as the final segment
pub fn validate_route_path(path: &str) -> Result<(), String> {
    if path.contains("//") {
        return Err("Route path cannot contain consecutive slashes".to_string());
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let mut param_names = std::collections::HashSet::new();
    for (idx, segment) in segments.iter().enumerate() {
        if *segment == "*" {
            if idx != segments.len() - 1 {
                return Err("Wildcard segment must be the final segment".to_string());
            }
            continue;
        }

        if let Some(param) = segment.strip_prefix(':') {
            if param.is_empty() {
                return Err("Route parameter name cannot be empty".to_string());
            }

            if !param.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(format!(
                    "Route parameter '{}' must contain only alphanumeric characters and underscores",
                    param
                ));
            }

            if !param_names.insert(param.to_string()) {
                return Err(format!("Duplicate route parameter: '{}'", param));
            }
        }
    }

    Ok(())
}
