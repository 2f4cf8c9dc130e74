//! Error handling for the router and request cache
//!
//! Provides the outcome type for navigation attempts and the typed failure
//! surfaced by the request cache. An unmatched path is control flow, not an
//! error: it resolves to a 404 handler or a fallback redirect and is reported
//! as a [`NavigationResult`] variant, never as `Err`.

use thiserror::Error;

// ============================================================================
// Navigation Result Types
// ============================================================================

/// Result of a navigation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationResult {
    /// Navigation succeeded and the matched handler ran
    Success { path: String },
    /// No route matched; the not-found handler ran (if one was set)
    NotFound { path: String },
    /// No route matched and the router redirected to its fallback path
    Redirected { from: String, to: String },
    /// The matched handler returned an error; the location is still updated
    HandlerFailed { path: String, message: String },
    /// Navigation was issued from inside a handler and queued for later
    Queued { path: String },
}

impl NavigationResult {
    /// Check if navigation was successful
    pub fn is_success(&self) -> bool {
        matches!(self, NavigationResult::Success { .. })
    }

    /// Check if route was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, NavigationResult::NotFound { .. })
    }

    /// Check if navigation was redirected to the fallback path
    pub fn is_redirected(&self) -> bool {
        matches!(self, NavigationResult::Redirected { .. })
    }

    /// Check if the handler failed during invocation
    pub fn is_handler_failed(&self) -> bool {
        matches!(self, NavigationResult::HandlerFailed { .. })
    }

    /// Check if the navigation was queued behind an in-progress dispatch
    pub fn is_queued(&self) -> bool {
        matches!(self, NavigationResult::Queued { .. })
    }

    /// Get the fallback target if this navigation was redirected
    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            NavigationResult::Redirected { to, .. } => Some(to),
            _ => None,
        }
    }
}

// ============================================================================
// Request Failures
// ============================================================================

/// Typed failure returned across the request-cache boundary
///
/// Loader and request failures are returned to the caller of
/// `fetch`/`mutate`, never thrown across the cache, so UI layers can
/// distinguish "stale but displayable" from "hard failure with no data".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// A `fetch`/`prefetch` loader failed
    #[error("loader failed: {0}")]
    Loader(String),

    /// A mutation request was rejected by the remote resource
    #[error("request failed: {0}")]
    Request(String),

    /// The remote resource has no record for the given target
    #[error("resource not found: {0}")]
    NotFound(String),

    /// A request descriptor carried a body the backend could not use
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// Another optimistic mutation is already in flight for this key
    ///
    /// Overlapping patches on the same entry cannot be rolled back to the
    /// correct intermediate value, so the second mutation is rejected.
    #[error("a mutation is already in flight for key '{0}'")]
    MutationInFlight(String),
}

// ============================================================================
// Tests
// ============================================================================
