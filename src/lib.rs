//! # Pagekit
//!
//! A client-side navigation and data toolkit with support for:
//!
//! - **Route Matching** - Pattern matching with `:param` segments and trailing wildcards
//! - **History Navigation** - Push, replace, back and forward over a linear history
//! - **Query Handling** - Canonical query encoding with merge and prune updates
//! - **Observable State** - A cloneable store with synchronous subscriber notification
//! - **Request Caching** - Tag invalidation, optimistic mutations, stale-response rejection
//! - **Error Handling** - Not-found handlers, fallback redirects, fault isolation
//!
//! # Quick Start
//!
//! ```
//! use pagekit::Router;
//!
//! let router = Router::new();
//! router.add_route("/", |_params, _query| Ok(()));
//! router.add_route_with_title("/items/:id", "Item", |params, _query| {
//!     let id = params.get("id").cloned().unwrap_or_default();
//!     println!("showing item {id}");
//!     Ok(())
//! });
//!
//! let result = router.navigate("/items/7");
//! assert!(result.is_success());
//! assert_eq!(router.active_title().as_deref(), Some("Item"));
//! ```
//!
//! # State and Data
//!
//! The store notifies subscribers synchronously after every update:
//!
//! ```
//! use pagekit::Store;
//!
//! let store = Store::new(0u32);
//! let _sub = store.subscribe(|count| println!("count is now {count}"));
//! store.set_state(|count| count + 1);
//! assert_eq!(store.get_state(), 1);
//! ```
//!
//! The request cache wraps async loaders with an LRU entry table:
//!
//! ```
//! use pagekit::RequestCache;
//! use serde_json::json;
//!
//! let cache = RequestCache::new();
//! let data = pollster::block_on(cache.fetch("items", &["Item"], || async {
//!     Ok(json!([{"id": 1}]))
//! }))?;
//! assert_eq!(data[0]["id"], 1);
//! # Ok::<(), pagekit::RequestError>(())
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)

#![doc(html_root_url = "https://docs.rs/pagekit/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Core routing modules
pub mod history;
pub mod matcher;
pub mod params;
pub mod route;
pub mod router;

// Observable state
pub mod app;
pub mod store;

// Remote data
pub mod cache;
pub mod request;

// Error handling
pub mod error;

// Re-export main types for convenient access
pub use app::{AppState, AppStore, Filters, Notification, NotificationKind, Pagination};
pub use cache::{CacheStats, EntryState, RequestCache};
pub use error::{NavigationResult, RequestError};
pub use history::{History, NavigationSource};
pub use matcher::{RoutePattern, WILDCARD_PARAM};
pub use params::{QueryParams, RouteParams};
pub use request::{MemoryClient, Method, RequestDescriptor, ResourceClient};
pub use route::{validate_route_path, HandlerError, NotFoundHandler, RouteHandler};
pub use router::{Location, Router};
pub use store::{Store, Subscription};

/// Route path matching result.
///
/// Snapshot of a resolved navigation: the pattern that won, its optional
/// title, and the extracted path and query parameters. `current_match` on
/// [`Router`] returns the match for the active location.
///
/// # Example
///
/// ```
/// use pagekit::RouteMatch;
///
/// let route_match = RouteMatch::new("/items/:id".to_string())
///     .with_param("id".to_string(), "123".to_string());
///
/// assert_eq!(route_match.params.get("id"), Some(&"123".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The pattern that matched, as registered
    pub pattern: String,
    /// Display title of the matched route, if one was registered
    pub title: Option<String>,
    /// Extracted route parameters (e.g., `:id` -> "123")
    pub params: RouteParams,
    /// Parsed query string parameters
    pub query: QueryParams,
}

impl RouteMatch {
    /// Create a new route match for the given pattern.
    #[must_use]
    pub fn new(pattern: String) -> Self {
        Self {
            pattern,
            title: None,
            params: RouteParams::new(),
            query: QueryParams::new(),
        }
    }

    /// Set the route title.
    #[must_use]
    pub fn with_title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    /// Add a route parameter to the match.
    #[must_use]
    pub fn with_param(mut self, key: String, value: String) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Add a query parameter to the match.
    #[must_use]
    pub fn with_query(mut self, key: String, value: String) -> Self {
        self.query.insert(key, value);
        self
    }
}

/// Navigation direction indicator.
///
/// Distinguishes how the active location was reached, for history management
/// and change listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDirection {
    /// Navigating forward to a new location
    Forward,
    /// Navigating back in history
    Back,
    /// Replacing the current location without affecting history direction
    Replace,
}

/// Event emitted when the location changes.
///
/// Contains the source and destination locations and the direction of
/// navigation.
#[derive(Debug, Clone)]
pub struct RouteChangeEvent {
    /// The previous location (None if this is the first navigation)
    pub from: Option<String>,
    /// The new location being navigated to
    pub to: String,
    /// The direction of navigation
    pub direction: NavigationDirection,
}
