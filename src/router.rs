//! Router: route table, current location, and navigation dispatch
//!
//! The router owns the registered route table and the pair of
//! `current_location` + `current_match`, which are always updated together.
//! Navigation runs a parse-match-invoke sequence that is atomic with respect
//! to subsequent navigations: a navigation issued synchronously from inside a
//! route handler is queued and applied after the current dispatch completes,
//! never interleaved.
//!
//! An unmatched path is a defined control-flow outcome, not an error: the
//! registered not-found handler runs, or the router redirects to its
//! configured fallback path. A handler that fails is caught at the router
//! boundary and logged; the location stays updated and the router stays
//! consistent.

use crate::error::NavigationResult;
use crate::history::{History, NavigationSource};
use crate::params::{QueryParams, RouteParams};
use crate::route::{
    validate_route_path, HandlerError, NotFoundHandler, RegisteredRoute, RouteHandler,
};
use crate::{warn_log, NavigationDirection, RouteChangeEvent, RouteMatch};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

// ============================================================================
// Location
// ============================================================================

/// A parsed location: path plus query
///
/// Derived from the navigable source on every change; ephemeral except as the
/// router's `current_location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Path portion of the location (raw, decoded per segment at match time)
    pub path: String,
    /// Parsed query parameters
    pub query: QueryParams,
}

impl Location {
    /// Parse a location string into path and query
    pub fn parse(location: &str) -> Self {
        let (path, query) = match location.split_once('?') {
            Some((path, query)) => (path, QueryParams::from_query_string(query)),
            None => (location, QueryParams::new()),
        };

        Self {
            path: path.to_string(),
            query,
        }
    }

    /// Serialize back to a location string with the canonical query encoding
    pub fn to_location_string(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query.to_query_string())
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Listener invoked after every applied navigation
pub type ChangeListener = Rc<dyn Fn(&RouteChangeEvent)>;

/// The resolved pair of location and match
///
/// Stored as one value so a navigation updates both or neither.
#[derive(Debug, Clone)]
struct Resolved {
    location: Location,
    matched: Option<RouteMatch>,
}

/// A navigation waiting behind an in-progress dispatch
enum NavRequest {
    Goto { location: String, replace: bool },
    Back,
    Forward,
    Sync,
}

impl NavRequest {
    fn describe(&self) -> String {
        match self {
            NavRequest::Goto { location, .. } => location.clone(),
            NavRequest::Back => "<back>".to_string(),
            NavRequest::Forward => "<forward>".to_string(),
            NavRequest::Sync => "<sync>".to_string(),
        }
    }
}

/// What to run once the match is resolved and borrows are released
enum Dispatch {
    Handler(RouteHandler, RouteParams, QueryParams),
    NotFound(NotFoundHandler),
    Fallback(String),
    Unhandled,
}

struct RouterInner {
    routes: Vec<RegisteredRoute>,
    source: Box<dyn NavigationSource>,
    resolved: Option<Resolved>,
    not_found: Option<NotFoundHandler>,
    fallback_path: Option<String>,
    on_change: Option<ChangeListener>,
    dispatching: bool,
    queued: VecDeque<NavRequest>,
}

/// Client-side router over an injected navigable source
///
/// Cheap to clone; clones share the same route table and location state, so
/// handlers can capture a `Router` and navigate from inside a dispatch.
///
/// # Example
///
/// ```
/// use pagekit::Router;
///
/// let router = Router::new();
/// router.add_route("/items", |_params, _query| Ok(()));
/// router.add_route("/items/:id", |params, _query| {
///     assert_eq!(params.get("id"), Some(&"7".to_string()));
///     Ok(())
/// });
///
/// let result = router.navigate("/items/7");
/// assert!(result.is_success());
/// ```
#[derive(Clone)]
pub struct Router {
    inner: Rc<RefCell<RouterInner>>,
}

impl Router {
    /// Create a router over an in-memory history starting at "/"
    pub fn new() -> Self {
        Self::with_source(Box::new(History::default()))
    }

    /// Create a router over a custom navigable source
    pub fn with_source(source: Box<dyn NavigationSource>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RouterInner {
                routes: Vec::new(),
                source,
                resolved: None,
                not_found: None,
                fallback_path: None,
                on_change: None,
                dispatching: false,
                queued: VecDeque::new(),
            })),
        }
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Register a route
    ///
    /// Routes are matched in registration order and the first match wins, so
    /// register more specific routes before parameterized ones that would
    /// shadow them. Duplicate patterns are legal; the first one wins.
    ///
    /// # Panics
    ///
    /// Panics if the pattern fails [`validate_route_path`].
    pub fn add_route<F>(&self, pattern: impl Into<String>, handler: F) -> &Self
    where
        F: Fn(&RouteParams, &QueryParams) -> Result<(), HandlerError> + 'static,
    {
        self.register(pattern.into(), Rc::new(handler), None)
    }

    /// Register a route with a title for "active route" UI markers
    pub fn add_route_with_title<F>(
        &self,
        pattern: impl Into<String>,
        title: impl Into<String>,
        handler: F,
    ) -> &Self
    where
        F: Fn(&RouteParams, &QueryParams) -> Result<(), HandlerError> + 'static,
    {
        self.register(pattern.into(), Rc::new(handler), Some(title.into()))
    }

    fn register(&self, pattern: String, handler: RouteHandler, title: Option<String>) -> &Self {
        if let Err(e) = validate_route_path(&pattern) {
            panic!("Invalid route path '{}': {}", pattern, e);
        }
        crate::trace_log!("registering route '{}'", pattern);
        self.inner
            .borrow_mut()
            .routes
            .push(RegisteredRoute::new(pattern, handler, title));
        self
    }

    /// Set the handler invoked when no route matches
    pub fn on_not_found(&self, handler: impl Fn(&str) + 'static) -> &Self {
        self.inner.borrow_mut().not_found = Some(Rc::new(handler));
        self
    }

    /// Set the path to redirect to when no route matches and no
    /// not-found handler is registered
    pub fn set_fallback(&self, path: impl Into<String>) -> &Self {
        self.inner.borrow_mut().fallback_path = Some(path.into());
        self
    }

    /// Set a listener fired after every applied navigation
    pub fn on_change(&self, listener: impl Fn(&RouteChangeEvent) + 'static) -> &Self {
        self.inner.borrow_mut().on_change = Some(Rc::new(listener));
        self
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Resolve the source's current location without touching history
    ///
    /// Call once after registering routes to leave the `Idle` state.
    pub fn start(&self) -> NavigationResult {
        self.apply(NavRequest::Sync)
            .expect("sync navigation always yields a result")
    }

    /// Navigate to a path with no query, creating a history entry
    pub fn navigate(&self, path: &str) -> NavigationResult {
        self.navigate_to(path, QueryParams::new(), false)
    }

    /// Navigate to a path plus query
    ///
    /// The location string is built with the canonical query encoding. With
    /// `replace` the current history entry is replaced instead of pushed.
    pub fn navigate_to(&self, path: &str, query: QueryParams, replace: bool) -> NavigationResult {
        let location = Location {
            path: path.to_string(),
            query,
        }
        .to_location_string();

        self.apply(NavRequest::Goto { location, replace })
            .expect("goto navigation always yields a result")
    }

    /// Recompute the query for the current path and replace-navigate to it
    ///
    /// With `merge` the partial entries are laid over the current query;
    /// otherwise they replace it entirely. An empty value removes its key, so
    /// cleared filters disappear from the location rather than lingering as
    /// `key=`. This is just a convenience constructor for `navigate_to`; it
    /// triggers the same dispatch as any other navigation.
    pub fn update_query<I>(&self, partial: I, merge: bool) -> NavigationResult
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let (path, base) = {
            let inner = self.inner.borrow();
            match &inner.resolved {
                Some(resolved) => (
                    resolved.location.path.clone(),
                    resolved.location.query.clone(),
                ),
                None => {
                    let location = Location::parse(inner.source.current_location());
                    (location.path, location.query)
                }
            }
        };

        let mut query = if merge { base } else { QueryParams::new() };
        for (key, value) in partial {
            query.insert(key, value);
        }

        self.navigate_to(&path, query, true)
    }

    /// Go back in history and re-dispatch, if possible
    pub fn back(&self) -> Option<NavigationResult> {
        self.apply(NavRequest::Back)
    }

    /// Go forward in history and re-dispatch, if possible
    pub fn forward(&self) -> Option<NavigationResult> {
        self.apply(NavRequest::Forward)
    }

    /// Feed an externally triggered location change into the router
    ///
    /// For sources with an outside edit channel (a hash fragment, a deep
    /// link). The change is recorded as a new history entry and dispatched
    /// like any other navigation.
    pub fn handle_external_change(&self, location: &str) -> NavigationResult {
        self.apply(NavRequest::Goto {
            location: location.to_string(),
            replace: false,
        })
        .expect("goto navigation always yields a result")
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Current parsed location, if the router has resolved one
    pub fn current_location(&self) -> Option<Location> {
        self.inner
            .borrow()
            .resolved
            .as_ref()
            .map(|r| r.location.clone())
    }

    /// Current match, if the router has resolved one and it matched
    pub fn current_match(&self) -> Option<RouteMatch> {
        self.inner
            .borrow()
            .resolved
            .as_ref()
            .and_then(|r| r.matched.clone())
    }

    /// Title of the active route, if any
    pub fn active_title(&self) -> Option<String> {
        self.current_match().and_then(|m| m.title)
    }

    /// Check if back navigation is possible
    pub fn can_go_back(&self) -> bool {
        self.inner.borrow().source.can_go_back()
    }

    /// Check if forward navigation is possible
    pub fn can_go_forward(&self) -> bool {
        self.inner.borrow().source.can_go_forward()
    }

    /// Number of registered routes
    pub fn route_count(&self) -> usize {
        self.inner.borrow().routes.len()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn apply(&self, request: NavRequest) -> Option<NavigationResult> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.dispatching {
                let path = request.describe();
                crate::trace_log!("queueing navigation to '{}' behind active dispatch", path);
                inner.queued.push_back(request);
                return Some(NavigationResult::Queued { path });
            }
            inner.dispatching = true;
        }

        let first = self.dispatch_one(request);

        // Run navigations queued by handlers, in the order they were issued.
        // `dispatching` stays set so nested requests keep queueing.
        loop {
            let next = self.inner.borrow_mut().queued.pop_front();
            match next {
                Some(request) => {
                    if let Some(result) = self.dispatch_one(request) {
                        crate::debug_log!("queued navigation applied: {:?}", result);
                    }
                }
                None => break,
            }
        }

        self.inner.borrow_mut().dispatching = false;
        first
    }

    /// One parse-match-invoke pass; callbacks run with no borrow held
    fn dispatch_one(&self, request: NavRequest) -> Option<NavigationResult> {
        let (location_str, event) = {
            let mut inner = self.inner.borrow_mut();
            let event = match &request {
                NavRequest::Goto { location, replace } => {
                    if *replace {
                        inner.source.replace(location.clone())
                    } else {
                        inner.source.push(location.clone())
                    }
                }
                NavRequest::Back => inner.source.back()?,
                NavRequest::Forward => inner.source.forward()?,
                NavRequest::Sync => RouteChangeEvent {
                    from: None,
                    to: inner.source.current_location().to_string(),
                    direction: NavigationDirection::Forward,
                },
            };
            (inner.source.current_location().to_string(), event)
        };

        crate::debug_log!("dispatching navigation to '{}'", location_str);
        let location = Location::parse(&location_str);

        let (dispatch, listener) = {
            let mut inner = self.inner.borrow_mut();

            let matched = inner.routes.iter().find_map(|route| {
                route
                    .matcher
                    .matches(&location.path)
                    .map(|params| (route.clone(), RouteParams::from_map(params)))
            });

            match matched {
                Some((route, params)) => {
                    let route_match = RouteMatch {
                        pattern: route.pattern.clone(),
                        title: route.title.clone(),
                        params: params.clone(),
                        query: location.query.clone(),
                    };
                    inner.resolved = Some(Resolved {
                        location: location.clone(),
                        matched: Some(route_match),
                    });
                    (
                        Dispatch::Handler(route.handler.clone(), params, location.query.clone()),
                        inner.on_change.clone(),
                    )
                }
                None => {
                    inner.resolved = Some(Resolved {
                        location: location.clone(),
                        matched: None,
                    });
                    let dispatch = if let Some(not_found) = inner.not_found.clone() {
                        Dispatch::NotFound(not_found)
                    } else if let Some(fallback) = inner.fallback_path.clone() {
                        Dispatch::Fallback(fallback)
                    } else {
                        Dispatch::Unhandled
                    };
                    (dispatch, inner.on_change.clone())
                }
            }
        };

        if let Some(listener) = listener {
            listener(&event);
        }

        let result = match dispatch {
            Dispatch::Handler(handler, params, query) => match handler(&params, &query) {
                Ok(()) => NavigationResult::Success {
                    path: location_str.clone(),
                },
                Err(e) => {
                    warn_log!("handler failed for '{}': {}", location_str, e);
                    NavigationResult::HandlerFailed {
                        path: location_str.clone(),
                        message: e.to_string(),
                    }
                }
            },
            Dispatch::NotFound(not_found) => {
                not_found(&location.path);
                NavigationResult::NotFound {
                    path: location_str.clone(),
                }
            }
            Dispatch::Fallback(fallback) => {
                // Self-referential fallbacks would loop forever
                if fallback == location.path {
                    warn_log!("fallback path '{}' is itself unregistered", fallback);
                    NavigationResult::NotFound {
                        path: location_str.clone(),
                    }
                } else {
                    crate::debug_log!("no match for '{}', redirecting to '{}'", location.path, fallback);
                    let _ = self.dispatch_one(NavRequest::Goto {
                        location: fallback.clone(),
                        replace: true,
                    });
                    NavigationResult::Redirected {
                        from: location_str.clone(),
                        to: fallback,
                    }
                }
            }
            Dispatch::Unhandled => {
                warn_log!("no route matched '{}' and no fallback configured", location.path);
                NavigationResult::NotFound {
                    path: location_str.clone(),
                }
            }
        };

        Some(result)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
