//! Navigable source abstraction and in-memory history
//!
//! The router never talks to a concrete location API. It consumes a
//! [`NavigationSource`]: get the current location string, set it with push or
//! replace semantics, and move through back/forward history. The in-memory
//! [`History`] implementation here is the default source; hosts embed the
//! router behind a hash fragment, a terminal UI, or anything else by
//! implementing the trait and forwarding external changes to
//! `Router::handle_external_change`.

use crate::{NavigationDirection, RouteChangeEvent};

/// Source of truth for the current location string
///
/// A location is a full `path?query` string. Implementations own the history
/// semantics; the router only distinguishes push (new history entry) from
/// replace (no new entry).
pub trait NavigationSource {
    /// Current location string
    fn current_location(&self) -> &str;

    /// Set the location, creating a new history entry
    fn push(&mut self, location: String) -> RouteChangeEvent;

    /// Set the location, replacing the current history entry
    fn replace(&mut self, location: String) -> RouteChangeEvent;

    /// Move one entry back, if possible
    fn back(&mut self) -> Option<RouteChangeEvent>;

    /// Move one entry forward, if possible
    fn forward(&mut self) -> Option<RouteChangeEvent>;

    /// Check if back navigation is possible
    fn can_go_back(&self) -> bool;

    /// Check if forward navigation is possible
    fn can_go_forward(&self) -> bool;
}

/// In-memory navigation history stack
///
/// Pushing truncates any forward history. An optional size limit evicts the
/// oldest entries while keeping the current one reachable.
#[derive(Debug, Clone)]
pub struct History {
    /// History stack of location strings
    entries: Vec<String>,
    /// Current position in history
    current: usize,
    /// Maximum history size (0 = unlimited)
    max_size: usize,
}

impl History {
    /// Create a new history with an initial location
    pub fn new(initial_location: impl Into<String>) -> Self {
        Self {
            entries: vec![initial_location.into()],
            current: 0,
            max_size: 1000, // Default limit
        }
    }

    /// Create with a custom max size
    pub fn with_max_size(initial_location: impl Into<String>, max_size: usize) -> Self {
        Self {
            entries: vec![initial_location.into()],
            current: 0,
            max_size,
        }
    }

    /// Get history length
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if history is empty (never true in practice)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get all entries
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Get current index
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Clear all history, keeping a single initial entry
    pub fn clear(&mut self, initial_location: impl Into<String>) {
        self.entries.clear();
        self.entries.push(initial_location.into());
        self.current = 0;
    }

    /// Enforce maximum size limit
    fn enforce_size_limit(&mut self) {
        if self.max_size > 0 && self.entries.len() > self.max_size {
            let excess = self.entries.len() - self.max_size;
            self.entries.drain(0..excess);
            self.current = self.current.saturating_sub(excess);
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new("/")
    }
}

impl NavigationSource for History {
    fn current_location(&self) -> &str {
        &self.entries[self.current]
    }

    fn push(&mut self, location: String) -> RouteChangeEvent {
        let from = Some(self.current_location().to_string());

        // Remove forward history when pushing
        self.entries.truncate(self.current + 1);

        self.entries.push(location.clone());
        self.current += 1;

        self.enforce_size_limit();

        RouteChangeEvent {
            from,
            to: location,
            direction: NavigationDirection::Forward,
        }
    }

    fn replace(&mut self, location: String) -> RouteChangeEvent {
        let from = Some(self.current_location().to_string());

        self.entries[self.current] = location.clone();

        RouteChangeEvent {
            from,
            to: location,
            direction: NavigationDirection::Replace,
        }
    }

    fn back(&mut self) -> Option<RouteChangeEvent> {
        if self.can_go_back() {
            let from = Some(self.current_location().to_string());
            self.current -= 1;
            let to = self.current_location().to_string();

            Some(RouteChangeEvent {
                from,
                to,
                direction: NavigationDirection::Back,
            })
        } else {
            None
        }
    }

    fn forward(&mut self) -> Option<RouteChangeEvent> {
        if self.can_go_forward() {
            let from = Some(self.current_location().to_string());
            self.current += 1;
            let to = self.current_location().to_string();

            Some(RouteChangeEvent {
                from,
                to,
                direction: NavigationDirection::Forward,
            })
        } else {
            None
        }
    }

    fn can_go_back(&self) -> bool {
        self.current > 0
    }

    fn can_go_forward(&self) -> bool {
        self.current < self.entries.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_creation() {
        let history = History::new("/");
        assert_eq!(history.current_location(), "/");
        assert_eq!(history.len(), 1);
        assert!(!history.can_go_back());
        assert!(!history.can_go_forward());
    }

    #[test]
    fn test_history_push() {
        let mut history = History::new("/");

        history.push("/items".to_string());
        assert_eq!(history.current_location(), "/items");
        assert_eq!(history.len(), 2);
        assert!(history.can_go_back());
        assert!(!history.can_go_forward());

        history.push("/items/123".to_string());
        assert_eq!(history.current_location(), "/items/123");
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_history_back_forward() {
        let mut history = History::new("/");
        history.push("/page1".to_string());
        history.push("/page2".to_string());

        assert_eq!(history.current_location(), "/page2");

        history.back();
        assert_eq!(history.current_location(), "/page1");
        assert!(history.can_go_back());
        assert!(history.can_go_forward());

        history.forward();
        assert_eq!(history.current_location(), "/page2");
        assert!(!history.can_go_forward());
    }

    #[test]
    fn test_history_truncation_on_push() {
        let mut history = History::new("/");
        history.push("/page1".to_string());
        history.push("/page2".to_string());
        history.back();

        assert_eq!(history.current_location(), "/page1");
        assert_eq!(history.len(), 3);

        // Push a new page - should truncate forward history
        history.push("/page3".to_string());
        assert_eq!(history.current_location(), "/page3");
        assert_eq!(history.len(), 3); // /, /page1, /page3
        assert!(!history.can_go_forward());
    }

    #[test]
    fn test_history_replace() {
        let mut history = History::new("/");
        history.push("/page1".to_string());

        history.replace("/page2".to_string());
        assert_eq!(history.current_location(), "/page2");
        assert_eq!(history.len(), 2); // Still 2 entries

        history.back();
        assert_eq!(history.current_location(), "/");
    }

    #[test]
    fn test_history_clear() {
        let mut history = History::new("/");
        history.push("/page1".to_string());
        history.push("/page2".to_string());

        history.clear("/home");
        assert_eq!(history.current_location(), "/home");
        assert_eq!(history.len(), 1);
        assert!(!history.can_go_back());
    }

    #[test]
    fn test_history_max_size() {
        let mut history = History::with_max_size("/", 3);

        history.push("/page1".to_string());
        history.push("/page2".to_string());
        history.push("/page3".to_string()); // Should trigger limit
        history.push("/page4".to_string()); // Should remove oldest

        assert_eq!(history.len(), 3);
        assert_eq!(history.current_location(), "/page4");

        // Oldest entry "/" should be removed
        history.back();
        history.back();
        assert_eq!(history.current_location(), "/page2");
    }

    #[test]
    fn test_navigation_event() {
        let mut history = History::new("/");

        let event = history.push("/items".to_string());
        assert_eq!(event.from, Some("/".to_string()));
        assert_eq!(event.to, "/items");
        assert_eq!(event.direction, NavigationDirection::Forward);

        let event = history.back().unwrap();
        assert_eq!(event.from, Some("/items".to_string()));
        assert_eq!(event.to, "/");
        assert_eq!(event.direction, NavigationDirection::Back);
    }

    #[test]
    fn test_empty_history_boundaries() {
        let mut history = History::new("/");

        assert!(history.back().is_none());
        assert!(history.forward().is_none());
        assert!(!history.can_go_back());
        assert!(!history.can_go_forward());
    }
}
