//! Canonical application state and convenience mutators
//!
//! The generic [`Store`](crate::Store) treats state as opaque. This module
//! supplies the state shape a typical list-and-detail application needs
//! (items, current item, loading/error flags, filters, pagination,
//! notifications) and thin mutators over it. Every mutator is expressed as a
//! `set_state` call, so the store's single mutation and notification path is
//! never bypassed.
//!
//! The state derives serde traits so hosts can persist filters, pagination,
//! and the auth token; the wire shape of item records themselves is opaque
//! `serde_json::Value`.

use crate::store::{Store, Subscription};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// List filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub search: String,
    pub category: String,
    pub sort_by: String,
    pub order: String,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: String::new(),
            sort_by: "createdAt".to_string(),
            order: "desc".to_string(),
        }
    }
}

/// List pagination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 12,
            total: 0,
            total_pages: 1,
        }
    }
}

/// Severity of a transient notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

/// A transient notification with a deadline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    /// When this notification is due for removal; not persisted
    #[serde(skip)]
    pub expires_at: Option<Instant>,
}

/// Application state for a list-and-detail page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub items: Vec<Value>,
    pub current_item: Option<Value>,
    pub loading: bool,
    pub error: Option<String>,
    pub filters: Filters,
    pub pagination: Pagination,
    pub notifications: Vec<Notification>,
    pub auth_token: Option<String>,
}

/// Store over [`AppState`] with convenience mutators
///
/// Cheap to clone; clones share state. The underlying generic store remains
/// accessible for `subscribe`/`set_state` when the conveniences don't fit.
#[derive(Clone)]
pub struct AppStore {
    store: Store<AppState>,
    next_notification_id: Rc<Cell<u64>>,
}

impl AppStore {
    /// Create a store with default state
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    /// Create a store with a specific initial state
    pub fn with_state(state: AppState) -> Self {
        Self {
            store: Store::new(state),
            next_notification_id: Rc::new(Cell::new(0)),
        }
    }

    /// The underlying generic store
    pub fn store(&self) -> &Store<AppState> {
        &self.store
    }

    /// Snapshot of the current state
    pub fn get_state(&self) -> AppState {
        self.store.get_state()
    }

    /// Register a subscriber on the underlying store
    pub fn subscribe(&self, subscriber: impl Fn(&AppState) + 'static) -> Subscription<AppState> {
        self.store.subscribe(subscriber)
    }

    /// Compute the next state and notify subscribers
    pub fn set_state(&self, updater: impl FnOnce(&AppState) -> AppState) {
        self.store.set_state(updater);
    }

    // ------------------------------------------------------------------
    // Convenience mutators
    // ------------------------------------------------------------------

    /// Set the loading flag
    pub fn set_loading(&self, loading: bool) {
        self.set_state(|state| AppState {
            loading,
            ..state.clone()
        });
    }

    /// Record an error and stop loading
    pub fn set_error(&self, error: impl Into<String>) {
        let error = error.into();
        self.set_state(|state| AppState {
            error: Some(error),
            loading: false,
            ..state.clone()
        });
    }

    /// Clear any recorded error
    pub fn clear_error(&self) {
        self.set_state(|state| AppState {
            error: None,
            ..state.clone()
        });
    }

    /// Replace the item list; clears loading and error
    pub fn set_items(&self, items: Vec<Value>) {
        self.set_state(|state| AppState {
            items,
            loading: false,
            error: None,
            ..state.clone()
        });
    }

    /// Replace the current item; clears loading and error
    pub fn set_current_item(&self, item: Option<Value>) {
        self.set_state(|state| AppState {
            current_item: item,
            loading: false,
            error: None,
            ..state.clone()
        });
    }

    /// Adjust filters and reset pagination to the first page
    pub fn update_filters(&self, adjust: impl FnOnce(&mut Filters)) {
        self.set_state(|state| {
            let mut next = state.clone();
            adjust(&mut next.filters);
            next.pagination.page = 1;
            next
        });
    }

    /// Reset filters to their defaults and return to the first page
    pub fn reset_filters(&self) {
        self.set_state(|state| {
            let mut next = state.clone();
            next.filters = Filters::default();
            next.pagination.page = 1;
            next
        });
    }

    /// Adjust pagination in place
    pub fn update_pagination(&self, adjust: impl FnOnce(&mut Pagination)) {
        self.set_state(|state| {
            let mut next = state.clone();
            adjust(&mut next.pagination);
            next
        });
    }

    /// Add a notification; returns its id
    ///
    /// With a `ttl` the notification expires after that duration; with
    /// `None` it stays until removed by id. The library owns no timer: the
    /// host calls [`expire_notifications`](Self::expire_notifications) on
    /// its tick to remove due entries.
    pub fn add_notification(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        ttl: Option<Duration>,
    ) -> u64 {
        let id = self.next_notification_id.get();
        self.next_notification_id.set(id + 1);

        let notification = Notification {
            id,
            kind,
            message: message.into(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };

        self.set_state(|state| {
            let mut next = state.clone();
            next.notifications.push(notification.clone());
            next
        });

        id
    }

    /// Remove a notification by id
    pub fn remove_notification(&self, id: u64) {
        self.set_state(|state| {
            let mut next = state.clone();
            next.notifications.retain(|n| n.id != id);
            next
        });
    }

    /// Remove every notification past its deadline; returns how many
    pub fn expire_notifications(&self) -> usize {
        let now = Instant::now();
        let due = self.store.read(|state| {
            state
                .notifications
                .iter()
                .filter(|n| n.expires_at.is_some_and(|at| at <= now))
                .count()
        });

        if due > 0 {
            self.set_state(|state| {
                let mut next = state.clone();
                next.notifications
                    .retain(|n| !n.expires_at.is_some_and(|at| at <= now));
                next
            });
        }

        due
    }
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}
