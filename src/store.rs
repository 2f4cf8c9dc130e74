//! Reactive state store
//!
//! Holds an application-defined state value and a subscriber set. The store
//! never inspects the state's shape: every mutation produces a new state
//! value through [`Store::set_state`], and every subscriber is then notified
//! synchronously with the new state. There is exactly one code path that
//! mutates state and exactly one that notifies.
//!
//! Failure isolation follows the taxonomy of the crate: an updater that
//! panics propagates to the `set_state` caller (the state is left unchanged),
//! while a panicking subscriber is caught, logged, and does not prevent the
//! remaining subscribers from being notified.

use crate::warn_log;
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

type SubscriberFn<S> = Rc<dyn Fn(&S)>;

struct StoreInner<S> {
    state: S,
    subscribers: Vec<(u64, SubscriberFn<S>)>,
    next_id: u64,
}

/// Reactive store over an application-defined state value
///
/// Cheap to clone; clones share the same state and subscriber set. Designed
/// for single-threaded cooperative use: all mutation logic runs to completion
/// with no suspension between reading the current state and writing the new
/// one, so functional updaters always observe the latest state even under
/// synchronous re-entrant calls.
///
/// # Example
///
/// ```
/// use pagekit::Store;
///
/// let store = Store::new(0u32);
/// let subscription = store.subscribe(|count| println!("count is {count}"));
///
/// store.set_state(|count| count + 1);
/// assert_eq!(store.get_state(), 1);
///
/// subscription.unsubscribe();
/// ```
pub struct Store<S> {
    inner: Rc<RefCell<StoreInner<S>>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: Clone + 'static> Store<S> {
    /// Create a store with an initial state
    pub fn new(initial: S) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                state: initial,
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Get a snapshot of the current state
    pub fn get_state(&self) -> S {
        self.inner.borrow().state.clone()
    }

    /// Read from the current state without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.borrow().state)
    }

    /// Compute the next state and notify every subscriber with it
    ///
    /// The updater receives the current state at call time: a re-entrant
    /// `set_state` issued from inside a subscriber has already completed by
    /// the time a later updater runs, so updaters never see a stale snapshot.
    /// Subscriber call order is unspecified and must not be relied on.
    pub fn set_state(&self, updater: impl FnOnce(&S) -> S) {
        let (snapshot, subscribers) = {
            let mut inner = self.inner.borrow_mut();
            let next = updater(&inner.state);
            inner.state = next;
            (inner.state.clone(), inner.subscribers.clone())
        };

        // Notify with no borrow held so subscribers can read or mutate the
        // store. Each subscriber is isolated: one panicking must not starve
        // the rest.
        for (id, subscriber) in subscribers {
            if catch_unwind(AssertUnwindSafe(|| subscriber(&snapshot))).is_err() {
                warn_log!("subscriber {} panicked during notification", id);
            }
        }
    }

    /// Register a subscriber, returning a handle that removes it
    ///
    /// The subscriber is called with the new state after every mutation.
    pub fn subscribe(&self, subscriber: impl Fn(&S) + 'static) -> Subscription<S> {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push((id, Rc::new(subscriber)));
            id
        };

        Subscription {
            id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

/// Handle to a registered subscriber
///
/// `unsubscribe` removes exactly the registration that produced this handle.
/// Calling it more than once is a no-op, and a handle outliving its store is
/// harmless.
pub struct Subscription<S> {
    id: u64,
    inner: Weak<RefCell<StoreInner<S>>>,
}

impl<S> Subscription<S> {
    /// Remove the subscriber this handle refers to
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner
                .borrow_mut()
                .subscribers
                .retain(|(id, _)| *id != self.id);
        }
    }
}
