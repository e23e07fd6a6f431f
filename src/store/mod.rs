//! Shared state store with publish/subscribe
//!
//! One `Store` is created at startup and handed to every component that
//! needs state shared across unrelated subtrees. Writes are shallow merges;
//! every write notifies all subscribers, in registration order, with the
//! complete resulting state.
//!
//! # Reentrancy
//!
//! A subscriber may call [`Store::set_state`] from inside its callback. That
//! write is queued and delivered in its own notification round once the
//! current round finishes, so subscribers are never re-entered. A runaway
//! feedback loop is cut off after [`MAX_CASCADE_ROUNDS`]: the remaining
//! writes are still merged but no further notifications go out for that
//! cascade.

use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// Full store contents
pub type StoreState = Map<String, Value>;

/// Upper bound on notification rounds triggered by a single outer write
pub const MAX_CASCADE_ROUNDS: usize = 64;

type Callback = Rc<RefCell<dyn FnMut(&StoreState)>>;

struct Inner {
    state: StoreState,
    subscribers: Vec<(u64, Callback)>,
    next_id: u64,
    notifying: bool,
    pending: VecDeque<StoreState>,
}

impl Inner {
    fn is_registered(&self, id: u64) -> bool {
        self.subscribers.iter().any(|(sid, _)| *sid == id)
    }
}

/// Clears the notifying flag when a round ends, including by a subscriber
/// panic, so later writes are not queued forever
struct NotifyRound<'a>(&'a RefCell<Inner>);

impl Drop for NotifyRound<'_> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.0.try_borrow_mut() {
            inner.notifying = false;
        }
    }
}

/// Handle to the shared store. Clones point at the same state.
#[derive(Clone)]
pub struct Store {
    inner: Rc<RefCell<Inner>>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(StoreState::new())
    }

    /// Create a store pre-populated with `state`
    pub fn with_state(state: StoreState) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state,
                subscribers: Vec::new(),
                next_id: 0,
                notifying: false,
                pending: VecDeque::new(),
            })),
        }
    }

    /// Snapshot of the current state.
    ///
    /// The snapshot is an owned copy; changing it does not touch the store.
    pub fn get_state(&self) -> StoreState {
        self.inner.borrow().state.clone()
    }

    /// Snapshot of a single top-level key
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.borrow().state.get(key).cloned()
    }

    /// Shallow-merge `partial` into the state and notify subscribers.
    ///
    /// Keys in `partial` replace existing values wholesale (nested objects are
    /// not merged); all other keys are kept.
    pub fn set_state(&self, partial: StoreState) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.pending.push_back(partial);
            if inner.notifying {
                tracing::trace!("Store write queued behind active notification");
                return;
            }
            inner.notifying = true;
        }
        let _round = NotifyRound(&self.inner);

        let mut rounds = 0;
        loop {
            let (snapshot, subscribers) = {
                let mut inner = self.inner.borrow_mut();
                let Some(partial) = inner.pending.pop_front() else {
                    break;
                };
                inner.state.extend(partial);

                rounds += 1;
                if rounds > MAX_CASCADE_ROUNDS {
                    let mut dropped_rounds = 1;
                    while let Some(rest) = inner.pending.pop_front() {
                        inner.state.extend(rest);
                        dropped_rounds += 1;
                    }
                    tracing::error!(
                        "Store update cascade exceeded {} rounds; merged {} pending write(s) without notifying",
                        MAX_CASCADE_ROUNDS,
                        dropped_rounds
                    );
                    break;
                }

                let subscribers: Vec<(u64, Callback)> = inner
                    .subscribers
                    .iter()
                    .map(|(id, cb)| (*id, cb.clone()))
                    .collect();
                (inner.state.clone(), subscribers)
            };

            for (id, callback) in subscribers {
                // Unsubscribed earlier in this round
                if !self.inner.borrow().is_registered(id) {
                    continue;
                }
                (callback.borrow_mut())(&snapshot);
            }
        }
    }

    /// Convenience for writing a single key
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let mut partial = StoreState::new();
        partial.insert(key.into(), value);
        self.set_state(partial);
    }

    /// Register `callback` for every future write.
    ///
    /// The callback is not invoked with the current state; it first runs on
    /// the next [`Store::set_state`].
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&StoreState) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Rc::new(RefCell::new(callback))));
        tracing::trace!("Store subscriber {} registered", id);

        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
            active: Cell::new(true),
        }
    }

    /// Number of live subscriptions, used to catch leaks
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration returned by [`Store::subscribe`].
///
/// Call [`Subscription::unsubscribe`] to stop receiving updates. Dropping a
/// subscription that is still active does *not* unsubscribe; it logs a
/// warning because the callback now lives as long as the store.
#[must_use = "keep the subscription and unsubscribe it when the owner goes away"]
pub struct Subscription {
    store: Weak<RefCell<Inner>>,
    id: u64,
    active: Cell<bool>,
}

impl Subscription {
    /// Stop receiving updates. Calling this more than once is harmless.
    pub fn unsubscribe(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let Some(store) = self.store.upgrade() {
            store
                .borrow_mut()
                .subscribers
                .retain(|(id, _)| *id != self.id);
            tracing::trace!("Store subscriber {} removed", self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.active.get() && self.store.strong_count() > 0 {
            tracing::warn!(
                "Store subscription {} dropped without unsubscribe; callback leaked",
                self.id
            );
        }
    }
}
