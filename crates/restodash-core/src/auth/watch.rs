//! Identity-change subscriptions.
//!
//! Consumers register a callback and get back a [`Subscription`]; dropping
//! the handle (or calling `unsubscribe`) removes the callback. Callbacks run
//! synchronously, in registration order, on every transition.

use std::sync::{Arc, Mutex, Weak};

use super::Identity;

type Callback = Arc<dyn Fn(Option<&Identity>) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct IdentityWatch {
    inner: Arc<Mutex<Subscribers>>,
}

impl IdentityWatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(inner: &Mutex<Subscribers>) -> std::sync::MutexGuard<'_, Subscribers> {
        inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<&Identity>) + Send + Sync + 'static,
    {
        let mut subs = Self::lock(&self.inner);
        let id = subs.next_id;
        subs.next_id += 1;
        if !subs.closed {
            subs.entries.push((id, Arc::new(callback)));
        }
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke every live callback with `identity`.
    pub fn notify(&self, identity: Option<&Identity>) {
        // Snapshot so callbacks may (un)subscribe without deadlocking
        let callbacks: Vec<Callback> = Self::lock(&self.inner)
            .entries
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(identity);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        Self::lock(&self.inner).entries.len()
    }

    /// Drop all callbacks and refuse new ones.
    pub fn close(&self) {
        let mut subs = Self::lock(&self.inner);
        subs.closed = true;
        subs.entries.clear();
    }
}

/// Handle returned by [`IdentityWatch::subscribe`].
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    inner: Weak<Mutex<Subscribers>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            IdentityWatch::lock(&inner)
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}
