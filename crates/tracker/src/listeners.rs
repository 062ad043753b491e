//! Listener fan-out for tracking output.
//!
//! Callbacks run synchronously, in subscription order, on the task that
//! produced the value. A listener that returns an error or panics is logged
//! and skipped; the remaining listeners still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::{error, warn};

use domain::models::{GeofenceEvent, LocationUpdate, SessionChange};

pub type Callback<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// Ordered set of callbacks for one kind of value.
pub struct ListenerSet<T> {
    channel: &'static str,
    next_id: AtomicU64,
    entries: RwLock<Vec<(u64, Callback<T>)>>,
}

impl<T: 'static> ListenerSet<T> {
    pub fn new(channel: &'static str) -> Arc<Self> {
        Arc::new(Self {
            channel,
            next_id: AtomicU64::new(1),
            entries: RwLock::new(Vec::new()),
        })
    }

    /// Register a callback. It stays registered until the returned
    /// subscription is cancelled.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback<T> = Arc::new(callback);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, callback));

        let set: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(set) = set.upgrade() {
                set.remove(id);
            }
        })
    }

    /// Deliver a value to every listener. Returns how many succeeded.
    pub fn notify(&self, value: &T) -> usize {
        // Snapshot so callbacks may subscribe or unsubscribe while running.
        let callbacks: Vec<(u64, Callback<T>)> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut delivered = 0;
        for (id, callback) in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(value))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    warn!(channel = self.channel, listener = id, error = %e, "Listener failed");
                }
                Err(_) => {
                    error!(channel = self.channel, listener = id, "Listener panicked");
                }
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(entry_id, _)| *entry_id != id);
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping the handle leaves the listener registered; call `unsubscribe`
/// to remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    cancel: Box<dyn FnOnce() + Send + Sync>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    pub fn unsubscribe(self) {
        (self.cancel)();
    }

    /// Combine several subscriptions into one.
    pub fn merge(subscriptions: Vec<Subscription>) -> Self {
        Self::new(move || {
            for subscription in subscriptions {
                subscription.unsubscribe();
            }
        })
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Observer interface over all three channels.
///
/// Every method defaults to a no-op so implementors pick what they need.
pub trait TrackingObserver: Send + Sync {
    fn on_location_update(&self, _update: &LocationUpdate) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_geofence_event(&self, _event: &GeofenceEvent) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_session_change(&self, _change: &SessionChange) -> anyhow::Result<()> {
        Ok(())
    }
}

/// The engine's output channels.
pub struct Listeners {
    pub location: Arc<ListenerSet<LocationUpdate>>,
    pub geofence: Arc<ListenerSet<GeofenceEvent>>,
    pub session: Arc<ListenerSet<SessionChange>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self {
            location: ListenerSet::new("location"),
            geofence: ListenerSet::new("geofence"),
            session: ListenerSet::new("session"),
        }
    }

    /// Subscribe an observer to every channel at once.
    pub fn observe(&self, observer: Arc<dyn TrackingObserver>) -> Subscription {
        let location = {
            let observer = Arc::clone(&observer);
            self.location.subscribe(move |u| observer.on_location_update(u))
        };
        let geofence = {
            let observer = Arc::clone(&observer);
            self.geofence.subscribe(move |e| observer.on_geofence_event(e))
        };
        let session = self.session.subscribe(move |c| observer.on_session_change(c));

        Subscription::merge(vec![location, geofence, session])
    }
}

impl Default for Listeners {
    fn default() -> Self {
        Self::new()
    }
}
