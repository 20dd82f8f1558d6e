use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

/// Error type subscriber callbacks and middleware may return.
///
/// Deliberately wide open: the bus and store collect these, they never
/// interpret them.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Callback signature for bus subscriptions.
pub type EventCallback<P> = dyn Fn(&P) -> Result<(), CallbackError> + Send + Sync;

/// Opaque identity a subscriber registers under.
///
/// The bus never dereferences this value; it is a lookup and removal key
/// only. Mint them however you like (a widget id, a hash of a name, a
/// counter you own) and call [`EventBus::unsubscribe`] when the thing the
/// id stands for reaches end of life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl SubscriberId {
    /// Create a subscriber id from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value back.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Ticket for one registration, returned by the subscribe methods.
///
/// Identifies exactly one (subscriber, event, callback) registration and
/// can be handed to [`EventBus::remove`] for precise removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    event: String,
    subscriber: SubscriberId,
    seq: u64,
}

impl SubscriptionHandle {
    /// The event name this registration listens on.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// The subscriber identity this registration belongs to.
    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }
}

/// One failed callback within a delivery pass.
#[derive(Debug)]
#[non_exhaustive]
pub struct CallbackFailure {
    /// Identity the failing callback was registered under.
    pub subscriber: SubscriberId,
    /// The error the callback returned.
    pub error: CallbackError,
}

/// Aggregate error from a publish whose delivery pass hit callback errors.
///
/// Delivery always runs to completion: every snapshotted subscriber was
/// invoked before this error was assembled, so one failing callback never
/// starves the rest.
#[derive(Debug, Error)]
#[error("{} of {} callbacks failed for event '{}'", .failures.len(), .attempted, .event)]
#[non_exhaustive]
pub struct PublishError {
    /// Event the publish targeted.
    pub event: String,
    /// Number of callbacks invoked, failures included.
    pub attempted: usize,
    /// Every callback error collected during the pass.
    pub failures: Vec<CallbackFailure>,
}

struct Registration<P> {
    subscriber: SubscriberId,
    seq: u64,
    callback: Arc<EventCallback<P>>,
}

// Derived Clone would demand P: Clone; registrations only clone the Arc.
impl<P> Clone for Registration<P> {
    fn clone(&self) -> Self {
        Registration {
            subscriber: self.subscriber,
            seq: self.seq,
            callback: Arc::clone(&self.callback),
        }
    }
}

/// Thread-safe publish/subscribe keyed by event name.
///
/// Generic over the payload type `P` handed to callbacks; a bus whose
/// events carry no payload uses the default `()`. Delivery is synchronous
/// on the publishing thread, in registration order, against a snapshot of
/// the registration list taken before the first callback runs: a callback
/// that subscribes or unsubscribes mid-delivery changes future publishes,
/// never the one in flight.
///
/// Lookup is a single hash probe on the event name and the snapshot is
/// one `Vec` of `Arc` clones sized to that event's subscriber count, so
/// publishing stays cheap no matter how many unrelated events exist.
///
/// # Examples
///
/// ```
/// use statefold::{EventBus, SubscriberId};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let bus: EventBus<String> = EventBus::new();
/// let seen = Arc::new(AtomicUsize::new(0));
///
/// let counter = Arc::clone(&seen);
/// bus.subscribe(SubscriberId::new(1), "file_saved", move |path: &String| {
///     assert!(path.ends_with(".txt"));
///     counter.fetch_add(1, Ordering::SeqCst);
///     Ok(())
/// });
///
/// let delivered = bus.publish("file_saved", &"notes.txt".to_string())?;
/// assert_eq!(delivered, 1);
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
///
/// bus.unsubscribe(SubscriberId::new(1), "file_saved");
/// assert_eq!(bus.publish("file_saved", &"notes.txt".to_string())?, 0);
/// # Ok::<(), statefold::PublishError>(())
/// ```
pub struct EventBus<P = ()> {
    registry: RwLock<HashMap<String, Vec<Registration<P>>>>,
    next_seq: AtomicU64,
}

impl<P> EventBus<P> {
    /// Create an empty bus.
    pub fn new() -> Self {
        EventBus {
            registry: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Register `callback` for `event` under `subscriber`.
    ///
    /// Each call wraps the closure in a fresh [`Arc`], so calling this
    /// twice registers two independent callbacks even if the bodies look
    /// identical. Use [`subscribe_shared`](Self::subscribe_shared) when
    /// re-registration of the *same* callback must stay idempotent.
    pub fn subscribe<F>(
        &self,
        subscriber: SubscriberId,
        event: &str,
        callback: F,
    ) -> SubscriptionHandle
    where
        F: Fn(&P) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.subscribe_shared(subscriber, event, Arc::new(callback))
    }

    /// Register a shared callback, idempotently.
    ///
    /// If this exact `Arc` (pointer identity) is already registered for
    /// (`subscriber`, `event`), nothing changes and the handle of the
    /// existing registration is returned. A different callback instance
    /// for the same pair is an independent registration.
    pub fn subscribe_shared(
        &self,
        subscriber: SubscriberId,
        event: &str,
        callback: Arc<EventCallback<P>>,
    ) -> SubscriptionHandle {
        let mut registry = write_lock(&self.registry);
        let slots = registry.entry(event.to_string()).or_default();

        if let Some(existing) = slots
            .iter()
            .find(|r| r.subscriber == subscriber && Arc::ptr_eq(&r.callback, &callback))
        {
            return SubscriptionHandle {
                event: event.to_string(),
                subscriber,
                seq: existing.seq,
            };
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        slots.push(Registration {
            subscriber,
            seq,
            callback,
        });
        SubscriptionHandle {
            event: event.to_string(),
            subscriber,
            seq,
        }
    }

    /// Deliver `payload` to every callback registered for `event`.
    ///
    /// Callbacks run synchronously on the calling thread, in registration
    /// order. Returns the number of callbacks invoked. A callback error
    /// does not stop the pass: every remaining callback still runs, and
    /// the collected failures come back as one [`PublishError`].
    pub fn publish(&self, event: &str, payload: &P) -> Result<usize, PublishError> {
        let snapshot: Vec<Registration<P>> = {
            let registry = read_lock(&self.registry);
            match registry.get(event) {
                Some(slots) => slots.clone(),
                None => return Ok(0),
            }
        };

        let mut failures = Vec::new();
        for registration in &snapshot {
            if let Err(error) = (registration.callback)(payload) {
                log::warn!(
                    "subscriber {} failed during '{event}': {error}",
                    registration.subscriber.raw()
                );
                failures.push(CallbackFailure {
                    subscriber: registration.subscriber,
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(snapshot.len())
        } else {
            Err(PublishError {
                event: event.to_string(),
                attempted: snapshot.len(),
                failures,
            })
        }
    }

    /// Remove every registration for (`subscriber`, `event`).
    ///
    /// Returns how many were removed; removing where nothing is
    /// registered is a no-op, not an error.
    pub fn unsubscribe(&self, subscriber: SubscriberId, event: &str) -> usize {
        self.retain(event, |r| r.subscriber != subscriber)
    }

    /// Remove registrations for (`subscriber`, `event`) that hold this
    /// exact callback (pointer identity).
    pub fn unsubscribe_callback(
        &self,
        subscriber: SubscriberId,
        event: &str,
        callback: &Arc<EventCallback<P>>,
    ) -> usize {
        self.retain(event, |r| {
            r.subscriber != subscriber || !Arc::ptr_eq(&r.callback, callback)
        })
    }

    /// Remove the single registration `handle` refers to.
    ///
    /// Returns whether it was still present.
    pub fn remove(&self, handle: &SubscriptionHandle) -> bool {
        self.retain(&handle.event, |r| r.seq != handle.seq) == 1
    }

    /// Number of callbacks currently registered for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        read_lock(&self.registry).get(event).map_or(0, Vec::len)
    }

    // Keep registrations for `event` satisfying `keep`; drops the map
    // entry when the last registration goes so dead event names do not
    // accumulate.
    fn retain(&self, event: &str, keep: impl Fn(&Registration<P>) -> bool) -> usize {
        let mut registry = write_lock(&self.registry);
        let Some(slots) = registry.get_mut(event) else {
            return 0;
        };
        let before = slots.len();
        slots.retain(|r| keep(r));
        let removed = before - slots.len();
        if slots.is_empty() {
            registry.remove(event);
        }
        removed
    }
}

impl<P> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = read_lock(&self.registry);
        let mut events: Vec<(&str, usize)> = registry
            .iter()
            .map(|(name, slots)| (name.as_str(), slots.len()))
            .collect();
        events.sort_unstable();
        f.debug_struct("EventBus").field("events", &events).finish()
    }
}

// Mutations under these locks always complete before control returns, so
// a poisoned guard still holds a structurally sound registry.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
