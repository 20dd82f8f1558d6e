use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::bus::CallbackError;
use crate::middleware::{run_chain, Middleware};
use crate::reducer::Reducer;

/// Handle for one watch registration, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchToken(u64);

/// One failed watch callback within a notification pass.
#[derive(Debug)]
#[non_exhaustive]
pub struct WatchFailure {
    /// Token of the registration whose callback failed.
    pub token: WatchToken,
    /// The error the callback returned.
    pub error: CallbackError,
}

/// Aggregate error from a notification pass that hit callback errors.
///
/// The pass always runs to completion, so `failures` never hides a
/// watcher that was skipped: every registered watcher was probed.
#[derive(Debug, Error)]
#[error("{} of {} watch callbacks failed", .failures.len(), .attempted)]
#[non_exhaustive]
pub struct NotifyError {
    /// Number of watchers probed during the pass.
    pub attempted: usize,
    /// Every callback error collected during the pass.
    pub failures: Vec<WatchFailure>,
}

/// Error from [`DataStore::watch_now`] when the instant callback fails.
///
/// The registration itself survives; `token` cancels it.
#[derive(Debug, Error)]
#[error("instant watch callback failed")]
pub struct WatchNowError {
    /// Token of the registration, which is live despite the error.
    pub token: WatchToken,
    /// The error the callback returned.
    #[source]
    pub error: CallbackError,
}

/// Error from a dispatch.
///
/// Either the pipeline refused the action or, after a successful swap,
/// some watch callbacks failed. In the `Notify` case the new state is
/// already installed and visible to [`DataStore::state`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A middleware (or something it called) returned an error; the
    /// state was not changed.
    #[error("middleware failed: {0}")]
    Middleware(#[source] CallbackError),
    /// The state was swapped but one or more watch callbacks failed.
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

// Checks one watcher against a new state: selects, compares with the
// previous selection, and invokes the callback when they differ.
type Probe<S> = Box<dyn Fn(&Arc<S>) -> Result<(), CallbackError> + Send + Sync>;

struct Watcher<S> {
    token: WatchToken,
    probe: Probe<S>,
}

struct Pipeline<S, A> {
    middleware: Vec<Box<dyn Middleware<S, A>>>,
    reducer: Box<dyn Reducer<S, A>>,
}

/// Single-state container driving the action / reducer / notify loop.
///
/// Holds one current state behind an [`ArcSwap`], so [`state`](Self::state)
/// is lock-free from any thread. Dispatch is serialized: actions take a
/// pipeline lock, run through the middleware chain into the reducer, and
/// the produced state replaces the current one in a single atomic swap.
/// Readers therefore always see a complete state, never a half-applied
/// one, and two racing dispatches apply in some total order.
///
/// Watchers observe slices of the state through selector functions.
/// After every dispatch that produced a different selection (compared by
/// [`Arc::ptr_eq`], never by value), the watcher's callback runs with the
/// new selection. Selecting with cheap pointer comparison is what makes
/// fine-grained watching affordable: reducers share unchanged subtrees,
/// so an untouched slice is the *same* `Arc` and the watcher stays quiet.
///
/// # Examples
///
/// ```
/// use statefold::DataStore;
/// use std::sync::Arc;
///
/// enum Action {
///     Add(u64),
/// }
///
/// let store = DataStore::new(0u64, |state: Arc<u64>, action: &Action| match action {
///     Action::Add(0) => state,
///     Action::Add(n) => Arc::new(*state + n),
/// });
///
/// let two = store.dispatch(Action::Add(2))?;
/// assert_eq!(*two, 2);
///
/// // A no-op action keeps the exact same state allocation.
/// let same = store.dispatch(Action::Add(0))?;
/// assert!(Arc::ptr_eq(&two, &same));
/// # Ok::<(), statefold::DispatchError>(())
/// ```
pub struct DataStore<S, A> {
    state: ArcSwap<S>,
    pipeline: Mutex<Pipeline<S, A>>,
    watchers: RwLock<Vec<Arc<Watcher<S>>>>,
    next_token: AtomicU64,
}

/// Configures a [`DataStore`] before first use.
///
/// Obtained from [`DataStore::builder`]; add middleware in the order they
/// should see actions, then [`build`](Self::build).
pub struct DataStoreBuilder<S, A> {
    initial: S,
    reducer: Box<dyn Reducer<S, A>>,
    middleware: Vec<Box<dyn Middleware<S, A>>>,
}

impl<S, A> DataStoreBuilder<S, A>
where
    S: Send + Sync + 'static,
    A: 'static,
{
    /// Append a middleware to the chain.
    ///
    /// The first one added is outermost: it sees each action first and
    /// the resulting state last.
    #[must_use]
    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<S, A> + 'static,
    {
        self.middleware.push(Box::new(middleware));
        self
    }

    /// Finish configuration and create the store.
    pub fn build(self) -> DataStore<S, A> {
        DataStore {
            state: ArcSwap::from_pointee(self.initial),
            pipeline: Mutex::new(Pipeline {
                middleware: self.middleware,
                reducer: self.reducer,
            }),
            watchers: RwLock::new(Vec::new()),
            next_token: AtomicU64::new(0),
        }
    }
}

impl<S, A> DataStore<S, A>
where
    S: Send + Sync + 'static,
    A: 'static,
{
    /// Create a store with no middleware.
    pub fn new<R>(initial: S, reducer: R) -> Self
    where
        R: Reducer<S, A> + 'static,
    {
        Self::builder(initial, reducer).build()
    }

    /// Start configuring a store, to add middleware before [`build`].
    ///
    /// [`build`]: DataStoreBuilder::build
    pub fn builder<R>(initial: S, reducer: R) -> DataStoreBuilder<S, A>
    where
        R: Reducer<S, A> + 'static,
    {
        DataStoreBuilder {
            initial,
            reducer: Box::new(reducer),
            middleware: Vec::new(),
        }
    }

    /// The current state.
    ///
    /// Lock-free; the returned handle stays valid however many dispatches
    /// land after it.
    pub fn state(&self) -> Arc<S> {
        self.state.load_full()
    }

    /// Run `action` through the middleware chain and reducer, install the
    /// produced state, and notify watchers whose selection changed.
    ///
    /// Dispatches are serialized; concurrent callers apply in some total
    /// order, each against the state its predecessor produced. When the
    /// pipeline hands back the entry state itself (pointer-equal), the
    /// dispatch is a no-op: no swap, no notifications.
    ///
    /// Returns the state the store holds after this dispatch.
    pub fn dispatch(&self, action: A) -> Result<Arc<S>, DispatchError> {
        let mut pipeline = lock(&self.pipeline);
        let before = self.state.load_full();

        let Pipeline {
            middleware,
            reducer,
        } = &mut *pipeline;
        let after = run_chain(middleware, reducer.as_mut(), &before, action)
            .map_err(DispatchError::Middleware)?;

        if Arc::ptr_eq(&before, &after) {
            return Ok(after);
        }

        self.state.store(Arc::clone(&after));
        self.notify_watchers(&after)?;
        Ok(after)
    }

    /// Watch a slice of the state.
    ///
    /// `selector` picks an `Arc`-wrapped part out of the state; after
    /// every dispatch that replaced that part (pointer identity, not
    /// value equality), `callback` runs with the new selection. The
    /// callback does not run for the state the store holds right now;
    /// use [`watch_now`](Self::watch_now) to also get that.
    ///
    /// Callbacks run on the dispatching thread. Returns a token for
    /// [`unwatch`](Self::unwatch).
    pub fn watch<V, F, C>(&self, selector: F, callback: C) -> WatchToken
    where
        V: Send + Sync + 'static,
        F: Fn(&S) -> Arc<V> + Send + Sync + 'static,
        C: Fn(&Arc<V>) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        let (token, _) = self.register(selector, callback, false);
        token
    }

    /// Watch a slice of the state and run the callback immediately.
    ///
    /// Like [`watch`](Self::watch), but `callback` also runs once right
    /// away with the current selection, so callers need no separate
    /// "prime the view" step. If that instant call fails the registration
    /// still stands; the returned error carries its token.
    pub fn watch_now<V, F, C>(&self, selector: F, callback: C) -> Result<WatchToken, WatchNowError>
    where
        V: Send + Sync + 'static,
        F: Fn(&S) -> Arc<V> + Send + Sync + 'static,
        C: Fn(&Arc<V>) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        match self.register(selector, callback, true) {
            (token, Ok(())) => Ok(token),
            (token, Err(error)) => Err(WatchNowError { token, error }),
        }
    }

    /// Cancel a watch registration.
    ///
    /// Returns whether the token was still live. A callback observing the
    /// in-flight notification pass is unaffected; the registration is
    /// gone for every later dispatch.
    pub fn unwatch(&self, token: WatchToken) -> bool {
        let mut watchers = write_lock(&self.watchers);
        let before = watchers.len();
        watchers.retain(|w| w.token != token);
        watchers.len() < before
    }

    /// Number of live watch registrations.
    pub fn watcher_count(&self) -> usize {
        read_lock(&self.watchers).len()
    }

    fn register<V, F, C>(
        &self,
        selector: F,
        callback: C,
        fire_now: bool,
    ) -> (WatchToken, Result<(), CallbackError>)
    where
        V: Send + Sync + 'static,
        F: Fn(&S) -> Arc<V> + Send + Sync + 'static,
        C: Fn(&Arc<V>) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        let current = self.state.load_full();
        let initial = selector(&current);

        let first_result = if fire_now { callback(&initial) } else { Ok(()) };

        let token = WatchToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let last = Mutex::new(initial);
        let probe: Probe<S> = Box::new(move |state: &Arc<S>| {
            let selected = selector(state);
            {
                let mut last = lock(&last);
                if Arc::ptr_eq(&*last, &selected) {
                    return Ok(());
                }
                *last = Arc::clone(&selected);
            }
            callback(&selected)
        });

        write_lock(&self.watchers).push(Arc::new(Watcher { token, probe }));
        (token, first_result)
    }

    // Runs after the swap, still under the pipeline lock, so passes for
    // successive states reach watchers in order.
    fn notify_watchers(&self, state: &Arc<S>) -> Result<(), NotifyError> {
        let snapshot: Vec<Arc<Watcher<S>>> = read_lock(&self.watchers)
            .iter()
            .map(Arc::clone)
            .collect();

        let mut failures = Vec::new();
        for watcher in &snapshot {
            if let Err(error) = (watcher.probe)(state) {
                log::warn!("watch callback {:?} failed: {error}", watcher.token);
                failures.push(WatchFailure {
                    token: watcher.token,
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifyError {
                attempted: snapshot.len(),
                failures,
            })
        }
    }
}

impl<S: fmt::Debug, A> fmt::Debug for DataStore<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore")
            .field("state", &self.state.load_full())
            .field("watchers", &read_lock(&self.watchers).len())
            .finish()
    }
}

// Same reasoning as the bus locks: every mutation under these guards
// completes before control returns, so poison never means torn data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
