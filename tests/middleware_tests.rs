mod common;

use common::{boom, counter_reducer, CounterAction};
use statefold::{CallbackError, DataStore, DispatchError, LoggingMiddleware, Middleware, Next};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct Recording {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Middleware<u64, CounterAction> for Recording {
    fn handle(
        &mut self,
        _state: &Arc<u64>,
        action: CounterAction,
        next: Next<'_, u64, CounterAction>,
    ) -> Result<Arc<u64>, CallbackError> {
        self.log.lock().unwrap().push(format!("{}:before", self.label));
        let after = next(action)?;
        self.log.lock().unwrap().push(format!("{}:after", self.label));
        Ok(after)
    }
}

// Refuses reset actions without consulting the rest of the chain.
struct KeepCount;

impl Middleware<u64, CounterAction> for KeepCount {
    fn handle(
        &mut self,
        state: &Arc<u64>,
        action: CounterAction,
        next: Next<'_, u64, CounterAction>,
    ) -> Result<Arc<u64>, CallbackError> {
        if matches!(action, CounterAction::Reset) {
            return Ok(Arc::clone(state));
        }
        next(action)
    }
}

struct DoubleAdds;

impl Middleware<u64, CounterAction> for DoubleAdds {
    fn handle(
        &mut self,
        _state: &Arc<u64>,
        action: CounterAction,
        next: Next<'_, u64, CounterAction>,
    ) -> Result<Arc<u64>, CallbackError> {
        match action {
            CounterAction::Add(n) => next(CounterAction::Add(n * 2)),
            other => next(other),
        }
    }
}

struct FailOnAdd(u64);

impl Middleware<u64, CounterAction> for FailOnAdd {
    fn handle(
        &mut self,
        _state: &Arc<u64>,
        action: CounterAction,
        next: Next<'_, u64, CounterAction>,
    ) -> Result<Arc<u64>, CallbackError> {
        if action == CounterAction::Add(self.0) {
            return Err(boom("quota exceeded"));
        }
        next(action)
    }
}

// Forwards the same action twice and keeps the second outcome.
struct RunTwice;

impl Middleware<u64, CounterAction> for RunTwice {
    fn handle(
        &mut self,
        _state: &Arc<u64>,
        action: CounterAction,
        next: Next<'_, u64, CounterAction>,
    ) -> Result<Arc<u64>, CallbackError> {
        next(action)?;
        next(action)
    }
}

struct SeenStates(Arc<Mutex<Vec<u64>>>);

impl Middleware<u64, CounterAction> for SeenStates {
    fn handle(
        &mut self,
        state: &Arc<u64>,
        action: CounterAction,
        next: Next<'_, u64, CounterAction>,
    ) -> Result<Arc<u64>, CallbackError> {
        self.0.lock().unwrap().push(**state);
        next(action)
    }
}

#[test]
fn test_onion_ordering() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let store = DataStore::builder(0, counter_reducer)
        .middleware(Recording {
            label: "outer",
            log: Arc::clone(&log),
        })
        .middleware(Recording {
            label: "inner",
            log: Arc::clone(&log),
        })
        .build();

    store.dispatch(CounterAction::Add(1)).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["outer:before", "inner:before", "inner:after", "outer:after"]
    );
}

#[test]
fn test_middleware_sees_entry_state() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let store = DataStore::builder(0, counter_reducer)
        .middleware(SeenStates(Arc::clone(&seen)))
        .build();

    store.dispatch(CounterAction::Add(1)).unwrap();
    store.dispatch(CounterAction::Add(1)).unwrap();
    // Each dispatch observes the state its predecessor left behind.
    assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
}

#[test]
fn test_swallowed_action_changes_nothing() {
    let fired = Arc::new(AtomicUsize::new(0));
    let store = DataStore::builder(0, counter_reducer)
        .middleware(KeepCount)
        .build();

    let count = Arc::clone(&fired);
    store.watch(
        |s: &u64| Arc::new(*s),
        move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    );

    let five = store.dispatch(CounterAction::Add(5)).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // Swallowed: same allocation back, watchers stay quiet.
    let still_five = store.dispatch(CounterAction::Reset).unwrap();
    assert!(Arc::ptr_eq(&five, &still_five));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_middleware_substitutes_action() {
    let store = DataStore::builder(0, counter_reducer)
        .middleware(DoubleAdds)
        .build();

    store.dispatch(CounterAction::Add(3)).unwrap();
    assert_eq!(*store.state(), 6);
}

#[test]
fn test_next_is_anchored_at_entry_state() {
    let store = DataStore::builder(0, counter_reducer)
        .middleware(RunTwice)
        .build();

    // Both forwards reduce from the same entry state, so running the
    // action twice through `next` does not apply it twice.
    store.dispatch(CounterAction::Add(1)).unwrap();
    assert_eq!(*store.state(), 1);
}

#[test]
fn test_middleware_error_short_circuits() {
    let fired = Arc::new(AtomicUsize::new(0));
    let store = DataStore::builder(0, counter_reducer)
        .middleware(FailOnAdd(13))
        .build();

    let count = Arc::clone(&fired);
    store.watch(
        |s: &u64| Arc::new(*s),
        move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    );

    let err = store.dispatch(CounterAction::Add(13)).unwrap_err();
    match &err {
        DispatchError::Middleware(source) => {
            assert_eq!(source.to_string(), "quota exceeded");
        }
        other => panic!("expected middleware error, got {other:?}"),
    }
    assert_eq!(err.to_string(), "middleware failed: quota exceeded");

    // No swap, no notifications; the store keeps working.
    assert_eq!(*store.state(), 0);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    store.dispatch(CounterAction::Add(1)).unwrap();
    assert_eq!(*store.state(), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_inner_error_unwinds_through_outer() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let store = DataStore::builder(0, counter_reducer)
        .middleware(Recording {
            label: "outer",
            log: Arc::clone(&log),
        })
        .middleware(FailOnAdd(1))
        .build();

    assert!(store.dispatch(CounterAction::Add(1)).is_err());
    // The outer layer entered but never completed.
    assert_eq!(*log.lock().unwrap(), vec!["outer:before"]);
}

#[test]
fn test_logging_middleware_is_transparent() {
    let store = DataStore::builder(0, counter_reducer)
        .middleware(LoggingMiddleware)
        .middleware(DoubleAdds)
        .build();

    store.dispatch(CounterAction::Add(2)).unwrap();
    store.dispatch(CounterAction::Add(0)).unwrap();
    assert_eq!(*store.state(), 4);
}
