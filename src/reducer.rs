use std::sync::Arc;

/// A pure state transition: previous state and an action in, next state out.
///
/// Reducers receive the current state as an owned [`Arc`] and return the
/// next state reference. They should be deterministic, free of side
/// effects, and total: an unrecognized action returns the input `Arc`
/// unchanged, never some "empty" placeholder. Returning the *same* `Arc`
/// (pointer-equal) is the signal that nothing changed; every dirty check
/// downstream works on pointer identity, so a reducer that rebuilds an
/// identical-looking state from scratch defeats change detection.
///
/// The `&mut self` receiver exists for stateful decorators such as
/// [`UndoRedo`](crate::UndoRedo); the store only ever calls a reducer
/// inside its serialized dispatch section. Plain functions and closures
/// are reducers:
///
/// ```
/// use std::sync::Arc;
/// use statefold::Reducer;
///
/// enum CounterAction {
///     Add(u64),
///     Reset,
/// }
///
/// fn counter(state: Arc<u64>, action: &CounterAction) -> Arc<u64> {
///     match action {
///         CounterAction::Add(n) => Arc::new(*state + n),
///         CounterAction::Reset if *state != 0 => Arc::new(0),
///         _ => state,
///     }
/// }
///
/// let mut reducer = counter;
/// let zero = Arc::new(0);
/// let two = reducer.reduce(Arc::clone(&zero), &CounterAction::Add(2));
/// assert_eq!(*two, 2);
///
/// // Resetting an already-zero counter returns the same reference.
/// let same = reducer.reduce(Arc::clone(&zero), &CounterAction::Reset);
/// assert!(Arc::ptr_eq(&zero, &same));
/// ```
///
/// # Composite state
///
/// Build a root reducer out of independent field reducers. Run each field
/// reducer against its `Arc`-wrapped slice; if every one of them returned
/// its input unchanged, return the original parent `Arc`, otherwise build
/// one new parent that re-uses every unchanged field reference:
///
/// ```
/// use std::sync::Arc;
///
/// struct App {
///     count: Arc<u64>,
///     label: Arc<String>,
/// }
///
/// enum AppAction {
///     Bump,
///     Relabel(String),
/// }
///
/// fn count_reducer(count: Arc<u64>, action: &AppAction) -> Arc<u64> {
///     match action {
///         AppAction::Bump => Arc::new(*count + 1),
///         _ => count,
///     }
/// }
///
/// fn label_reducer(label: Arc<String>, action: &AppAction) -> Arc<String> {
///     match action {
///         AppAction::Relabel(next) if *next != *label => Arc::new(next.clone()),
///         _ => label,
///     }
/// }
///
/// fn app_reducer(state: Arc<App>, action: &AppAction) -> Arc<App> {
///     let count = count_reducer(Arc::clone(&state.count), action);
///     let label = label_reducer(Arc::clone(&state.label), action);
///     if Arc::ptr_eq(&count, &state.count) && Arc::ptr_eq(&label, &state.label) {
///         state
///     } else {
///         Arc::new(App { count, label })
///     }
/// }
///
/// let s0 = Arc::new(App {
///     count: Arc::new(0),
///     label: Arc::new("draft".to_string()),
/// });
/// let s1 = app_reducer(Arc::clone(&s0), &AppAction::Bump);
///
/// // The untouched slice keeps its exact reference.
/// assert!(Arc::ptr_eq(&s0.label, &s1.label));
/// assert!(!Arc::ptr_eq(&s0, &s1));
/// ```
pub trait Reducer<S, A>: Send {
    /// Compute the next state for `action`.
    fn reduce(&mut self, state: Arc<S>, action: &A) -> Arc<S>;
}

impl<S, A, F> Reducer<S, A> for F
where
    F: FnMut(Arc<S>, &A) -> Arc<S> + Send,
{
    fn reduce(&mut self, state: Arc<S>, action: &A) -> Arc<S> {
        self(state, action)
    }
}
