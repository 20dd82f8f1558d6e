use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::action::{HistoryAction, HistoryKind};
use crate::reducer::Reducer;

/// Reducer decorator that records state history for undo and redo.
///
/// Wraps any inner reducer and keeps two stacks of state snapshots,
/// `past` and `future`. Because states are [`Arc`] handles, a snapshot is
/// one pointer, never a deep copy. Actions route by their
/// [`history_kind`](HistoryAction::history_kind):
///
/// * **Ordinary** actions run through the inner reducer. When the state
///   actually changed, the pre-action state is pushed onto `past` and
///   `future` is cleared; a no-op leaves both stacks alone.
/// * **Undo** pops `past`, pushes the current state onto `future`, and
///   restores the popped snapshot. With nothing to undo the current
///   state comes back unchanged.
/// * **Redo** is the mirror image via `future`.
///
/// A bounded decorator evicts the oldest `past` snapshot once the bound
/// is hit, so undo reaches at most `depth` steps back.
///
/// # Examples
///
/// ```
/// use statefold::{HistoryAction, HistoryKind, Reducer, UndoRedo};
/// use std::sync::Arc;
///
/// enum Action {
///     Add(u64),
///     Undo,
///     Redo,
/// }
///
/// impl HistoryAction for Action {
///     fn history_kind(&self) -> HistoryKind {
///         match self {
///             Action::Undo => HistoryKind::Undo,
///             Action::Redo => HistoryKind::Redo,
///             Action::Add(_) => HistoryKind::Ordinary,
///         }
///     }
/// }
///
/// fn count(state: Arc<u64>, action: &Action) -> Arc<u64> {
///     match action {
///         Action::Add(n) => Arc::new(*state + n),
///         _ => state,
///     }
/// }
///
/// let mut history = UndoRedo::wrap(count);
///
/// let zero = Arc::new(0);
/// let one = history.reduce(Arc::clone(&zero), &Action::Add(1));
/// assert_eq!(*one, 1);
///
/// // Undo restores the exact pre-action snapshot, not a rebuilt equal.
/// let back = history.reduce(Arc::clone(&one), &Action::Undo);
/// assert!(Arc::ptr_eq(&back, &zero));
///
/// let again = history.reduce(back, &Action::Redo);
/// assert!(Arc::ptr_eq(&again, &one));
/// ```
pub struct UndoRedo<S, R> {
    inner: R,
    past: VecDeque<Arc<S>>,
    future: Vec<Arc<S>>,
    depth: usize,
}

impl<S, R> UndoRedo<S, R> {
    /// Wrap `inner` with unbounded history.
    pub fn wrap(inner: R) -> Self {
        UndoRedo {
            inner,
            past: VecDeque::new(),
            future: Vec::new(),
            depth: 0,
        }
    }

    /// Bound the history to `depth` undo steps.
    ///
    /// `0` means unbounded. When the bound is reached the oldest snapshot
    /// is evicted first, so the most recent `depth` steps stay reachable.
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        while self.depth != 0 && self.past.len() > self.depth {
            self.past.pop_front();
        }
        self
    }

    /// Whether an undo would restore anything.
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Whether a redo would restore anything.
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of undo steps currently recorded.
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    /// Number of redo steps currently recorded.
    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// Drop all recorded history, keeping the inner reducer.
    pub fn clear_history(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    fn push_past(&mut self, snapshot: Arc<S>) {
        if self.depth != 0 && self.past.len() == self.depth {
            self.past.pop_front();
        }
        self.past.push_back(snapshot);
    }
}

impl<S, R, A> Reducer<S, A> for UndoRedo<S, R>
where
    S: Send + Sync,
    R: Reducer<S, A>,
    A: HistoryAction,
{
    fn reduce(&mut self, state: Arc<S>, action: &A) -> Arc<S> {
        match action.history_kind() {
            HistoryKind::Ordinary => {
                let next = self.inner.reduce(Arc::clone(&state), action);
                if Arc::ptr_eq(&next, &state) {
                    return state;
                }
                self.push_past(state);
                self.future.clear();
                next
            }
            HistoryKind::Undo => match self.past.pop_back() {
                Some(snapshot) => {
                    self.future.push(state);
                    snapshot
                }
                None => state,
            },
            HistoryKind::Redo => match self.future.pop() {
                Some(snapshot) => {
                    self.push_past(state);
                    snapshot
                }
                None => state,
            },
        }
    }
}

impl<S, R: fmt::Debug> fmt::Debug for UndoRedo<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoRedo")
            .field("inner", &self.inner)
            .field("past", &self.past.len())
            .field("future", &self.future.len())
            .field("depth", &self.depth)
            .finish()
    }
}
