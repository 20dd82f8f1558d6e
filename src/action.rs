/// Classification of an action for history tracking.
///
/// The store treats actions as opaque; this is the single exception, and
/// only [`UndoRedo`](crate::UndoRedo) ever consults it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    /// A normal application action, forwarded to the wrapped reducer.
    Ordinary,
    /// Sentinel: step back to the previous recorded state.
    Undo,
    /// Sentinel: step forward again after an undo.
    Redo,
}

/// Marks an action type as participating in undo/redo.
///
/// The default implementation classifies everything as
/// [`HistoryKind::Ordinary`], so an action type opts in by overriding
/// [`history_kind`](HistoryAction::history_kind) for its two sentinel
/// variants. The sentinels are consumed by [`UndoRedo`](crate::UndoRedo)
/// and never reach the reducer it wraps.
///
/// # Examples
///
/// ```
/// use statefold::{HistoryAction, HistoryKind};
///
/// enum DrawAction {
///     AddStroke(u32),
///     ClearCanvas,
///     Undo,
///     Redo,
/// }
///
/// impl HistoryAction for DrawAction {
///     fn history_kind(&self) -> HistoryKind {
///         match self {
///             DrawAction::Undo => HistoryKind::Undo,
///             DrawAction::Redo => HistoryKind::Redo,
///             _ => HistoryKind::Ordinary,
///         }
///     }
/// }
///
/// assert_eq!(DrawAction::Undo.history_kind(), HistoryKind::Undo);
/// assert_eq!(DrawAction::AddStroke(7).history_kind(), HistoryKind::Ordinary);
/// ```
pub trait HistoryAction {
    /// Returns which history class this action belongs to.
    fn history_kind(&self) -> HistoryKind {
        HistoryKind::Ordinary
    }
}
