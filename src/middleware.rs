use std::fmt;
use std::sync::Arc;

use crate::bus::CallbackError;
use crate::reducer::Reducer;

/// Continuation handed to [`Middleware::handle`].
///
/// Invoking it passes an action to the rest of the chain and, past the
/// last middleware, to the reducer. A middleware may call it once,
/// several times, or not at all.
pub type Next<'a, S, A> = &'a mut (dyn FnMut(A) -> Result<Arc<S>, CallbackError> + 'a);

/// Interceptor wrapped around the reducer during dispatch.
///
/// Middleware compose like an onion: the first one added sees the action
/// first and sees the final state last. Each layer may inspect the state
/// the dispatch started from, pass the action (or a substitute) down via
/// `next`, swallow it by returning without calling `next`, or run `next`
/// more than once. Whatever state it returns is what the dispatch
/// installs.
///
/// # Examples
///
/// A layer that refuses to let a counter climb past a ceiling:
///
/// ```
/// use statefold::{CallbackError, Middleware, Next};
/// use std::sync::Arc;
///
/// struct Ceiling(u64);
///
/// impl Middleware<u64, u64> for Ceiling {
///     fn handle(
///         &mut self,
///         state: &Arc<u64>,
///         action: u64,
///         next: Next<'_, u64, u64>,
///     ) -> Result<Arc<u64>, CallbackError> {
///         if **state + action > self.0 {
///             // Swallow the action: hand back the entry state untouched.
///             return Ok(Arc::clone(state));
///         }
///         next(action)
///     }
/// }
/// ```
pub trait Middleware<S, A>: Send {
    /// Intercept `action` on its way to the reducer.
    ///
    /// `state` is the state the dispatch started from, not a live view;
    /// calls to `next` do not change what later reads of it see.
    fn handle(
        &mut self,
        state: &Arc<S>,
        action: A,
        next: Next<'_, S, A>,
    ) -> Result<Arc<S>, CallbackError>;
}

/// Thread the action through `middleware` front to back, ending at `reducer`.
pub(crate) fn run_chain<S, A>(
    middleware: &mut [Box<dyn Middleware<S, A>>],
    reducer: &mut dyn Reducer<S, A>,
    state: &Arc<S>,
    action: A,
) -> Result<Arc<S>, CallbackError> {
    match middleware.split_first_mut() {
        None => Ok(reducer.reduce(Arc::clone(state), &action)),
        Some((head, rest)) => {
            let entry = Arc::clone(state);
            let mut next =
                move |action: A| run_chain(&mut *rest, &mut *reducer, &entry, action);
            head.handle(state, action, &mut next)
        }
    }
}

/// Middleware that logs every action and whether it changed the state.
///
/// Emits at debug level through the [`log`] facade; wire up any logger
/// implementation to see the output. Useful as the outermost layer while
/// developing a reducer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl<S, A> Middleware<S, A> for LoggingMiddleware
where
    A: fmt::Debug,
{
    fn handle(
        &mut self,
        state: &Arc<S>,
        action: A,
        next: Next<'_, S, A>,
    ) -> Result<Arc<S>, CallbackError> {
        log::debug!("dispatch {action:?}");
        let after = next(action)?;
        if Arc::ptr_eq(state, &after) {
            log::debug!("state unchanged");
        } else {
            log::debug!("state replaced");
        }
        Ok(after)
    }
}
