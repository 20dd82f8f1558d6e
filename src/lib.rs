mod action;
mod bus;
mod middleware;
mod reducer;
mod store;
mod undo;

pub use action::{HistoryAction, HistoryKind};
pub use bus::{
    CallbackError, CallbackFailure, EventBus, EventCallback, PublishError, SubscriberId,
    SubscriptionHandle,
};
pub use middleware::{LoggingMiddleware, Middleware, Next};
pub use reducer::Reducer;
pub use store::{
    DataStore, DataStoreBuilder, DispatchError, NotifyError, WatchFailure, WatchNowError,
    WatchToken,
};
pub use undo::UndoRedo;
