#![allow(dead_code)]

use std::sync::Arc;

use statefold::{HistoryAction, HistoryKind};

/// Counter action used across the suites. `Add(0)` and a redundant
/// `Reset` are deliberate no-ops so tests can exercise the
/// pointer-identity fast path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterAction {
    Add(u64),
    Reset,
    Undo,
    Redo,
}

impl HistoryAction for CounterAction {
    fn history_kind(&self) -> HistoryKind {
        match self {
            CounterAction::Undo => HistoryKind::Undo,
            CounterAction::Redo => HistoryKind::Redo,
            _ => HistoryKind::Ordinary,
        }
    }
}

pub fn counter_reducer(state: Arc<u64>, action: &CounterAction) -> Arc<u64> {
    match action {
        CounterAction::Add(0) => state,
        CounterAction::Add(n) => Arc::new(*state + n),
        CounterAction::Reset if *state == 0 => state,
        CounterAction::Reset => Arc::new(0),
        _ => state,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub name: String,
}

/// Two independently shared slices, so selector tests can show one
/// changing while the other keeps its allocation.
#[derive(Debug)]
pub struct AppState {
    pub selected: Arc<Option<u64>>,
    pub users: Arc<Vec<User>>,
}

pub fn fresh_app() -> AppState {
    AppState {
        selected: Arc::new(None),
        users: Arc::new(Vec::new()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Select(u64),
    Deselect,
    AddUser(u64, String),
    RemoveUser(u64),
    Undo,
    Redo,
}

impl HistoryAction for AppAction {
    fn history_kind(&self) -> HistoryKind {
        match self {
            AppAction::Undo => HistoryKind::Undo,
            AppAction::Redo => HistoryKind::Redo,
            _ => HistoryKind::Ordinary,
        }
    }
}

pub fn app_reducer(state: Arc<AppState>, action: &AppAction) -> Arc<AppState> {
    match action {
        AppAction::Select(id) if *state.selected == Some(*id) => state,
        AppAction::Select(id) => Arc::new(AppState {
            selected: Arc::new(Some(*id)),
            users: Arc::clone(&state.users),
        }),
        AppAction::Deselect if state.selected.is_none() => state,
        AppAction::Deselect => Arc::new(AppState {
            selected: Arc::new(None),
            users: Arc::clone(&state.users),
        }),
        AppAction::AddUser(id, name) => {
            let mut users = state.users.to_vec();
            users.push(User {
                id: *id,
                name: name.clone(),
            });
            Arc::new(AppState {
                selected: Arc::clone(&state.selected),
                users: Arc::new(users),
            })
        }
        AppAction::RemoveUser(id) => {
            if !state.users.iter().any(|u| u.id == *id) {
                return state;
            }
            let users: Vec<User> = state
                .users
                .iter()
                .filter(|u| u.id != *id)
                .cloned()
                .collect();
            Arc::new(AppState {
                selected: Arc::clone(&state.selected),
                users: Arc::new(users),
            })
        }
        AppAction::Undo | AppAction::Redo => state,
    }
}

pub fn user(id: u64, name: &str) -> AppAction {
    AppAction::AddUser(id, name.to_string())
}

pub fn boom(msg: &str) -> statefold::CallbackError {
    msg.to_string().into()
}
