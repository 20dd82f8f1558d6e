//! A todo list with bounded undo/redo.
//!
//! Shows the history decorator wrapped around an ordinary reducer
//! inside a store: ordinary actions record snapshots, undo and redo
//! swap them back in by pointer, never by rebuilding.

use statefold::{DataStore, HistoryAction, HistoryKind, UndoRedo};
use std::sync::Arc;

#[derive(Clone)]
struct TodoItem {
    id: u64,
    text: String,
    done: bool,
}

struct TodoList {
    items: Arc<Vec<TodoItem>>,
    next_id: u64,
}

enum TodoAction {
    Add(String),
    Complete(u64),
    Undo,
    Redo,
}

impl HistoryAction for TodoAction {
    fn history_kind(&self) -> HistoryKind {
        match self {
            TodoAction::Undo => HistoryKind::Undo,
            TodoAction::Redo => HistoryKind::Redo,
            _ => HistoryKind::Ordinary,
        }
    }
}

fn todo_reducer(state: Arc<TodoList>, action: &TodoAction) -> Arc<TodoList> {
    match action {
        TodoAction::Add(text) => {
            let mut items = state.items.to_vec();
            items.push(TodoItem {
                id: state.next_id,
                text: text.clone(),
                done: false,
            });
            Arc::new(TodoList {
                items: Arc::new(items),
                next_id: state.next_id + 1,
            })
        }
        TodoAction::Complete(id) => {
            // Completing something unknown (or already done) changes
            // nothing, so history stays untouched.
            let Some(pos) = state
                .items
                .iter()
                .position(|i| i.id == *id && !i.done)
            else {
                return state;
            };
            let mut items = state.items.to_vec();
            items[pos].done = true;
            Arc::new(TodoList {
                items: Arc::new(items),
                next_id: state.next_id,
            })
        }
        _ => state,
    }
}

fn render(label: &str, state: &TodoList) {
    println!("{label}:");
    for item in state.items.iter() {
        let mark = if item.done { "x" } else { " " };
        println!("  [{mark}] {} {}", item.id, item.text);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let initial = TodoList {
        items: Arc::new(Vec::new()),
        next_id: 0,
    };
    let store = DataStore::new(initial, UndoRedo::wrap(todo_reducer).with_depth(10));

    // Build up some state
    store.dispatch(TodoAction::Add("buy milk".to_string()))?;
    store.dispatch(TodoAction::Add("write docs".to_string()))?;
    store.dispatch(TodoAction::Add("fix bug".to_string()))?;
    store.dispatch(TodoAction::Complete(0))?;
    render("After four actions", &store.state());

    // Step back twice
    store.dispatch(TodoAction::Undo)?;
    store.dispatch(TodoAction::Undo)?;
    render("After two undos", &store.state());

    // Step forward once
    store.dispatch(TodoAction::Redo)?;
    render("After one redo", &store.state());

    // A no-op never burns the redo path: item 0 is not completable
    // twice, so this leaves everything (including history) alone.
    store.dispatch(TodoAction::Complete(99))?;
    store.dispatch(TodoAction::Redo)?;
    render("After no-op and final redo", &store.state());

    Ok(())
}
