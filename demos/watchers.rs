//! Fine-grained change notifications through selectors.
//!
//! Two watchers observe different slices of the same state. Because the
//! reducer shares untouched slices between versions, each watcher fires
//! only when its own slice is actually replaced.

use statefold::DataStore;
use std::sync::Arc;

struct Profile {
    name: Arc<String>,
    theme: Arc<String>,
}

enum ProfileAction {
    Rename(String),
    SwitchTheme(String),
}

fn profile_reducer(state: Arc<Profile>, action: &ProfileAction) -> Arc<Profile> {
    match action {
        ProfileAction::Rename(name) if *state.name == *name => state,
        ProfileAction::Rename(name) => Arc::new(Profile {
            name: Arc::new(name.clone()),
            theme: Arc::clone(&state.theme),
        }),
        ProfileAction::SwitchTheme(theme) if *state.theme == *theme => state,
        ProfileAction::SwitchTheme(theme) => Arc::new(Profile {
            name: Arc::clone(&state.name),
            theme: Arc::new(theme.clone()),
        }),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let initial = Profile {
        name: Arc::new("anonymous".to_string()),
        theme: Arc::new("light".to_string()),
    };
    let store = DataStore::new(initial, profile_reducer);

    // watch_now primes each watcher with the current slice before any
    // dispatch happens.
    store.watch_now(
        |p: &Profile| Arc::clone(&p.name),
        |name| {
            println!("name watcher:  {name}");
            Ok(())
        },
    )?;
    store.watch_now(
        |p: &Profile| Arc::clone(&p.theme),
        |theme| {
            println!("theme watcher: {theme}");
            Ok(())
        },
    )?;

    println!("-- rename --");
    store.dispatch(ProfileAction::Rename("ada".to_string()))?;

    // Only the theme watcher fires; the name slice keeps its allocation.
    println!("-- switch theme --");
    store.dispatch(ProfileAction::SwitchTheme("dark".to_string()))?;

    // The reducer declines identical values, so nobody fires at all.
    println!("-- rename to the same name --");
    store.dispatch(ProfileAction::Rename("ada".to_string()))?;

    println!("-- done --");
    Ok(())
}
