//! Decoupled publish/subscribe with JSON payloads.
//!
//! An audit log and a search index both listen for user events without
//! knowing about each other. One failing subscriber never keeps the
//! others from being delivered to.

use serde_json::json;
use statefold::{EventBus, SubscriberId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const AUDIT: SubscriberId = SubscriberId::new(1);
const SEARCH: SubscriberId = SubscriberId::new(2);
const FLAKY: SubscriberId = SubscriberId::new(3);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bus: EventBus<serde_json::Value> = EventBus::new();

    bus.subscribe(AUDIT, "user_created", |data: &serde_json::Value| {
        println!("audit: user_created {}", data["name"]);
        Ok(())
    });

    let indexed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&indexed);
    bus.subscribe(SEARCH, "user_created", move |_: &serde_json::Value| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let delivered = bus.publish("user_created", &json!({"id": 1, "name": "ada"}))?;
    println!("delivered to {delivered} subscribers");

    // A misbehaving subscriber joins.
    bus.subscribe(FLAKY, "user_created", |_: &serde_json::Value| {
        Err("search backend timed out".into())
    });

    // Delivery still reaches everyone; the failures come back together.
    match bus.publish("user_created", &json!({"id": 2, "name": "grace"})) {
        Ok(_) => unreachable!("the flaky subscriber always fails"),
        Err(err) => {
            println!("{err}");
            for failure in &err.failures {
                println!("  subscriber {:?}: {}", failure.subscriber, failure.error);
            }
        }
    }
    println!("indexed so far: {}", indexed.load(Ordering::SeqCst));

    // Retire the flaky subscriber and carry on cleanly.
    bus.unsubscribe(FLAKY, "user_created");
    bus.publish("user_created", &json!({"id": 3, "name": "edsger"}))?;
    println!("indexed so far: {}", indexed.load(Ordering::SeqCst));

    Ok(())
}
