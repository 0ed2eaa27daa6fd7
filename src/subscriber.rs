/// Websocket-like sinks that receive thing notifications.
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde_json::json;

use crate::error::Result;

/// A live connection that receives serialized notification messages.
pub trait Subscriber: Send + Sync {
    /// Deliver a message to the remote end.
    ///
    /// message -- serialized JSON message
    fn send(&self, message: String) -> Result<()>;
}

/// The set of subscribers attached to one thing, keyed by connection ID.
///
/// Fan-out never fails: a subscriber that cannot take a message is logged and
/// skipped, and the remaining subscribers still receive it.
#[derive(Default)]
pub struct Subscribers {
    sinks: RwLock<HashMap<String, Box<dyn Subscriber>>>,
}

impl Subscribers {
    /// Create an empty subscriber set.
    pub fn new() -> Subscribers {
        Subscribers::default()
    }

    /// Add a subscriber, replacing any previous one with the same ID.
    pub fn add(&self, id: String, subscriber: Box<dyn Subscriber>) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, subscriber);
    }

    /// Remove a subscriber. Returns whether it was present.
    pub fn remove(&self, id: &str) -> bool {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    /// Whether a subscriber with this ID is attached.
    pub fn contains(&self, id: &str) -> bool {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Number of attached subscribers.
    pub fn len(&self) -> usize {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no subscriber is attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send a message to every subscriber.
    ///
    /// Returns the number of successful deliveries.
    pub fn broadcast(&self, message: &str) -> usize {
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;
        for (id, sink) in sinks.iter() {
            if deliver(id, sink.as_ref(), message) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Send a message to the listed subscribers only.
    ///
    /// Returns the number of successful deliveries.
    pub fn send_to<'a, I>(&self, ids: I, message: &str) -> usize
    where
        I: IntoIterator<Item = &'a String>,
    {
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;
        for id in ids {
            if let Some(sink) = sinks.get(id) {
                if deliver(id, sink.as_ref(), message) {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Notify all subscribers of a property change.
    ///
    /// name -- name of the property that changed
    /// value -- new property value
    pub fn property_notify(&self, name: &str, value: &serde_json::Value) -> usize {
        let message = json!({
            "messageType": "propertyStatus",
            "data": {
                name: value
            }
        })
        .to_string();

        self.broadcast(&message)
    }
}

fn deliver(id: &str, sink: &dyn Subscriber, message: &str) -> bool {
    match sink.send(message.to_owned()) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Dropping message for subscriber {}: {}", id, e);
            false
        }
    }
}
