/// High-level Event base class implementation.
use serde_json::json;

use crate::utils::timestamp;

/// An Event represents an individual event from a thing.
pub trait Event: Send + Sync {
    /// Get the event description.
    ///
    /// Returns a JSON map describing the event.
    fn as_event_description(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut inner = serde_json::Map::new();
        if let Some(data) = self.get_data() {
            inner.insert("data".to_owned(), data);
        }
        inner.insert("timestamp".to_owned(), json!(self.get_time()));

        let mut description = serde_json::Map::new();
        description.insert(self.get_name(), serde_json::Value::Object(inner));
        description
    }

    /// Get the event's name.
    fn get_name(&self) -> String;

    /// Get the event's data.
    fn get_data(&self) -> Option<serde_json::Value>;

    /// Get the event's timestamp.
    fn get_time(&self) -> String;
}

/// Basic event implementation, timestamped at creation.
pub struct BaseEvent {
    name: String,
    data: Option<serde_json::Value>,
    time: String,
}

impl BaseEvent {
    /// Create a new BaseEvent.
    ///
    /// name -- name of the event
    /// data -- data associated with the event
    pub fn new(name: String, data: Option<serde_json::Value>) -> BaseEvent {
        BaseEvent {
            name,
            data,
            time: timestamp(),
        }
    }
}

impl Event for BaseEvent {
    fn get_name(&self) -> String {
        self.name.clone()
    }

    fn get_data(&self) -> Option<serde_json::Value> {
        self.data.clone()
    }

    fn get_time(&self) -> String {
        self.time.clone()
    }
}
