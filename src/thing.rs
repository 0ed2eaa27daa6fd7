use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, Weak};

use serde_json::json;
use valico::json_schema;

use crate::action::Action;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::property::Property;
use crate::subscriber::{Subscriber, Subscribers};
use crate::utils::{read_lock, write_lock};
use crate::value::Observer;

/// High-level Thing trait.
pub trait Thing: Send + Sync {
    /// Return the thing state as a Thing Description.
    ///
    /// Returns the state as a JSON map.
    fn as_thing_description(&self) -> serde_json::Map<String, serde_json::Value>;

    /// Return this thing as an Any.
    fn as_any(&self) -> &dyn Any;

    /// Return this thing as a mutable Any.
    fn as_mut_any(&mut self) -> &mut dyn Any;

    /// Get this thing's href.
    fn get_href(&self) -> String;

    /// Get this thing's href prefix, i.e. /0.
    fn get_href_prefix(&self) -> String;

    /// Get the UI href.
    fn get_ui_href(&self) -> Option<String>;

    /// Set the prefix of any hrefs associated with this thing.
    ///
    /// The prefix cascades to every property and action request.
    ///
    /// prefix -- the prefix
    fn set_href_prefix(&mut self, prefix: String);

    /// Set the href of this thing's custom UI.
    ///
    /// href -- the href
    fn set_ui_href(&mut self, href: String);

    /// Get the ID of the thing.
    fn get_id(&self) -> String;

    /// Get the title of the thing.
    fn get_title(&self) -> String;

    /// Get the type context of the thing.
    fn get_context(&self) -> String;

    /// Get the type(s) of the thing.
    fn get_type(&self) -> Vec<String>;

    /// Get the description of the thing.
    fn get_description(&self) -> String;

    /// Get the thing's properties as a JSON map.
    ///
    /// Returns the properties as a JSON map, i.e. name -> description.
    fn get_property_descriptions(&self) -> serde_json::Map<String, serde_json::Value>;

    /// Get the thing's action requests as an array.
    ///
    /// action_name -- Optional action name to get descriptions for
    fn get_action_descriptions(&self, action_name: Option<&str>) -> serde_json::Value;

    /// Get the thing's events as an array.
    ///
    /// event_name -- Optional event name to get descriptions for
    fn get_event_descriptions(&self, event_name: Option<&str>) -> serde_json::Value;

    /// Add a property to this thing, replacing any property of the same name.
    ///
    /// property -- property to add
    fn add_property(&mut self, property: Box<dyn Property>);

    /// Remove a property from this thing. Unknown names are ignored.
    ///
    /// property_name -- name of the property to remove
    fn remove_property(&mut self, property_name: &str);

    /// Find a property by name.
    fn find_property(&self, property_name: &str) -> Option<&dyn Property>;

    /// Get a property's value, if the property exists.
    fn get_property(&self, property_name: &str) -> Option<serde_json::Value>;

    /// Get a mapping of all properties and their values.
    ///
    /// Returns an object of propertyName -> value.
    fn get_properties(&self) -> serde_json::Map<String, serde_json::Value>;

    /// Determine whether or not this thing has a given property.
    fn has_property(&self, property_name: &str) -> bool;

    /// Set a property value.
    ///
    /// Unknown property names are a no-op; validation and forwarding errors
    /// are returned to the caller.
    ///
    /// property_name -- name of the property to set
    /// value -- value to set
    fn set_property(&mut self, property_name: &str, value: serde_json::Value) -> Result<()>;

    /// Get an action request.
    ///
    /// Returns the requested action if found, else None.
    fn get_action(
        &self,
        action_name: &str,
        action_id: &str,
    ) -> Option<Arc<RwLock<Box<dyn Action>>>>;

    /// Add a new event and notify subscribers.
    ///
    /// event -- the event that occurred
    fn add_event(&mut self, event: Box<dyn Event>);

    /// Add an available event.
    ///
    /// name -- name of the event
    /// metadata -- event metadata, i.e. type, description, etc., as a JSON map
    fn add_available_event(
        &mut self,
        name: String,
        metadata: serde_json::Map<String, serde_json::Value>,
    );

    /// Add a new action request, validating its input.
    ///
    /// action -- the action request
    /// input -- any action inputs
    fn add_action(
        &mut self,
        action: Arc<RwLock<Box<dyn Action>>>,
        input: Option<&serde_json::Value>,
    ) -> Result<()>;

    /// Cancel and remove an existing action request.
    ///
    /// Returns a boolean indicating the presence of the action.
    fn remove_action(&mut self, action_name: &str, action_id: &str) -> bool;

    /// Add an available action.
    ///
    /// name -- name of the action
    /// metadata -- action metadata, i.e. type, description, etc., as a JSON map
    fn add_available_action(
        &mut self,
        name: String,
        metadata: serde_json::Map<String, serde_json::Value>,
    );

    /// Add a new websocket subscriber.
    ///
    /// ws_id -- ID of the websocket
    /// subscriber -- sink for the websocket's messages
    fn add_subscriber(&mut self, ws_id: String, subscriber: Box<dyn Subscriber>);

    /// Remove a websocket subscriber, including from every event it follows.
    fn remove_subscriber(&mut self, ws_id: &str);

    /// Add a new websocket subscriber to an event.
    fn add_event_subscriber(&mut self, name: &str, ws_id: &str);

    /// Remove a websocket subscriber from an event.
    fn remove_event_subscriber(&mut self, name: &str, ws_id: &str);

    /// Notify all subscribers of a property change.
    ///
    /// name -- name of the property that changed
    /// value -- new property value
    fn property_notify(&self, name: &str, value: &serde_json::Value);

    /// Notify all subscribers of an action status change.
    ///
    /// action -- JSON description of the action whose status changed
    fn action_notify(&self, action: serde_json::Map<String, serde_json::Value>);

    /// Notify the event's subscribers of an event.
    ///
    /// name -- name of the event that occurred
    /// event -- JSON description of the event
    fn event_notify(&self, name: &str, event: serde_json::Map<String, serde_json::Value>);

    /// Start the specified action.
    fn start_action(&mut self, name: &str, id: &str);

    /// Cancel the specified action.
    fn cancel_action(&mut self, name: &str, id: &str);

    /// Finish the specified action.
    fn finish_action(&mut self, name: &str, id: &str);
}

/// Basic web thing implementation.
///
/// This can easily be used by other things to handle most of the boring work.
pub struct BaseThing {
    id: String,
    context: String,
    type_: Vec<String>,
    title: String,
    description: String,
    properties: Vec<Box<dyn Property>>,
    available_actions: Vec<AvailableAction>,
    available_events: Vec<AvailableEvent>,
    actions: HashMap<String, Vec<Arc<RwLock<Box<dyn Action>>>>>,
    events: Vec<Box<dyn Event>>,
    subscribers: Arc<Subscribers>,
    href_prefix: String,
    ui_href: Option<String>,
}

impl BaseThing {
    /// Create a new BaseThing.
    ///
    /// id -- the thing's unique ID, usually a URI
    /// title -- the thing's title
    /// type -- the thing's type(s)
    /// description -- description of the thing
    pub fn new(
        id: String,
        title: String,
        type_: Option<Vec<String>>,
        description: Option<String>,
    ) -> BaseThing {
        BaseThing {
            id,
            context: "https://iot.mozilla.org/schemas".to_owned(),
            type_: type_.unwrap_or_default(),
            title,
            description: description.unwrap_or_default(),
            properties: Vec::new(),
            available_actions: Vec::new(),
            available_events: Vec::new(),
            actions: HashMap::new(),
            events: Vec::new(),
            subscribers: Arc::new(Subscribers::new()),
            href_prefix: "".to_owned(),
            ui_href: None,
        }
    }

    fn find_available_action(&self, name: &str) -> Option<&AvailableAction> {
        self.available_actions.iter().find(|a| a.name == name)
    }

    fn find_available_event_mut(&mut self, name: &str) -> Option<&mut AvailableEvent> {
        self.available_events.iter_mut().find(|e| e.name == name)
    }

    fn link(rel: &str, href: String) -> serde_json::Value {
        json!({
            "rel": rel,
            "href": href,
        })
    }
}

impl Thing for BaseThing {
    fn as_thing_description(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut description = serde_json::Map::new();

        description.insert("id".to_owned(), json!(self.id));
        description.insert("title".to_owned(), json!(self.title));
        description.insert("@context".to_owned(), json!(self.context));
        description.insert("@type".to_owned(), json!(self.type_));
        description.insert(
            "properties".to_owned(),
            serde_json::Value::Object(self.get_property_descriptions()),
        );

        let mut actions = serde_json::Map::new();
        for action in &self.available_actions {
            let mut metadata = action.metadata.clone();
            metadata.insert(
                "links".to_owned(),
                json!([BaseThing::link(
                    "action",
                    format!("{}/actions/{}", self.href_prefix, action.name),
                )]),
            );
            actions.insert(action.name.clone(), serde_json::Value::Object(metadata));
        }
        description.insert("actions".to_owned(), serde_json::Value::Object(actions));

        let mut events = serde_json::Map::new();
        for event in &self.available_events {
            let mut metadata = event.metadata.clone();
            metadata.insert(
                "links".to_owned(),
                json!([BaseThing::link(
                    "event",
                    format!("{}/events/{}", self.href_prefix, event.name),
                )]),
            );
            events.insert(event.name.clone(), serde_json::Value::Object(metadata));
        }
        description.insert("events".to_owned(), serde_json::Value::Object(events));

        let mut links = vec![
            BaseThing::link("properties", format!("{}/properties", self.href_prefix)),
            BaseThing::link("actions", format!("{}/actions", self.href_prefix)),
            BaseThing::link("events", format!("{}/events", self.href_prefix)),
        ];

        if let Some(ui_href) = &self.ui_href {
            links.push(json!({
                "rel": "alternate",
                "mediaType": "text/html",
                "href": ui_href,
            }));
        }

        description.insert("links".to_owned(), serde_json::Value::Array(links));

        if !self.description.is_empty() {
            description.insert("description".to_owned(), json!(self.description));
        }

        description
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_mut_any(&mut self) -> &mut dyn Any {
        self
    }

    fn get_href(&self) -> String {
        if self.href_prefix.is_empty() {
            "/".to_owned()
        } else {
            self.href_prefix.clone()
        }
    }

    fn get_href_prefix(&self) -> String {
        self.href_prefix.clone()
    }

    fn get_ui_href(&self) -> Option<String> {
        self.ui_href.clone()
    }

    fn set_href_prefix(&mut self, prefix: String) {
        self.href_prefix = prefix.clone();

        for property in self.properties.iter_mut() {
            property.set_href_prefix(prefix.clone());
        }

        for actions in self.actions.values() {
            for action in actions {
                write_lock(action).set_href_prefix(prefix.clone());
            }
        }
    }

    fn set_ui_href(&mut self, href: String) {
        self.ui_href = Some(href);
    }

    fn get_id(&self) -> String {
        self.id.clone()
    }

    fn get_title(&self) -> String {
        self.title.clone()
    }

    fn get_context(&self) -> String {
        self.context.clone()
    }

    fn get_type(&self) -> Vec<String> {
        self.type_.clone()
    }

    fn get_description(&self) -> String {
        self.description.clone()
    }

    fn get_property_descriptions(&self) -> serde_json::Map<String, serde_json::Value> {
        self.properties
            .iter()
            .map(|p| {
                (
                    p.get_name(),
                    serde_json::Value::Object(p.as_property_description()),
                )
            })
            .collect()
    }

    fn get_action_descriptions(&self, action_name: Option<&str>) -> serde_json::Value {
        let mut descriptions = Vec::new();

        for available in &self.available_actions {
            if action_name.map_or(false, |n| n != available.name) {
                continue;
            }

            if let Some(actions) = self.actions.get(&available.name) {
                for action in actions {
                    descriptions.push(serde_json::Value::Object(
                        read_lock(action).as_action_description(),
                    ));
                }
            }
        }

        serde_json::Value::Array(descriptions)
    }

    fn get_event_descriptions(&self, event_name: Option<&str>) -> serde_json::Value {
        let descriptions = self
            .events
            .iter()
            .filter(|e| event_name.map_or(true, |n| e.get_name() == n))
            .map(|e| serde_json::Value::Object(e.as_event_description()))
            .collect();

        serde_json::Value::Array(descriptions)
    }

    fn add_property(&mut self, mut property: Box<dyn Property>) {
        let name = property.get_name();
        property.set_href_prefix(self.href_prefix.clone());

        let position = self.properties.iter().position(|p| p.get_name() == name);
        if let Some(idx) = position {
            self.properties[idx].value().clear_observer();
        }

        property.value().set_observer(Box::new(PropertyObserver {
            name: name.clone(),
            subscribers: Arc::downgrade(&self.subscribers),
        }));

        match position {
            Some(idx) => self.properties[idx] = property,
            None => self.properties.push(property),
        }
    }

    fn remove_property(&mut self, property_name: &str) {
        if let Some(property) = self.find_property(property_name) {
            property.value().clear_observer();
        }

        self.properties.retain(|p| p.get_name() != property_name);
    }

    fn find_property(&self, property_name: &str) -> Option<&dyn Property> {
        self.properties
            .iter()
            .find(|p| p.get_name() == property_name)
            .map(|p| p.as_ref())
    }

    fn get_property(&self, property_name: &str) -> Option<serde_json::Value> {
        self.find_property(property_name).map(|p| p.get_value())
    }

    fn get_properties(&self) -> serde_json::Map<String, serde_json::Value> {
        self.properties
            .iter()
            .map(|p| (p.get_name(), p.get_value()))
            .collect()
    }

    fn has_property(&self, property_name: &str) -> bool {
        self.find_property(property_name).is_some()
    }

    fn set_property(&mut self, property_name: &str, value: serde_json::Value) -> Result<()> {
        match self.find_property(property_name) {
            Some(property) => property.set_value(value),
            None => Ok(()),
        }
    }

    fn get_action(
        &self,
        action_name: &str,
        action_id: &str,
    ) -> Option<Arc<RwLock<Box<dyn Action>>>> {
        self.actions
            .get(action_name)?
            .iter()
            .find(|a| read_lock(a).get_id() == action_id)
            .cloned()
    }

    fn add_event(&mut self, event: Box<dyn Event>) {
        self.event_notify(&event.get_name(), event.as_event_description());
        self.events.push(event);
    }

    fn add_available_event(
        &mut self,
        name: String,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) {
        self.available_events.retain(|e| e.name != name);
        self.available_events.push(AvailableEvent {
            name,
            metadata,
            subscribers: HashSet::new(),
        });
    }

    fn add_action(
        &mut self,
        action: Arc<RwLock<Box<dyn Action>>>,
        input: Option<&serde_json::Value>,
    ) -> Result<()> {
        let action_name = read_lock(&action).get_name();

        match self.find_available_action(&action_name) {
            None => return Err(Error::ActionNotFound(action_name)),
            Some(available) => available.validate_action_input(input)?,
        }

        let description = {
            let mut a = write_lock(&action);
            a.set_href_prefix(self.href_prefix.clone());
            a.as_action_description()
        };
        self.action_notify(description);
        self.actions.entry(action_name).or_default().push(action);

        Ok(())
    }

    fn remove_action(&mut self, action_name: &str, action_id: &str) -> bool {
        if self.get_action(action_name, action_id).is_none() {
            return false;
        }

        self.cancel_action(action_name, action_id);
        if let Some(actions) = self.actions.get_mut(action_name) {
            actions.retain(|a| read_lock(a).get_id() != action_id);
        }

        true
    }

    fn add_available_action(
        &mut self,
        name: String,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) {
        self.available_actions.retain(|a| a.name != name);
        self.actions.entry(name.clone()).or_default();
        self.available_actions.push(AvailableAction { name, metadata });
    }

    fn add_subscriber(&mut self, ws_id: String, subscriber: Box<dyn Subscriber>) {
        self.subscribers.add(ws_id, subscriber);
    }

    fn remove_subscriber(&mut self, ws_id: &str) {
        self.subscribers.remove(ws_id);

        for event in self.available_events.iter_mut() {
            event.subscribers.remove(ws_id);
        }
    }

    fn add_event_subscriber(&mut self, name: &str, ws_id: &str) {
        if let Some(event) = self.find_available_event_mut(name) {
            event.subscribers.insert(ws_id.to_owned());
        }
    }

    fn remove_event_subscriber(&mut self, name: &str, ws_id: &str) {
        if let Some(event) = self.find_available_event_mut(name) {
            event.subscribers.remove(ws_id);
        }
    }

    fn property_notify(&self, name: &str, value: &serde_json::Value) {
        self.subscribers.property_notify(name, value);
    }

    fn action_notify(&self, action: serde_json::Map<String, serde_json::Value>) {
        let message = json!({
            "messageType": "actionStatus",
            "data": action,
        })
        .to_string();

        self.subscribers.broadcast(&message);
    }

    fn event_notify(&self, name: &str, event: serde_json::Map<String, serde_json::Value>) {
        let available = match self.available_events.iter().find(|e| e.name == name) {
            Some(available) => available,
            None => return,
        };

        let message = json!({
            "messageType": "event",
            "data": event,
        })
        .to_string();

        self.subscribers.send_to(&available.subscribers, &message);
    }

    fn start_action(&mut self, name: &str, id: &str) {
        if let Some(action) = self.get_action(name, id) {
            let mut a = write_lock(&action);
            a.start();
            self.action_notify(a.as_action_description());
            a.perform_action();
        }
    }

    fn cancel_action(&mut self, name: &str, id: &str) {
        if let Some(action) = self.get_action(name, id) {
            let mut a = write_lock(&action);
            a.cancel();
            self.action_notify(a.as_action_description());
        }
    }

    fn finish_action(&mut self, name: &str, id: &str) {
        if let Some(action) = self.get_action(name, id) {
            let mut a = write_lock(&action);
            a.finish();
            self.action_notify(a.as_action_description());
        }
    }
}

/// Forwards value changes of one property to the owning thing's subscribers.
struct PropertyObserver {
    name: String,
    subscribers: Weak<Subscribers>,
}

impl Observer for PropertyObserver {
    fn notify(&self, value: &serde_json::Value) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.property_notify(&self.name, value);
        }
    }
}

/// An action available to be requested.
struct AvailableAction {
    name: String,
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl AvailableAction {
    /// Validate the input for a new action against the `input` schema.
    fn validate_action_input(&self, input: Option<&serde_json::Value>) -> Result<()> {
        let schema = match self.metadata.get("input") {
            Some(schema) => schema.clone(),
            None => return Ok(()),
        };

        let mut scope = json_schema::Scope::new();
        let validator = scope
            .compile_and_return(schema, false)
            .map_err(|_| Error::InvalidActionInput)?;

        let input = input.cloned().unwrap_or(serde_json::Value::Null);
        if validator.validate(&input).is_valid() {
            Ok(())
        } else {
            Err(Error::InvalidActionInput)
        }
    }
}

/// An event available for subscription, with the IDs of its subscribers.
struct AvailableEvent {
    name: String,
    metadata: serde_json::Map<String, serde_json::Value>,
    subscribers: HashSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::BaseAction;
    use crate::event::BaseEvent;
    use crate::property::BaseProperty;
    use crate::subscriber::tests::{Broken, Inbox};
    use crate::value::Value;

    fn metadata(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    fn lamp() -> BaseThing {
        let mut thing = BaseThing::new(
            "urn:dev:ops:my-lamp-1234".to_owned(),
            "My Lamp".to_owned(),
            Some(vec!["OnOffSwitch".to_owned(), "Light".to_owned()]),
            Some("A web connected lamp".to_owned()),
        );
        thing.add_property(Box::new(BaseProperty::new(
            "on".to_owned(),
            Value::with_forwarder(json!(true), |_| Ok(())),
            Some(metadata(json!({"type": "boolean"}))),
        )));
        thing.add_property(Box::new(BaseProperty::new(
            "brightness".to_owned(),
            Value::with_forwarder(json!(50), |_| Ok(())),
            Some(metadata(
                json!({"type": "integer", "minimum": 0, "maximum": 100}),
            )),
        )));
        thing
    }

    #[test]
    fn description_lists_properties_in_order() {
        let description = lamp().as_thing_description();

        assert_eq!(description["id"], json!("urn:dev:ops:my-lamp-1234"));
        assert_eq!(description["title"], json!("My Lamp"));
        assert_eq!(description["@type"], json!(["OnOffSwitch", "Light"]));
        assert_eq!(description["description"], json!("A web connected lamp"));
        assert_eq!(description["properties"]["on"]["type"], json!("boolean"));
        assert_eq!(description["properties"]["brightness"]["maximum"], json!(100));

        let names: Vec<&String> = description["properties"]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(names, vec!["on", "brightness"]);
        assert_eq!(description["links"][0], json!({"rel": "properties", "href": "/properties"}));
    }

    #[test]
    fn href_prefix_cascades_to_properties() {
        let mut thing = lamp();
        thing.set_href_prefix("/2".to_owned());

        assert_eq!(thing.get_href(), "/2");
        let description = thing.as_thing_description();
        assert_eq!(
            description["properties"]["on"]["links"][0]["href"],
            json!("/2/properties/on")
        );

        thing.add_property(Box::new(BaseProperty::new(
            "late".to_owned(),
            Value::read_only(json!(1)),
            None,
        )));
        assert_eq!(
            thing.get_property_descriptions()["late"]["links"][0]["href"],
            json!("/2/properties/late")
        );
    }

    #[test]
    fn duplicate_property_replaces_previous() {
        let mut thing = lamp();
        thing.add_property(Box::new(BaseProperty::new(
            "on".to_owned(),
            Value::read_only(json!(false)),
            None,
        )));

        assert_eq!(thing.get_property("on"), Some(json!(false)));
        assert_eq!(thing.get_properties().len(), 2);
        assert_eq!(thing.get_properties().keys().next().unwrap(), "on");
    }

    #[test]
    fn remove_and_lookup_properties() {
        let mut thing = lamp();
        assert!(thing.has_property("on"));
        thing.remove_property("on");
        thing.remove_property("missing");
        assert!(!thing.has_property("on"));
        assert!(thing.find_property("on").is_none());
        assert_eq!(thing.get_property("on"), None);
        assert_eq!(thing.get_properties(), metadata(json!({"brightness": 50})));
    }

    #[test]
    fn removed_property_no_longer_reports() {
        let mut thing = BaseThing::new("urn:sensor".to_owned(), "Sensor".to_owned(), None, None);
        let level = Value::read_only(json!(0));
        thing.add_property(Box::new(BaseProperty::new(
            "level".to_owned(),
            level.clone(),
            None,
        )));
        let inbox = Inbox::default();
        thing.add_subscriber("ws".to_owned(), Box::new(inbox.clone()));

        thing.remove_property("level");
        assert!(level.notify_of_external_update(json!(7)));

        assert!(inbox.messages().is_empty());
    }

    #[test]
    fn replaced_property_no_longer_reports() {
        let mut thing = lamp();
        let old = Value::with_forwarder(json!(1), |_| Ok(()));
        thing.add_property(Box::new(BaseProperty::new(
            "level".to_owned(),
            old.clone(),
            None,
        )));
        thing.add_property(Box::new(BaseProperty::new(
            "level".to_owned(),
            Value::read_only(json!(2)),
            None,
        )));
        let inbox = Inbox::default();
        thing.add_subscriber("ws".to_owned(), Box::new(inbox.clone()));

        old.notify_of_external_update(json!(9));

        assert!(inbox.messages().is_empty());
        assert_eq!(thing.get_property("level"), Some(json!(2)));
    }

    #[test]
    fn set_property_notifies_subscribers() {
        let mut thing = lamp();
        let inbox = Inbox::default();
        thing.add_subscriber("ws".to_owned(), Box::new(inbox.clone()));

        thing.set_property("brightness", json!(75)).unwrap();

        assert_eq!(thing.get_property("brightness"), Some(json!(75)));
        assert_eq!(
            inbox.messages(),
            vec![json!({"messageType": "propertyStatus", "data": {"brightness": 75}})]
        );
    }

    #[test]
    fn rejected_write_does_not_notify() {
        let mut thing = lamp();
        let inbox = Inbox::default();
        thing.add_subscriber("ws".to_owned(), Box::new(inbox.clone()));

        assert!(thing.set_property("brightness", json!(150)).is_err());
        assert_eq!(thing.get_property("brightness"), Some(json!(50)));
        assert!(inbox.messages().is_empty());
    }

    #[test]
    fn set_unknown_property_is_noop() {
        let mut thing = lamp();
        assert_eq!(thing.set_property("color", json!("red")), Ok(()));
        assert!(!thing.has_property("color"));
    }

    #[test]
    fn external_update_reaches_every_subscriber_once() {
        let mut thing = BaseThing::new("urn:sensor".to_owned(), "Sensor".to_owned(), None, None);
        let level = Value::read_only(json!(0));
        thing.add_property(Box::new(BaseProperty::new(
            "level".to_owned(),
            level.clone(),
            Some(metadata(json!({"type": "number", "readOnly": true}))),
        )));

        let first = Inbox::default();
        let second = Inbox::default();
        thing.add_subscriber("broken".to_owned(), Box::new(Broken));
        thing.add_subscriber("first".to_owned(), Box::new(first.clone()));
        thing.add_subscriber("second".to_owned(), Box::new(second.clone()));

        level.notify_of_external_update(json!(42.5));
        level.notify_of_external_update(json!(42.5));

        let expected = vec![json!({"messageType": "propertyStatus", "data": {"level": 42.5}})];
        assert_eq!(first.messages(), expected);
        assert_eq!(second.messages(), expected);
        assert_eq!(thing.get_property("level"), Some(json!(42.5)));
    }

    #[test]
    fn removed_subscriber_stops_receiving() {
        let mut thing = lamp();
        let inbox = Inbox::default();
        thing.add_available_event("overheated".to_owned(), serde_json::Map::new());
        thing.add_subscriber("ws".to_owned(), Box::new(inbox.clone()));
        thing.add_event_subscriber("overheated", "ws");

        thing.remove_subscriber("ws");
        thing.set_property("on", json!(false)).unwrap();
        thing.add_event(Box::new(BaseEvent::new("overheated".to_owned(), None)));

        assert!(inbox.messages().is_empty());
        assert!(thing.available_events[0].subscribers.is_empty());
    }

    #[test]
    fn events_go_to_event_subscribers_only() {
        let mut thing = lamp();
        thing.add_available_event(
            "overheated".to_owned(),
            metadata(json!({"type": "number", "unit": "degree celsius"})),
        );

        let following = Inbox::default();
        let bystander = Inbox::default();
        thing.add_subscriber("following".to_owned(), Box::new(following.clone()));
        thing.add_subscriber("bystander".to_owned(), Box::new(bystander.clone()));
        thing.add_event_subscriber("overheated", "following");
        thing.add_event_subscriber("unknown", "bystander");

        thing.add_event(Box::new(BaseEvent::new("overheated".to_owned(), Some(json!(102)))));

        let messages = following.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["messageType"], json!("event"));
        assert_eq!(messages[0]["data"]["overheated"]["data"], json!(102));
        assert!(bystander.messages().is_empty());

        assert_eq!(thing.get_event_descriptions(None).as_array().unwrap().len(), 1);
        assert_eq!(
            thing.get_event_descriptions(Some("other")),
            json!([])
        );
        assert_eq!(
            thing.as_thing_description()["events"]["overheated"]["links"][0]["href"],
            json!("/events/overheated")
        );
    }

    fn fade(id: &str, input: serde_json::Value) -> Arc<RwLock<Box<dyn Action>>> {
        Arc::new(RwLock::new(Box::new(BaseAction::new(
            id.to_owned(),
            "fade".to_owned(),
            input.as_object().cloned(),
            Weak::<RwLock<Box<dyn Thing>>>::new(),
        ))))
    }

    fn with_fade() -> BaseThing {
        let mut thing = lamp();
        thing.add_available_action(
            "fade".to_owned(),
            metadata(json!({
                "title": "Fade",
                "input": {
                    "type": "object",
                    "required": ["brightness", "duration"],
                    "properties": {
                        "brightness": {"type": "integer", "minimum": 0, "maximum": 100},
                        "duration": {"type": "integer", "minimum": 1}
                    }
                }
            })),
        );
        thing
    }

    #[test]
    fn action_input_is_validated() {
        let mut thing = with_fade();
        let good = json!({"brightness": 10, "duration": 5});
        let bad = json!({"brightness": 10});

        assert_eq!(
            thing.add_action(fade("1", bad.clone()), Some(&bad)),
            Err(Error::InvalidActionInput)
        );
        assert!(thing.add_action(fade("2", good.clone()), Some(&good)).is_ok());
        assert!(thing.get_action("fade", "1").is_none());
        assert!(thing.get_action("fade", "2").is_some());
    }

    #[test]
    fn unknown_action_is_rejected() {
        let mut thing = lamp();
        let action: Arc<RwLock<Box<dyn Action>>> = Arc::new(RwLock::new(Box::new(
            BaseAction::new("1".to_owned(), "explode".to_owned(), None, Weak::<RwLock<Box<dyn Thing>>>::new()),
        )));
        assert_eq!(
            thing.add_action(action, None),
            Err(Error::ActionNotFound("explode".to_owned()))
        );
    }

    #[test]
    fn action_lifecycle_is_broadcast() {
        let mut thing = with_fade();
        thing.set_href_prefix("/0".to_owned());
        let inbox = Inbox::default();
        thing.add_subscriber("ws".to_owned(), Box::new(inbox.clone()));

        let input = json!({"brightness": 10, "duration": 5});
        thing.add_action(fade("7", input.clone()), Some(&input)).unwrap();
        thing.start_action("fade", "7");
        thing.finish_action("fade", "7");

        let statuses: Vec<serde_json::Value> = inbox
            .messages()
            .iter()
            .map(|m| m["data"]["fade"]["status"].clone())
            .collect();
        assert_eq!(statuses, vec![json!("created"), json!("pending"), json!("completed")]);

        let descriptions = thing.get_action_descriptions(Some("fade"));
        assert_eq!(descriptions[0]["fade"]["href"], json!("/0/actions/fade/7"));

        assert!(thing.remove_action("fade", "7"));
        assert!(!thing.remove_action("fade", "7"));
        assert_eq!(thing.get_action_descriptions(None), json!([]));
    }

    #[test]
    fn ui_href_adds_alternate_link() {
        let mut thing = lamp();
        thing.set_ui_href("https://example.com/ui".to_owned());
        let links = thing.as_thing_description()["links"].clone();
        assert_eq!(
            links.as_array().unwrap().last().unwrap(),
            &json!({"rel": "alternate", "mediaType": "text/html", "href": "https://example.com/ui"})
        );
    }
}
