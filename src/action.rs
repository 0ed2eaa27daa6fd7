/// High-level Action base class implementation.
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use serde_json::json;

use crate::thing::Thing;
use crate::utils::timestamp;

/// Lifecycle of an action request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    /// Accepted but not started yet.
    Created,
    /// Currently running.
    Pending,
    /// Ran to completion.
    Completed,
    /// Cancelled before completion.
    Cancelled,
}

impl ActionStatus {
    /// The status as it appears in action descriptions.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Created => "created",
            ActionStatus::Pending => "pending",
            ActionStatus::Completed => "completed",
            ActionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An Action represents an individual action request on a thing.
///
/// Implementors own a `BaseAction` holding the bookkeeping and provide the
/// device-specific `perform_action`. `perform_action` is called while the
/// thing is locked; work that needs the thing must run on another thread.
pub trait Action: Send + Sync {
    /// Get the bookkeeping record of this action.
    fn base(&self) -> &BaseAction;

    /// Get the mutable bookkeeping record of this action.
    fn base_mut(&mut self) -> &mut BaseAction;

    /// Override this with the code necessary to perform the action.
    fn perform_action(&mut self);

    /// Override this with the code necessary to cancel the action.
    fn cancel(&mut self) {
        self.base_mut().set_status(ActionStatus::Cancelled);
    }

    /// Start performing the action.
    fn start(&mut self) {
        self.base_mut().set_status(ActionStatus::Pending);
    }

    /// Finish performing the action.
    fn finish(&mut self) {
        self.base_mut().finish();
    }

    /// Get the action description.
    ///
    /// Returns a JSON map describing the action.
    fn as_action_description(&self) -> serde_json::Map<String, serde_json::Value> {
        self.base().as_action_description()
    }

    /// Set the prefix of any hrefs associated with this action.
    ///
    /// prefix -- the prefix
    fn set_href_prefix(&mut self, prefix: String) {
        self.base_mut().href_prefix = prefix;
    }

    /// Get this action's ID.
    fn get_id(&self) -> String {
        self.base().id.clone()
    }

    /// Get this action's name.
    fn get_name(&self) -> String {
        self.base().name.clone()
    }

    /// Get this action's href.
    fn get_href(&self) -> String {
        self.base().get_href()
    }

    /// Get this action's status.
    fn get_status(&self) -> ActionStatus {
        self.base().status
    }

    /// Get the inputs for this action.
    fn get_input(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.base().input.clone()
    }

    /// Get the thing associated with this action, if it still exists.
    fn get_thing(&self) -> Option<Arc<RwLock<Box<dyn Thing>>>> {
        self.base().thing.upgrade()
    }
}

/// Bookkeeping shared by all actions: identity, input, status and timestamps.
pub struct BaseAction {
    id: String,
    name: String,
    input: Option<serde_json::Map<String, serde_json::Value>>,
    thing: Weak<RwLock<Box<dyn Thing>>>,
    href_prefix: String,
    href: String,
    status: ActionStatus,
    time_requested: String,
    time_completed: Option<String>,
}

impl BaseAction {
    /// Create a new BaseAction.
    ///
    /// id -- ID of this action
    /// name -- name of the action
    /// input -- any action inputs
    /// thing -- the Thing this action belongs to
    pub fn new(
        id: String,
        name: String,
        input: Option<serde_json::Map<String, serde_json::Value>>,
        thing: Weak<RwLock<Box<dyn Thing>>>,
    ) -> BaseAction {
        let href = format!("/actions/{}/{}", name, id);

        BaseAction {
            id,
            name,
            input,
            thing,
            href_prefix: "".to_owned(),
            href,
            status: ActionStatus::Created,
            time_requested: timestamp(),
            time_completed: None,
        }
    }

    /// Get this action's href, including the thing prefix.
    pub fn get_href(&self) -> String {
        format!("{}{}", self.href_prefix, self.href)
    }

    /// Set the status of this action.
    pub fn set_status(&mut self, status: ActionStatus) {
        self.status = status;
    }

    /// Get the time the action was requested.
    pub fn get_time_requested(&self) -> &str {
        &self.time_requested
    }

    /// Get the time the action was completed.
    pub fn get_time_completed(&self) -> Option<&str> {
        self.time_completed.as_deref()
    }

    /// Mark the action completed now.
    pub fn finish(&mut self) {
        self.status = ActionStatus::Completed;
        self.time_completed = Some(timestamp());
    }

    fn as_action_description(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut inner = serde_json::Map::new();
        if let Some(input) = &self.input {
            inner.insert("input".to_owned(), json!(input));
        }
        inner.insert("href".to_owned(), json!(self.get_href()));
        inner.insert("timeRequested".to_owned(), json!(self.time_requested));
        inner.insert("status".to_owned(), json!(self.status.as_str()));
        if let Some(time_completed) = &self.time_completed {
            inner.insert("timeCompleted".to_owned(), json!(time_completed));
        }

        let mut description = serde_json::Map::new();
        description.insert(self.name.clone(), serde_json::Value::Object(inner));
        description
    }
}

impl Action for BaseAction {
    fn base(&self) -> &BaseAction {
        self
    }

    fn base_mut(&mut self) -> &mut BaseAction {
        self
    }

    fn perform_action(&mut self) {}
}

/// Generator for new actions, based on name.
pub trait ActionGenerator: Send + Sync {
    /// Generate a new action, if possible.
    ///
    /// thing -- thing associated with this action
    /// name -- name of the requested action
    /// input -- input for the action
    fn generate(
        &self,
        thing: Weak<RwLock<Box<dyn Thing>>>,
        name: String,
        input: Option<&serde_json::Value>,
    ) -> Option<Box<dyn Action>>;
}

/// Action generator for things without actions: never generates anything.
pub struct BaseActionGenerator;

impl ActionGenerator for BaseActionGenerator {
    fn generate(
        &self,
        _thing: Weak<RwLock<Box<dyn Thing>>>,
        _name: String,
        _input: Option<&serde_json::Value>,
    ) -> Option<Box<dyn Action>> {
        None
    }
}
