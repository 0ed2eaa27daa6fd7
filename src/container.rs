use std::sync::{Arc, RwLock};

use crate::thing::Thing;
use crate::utils::read_lock;

/// Represents the things managed by the server.
#[derive(Clone)]
pub enum ThingsType {
    /// Set when there are multiple things managed by the server
    Multiple(Vec<Arc<RwLock<Box<dyn Thing>>>>, String),
    /// Set when there is only one thing
    Single(Arc<RwLock<Box<dyn Thing>>>),
}

/// Resolution of a thing from the path segment naming it.
pub trait ThingLookup {
    /// Get the thing at the given index.
    ///
    /// idx -- index of the thing, in string form
    ///
    /// Returns the thing, or None if not found.
    fn get_thing(&self, idx: Option<&str>) -> Option<Arc<RwLock<Box<dyn Thing>>>>;

    /// Get the list of things.
    fn get_things(&self) -> Vec<Arc<RwLock<Box<dyn Thing>>>>;

    /// Get the name of this device, i.e. the title of a single thing.
    fn get_name(&self) -> String;
}

impl ThingsType {
    /// Whether this container routes by thing index.
    pub fn is_multiple(&self) -> bool {
        matches!(self, ThingsType::Multiple(_, _))
    }
}

impl ThingLookup for ThingsType {
    fn get_thing(&self, idx: Option<&str>) -> Option<Arc<RwLock<Box<dyn Thing>>>> {
        match self {
            ThingsType::Multiple(things, _) => {
                let idx = idx?.parse::<usize>().ok()?;
                things.get(idx).cloned()
            }
            ThingsType::Single(thing) => Some(thing.clone()),
        }
    }

    fn get_things(&self) -> Vec<Arc<RwLock<Box<dyn Thing>>>> {
        match self {
            ThingsType::Multiple(things, _) => things.clone(),
            ThingsType::Single(thing) => vec![thing.clone()],
        }
    }

    fn get_name(&self) -> String {
        match self {
            ThingsType::Multiple(_, name) => name.clone(),
            ThingsType::Single(thing) => read_lock(thing).get_title(),
        }
    }
}
