#![warn(missing_docs)]

//! Implementation of an HTTP [Web Thing](https://webthings.io/api/).

/// Action trait, action generator and base implementations.
pub mod action;

/// Single and multiple thing containers.
pub mod container;

/// Error type shared by the thing model and the server.
pub mod error;

/// Event trait and base implementation.
pub mod event;

/// Property trait and base implementation.
pub mod property;

/// Path matching for the thing API.
pub mod router;

/// WebThingServer implementation.
#[cfg(feature = "actix")]
pub mod server;

/// Subscriber trait and fan-out hub.
pub mod subscriber;

/// Thing trait and base implementation.
pub mod thing;

/// Utility functions.
pub mod utils;

/// Observable value cell backing a property.
pub mod value;

pub use action::{Action, ActionGenerator, ActionStatus, BaseAction, BaseActionGenerator};
pub use container::{ThingLookup, ThingsType};
pub use error::{Error, Result};
pub use event::{BaseEvent, Event};
pub use property::{BaseProperty, Property};
pub use subscriber::{Subscriber, Subscribers};
pub use thing::{BaseThing, Thing};
pub use value::{Observer, Value, ValueForwarder};

#[cfg(feature = "actix")]
pub use server::{build_app, AppState, WebThingServer};
