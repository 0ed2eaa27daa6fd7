use thiserror::Error;

/// Errors raised by the thing model and surfaced through the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The property metadata marks it as read-only.
    #[error("Read-only property")]
    ReadOnlyProperty,

    /// The value has no forwarder, so it cannot be written.
    #[error("Read-only value")]
    ReadOnlyValue,

    /// The candidate value does not satisfy the property metadata.
    #[error("Invalid property value: {0}")]
    InvalidValue(String),

    /// The value forwarder refused to push the value to the device.
    #[error("Failed to forward value: {0}")]
    Forward(String),

    /// No thing matches the requested ID.
    #[error("Thing not found")]
    ThingNotFound,

    /// The thing has no property with this name.
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    /// The thing has no available action with this name.
    #[error("Action type not found: {0}")]
    ActionNotFound(String),

    /// No action request matches the given name and ID.
    #[error("Action request not found: {0}")]
    ActionRequestNotFound(String),

    /// The action input does not satisfy the action's input schema.
    #[error("Action input invalid")]
    InvalidActionInput,

    /// The request could not be understood.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The route exists but does not accept this method.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// A subscriber could not take a message.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl Error {
    /// Whether this error is a rejected write to a read-only property.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Error::ReadOnlyProperty | Error::ReadOnlyValue)
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
