/// An observable, settable value interface.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};

/// Receives the new value whenever a `Value` changes.
pub trait Observer: Send + Sync {
    /// Called with the new value, once per change.
    fn notify(&self, value: &serde_json::Value);
}

/// Pushes a validated write out to the physical (or virtual) device.
pub trait ValueForwarder: Send {
    /// Forward the value to the device.
    ///
    /// value -- value to forward
    fn set_value(&mut self, value: &serde_json::Value) -> Result<()>;
}

impl<F> ValueForwarder for F
where
    F: FnMut(&serde_json::Value) -> Result<()> + Send,
{
    fn set_value(&mut self, value: &serde_json::Value) -> Result<()> {
        self(value)
    }
}

struct ValueState {
    last_value: serde_json::Value,
    observer: Option<Arc<dyn Observer>>,
}

/// A property value.
///
/// This is used for communicating between the Thing representation and the
/// actual physical thing implementation.
///
/// Notifies the observer when the underlying value changes through an
/// external update (command to turn the light off) or if the underlying sensor
/// reports a new value. Clones share the same state, so a sensor loop can hold
/// one clone while the owning property holds another.
///
/// Neither the forwarder nor the observer runs under the value's lock, so
/// both may call back into the same value.
#[derive(Clone)]
pub struct Value {
    state: Arc<Mutex<ValueState>>,
    value_forwarder: Option<Arc<Mutex<Box<dyn ValueForwarder>>>>,
}

impl Value {
    /// Create a new value.
    ///
    /// initial_value -- the initial value
    /// value_forwarder -- the method that updates the actual value on the
    ///                    thing, or None for a read-only value
    pub fn new(
        initial_value: serde_json::Value,
        value_forwarder: Option<Box<dyn ValueForwarder>>,
    ) -> Value {
        Value {
            state: Arc::new(Mutex::new(ValueState {
                last_value: initial_value,
                observer: None,
            })),
            value_forwarder: value_forwarder.map(|f| Arc::new(Mutex::new(f))),
        }
    }

    /// Create a value whose writes go through the given closure.
    pub fn with_forwarder<F>(initial_value: serde_json::Value, forwarder: F) -> Value
    where
        F: FnMut(&serde_json::Value) -> Result<()> + Send + 'static,
    {
        Value::new(initial_value, Some(Box::new(forwarder)))
    }

    /// Create a value that rejects every write.
    pub fn read_only(initial_value: serde_json::Value) -> Value {
        Value::new(initial_value, None)
    }

    fn state(&self) -> MutexGuard<'_, ValueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the observer, replacing any previous one.
    pub fn set_observer(&self, observer: Box<dyn Observer>) {
        self.state().observer = Some(Arc::from(observer));
    }

    /// Detach the observer. Later changes are not reported anywhere.
    pub fn clear_observer(&self) {
        self.state().observer = None;
    }

    /// Set a new value for this thing.
    ///
    /// The value is forwarded to the device first; observers only hear about
    /// it once the forwarder accepted it.
    ///
    /// value -- value to set
    pub fn set(&self, value: serde_json::Value) -> Result<()> {
        let forwarder = self.value_forwarder.as_ref().ok_or(Error::ReadOnlyValue)?;
        forwarder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_value(&value)?;

        self.notify_of_external_update(value);
        Ok(())
    }

    /// Return the last known value from the underlying thing.
    pub fn get(&self) -> serde_json::Value {
        self.state().last_value.clone()
    }

    /// Whether writes to this value are rejected.
    pub fn is_read_only(&self) -> bool {
        self.value_forwarder.is_none()
    }

    /// Notify observers of a new value.
    ///
    /// Null values and values equal to the current one are ignored.
    ///
    /// value -- new value
    ///
    /// Returns whether the value changed.
    pub fn notify_of_external_update(&self, value: serde_json::Value) -> bool {
        let observer = {
            let mut state = self.state();
            if value.is_null() || same_value(&value, &state.last_value) {
                return false;
            }

            state.last_value = value.clone();
            state.observer.clone()
        };

        if let Some(observer) = observer {
            observer.notify(&value);
        }

        true
    }
}

/// Numbers compare by magnitude so that `50` and `50.0` are the same value.
fn same_value(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) if a.is_number() && b.is_number() => x == y,
        _ => a == b,
    }
}
