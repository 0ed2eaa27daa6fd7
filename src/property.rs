/// High-level Property base class implementation.
use serde_json::json;
use valico::json_schema;

use crate::error::{Error, Result};
use crate::value::Value;

/// A property of a thing: one named, typed, observable state slot.
pub trait Property: Send + Sync {
    /// Validate new property value before setting it.
    ///
    /// A `readOnly` property rejects every value. Otherwise the metadata is
    /// applied as a JSON schema (type, minimum, maximum, enum).
    ///
    /// value -- new value
    fn validate_value(&self, value: &serde_json::Value) -> Result<()> {
        let mut schema = self.get_metadata();

        if schema
            .get("readOnly")
            .and_then(|r| r.as_bool())
            .unwrap_or(false)
        {
            return Err(Error::ReadOnlyProperty);
        }

        schema.remove("readOnly");
        schema.remove("links");
        if let Some(serde_json::Value::Array(e)) = schema.get("enum") {
            if e.is_empty() {
                schema.remove("enum");
            }
        }

        let mut scope = json_schema::Scope::new();
        let validator = scope
            .compile_and_return(serde_json::Value::Object(schema), false)
            .map_err(|_| Error::InvalidValue("invalid property schema".to_owned()))?;

        let state = validator.validate(value);
        if state.is_valid() {
            return Ok(());
        }

        let reasons: Vec<&str> = state.errors.iter().map(|e| e.get_title()).collect();
        Err(Error::InvalidValue(reasons.join(", ")))
    }

    /// Get the property description.
    ///
    /// Returns a JSON map describing the property.
    fn as_property_description(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut description = self.get_metadata();
        description.insert(
            "links".to_owned(),
            json!([
                {
                    "rel": "property",
                    "href": self.get_href(),
                },
            ]),
        );
        description
    }

    /// Set the prefix of any hrefs associated with this property.
    ///
    /// prefix -- the prefix
    fn set_href_prefix(&mut self, prefix: String);

    /// Get the href of this property.
    fn get_href(&self) -> String;

    /// Get the value cell backing this property.
    fn value(&self) -> &Value;

    /// Get the current property value.
    fn get_value(&self) -> serde_json::Value {
        self.value().get()
    }

    /// Set the current value of the property.
    ///
    /// The value is validated against the metadata before it is forwarded.
    ///
    /// value -- the value to set
    fn set_value(&self, value: serde_json::Value) -> Result<()> {
        self.validate_value(&value)?;
        self.value().set(value)
    }

    /// Get the name of this property.
    fn get_name(&self) -> String;

    /// Get the metadata associated with this property.
    fn get_metadata(&self) -> serde_json::Map<String, serde_json::Value>;
}

/// Basic property implementation.
///
/// A Property represents an individual state value of a thing.
pub struct BaseProperty {
    name: String,
    value: Value,
    href_prefix: String,
    href: String,
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl BaseProperty {
    /// Create a new BaseProperty.
    ///
    /// name -- name of the property
    /// value -- Value object to hold the property value
    /// metadata -- property metadata, i.e. type, description, unit, etc., as a JSON map
    pub fn new(
        name: String,
        value: Value,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> BaseProperty {
        let href = format!("/properties/{}", name);

        BaseProperty {
            name,
            value,
            href_prefix: "".to_owned(),
            href,
            metadata: metadata.unwrap_or_default(),
        }
    }
}

impl Property for BaseProperty {
    fn set_href_prefix(&mut self, prefix: String) {
        self.href_prefix = prefix;
    }

    fn get_href(&self) -> String {
        format!("{}{}", self.href_prefix, self.href)
    }

    fn value(&self) -> &Value {
        &self.value
    }

    fn get_name(&self) -> String {
        self.name.clone()
    }

    fn get_metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        self.metadata.clone()
    }
}
