use serde_json::Map;
use serde_json::Value;

use crate::EntityError;

/// Untyped JSON object read from a registry value.
///
/// Every accessor is total: a missing key and a key holding an unexpected
/// type both read as absence. The only exceptions are the tag list and
/// parse failures of the document itself, which are reported as
/// [`EntityError`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawData(Map<String, Value>);

impl RawData {
    /// Parses a registry value. The document must be a JSON object.
    pub fn parse(value: &str) -> Result<Self, EntityError> {
        let value: Value = serde_json::from_str(value).map_err(EntityError::InvalidJson)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, EntityError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(EntityError::NotAnObject),
        }
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string stored under `key`
    pub fn get_str(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Non-empty string stored under `attributes.<key>`
    pub fn get_attribute(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.0
            .get("attributes")
            .and_then(Value::as_object)
            .and_then(|attributes| attributes.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Tag filter over the array stored under `field`.
    ///
    /// A missing field passes the filter. A field that is present but not an
    /// array is an error, it usually means the registration is corrupt.
    pub fn has_tag(
        &self,
        field: &'static str,
        tag: &str,
    ) -> Result<bool, EntityError> {
        match self.0.get(field) {
            None => Ok(true),
            Some(Value::Array(tags)) => Ok(tags.iter().any(|t| t.as_str() == Some(tag))),
            Some(_) => Err(EntityError::InvalidTags { field }),
        }
    }
}

impl TryFrom<Value> for RawData {
    type Error = EntityError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}
