//! JSON convenience layer
//!
//! Structured values stored as JSON text in a [`HashCollection`]. The engine
//! only ever sees strings; failures to encode or parse surface as
//! `AtlasError::Serialization` and never touch stored data.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::collection::HashCollection;
use crate::error::{AtlasError, Result};

/// A JSON object as returned by [`HashCollection::get_json_object`]
pub type JsonObject = Map<String, Value>;

/// Encode a value as compact JSON text
pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| AtlasError::Serialization(e.to_string()))
}

/// Parse JSON text into `T`
pub fn from_json_str<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| AtlasError::Serialization(e.to_string()))
}

impl HashCollection {
    /// Store `value` as JSON under `key`; `true` if this overwrote a value
    pub fn put_json<T>(&self, key: impl Into<String>, value: &T) -> Result<bool>
    where
        T: Serialize + ?Sized,
    {
        let text = to_json_string(value)?;
        self.put(key, text)
    }

    /// Parse the value under `key` as `T`; `None` if the key is absent
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(text) => from_json_str(&text).map(Some),
            None => Ok(None),
        }
    }

    /// Parse the value under `key` as a JSON object
    ///
    /// Valid JSON that is not an object is a `Serialization` error.
    pub fn get_json_object(&self, key: &str) -> Result<Option<JsonObject>> {
        match self.get_json::<Value>(key)? {
            Some(Value::Object(object)) => Ok(Some(object)),
            Some(other) => Err(AtlasError::Serialization(format!(
                "value under '{}' is not a JSON object: {}",
                key,
                json_type(&other)
            ))),
            None => Ok(None),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
