use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// Procedure arguments or return values, keyed by their declared names.
///
/// Convert to and from your own types with [Values::decode] and
/// [Values::encode], or access single values with [Values::get] and
/// [Values::insert].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(Map<String, Value>);

impl Values {
    pub fn new() -> Self {
        Values(Map::new())
    }

    /// Encodes a value that serializes to an object (or to null, for no values).
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(value)? {
            Value::Object(fields) => Ok(Values(fields)),
            Value::Null => Ok(Values::new()),
            _ => Err(serde::ser::Error::custom(
                "named values must serialize to an object",
            )),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, serde_json::Error> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| {
                <serde_json::Error as serde::de::Error>::custom(format!("missing value `{name}`"))
            })?;
        T::deserialize(value)
    }

    pub fn insert<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        self.0.insert(name.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub(crate) fn insert_value(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
