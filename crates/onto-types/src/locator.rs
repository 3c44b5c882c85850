use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::value::PropertyValue;

/// Canonical string form of a primary-key value.
///
/// Primary keys are compared by their string rendering, so the integer `1`
/// and the string `"1"` identify the same object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimaryKey(String);

impl PrimaryKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Canonicalize a property value. Only strings, integers, and booleans
    /// can act as primary keys.
    pub fn from_value(value: &PropertyValue) -> Result<Self, TypeError> {
        match value {
            PropertyValue::String(s) => Ok(Self(s.clone())),
            PropertyValue::Integer(n) => Ok(Self(n.to_string())),
            PropertyValue::Boolean(b) => Ok(Self(b.to_string())),
            other => Err(TypeError::InvalidPrimaryKey(other.kind().to_string())),
        }
    }

    /// Canonicalize a JSON primary-key literal.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, TypeError> {
        match value {
            serde_json::Value::String(s) => Ok(Self(s.clone())),
            serde_json::Value::Bool(b) => Ok(Self(b.to_string())),
            serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Self(n.to_string())),
            serde_json::Value::Number(_) => Err(TypeError::InvalidPrimaryKey("double".into())),
            serde_json::Value::Null => Err(TypeError::InvalidPrimaryKey("null".into())),
            serde_json::Value::Array(_) => Err(TypeError::InvalidPrimaryKey("array".into())),
            serde_json::Value::Object(_) => Err(TypeError::InvalidPrimaryKey("object".into())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrimaryKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PrimaryKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for PrimaryKey {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

/// Identity of an object: its object type plus its primary key.
///
/// Encoded as `"<objectType>:<primaryKey>"`. Object type names never contain
/// a colon, so the first colon separates the two halves and the primary key
/// may itself contain colons.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locator {
    pub object_type: String,
    pub primary_key: PrimaryKey,
}

impl Locator {
    pub fn new(object_type: impl Into<String>, primary_key: impl Into<PrimaryKey>) -> Self {
        Self {
            object_type: object_type.into(),
            primary_key: primary_key.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.primary_key)
    }
}

impl FromStr for Locator {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((object_type, primary_key)) if !object_type.is_empty() => {
                Ok(Self::new(object_type, primary_key))
            }
            _ => Err(TypeError::InvalidLocator(s.to_string())),
        }
    }
}

impl TryFrom<String> for Locator {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.to_string()
    }
}
