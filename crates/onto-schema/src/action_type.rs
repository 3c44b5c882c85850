use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declared type of an action parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ParameterType {
    Boolean,
    String,
    Integer,
    Long,
    Double,
    Date,
    Timestamp,
    Attachment,
    MediaReference,
    /// Primary key of an existing object of `object_type`.
    #[serde(rename_all = "camelCase")]
    Object { object_type: String },
    /// Name of a registered object type.
    ObjectType,
    #[serde(rename_all = "camelCase")]
    Array { sub_type: Box<ParameterType> },
}

impl ParameterType {
    pub fn object(object_type: impl Into<String>) -> Self {
        Self::Object {
            object_type: object_type.into(),
        }
    }

    pub fn array(sub_type: ParameterType) -> Self {
        Self::Array {
            sub_type: Box::new(sub_type),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Long => write!(f, "long"),
            Self::Double => write!(f, "double"),
            Self::Date => write!(f, "date"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Attachment => write!(f, "attachment"),
            Self::MediaReference => write!(f, "mediaReference"),
            Self::Object { object_type } => write!(f, "object<{object_type}>"),
            Self::ObjectType => write!(f, "objectType"),
            Self::Array { sub_type } => write!(f, "array<{sub_type}>"),
        }
    }
}

impl FromStr for ParameterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_prefix("array<").and_then(|r| r.strip_suffix('>')) {
            return Ok(Self::array(inner.parse()?));
        }
        if let Some(inner) = s.strip_prefix("object<").and_then(|r| r.strip_suffix('>')) {
            return Ok(Self::object(inner));
        }
        match s {
            "boolean" => Ok(Self::Boolean),
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "long" => Ok(Self::Long),
            "double" => Ok(Self::Double),
            "date" => Ok(Self::Date),
            "timestamp" => Ok(Self::Timestamp),
            "attachment" => Ok(Self::Attachment),
            "mediaReference" => Ok(Self::MediaReference),
            "objectType" => Ok(Self::ObjectType),
            other => Err(format!("unknown parameter type: {other:?}")),
        }
    }
}

/// Declaration of one action parameter. Parameters are required unless
/// declared otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ParameterDefRepr")]
pub struct ParameterDef {
    pub data_type: ParameterType,
    pub required: bool,
}

impl ParameterDef {
    pub fn required(data_type: ParameterType) -> Self {
        Self {
            data_type,
            required: true,
        }
    }

    pub fn optional(data_type: ParameterType) -> Self {
        Self {
            data_type,
            required: false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ParameterDefRepr {
    Short(String),
    Full {
        #[serde(rename = "dataType")]
        data_type: ParameterType,
        #[serde(default = "default_required")]
        required: bool,
    },
}

fn default_required() -> bool {
    true
}

impl TryFrom<ParameterDefRepr> for ParameterDef {
    type Error = String;

    fn try_from(repr: ParameterDefRepr) -> Result<Self, Self::Error> {
        match repr {
            ParameterDefRepr::Short(name) => name.parse().map(ParameterDef::required),
            ParameterDefRepr::Full {
                data_type,
                required,
            } => Ok(ParameterDef {
                data_type,
                required,
            }),
        }
    }
}

/// Declaration of an action type. The effect that runs when the action is
/// applied is registered separately with the action engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTypeDef {
    pub api_name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterDef>,
}

impl ActionTypeDef {
    pub fn new(api_name: impl Into<String>) -> Self {
        Self {
            api_name: api_name.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, def: ParameterDef) -> Self {
        self.parameters.insert(name.into(), def);
        self
    }
}
