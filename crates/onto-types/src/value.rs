use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::TypeError;
use crate::media::MediaReference;

/// Declared type of an object property.
///
/// This is the closed set of property types the store understands. Every
/// [`PropertyValue`] entering the store is checked against the declared type
/// of its property, and JSON literals are converted according to it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PropertyType {
    String,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    Long,
    Double,
    Float,
    Boolean,
    /// Calendar date without a time zone (`YYYY-MM-DD`).
    Date,
    /// RFC 3339 instant, normalized to UTC.
    Timestamp,
    #[serde(rename_all = "camelCase")]
    Array { sub_type: Box<PropertyType> },
    MediaReference,
    /// Time-series handle; the points live in the time-series store.
    #[serde(rename = "timeseries")]
    TimeSeries,
    /// Attachment rid; the bytes live in the attachment service.
    Attachment,
}

impl PropertyType {
    /// Convenience constructor for `array<sub_type>`.
    pub fn array(sub_type: PropertyType) -> Self {
        Self::Array {
            sub_type: Box::new(sub_type),
        }
    }

    /// Returns `true` for integer, long, double, and float.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Long | Self::Double | Self::Float
        )
    }

    /// The element type of an array type.
    pub fn element_type(&self) -> Option<&PropertyType> {
        match self {
            Self::Array { sub_type } => Some(sub_type),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Long => write!(f, "long"),
            Self::Double => write!(f, "double"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::Date => write!(f, "date"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Array { sub_type } => write!(f, "array<{sub_type}>"),
            Self::MediaReference => write!(f, "mediaReference"),
            Self::TimeSeries => write!(f, "timeseries"),
            Self::Attachment => write!(f, "attachment"),
        }
    }
}

impl FromStr for PropertyType {
    type Err = TypeError;

    /// Parse the display form (`"string"`, `"array<date>"`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_prefix("array<").and_then(|r| r.strip_suffix('>')) {
            return Ok(Self::array(inner.parse()?));
        }
        match s {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "long" => Ok(Self::Long),
            "double" => Ok(Self::Double),
            "float" => Ok(Self::Float),
            "boolean" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            "timestamp" => Ok(Self::Timestamp),
            "mediaReference" => Ok(Self::MediaReference),
            "timeseries" => Ok(Self::TimeSeries),
            "attachment" => Ok(Self::Attachment),
            other => Err(TypeError::UnknownType(other.to_string())),
        }
    }
}

/// A typed property value.
///
/// Values never carry "null": an absent property is simply missing from the
/// record's property map.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Array(Vec<PropertyValue>),
    Media(MediaReference),
}

impl PropertyValue {
    /// Convert a JSON literal into a value of the declared type.
    ///
    /// Integers are accepted for `double`/`float` columns; dates and
    /// timestamps are parsed from ISO 8601 strings. Anything else that does
    /// not fit is rejected rather than coerced.
    pub fn from_json(value: &Value, ty: &PropertyType) -> Result<Self, TypeError> {
        let mismatch = || TypeError::TypeMismatch {
            expected: ty.to_string(),
            actual: json_kind(value).to_string(),
        };

        match ty {
            PropertyType::String | PropertyType::TimeSeries | PropertyType::Attachment => value
                .as_str()
                .map(|s| Self::String(s.to_string()))
                .ok_or_else(mismatch),
            PropertyType::Integer => {
                let n = json_integer(value).ok_or_else(mismatch)?;
                if i32::try_from(n).is_err() {
                    return Err(TypeError::InvalidValue {
                        expected: ty.to_string(),
                        reason: format!("{n} is out of range for a 32-bit integer"),
                    });
                }
                Ok(Self::Integer(n))
            }
            PropertyType::Long => json_integer(value).map(Self::Integer).ok_or_else(mismatch),
            PropertyType::Double | PropertyType::Float => {
                value.as_f64().map(Self::Double).ok_or_else(mismatch)
            }
            PropertyType::Boolean => value.as_bool().map(Self::Boolean).ok_or_else(mismatch),
            PropertyType::Date => {
                let s = value.as_str().ok_or_else(mismatch)?;
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(Self::Date)
                    .map_err(|e| TypeError::InvalidValue {
                        expected: ty.to_string(),
                        reason: format!("{s:?}: {e}"),
                    })
            }
            PropertyType::Timestamp => {
                let s = value.as_str().ok_or_else(mismatch)?;
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| Self::Timestamp(dt.with_timezone(&Utc)))
                    .map_err(|e| TypeError::InvalidValue {
                        expected: ty.to_string(),
                        reason: format!("{s:?}: {e}"),
                    })
            }
            PropertyType::Array { sub_type } => {
                let items = value.as_array().ok_or_else(mismatch)?;
                items
                    .iter()
                    .map(|item| Self::from_json(item, sub_type))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::Array)
            }
            PropertyType::MediaReference => {
                if !value.is_object() {
                    return Err(mismatch());
                }
                serde_json::from_value::<MediaReference>(value.clone())
                    .map(Self::Media)
                    .map_err(|e| TypeError::InvalidValue {
                        expected: ty.to_string(),
                        reason: e.to_string(),
                    })
            }
        }
    }

    /// The wire (JSON) rendering of this value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(n) => Value::from(*n),
            Self::Double(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Self::Timestamp(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Media(m) => m.to_json(),
        }
    }

    /// Whether this value may be stored in a property of type `ty`.
    pub fn conforms_to(&self, ty: &PropertyType) -> bool {
        match (self, ty) {
            (
                Self::String(_),
                PropertyType::String | PropertyType::TimeSeries | PropertyType::Attachment,
            ) => true,
            (Self::Integer(n), PropertyType::Integer) => i32::try_from(*n).is_ok(),
            (
                Self::Integer(_),
                PropertyType::Long | PropertyType::Double | PropertyType::Float,
            ) => true,
            (Self::Double(_), PropertyType::Double | PropertyType::Float) => true,
            (Self::Boolean(_), PropertyType::Boolean) => true,
            (Self::Date(_), PropertyType::Date) => true,
            (Self::Timestamp(_), PropertyType::Timestamp) => true,
            (Self::Media(_), PropertyType::MediaReference) => true,
            (Self::Array(items), PropertyType::Array { sub_type }) => {
                items.iter().all(|item| item.conforms_to(sub_type))
            }
            _ => false,
        }
    }

    /// Order two values by their natural semantics: numeric for numbers
    /// (integers and doubles compare with each other), lexicographic for
    /// strings, chronological for dates and timestamps.
    ///
    /// Returns `None` when the two values have no common ordering.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Double(b)) => (!b.is_nan()).then(|| cmp_integer_double(*a, *b)),
            (Self::Double(a), Self::Integer(b)) => {
                (!a.is_nan()).then(|| cmp_integer_double(*b, *a).reverse())
            }
            (Self::Double(a), Self::Double(b)) => a.partial_cmp(b),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// A total order over every value, for sorting.
    ///
    /// Values of different kinds order by kind: numbers, strings, booleans,
    /// dates, timestamps, arrays, then media references. Integers and doubles
    /// share a rank and compare exactly. `NaN` sorts after every other number
    /// and equal to itself, and `-0.0` equals `0.0`. Arrays compare element by
    /// element.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Integer(a), Self::Double(b)) => cmp_integer_double(*a, *b),
            (Self::Double(a), Self::Integer(b)) => cmp_integer_double(*b, *a).reverse(),
            (Self::Double(a), Self::Double(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Array(a), Self::Array(b)) => a
                .iter()
                .zip(b)
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Self::Media(a), Self::Media(b)) => (&a.media_item_rid, &a.mime_type)
                .cmp(&(&b.media_item_rid, &b.mime_type)),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Self::Integer(_) | Self::Double(_) => 0,
            Self::String(_) => 1,
            Self::Boolean(_) => 2,
            Self::Date(_) => 3,
            Self::Timestamp(_) => 4,
            Self::Array(_) => 5,
            Self::Media(_) => 6,
        }
    }

    /// Value equality under [`Self::compare`] semantics (`1 == 1.0`),
    /// structural equality for arrays and media references.
    pub fn same_value(&self, other: &Self) -> bool {
        match self.compare(other) {
            Some(ordering) => ordering == Ordering::Equal,
            None => self == other,
        }
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Timestamp(_) => "timestamp",
            Self::Array(_) => "array",
            Self::Media(_) => "mediaReference",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Double(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_media(&self) -> Option<&MediaReference> {
        match self {
            Self::Media(m) => Some(m),
            _ => None,
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for PropertyValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        Self::Double(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<NaiveDate> for PropertyValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

impl From<MediaReference> for PropertyValue {
    fn from(m: MediaReference) -> Self {
        Self::Media(m)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

fn json_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
            .map(|f| f as i64)
    })
}

/// Exact comparison of an integer with a double. `NaN` is greater than
/// every integer.
fn cmp_integer_double(i: i64, d: f64) -> Ordering {
    // 2^63, the first double above i64::MAX.
    const I64_END: f64 = 9_223_372_036_854_775_808.0;
    if d.is_nan() || d >= I64_END {
        return Ordering::Less;
    }
    if d < -I64_END {
        return Ordering::Greater;
    }
    let whole = d.trunc();
    i.cmp(&(whole as i64)).then_with(|| {
        if d > whole {
            Ordering::Less
        } else if d < whole {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
