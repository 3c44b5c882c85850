//! Paged loads: request and response shapes, page tokens, and projection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use onto_store::PropertySecurities;

use crate::error::{QueryError, QueryResult};
use crate::object_set::ObjectSet;
use crate::order::OrderBy;

/// Encode a result offset as an opaque page token.
pub fn encode_page_token(offset: u64) -> String {
    hex::encode(offset.to_be_bytes())
}

/// Decode a token produced by [`encode_page_token`].
pub fn decode_page_token(token: &str) -> QueryResult<u64> {
    let bytes = hex::decode(token).map_err(|_| QueryError::InvalidPageToken(token.to_string()))?;
    let bytes: [u8; 8] = bytes
        .try_into()
        .map_err(|_| QueryError::InvalidPageToken(token.to_string()))?;
    Ok(u64::from_be_bytes(bytes))
}

/// A paged, ordered, projected load of an object set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadObjectSetRequest {
    pub object_set: ObjectSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    /// Properties to return. Empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select: Vec<String>,
    #[serde(default)]
    pub exclude_rid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    /// Render the property securities of the object. The set must hold
    /// exactly one object.
    #[serde(default)]
    pub load_property_securities: bool,
}

impl LoadObjectSetRequest {
    pub fn new(object_set: ObjectSet) -> Self {
        Self {
            object_set,
            order_by: None,
            select: Vec::new(),
            exclude_rid: false,
            page_size: None,
            page_token: None,
            load_property_securities: false,
        }
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    pub fn select<S: Into<String>>(mut self, properties: impl IntoIterator<Item = S>) -> Self {
        self.select = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude_rid(mut self) -> Self {
        self.exclude_rid = true;
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }

    pub fn load_property_securities(mut self) -> Self {
        self.load_property_securities = true;
        self
    }
}

/// One page of results.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPage {
    pub data: Vec<Value>,
    pub total_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    /// Securities indexed by `propertySecurityIndex` in `data`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub property_securities: Vec<PropertySecurities>,
}

/// Restrict a rendered record to `select` (all properties when empty).
/// The `__`-prefixed identity fields are always kept unless `exclude_rid`
/// drops `__rid`.
pub fn project(mut json: Value, select: &[String], exclude_rid: bool) -> Value {
    if let Value::Object(map) = &mut json {
        if !select.is_empty() {
            map.retain(|key, _| key.starts_with("__") || select.iter().any(|s| s == key));
        }
        if exclude_rid {
            map.remove("__rid");
        }
    }
    json
}

#[cfg(test)]
mod tests {
    use super::*;
    use onto_types::{PropertyValue, Record};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn token_encodes_offset_big_endian() {
        assert_eq!(encode_page_token(2), "0000000000000002");
        assert_eq!(decode_page_token("0000000000000100").unwrap(), 256);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for bad in ["", "zz", "0001", "000000000000000000"] {
            assert_eq!(
                decode_page_token(bad),
                Err(QueryError::InvalidPageToken(bad.to_string()))
            );
        }
    }

    #[test]
    fn projection_keeps_identity_fields() {
        let mut props = BTreeMap::new();
        props.insert("id".to_string(), PropertyValue::from("1"));
        props.insert("name".to_string(), PropertyValue::from("Ann"));
        props.insert("salary".to_string(), PropertyValue::Integer(5));
        let record = Record::new("Employee", "1", props);

        let json = project(record.to_json("id"), &["name".to_string()], true);
        assert_eq!(
            json,
            json!({"__apiName": "Employee", "__primaryKey": "1", "name": "Ann"})
        );
        let full = project(record.to_json("id"), &[], false);
        assert_eq!(full["salary"], json!(5));
        assert_eq!(full["__rid"], json!(record.rid.as_str()));
    }

    #[test]
    fn request_parses_wire_shape() {
        let request: LoadObjectSetRequest = serde_json::from_value(json!({
            "objectSet": {"type": "base", "objectType": "Employee"},
            "orderBy": {"fields": [{"field": "salary", "direction": "desc"}]},
            "select": ["name"],
            "pageSize": 10
        }))
        .unwrap();
        assert_eq!(request.page_size, Some(10));
        assert_eq!(request.order_by, Some(OrderBy::desc("salary")));
        assert!(!request.exclude_rid);
    }
}
