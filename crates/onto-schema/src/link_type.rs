use std::fmt;

use onto_types::Rid;
use serde::{Deserialize, Serialize};

/// How many targets one side of a link may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Cardinality {
    One,
    Many,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "ONE"),
            Self::Many => write!(f, "MANY"),
        }
    }
}

/// One end of a link type, as seen from `object_type`.
///
/// `link_name` is the name under which records of `object_type` see the
/// link, and `cardinality` bounds how many records they may point at
/// through it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEnd {
    pub object_type: String,
    pub link_name: String,
    pub cardinality: Cardinality,
    /// Property on `object_type` that stores the target's primary key.
    /// Only meaningful for `ONE` ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key_property: Option<String>,
}

impl LinkEnd {
    pub fn one(object_type: impl Into<String>, link_name: impl Into<String>) -> Self {
        Self::new(object_type, link_name, Cardinality::One)
    }

    pub fn many(object_type: impl Into<String>, link_name: impl Into<String>) -> Self {
        Self::new(object_type, link_name, Cardinality::Many)
    }

    fn new(
        object_type: impl Into<String>,
        link_name: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            link_name: link_name.into(),
            cardinality,
            foreign_key_property: None,
        }
    }

    pub fn with_foreign_key(mut self, property: impl Into<String>) -> Self {
        self.foreign_key_property = Some(property.into());
        self
    }
}

/// A bidirectional link type.
///
/// When `source` and `target` are the same end (same object type and link
/// name) the link is its own inverse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTypeDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<Rid>,
    pub source: LinkEnd,
    pub target: LinkEnd,
}

impl LinkTypeDef {
    pub fn new(source: LinkEnd, target: LinkEnd) -> Self {
        Self {
            rid: None,
            source,
            target,
        }
    }

    /// The declared rid, or one derived from the source end.
    pub fn link_type_rid(&self) -> Rid {
        match &self.rid {
            Some(rid) => rid.clone(),
            None => Rid::from(format!(
                "ri.ontology.main.relation.{}-{}",
                self.source.object_type, self.source.link_name
            )),
        }
    }

    pub fn is_self_inverse(&self) -> bool {
        self.source.object_type == self.target.object_type
            && self.source.link_name == self.target.link_name
    }
}

/// One side of a registered link type, keyed by the owning object type and
/// `api_name`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTypeSide {
    /// Link name on the owning object type.
    pub api_name: String,
    /// Object type the link points at.
    pub object_type: String,
    pub cardinality: Cardinality,
    /// Identity shared by both sides of the same link type.
    pub link_type_rid: Rid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key_property: Option<String>,
}

impl LinkTypeSide {
    pub fn is_one(&self) -> bool {
        self.cardinality == Cardinality::One
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_rid_is_stable() {
        let def = LinkTypeDef::new(
            LinkEnd::one("Employee", "office"),
            LinkEnd::many("Office", "occupants"),
        );
        assert_eq!(def.link_type_rid(), def.link_type_rid());
        assert_eq!(
            def.link_type_rid().as_str(),
            "ri.ontology.main.relation.Employee-office"
        );
    }

    #[test]
    fn identical_ends_are_self_inverse() {
        let def = LinkTypeDef::new(
            LinkEnd::many("Employee", "peeps"),
            LinkEnd::many("Employee", "peeps"),
        );
        assert!(def.is_self_inverse());
    }

    #[test]
    fn cardinality_uses_upper_case_on_the_wire() {
        let end: LinkEnd = serde_json::from_str(
            r#"{"objectType":"Employee","linkName":"lead","cardinality":"ONE","foreignKeyProperty":"leadId"}"#,
        )
        .unwrap();
        assert_eq!(end.cardinality, Cardinality::One);
        assert_eq!(end.foreign_key_property.as_deref(), Some("leadId"));
    }
}
