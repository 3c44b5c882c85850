//! The in-memory schema registry.

use std::collections::{BTreeMap, HashMap};

use onto_types::PropertyType;
use tracing::debug;

use crate::action_type::ActionTypeDef;
use crate::error::{SchemaError, SchemaResult};
use crate::link_type::{Cardinality, LinkEnd, LinkTypeDef, LinkTypeSide};
use crate::object_type::ObjectTypeDef;

#[derive(Clone, Debug)]
struct SideEntry {
    side: LinkTypeSide,
    /// Link name of the opposite side, on `side.object_type`.
    inverse: String,
}

/// Registry of object, link, and action types.
///
/// Registration validates each declaration against what is already known,
/// so object types must be registered before the link types that join them.
#[derive(Clone, Debug, Default)]
pub struct Ontology {
    object_types: BTreeMap<String, ObjectTypeDef>,
    link_sides: HashMap<String, BTreeMap<String, SideEntry>>,
    link_types: Vec<LinkTypeDef>,
    action_types: BTreeMap<String, ActionTypeDef>,
}

impl Ontology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from complete declaration lists.
    pub fn build(
        object_types: impl IntoIterator<Item = ObjectTypeDef>,
        link_types: impl IntoIterator<Item = LinkTypeDef>,
        action_types: impl IntoIterator<Item = ActionTypeDef>,
    ) -> SchemaResult<Self> {
        let mut ontology = Self::new();
        for def in object_types {
            ontology.register_object_type(def)?;
        }
        for def in link_types {
            ontology.register_link_type(def)?;
        }
        for def in action_types {
            ontology.register_action_type(def)?;
        }
        Ok(ontology)
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    pub fn register_object_type(&mut self, def: ObjectTypeDef) -> SchemaResult<()> {
        if self.object_types.contains_key(&def.api_name) {
            return Err(SchemaError::ObjectTypeAlreadyExists(def.api_name));
        }
        if def.property(&def.primary_key).is_none() {
            return Err(SchemaError::PropertyNotFound {
                object_type: def.api_name,
                property: def.primary_key,
            });
        }
        debug!(object_type = %def.api_name, properties = def.properties.len(), "registered object type");
        self.object_types.insert(def.api_name.clone(), def);
        Ok(())
    }

    pub fn register_link_type(&mut self, def: LinkTypeDef) -> SchemaResult<()> {
        self.check_link_end(&def, &def.source)?;
        self.check_link_end(&def, &def.target)?;

        let self_inverse = def.is_self_inverse();
        if self_inverse && def.source.cardinality != def.target.cardinality {
            return Err(SchemaError::InvalidLinkType {
                link: end_name(&def.source),
                reason: "a self-inverse link must have the same cardinality on both ends".into(),
            });
        }

        for end in [&def.source, &def.target] {
            let taken = self
                .link_sides
                .get(&end.object_type)
                .is_some_and(|sides| sides.contains_key(&end.link_name));
            if taken {
                return Err(SchemaError::LinkTypeAlreadyExists {
                    object_type: end.object_type.clone(),
                    link: end.link_name.clone(),
                });
            }
        }

        let rid = def.link_type_rid();
        let ends = if self_inverse {
            vec![(&def.source, &def.target)]
        } else {
            vec![(&def.source, &def.target), (&def.target, &def.source)]
        };
        for (near, far) in ends {
            let entry = SideEntry {
                side: LinkTypeSide {
                    api_name: near.link_name.clone(),
                    object_type: far.object_type.clone(),
                    cardinality: near.cardinality,
                    link_type_rid: rid.clone(),
                    foreign_key_property: near.foreign_key_property.clone(),
                },
                inverse: far.link_name.clone(),
            };
            self.link_sides
                .entry(near.object_type.clone())
                .or_default()
                .insert(near.link_name.clone(), entry);
        }

        debug!(
            link_type = %rid,
            source = %end_name(&def.source),
            target = %end_name(&def.target),
            "registered link type"
        );
        self.link_types.push(def);
        Ok(())
    }

    fn check_link_end(&self, def: &LinkTypeDef, end: &LinkEnd) -> SchemaResult<()> {
        let object_type = self.object_type(&end.object_type)?;
        let Some(property) = &end.foreign_key_property else {
            return Ok(());
        };
        if object_type.property(property).is_none() {
            return Err(SchemaError::PropertyNotFound {
                object_type: end.object_type.clone(),
                property: property.clone(),
            });
        }
        if end.cardinality != Cardinality::One {
            return Err(SchemaError::InvalidLinkType {
                link: end_name(end),
                reason: format!(
                    "foreign key {property:?} requires cardinality ONE (link type {})",
                    def.link_type_rid()
                ),
            });
        }
        Ok(())
    }

    pub fn register_action_type(&mut self, def: ActionTypeDef) -> SchemaResult<()> {
        if self.action_types.contains_key(&def.api_name) {
            return Err(SchemaError::ActionTypeAlreadyExists(def.api_name));
        }
        debug!(action_type = %def.api_name, parameters = def.parameters.len(), "registered action type");
        self.action_types.insert(def.api_name.clone(), def);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn object_type(&self, api_name: &str) -> SchemaResult<&ObjectTypeDef> {
        self.object_types
            .get(api_name)
            .ok_or_else(|| SchemaError::ObjectTypeNotFound(api_name.to_string()))
    }

    pub fn has_object_type(&self, api_name: &str) -> bool {
        self.object_types.contains_key(api_name)
    }

    /// All object types, ordered by name.
    pub fn object_types(&self) -> impl Iterator<Item = &ObjectTypeDef> {
        self.object_types.values()
    }

    pub fn property_type(&self, object_type: &str, property: &str) -> SchemaResult<&PropertyType> {
        self.object_type(object_type)?
            .property_type(property)
            .ok_or_else(|| SchemaError::PropertyNotFound {
                object_type: object_type.to_string(),
                property: property.to_string(),
            })
    }

    fn side_entry(&self, object_type: &str, link: &str) -> SchemaResult<&SideEntry> {
        self.link_sides
            .get(object_type)
            .and_then(|sides| sides.get(link))
            .ok_or_else(|| SchemaError::LinkTypeNotFound {
                object_type: object_type.to_string(),
                link: link.to_string(),
            })
    }

    /// The side of a link type as seen from `object_type` under `link`.
    pub fn link_type_side(&self, object_type: &str, link: &str) -> SchemaResult<&LinkTypeSide> {
        self.side_entry(object_type, link).map(|e| &e.side)
    }

    /// Name of the opposite side of `object_type.link`.
    pub fn inverse_link_name(&self, object_type: &str, link: &str) -> SchemaResult<&str> {
        self.side_entry(object_type, link).map(|e| e.inverse.as_str())
    }

    /// The opposite side of `object_type.link`, owned by the link's target type.
    pub fn inverse_link_type_side(
        &self,
        object_type: &str,
        link: &str,
    ) -> SchemaResult<&LinkTypeSide> {
        let entry = self.side_entry(object_type, link)?;
        self.link_type_side(&entry.side.object_type, &entry.inverse)
    }

    /// Both sides of a link from `src_type.src_link` into `dst_type`.
    ///
    /// Fails if the link does not point at `dst_type`.
    pub fn both_link_type_sides(
        &self,
        src_type: &str,
        src_link: &str,
        dst_type: &str,
    ) -> SchemaResult<(&LinkTypeSide, &LinkTypeSide)> {
        let side = self.link_type_side(src_type, src_link)?;
        if side.object_type != dst_type {
            return Err(SchemaError::InvalidLinkType {
                link: format!("{src_type}.{src_link}"),
                reason: format!("links to {}, not {dst_type}", side.object_type),
            });
        }
        let inverse = self.inverse_link_type_side(src_type, src_link)?;
        Ok((side, inverse))
    }

    /// Every link side owned by `object_type`, ordered by link name.
    pub fn link_type_sides(&self, object_type: &str) -> SchemaResult<Vec<&LinkTypeSide>> {
        self.object_type(object_type)?;
        Ok(self
            .link_sides
            .get(object_type)
            .map(|sides| sides.values().map(|e| &e.side).collect())
            .unwrap_or_default())
    }

    /// Registered link types in registration order.
    pub fn link_types(&self) -> &[LinkTypeDef] {
        &self.link_types
    }

    pub fn action_type(&self, api_name: &str) -> SchemaResult<&ActionTypeDef> {
        self.action_types
            .get(api_name)
            .ok_or_else(|| SchemaError::ActionTypeNotFound(api_name.to_string()))
    }

    pub fn action_types(&self) -> impl Iterator<Item = &ActionTypeDef> {
        self.action_types.values()
    }
}

fn end_name(end: &LinkEnd) -> String {
    format!("{}.{}", end.object_type, end.link_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_type::{ParameterDef, ParameterType};

    fn company() -> Ontology {
        let mut ontology = Ontology::new();
        ontology
            .register_object_type(
                ObjectTypeDef::new("Employee", "id", PropertyType::String)
                    .with_property("name", PropertyType::String)
                    .with_property("officeId", PropertyType::String),
            )
            .unwrap();
        ontology
            .register_object_type(ObjectTypeDef::new("Office", "officeId", PropertyType::String))
            .unwrap();
        ontology
            .register_link_type(LinkTypeDef::new(
                LinkEnd::one("Employee", "office").with_foreign_key("officeId"),
                LinkEnd::many("Office", "occupants"),
            ))
            .unwrap();
        ontology
            .register_link_type(LinkTypeDef::new(
                LinkEnd::many("Employee", "peeps"),
                LinkEnd::many("Employee", "peeps"),
            ))
            .unwrap();
        ontology
    }

    // -----------------------------------------------------------------------
    // Object types
    // -----------------------------------------------------------------------

    #[test]
    fn duplicate_object_type_is_rejected() {
        let mut ontology = company();
        let err = ontology
            .register_object_type(ObjectTypeDef::new("Office", "officeId", PropertyType::String))
            .unwrap_err();
        assert_eq!(err, SchemaError::ObjectTypeAlreadyExists("Office".into()));
    }

    #[test]
    fn primary_key_must_be_declared() {
        let mut ontology = Ontology::new();
        let mut def = ObjectTypeDef::new("Thing", "id", PropertyType::String);
        def.primary_key = "missing".into();
        assert!(matches!(
            ontology.register_object_type(def),
            Err(SchemaError::PropertyNotFound { .. })
        ));
    }

    #[test]
    fn property_type_lookup() {
        let ontology = company();
        assert_eq!(
            ontology.property_type("Employee", "name").unwrap(),
            &PropertyType::String
        );
        assert!(matches!(
            ontology.property_type("Employee", "salary"),
            Err(SchemaError::PropertyNotFound { .. })
        ));
        assert!(matches!(
            ontology.property_type("Desk", "id"),
            Err(SchemaError::ObjectTypeNotFound(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Link types
    // -----------------------------------------------------------------------

    #[test]
    fn both_sides_share_identity() {
        let ontology = company();
        let (side, inverse) = ontology
            .both_link_type_sides("Employee", "office", "Office")
            .unwrap();
        assert_eq!(side.api_name, "office");
        assert_eq!(side.object_type, "Office");
        assert_eq!(side.cardinality, Cardinality::One);
        assert_eq!(inverse.api_name, "occupants");
        assert_eq!(inverse.object_type, "Employee");
        assert_eq!(inverse.cardinality, Cardinality::Many);
        assert_eq!(side.link_type_rid, inverse.link_type_rid);
        assert_eq!(ontology.inverse_link_name("Office", "occupants").unwrap(), "office");
    }

    #[test]
    fn self_inverse_link_resolves_to_itself() {
        let ontology = company();
        let side = ontology.link_type_side("Employee", "peeps").unwrap();
        let inverse = ontology.inverse_link_type_side("Employee", "peeps").unwrap();
        assert_eq!(side, inverse);
        assert_eq!(ontology.link_type_sides("Employee").unwrap().len(), 2);
    }

    #[test]
    fn wrong_destination_type_is_rejected() {
        let ontology = company();
        assert!(matches!(
            ontology.both_link_type_sides("Employee", "office", "Employee"),
            Err(SchemaError::InvalidLinkType { .. })
        ));
    }

    #[test]
    fn link_names_are_unique_per_type() {
        let mut ontology = company();
        let err = ontology
            .register_link_type(LinkTypeDef::new(
                LinkEnd::many("Office", "occupants"),
                LinkEnd::many("Employee", "workplaces"),
            ))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::LinkTypeAlreadyExists {
                object_type: "Office".into(),
                link: "occupants".into()
            }
        );
        // Nothing from the rejected declaration was installed.
        assert!(ontology.link_type_side("Employee", "workplaces").is_err());
    }

    #[test]
    fn foreign_key_requires_one_cardinality() {
        let mut ontology = company();
        let err = ontology
            .register_link_type(LinkTypeDef::new(
                LinkEnd::many("Employee", "offices").with_foreign_key("officeId"),
                LinkEnd::many("Office", "staff"),
            ))
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidLinkType { .. }));
    }

    #[test]
    fn link_type_requires_known_object_types() {
        let mut ontology = company();
        assert!(matches!(
            ontology.register_link_type(LinkTypeDef::new(
                LinkEnd::one("Employee", "desk"),
                LinkEnd::one("Desk", "owner"),
            )),
            Err(SchemaError::ObjectTypeNotFound(name)) if name == "Desk"
        ));
    }

    #[test]
    fn missing_link_is_not_found() {
        let ontology = company();
        assert!(matches!(
            ontology.link_type_side("Office", "lead"),
            Err(SchemaError::LinkTypeNotFound { .. })
        ));
        assert!(ontology.link_type_sides("Office").unwrap().len() == 1);
    }

    // -----------------------------------------------------------------------
    // Action types
    // -----------------------------------------------------------------------

    #[test]
    fn action_types_register_once() {
        let mut ontology = company();
        let def = ActionTypeDef::new("moveOffice")
            .with_parameter("officeId", ParameterDef::required(ParameterType::object("Office")))
            .with_parameter("newAddress", ParameterDef::required(ParameterType::String));
        ontology.register_action_type(def.clone()).unwrap();
        assert_eq!(ontology.action_type("moveOffice").unwrap(), &def);
        assert_eq!(
            ontology.register_action_type(def),
            Err(SchemaError::ActionTypeAlreadyExists("moveOffice".into()))
        );
        assert!(ontology.action_type("fire").is_err());
    }

    #[test]
    fn build_registers_everything_in_order() {
        let ontology = Ontology::build(
            [
                ObjectTypeDef::new("A", "id", PropertyType::Integer),
                ObjectTypeDef::new("B", "id", PropertyType::Integer),
            ],
            [LinkTypeDef::new(LinkEnd::many("A", "bs"), LinkEnd::one("B", "a"))],
            [ActionTypeDef::new("noop")],
        )
        .unwrap();
        assert_eq!(ontology.object_types().count(), 2);
        assert_eq!(ontology.link_types().len(), 1);
        assert_eq!(ontology.action_types().count(), 1);
    }
}
