//! Ontology registry for the in-memory object store.
//!
//! The store never invents schema: every object type, link type, and action
//! type it works with is declared here first. The registry answers the
//! metadata questions the store asks while mutating and querying: which
//! property is the primary key, what type a property has, how a link name
//! resolves to a target type and its inverse, and what parameters an action
//! takes.
//!
//! # Modules
//!
//! - [`error`] -- Error types for registry operations
//! - [`object_type`] -- [`ObjectTypeDef`] and [`PropertyDef`]
//! - [`link_type`] -- [`LinkTypeDef`], [`LinkEnd`], and the derived [`LinkTypeSide`]
//! - [`action_type`] -- [`ActionTypeDef`], [`ParameterDef`], [`ParameterType`]
//! - [`ontology`] -- The [`Ontology`] registry itself

pub mod action_type;
pub mod error;
pub mod link_type;
pub mod object_type;
pub mod ontology;

pub use action_type::{ActionTypeDef, ParameterDef, ParameterType};
pub use error::{SchemaError, SchemaResult};
pub use link_type::{Cardinality, LinkEnd, LinkTypeDef, LinkTypeSide};
pub use object_type::{ObjectTypeDef, PropertyDef};
pub use ontology::Ontology;
