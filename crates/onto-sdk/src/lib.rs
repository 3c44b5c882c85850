//! High-level SDK for the ontology store.
//!
//! [`Sandbox`] owns a store, an action engine, and saved object sets, and
//! exposes the full object, link, query, action, time-series, and media
//! surface through one value. [`Fixture`] loads schema and contents from a
//! TOML or JSON file.

pub mod error;
pub mod fixture;
pub mod sandbox;

pub use error::{SdkError, SdkResult};
pub use fixture::{Fixture, FixtureLink, FixtureObject};
pub use sandbox::Sandbox;

// Re-export key types
pub use onto_action::{
    ActionParameters, ApplyActionRequest, ApplyActionResponse, BatchApplyActionRequest,
    ValidationResponse,
};
pub use onto_query::{LoadObjectSetRequest, ObjectPage, ObjectSet, OrderBy, Predicate};
pub use onto_schema::Ontology;
pub use onto_store::StoreConfig;
pub use onto_types::{Locator, PrimaryKey, PropertyValue, Record, Rid};
