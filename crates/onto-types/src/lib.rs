//! Foundation types for the ontology store.
//!
//! This crate provides the identity and value types shared by every other
//! crate in the workspace. Nothing here owns state: these are plain values
//! that can be hashed, compared, cloned, and serialized.
//!
//! # Key Types
//!
//! - [`PropertyType`] -- Declared type of an object property (closed set)
//! - [`PropertyValue`] -- Typed property value, converted from JSON by declared type
//! - [`PrimaryKey`] -- Canonical string form of a primary-key value
//! - [`Locator`] -- `(object type, primary key)` identity pair, `"type:pk"` encoded
//! - [`Rid`] -- Opaque resource identifier assigned to records and media items
//! - [`Record`] -- A typed object: object type, primary key, rid, properties
//! - [`MediaReference`] -- Pointer from a property value to a stored media item
//! - [`TimeSeriesPoint`] / [`TimeRange`] -- Time-series samples and range filters

pub mod error;
pub mod locator;
pub mod media;
pub mod record;
pub mod rid;
pub mod timeseries;
pub mod value;

pub use error::TypeError;
pub use locator::{Locator, PrimaryKey};
pub use media::MediaReference;
pub use record::Record;
pub use rid::Rid;
pub use timeseries::{TimeRange, TimeSeriesPoint};
pub use value::{PropertyType, PropertyValue};
