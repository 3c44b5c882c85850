//! In-memory object-graph storage.
//!
//! [`DataStore`] owns records in an [`ObjectTable`], bidirectional links in a
//! [`LinkGraph`], and the auxiliary [`TimeSeriesStore`], [`MediaStore`] and
//! [`SecurityStore`].
//! All writes are validated against an [`onto_schema::Ontology`].
//!
//! ```text
//!   DataStore ──► ObjectTable      (type, pk) -> Arc<Record>
//!             ──► LinkGraph        single / many link indices
//!             ──► TimeSeriesStore  (type, pk, property) -> points
//!             ──► MediaStore       (type, property, rid) -> bytes
//!             ──► SecurityStore    (type, pk) -> property securities
//! ```

pub mod accessor;
pub mod config;
pub mod error;
pub mod links;
pub mod media;
pub mod security;
pub mod store;
pub mod table;
pub mod timeseries;

pub use accessor::{LinkAccessor, SchemaLinkAccessor};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use links::{check_link_pair, LinkEdge, LinkGraph};
pub use media::{MediaItem, MediaMetadata, MediaStore};
pub use security::{ObjectSecurities, PropertySecurities, PropertySecurity, SecurityStore};
pub use store::DataStore;
pub use table::ObjectTable;
pub use timeseries::TimeSeriesStore;
