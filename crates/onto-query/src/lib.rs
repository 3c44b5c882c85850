//! Object-set queries over an [`onto_store::DataStore`].
//!
//! An [`ObjectSet`] is a tree of set operations (`base`, `static`,
//! `reference`, `filter`, `union`, `intersect`, `subtract`, `searchAround`,
//! `withProperties`, `nearestNeighbors`).
//! [`ObjectSetEvaluator`] reduces it to an ordered sequence of records, and
//! [`ObjectSetEvaluator::load`] then sorts by an [`OrderBy`], cuts a page, and
//! projects the selected properties.
//!
//! # Key Types
//!
//! - [`ObjectSet`] -- the query tree, in the platform's JSON wire shape
//! - [`Predicate`] -- filter expressions, typed by the property declaration
//! - [`DerivedProperty`] -- per-record selections over `methodInput`
//! - [`LoadObjectSetRequest`] / [`ObjectPage`] -- paged loads
//! - [`SavedObjectSets`] -- named sets for `reference`

pub mod derived;
pub mod error;
pub mod evaluator;
pub mod object_set;
pub mod order;
pub mod page;
pub mod predicate;
pub mod saved;

pub use derived::{DerivedProperty, SelectionOperation};
pub use error::{QueryError, QueryResult};
pub use evaluator::ObjectSetEvaluator;
pub use object_set::ObjectSet;
pub use order::{Direction, OrderBy, SortField};
pub use page::{decode_page_token, encode_page_token, LoadObjectSetRequest, ObjectPage};
pub use predicate::Predicate;
pub use saved::SavedObjectSets;
