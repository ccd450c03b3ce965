//! Document-store backend
//!
//! Shells are stored as one document each with their submodels embedded.
//! Search requests compile to a filter document and an aggregation pipeline
//! in the database's query language:
//!
//! ```text
//! $match (criteria) -> $addFields (submodel narrowing)
//!   -> $addFields (sort keys) -> $sort -> $project (drop sort keys) -> $skip -> $limit
//! ```
//!
//! The backend is generic over [`DocumentCollection`]; the embedded engine
//! and the MongoDB driver both implement it.

mod collection;
mod criteria;
mod listing;
mod mapping;
mod projection;
mod search;
mod sort;
mod storage;

pub use collection::{CollectionError, CollectionResult, DocumentCollection, Update};
pub use criteria::compile_filter;
pub use listing::{descriptor_filter, shell_page_pipeline, submodel_page_pipeline};
pub use mapping::{document_path, from_document, to_document, DocumentPath};
pub use projection::compile_projection;
pub use search::{compile_search, CompiledSearch};
pub use sort::compile_sort;
pub use storage::DocumentRegistryStorage;
