//! Embedded document engine
//!
//! An in-process [`DocumentCollection`](crate::document::DocumentCollection)
//! that evaluates the subset of the database's query, update and aggregation
//! language the document backend compiles to. It lets the document backend
//! run without a database server, and lets both search strategies be checked
//! against each other.

mod collection;
mod errors;
mod expr;
mod pipeline;
mod query;
mod update;
mod value;

pub use collection::{DocumentSet, EmbeddedCollection};
pub use errors::{EngineError, EngineResult};
pub use pipeline::run as run_pipeline;
pub use query::matches;
pub use value::RegexCache;
