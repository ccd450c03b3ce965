//! Search queries
//!
//! Request model, predicate compilation and scope grouping shared by the
//! in-memory engine and the document query compiler.

mod ast;
mod grouping;
mod matcher;

pub use ast::{
    Page, QueryType, ShellDescriptorQuery, ShellDescriptorSearchRequest,
    ShellDescriptorSearchResponse, SortDirection, Sorting,
};
pub use grouping::{GroupedQueries, Predicate};
pub use matcher::{anchored, ValueMatcher};
