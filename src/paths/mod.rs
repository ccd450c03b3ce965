//! Query path compilation
//!
//! A dotted path such as `submodelDescriptors.endpoints.protocolInformation.href`
//! is compiled against a static grammar of the descriptor schema into a
//! sequence of typed segment blocks. Both search backends interpret the same
//! compiled form.

mod cache;
mod grammar;
mod nodes;
mod resolve;
mod segments;

pub use cache::{PathCache, DEFAULT_CAPACITY};
pub use grammar::{FieldKind, NodeType};
pub use nodes::{FieldValue, PathNode};
pub use resolve::{any_value, first_value, visit_values};
pub use segments::{SegmentBlock, SegmentPath, SUBMODEL_DESCRIPTORS};
