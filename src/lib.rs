//! aasregistry - Asset administration shell descriptor registry
//!
//! Shell descriptors are stored with their submodel descriptors embedded and
//! searched through path predicates such as
//! `submodelDescriptors.extensions.value` with item-level ("same-row")
//! semantics. Two backends implement [`storage::RegistryStorage`]:
//!
//! - [`memory`]: descriptor objects walked along compiled segment paths
//! - [`document`]: the same search compiled to a document-store filter and
//!   aggregation pipeline, run by [`engine`] or by MongoDB (`mongodb` feature)

pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod memory;
pub mod model;
#[cfg(feature = "mongodb")]
pub mod mongo;
pub mod paths;
pub mod query;
pub mod storage;
