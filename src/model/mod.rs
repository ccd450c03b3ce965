//! Descriptor object model
//!
//! Shell and submodel descriptors as exchanged in their camelCase JSON form.

mod common;
mod shell;
mod submodel;

pub use common::{
    AdministrativeInformation, Endpoint, Extension, Key, LangStringNameType, LangStringTextType,
    ProtocolInformation, Reference, ReferenceParent, ReferenceTypes, SecurityAttribute,
    SecurityType, SpecificAssetId,
};
pub use shell::{AssetKind, ShellDescriptor};
pub use submodel::SubmodelDescriptor;
