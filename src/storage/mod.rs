//! Storage façade
//!
//! Every backend implements [`RegistryStorage`]. Operations are blocking and
//! report failures through [`RegistryError`](crate::errors::RegistryError).

mod filter;
mod pagination;

use std::collections::BTreeSet;
use std::sync::Arc;

pub use filter::DescriptorFilter;
pub use pagination::{cursor_page, CursorResult, PaginationInfo};

use crate::errors::RegistryResult;
use crate::model::{ShellDescriptor, SubmodelDescriptor};
use crate::query::{ShellDescriptorSearchRequest, ShellDescriptorSearchResponse};

/// Registry storage contract shared by all backends
pub trait RegistryStorage: Send + Sync {
    // ==================
    // Shell Descriptors
    // ==================

    /// Lists shells in id order, one cursor page at a time
    fn get_all_aas_descriptors(
        &self,
        pagination: &PaginationInfo,
        filter: &DescriptorFilter,
    ) -> RegistryResult<CursorResult<Vec<Arc<ShellDescriptor>>>>;

    fn get_aas_descriptor(&self, aas_id: &str) -> RegistryResult<Arc<ShellDescriptor>>;

    /// Fails with `AasDescriptorAlreadyExists` when the id is taken
    fn insert_aas_descriptor(&self, descriptor: ShellDescriptor) -> RegistryResult<()>;

    /// Replaces the shell stored under `aas_id`. The new descriptor may carry a different id.
    fn replace_aas_descriptor(&self, aas_id: &str, descriptor: ShellDescriptor)
        -> RegistryResult<()>;

    fn remove_aas_descriptor(&self, aas_id: &str) -> RegistryResult<()>;

    // ==================
    // Submodel Descriptors
    // ==================

    fn get_all_submodels(
        &self,
        aas_id: &str,
        pagination: &PaginationInfo,
    ) -> RegistryResult<CursorResult<Vec<SubmodelDescriptor>>>;

    fn get_submodel(&self, aas_id: &str, submodel_id: &str) -> RegistryResult<SubmodelDescriptor>;

    fn insert_submodel(&self, aas_id: &str, submodel: SubmodelDescriptor) -> RegistryResult<()>;

    fn replace_submodel(
        &self,
        aas_id: &str,
        submodel_id: &str,
        submodel: SubmodelDescriptor,
    ) -> RegistryResult<()>;

    fn remove_submodel(&self, aas_id: &str, submodel_id: &str) -> RegistryResult<()>;

    // ==================
    // Collection Operations
    // ==================

    /// Removes every shell and returns the removed ids
    fn clear(&self) -> RegistryResult<BTreeSet<String>>;

    fn search_aas_descriptors(
        &self,
        request: &ShellDescriptorSearchRequest,
    ) -> RegistryResult<ShellDescriptorSearchResponse>;

    /// All-or-nothing insert of several shells
    fn insert_aas_descriptors_bulk(&self, descriptors: Vec<ShellDescriptor>) -> RegistryResult<()>;

    /// All-or-nothing replace of several shells, each under its own id
    fn replace_aas_descriptors_bulk(&self, descriptors: Vec<ShellDescriptor>)
        -> RegistryResult<()>;

    /// All-or-nothing removal of several shells
    fn remove_aas_descriptors_bulk(&self, aas_ids: &[String]) -> RegistryResult<()>;
}
