//! Read/write-locked front for the in-memory registry
//!
//! Reads share the lock; writes hold it exclusively for the whole operation,
//! bulk operations included, so no reader sees a half-applied change.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::storage::InMemoryRegistry;
use crate::errors::{RegistryError, RegistryResult};
use crate::model::{ShellDescriptor, SubmodelDescriptor};
use crate::query::{ShellDescriptorSearchRequest, ShellDescriptorSearchResponse};
use crate::storage::{CursorResult, DescriptorFilter, PaginationInfo, RegistryStorage};

#[derive(Debug, Default)]
pub struct LockingRegistryStorage {
    inner: RwLock<InMemoryRegistry>,
}

impl LockingRegistryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_registry(registry: InMemoryRegistry) -> Self {
        Self {
            inner: RwLock::new(registry),
        }
    }

    fn read(&self) -> RegistryResult<RwLockReadGuard<'_, InMemoryRegistry>> {
        self.inner.read().map_err(|_| RegistryError::lock_poisoned())
    }

    fn write(&self) -> RegistryResult<RwLockWriteGuard<'_, InMemoryRegistry>> {
        self.inner.write().map_err(|_| RegistryError::lock_poisoned())
    }
}

impl RegistryStorage for LockingRegistryStorage {
    fn get_all_aas_descriptors(
        &self,
        pagination: &PaginationInfo,
        filter: &DescriptorFilter,
    ) -> RegistryResult<CursorResult<Vec<Arc<ShellDescriptor>>>> {
        Ok(self.read()?.get_all_aas_descriptors(pagination, filter))
    }

    fn get_aas_descriptor(&self, aas_id: &str) -> RegistryResult<Arc<ShellDescriptor>> {
        self.read()?.get_aas_descriptor(aas_id)
    }

    fn insert_aas_descriptor(&self, descriptor: ShellDescriptor) -> RegistryResult<()> {
        self.write()?.insert_aas_descriptor(descriptor)
    }

    fn replace_aas_descriptor(
        &self,
        aas_id: &str,
        descriptor: ShellDescriptor,
    ) -> RegistryResult<()> {
        self.write()?.replace_aas_descriptor(aas_id, descriptor)
    }

    fn remove_aas_descriptor(&self, aas_id: &str) -> RegistryResult<()> {
        self.write()?.remove_aas_descriptor(aas_id)
    }

    fn get_all_submodels(
        &self,
        aas_id: &str,
        pagination: &PaginationInfo,
    ) -> RegistryResult<CursorResult<Vec<SubmodelDescriptor>>> {
        self.read()?.get_all_submodels(aas_id, pagination)
    }

    fn get_submodel(&self, aas_id: &str, submodel_id: &str) -> RegistryResult<SubmodelDescriptor> {
        self.read()?.get_submodel(aas_id, submodel_id)
    }

    fn insert_submodel(&self, aas_id: &str, submodel: SubmodelDescriptor) -> RegistryResult<()> {
        self.write()?.insert_submodel(aas_id, submodel)
    }

    fn replace_submodel(
        &self,
        aas_id: &str,
        submodel_id: &str,
        submodel: SubmodelDescriptor,
    ) -> RegistryResult<()> {
        self.write()?.replace_submodel(aas_id, submodel_id, submodel)
    }

    fn remove_submodel(&self, aas_id: &str, submodel_id: &str) -> RegistryResult<()> {
        self.write()?.remove_submodel(aas_id, submodel_id)
    }

    fn clear(&self) -> RegistryResult<BTreeSet<String>> {
        Ok(self.write()?.clear())
    }

    fn search_aas_descriptors(
        &self,
        request: &ShellDescriptorSearchRequest,
    ) -> RegistryResult<ShellDescriptorSearchResponse> {
        self.read()?.search_aas_descriptors(request)
    }

    fn insert_aas_descriptors_bulk(&self, descriptors: Vec<ShellDescriptor>) -> RegistryResult<()> {
        self.write()?.insert_aas_descriptors_bulk(descriptors)
    }

    fn replace_aas_descriptors_bulk(
        &self,
        descriptors: Vec<ShellDescriptor>,
    ) -> RegistryResult<()> {
        self.write()?.replace_aas_descriptors_bulk(descriptors)
    }

    fn remove_aas_descriptors_bulk(&self, aas_ids: &[String]) -> RegistryResult<()> {
        self.write()?.remove_aas_descriptors_bulk(aas_ids)
    }
}
