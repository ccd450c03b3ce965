//! In-memory registry
//!
//! Shells are kept in id order. Each entry carries an index from submodel id
//! to the submodel's position in the embedded list, rebuilt on every
//! structural change. Stored shells are shared; writes go through
//! `Arc::make_mut`, so hits handed out by an earlier search stay untouched.
//!
//! The registry itself is not synchronized;
//! [`LockingRegistryStorage`](crate::memory::LockingRegistryStorage) is the
//! thread-safe front.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info};

use super::search;
use crate::errors::{RegistryError, RegistryResult};
use crate::model::{ShellDescriptor, SubmodelDescriptor};
use crate::query::{ShellDescriptorSearchRequest, ShellDescriptorSearchResponse};
use crate::storage::{cursor_page, CursorResult, DescriptorFilter, PaginationInfo};

#[derive(Debug, Clone)]
struct ShellEntry {
    descriptor: Arc<ShellDescriptor>,
    submodels: BTreeMap<String, usize>,
}

impl ShellEntry {
    fn new(descriptor: ShellDescriptor) -> RegistryResult<Self> {
        let submodels = descriptor.submodel_index()?;
        Ok(Self {
            descriptor: Arc::new(descriptor),
            submodels,
        })
    }

    fn submodel(&self, aas_id: &str, submodel_id: &str) -> RegistryResult<&SubmodelDescriptor> {
        self.submodels
            .get(submodel_id)
            .and_then(|position| self.descriptor.submodel_descriptors.get(*position))
            .ok_or_else(|| submodel_not_found(aas_id, submodel_id))
    }
}

fn submodel_not_found(aas_id: &str, submodel_id: &str) -> RegistryError {
    RegistryError::SubmodelNotFound {
        aas_id: aas_id.to_string(),
        submodel_id: submodel_id.to_string(),
    }
}

/// Shell descriptors held in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    shells: BTreeMap<String, ShellEntry>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shells.is_empty()
    }

    // ==================
    // Shell Descriptors
    // ==================

    pub fn get_all_aas_descriptors(
        &self,
        pagination: &PaginationInfo,
        filter: &DescriptorFilter,
    ) -> CursorResult<Vec<Arc<ShellDescriptor>>> {
        let candidates = pagination
            .seek(&self.shells)
            .filter(|(_, entry)| filter.matches(&entry.descriptor))
            .map(|(id, entry)| (id, Arc::clone(&entry.descriptor)));

        let page = cursor_page(candidates, pagination);
        debug!(
            returned = page.result.len(),
            has_next = page.cursor.is_some(),
            "SHELLS_LISTED"
        );
        page
    }

    pub fn get_aas_descriptor(&self, aas_id: &str) -> RegistryResult<Arc<ShellDescriptor>> {
        self.entry(aas_id).map(|entry| Arc::clone(&entry.descriptor))
    }

    pub fn insert_aas_descriptor(&mut self, descriptor: ShellDescriptor) -> RegistryResult<()> {
        let aas_id = descriptor.id.clone();
        self.insert_entry(descriptor)?;
        info!(aas_id = %aas_id, "SHELL_INSERTED");
        Ok(())
    }

    pub fn replace_aas_descriptor(
        &mut self,
        aas_id: &str,
        descriptor: ShellDescriptor,
    ) -> RegistryResult<()> {
        let new_id = descriptor.id.clone();
        self.replace_entry(aas_id, descriptor)?;
        info!(aas_id = %aas_id, new_id = %new_id, "SHELL_REPLACED");
        Ok(())
    }

    pub fn remove_aas_descriptor(&mut self, aas_id: &str) -> RegistryResult<()> {
        self.remove_entry(aas_id)?;
        info!(aas_id = %aas_id, "SHELL_REMOVED");
        Ok(())
    }

    // ==================
    // Submodel Descriptors
    // ==================

    pub fn get_all_submodels(
        &self,
        aas_id: &str,
        pagination: &PaginationInfo,
    ) -> RegistryResult<CursorResult<Vec<SubmodelDescriptor>>> {
        let entry = self.entry(aas_id)?;
        let submodels = &entry.descriptor.submodel_descriptors;
        let candidates = pagination
            .seek(&entry.submodels)
            .filter_map(|(id, position)| submodels.get(*position).map(|sm| (id, sm.clone())));

        Ok(cursor_page(candidates, pagination))
    }

    pub fn get_submodel(
        &self,
        aas_id: &str,
        submodel_id: &str,
    ) -> RegistryResult<SubmodelDescriptor> {
        self.entry(aas_id)?.submodel(aas_id, submodel_id).cloned()
    }

    pub fn insert_submodel(
        &mut self,
        aas_id: &str,
        submodel: SubmodelDescriptor,
    ) -> RegistryResult<()> {
        let entry = self.entry_mut(aas_id)?;
        if entry.submodels.contains_key(&submodel.id) {
            return Err(RegistryError::SubmodelAlreadyExists {
                aas_id: aas_id.to_string(),
                submodel_id: submodel.id,
            });
        }

        let submodel_id = submodel.id.clone();
        let shell = Arc::make_mut(&mut entry.descriptor);
        entry
            .submodels
            .insert(submodel_id.clone(), shell.submodel_descriptors.len());
        shell.submodel_descriptors.push(submodel);

        info!(aas_id = %aas_id, submodel_id = %submodel_id, "SUBMODEL_INSERTED");
        Ok(())
    }

    /// Replaces a submodel in place. The replacement may carry a new id as long
    /// as the shell does not already hold it.
    pub fn replace_submodel(
        &mut self,
        aas_id: &str,
        submodel_id: &str,
        submodel: SubmodelDescriptor,
    ) -> RegistryResult<()> {
        let entry = self.entry_mut(aas_id)?;
        let position = *entry
            .submodels
            .get(submodel_id)
            .ok_or_else(|| submodel_not_found(aas_id, submodel_id))?;

        let new_id = submodel.id.clone();
        if new_id != submodel_id && entry.submodels.contains_key(&new_id) {
            return Err(RegistryError::SubmodelAlreadyExists {
                aas_id: aas_id.to_string(),
                submodel_id: new_id,
            });
        }

        let shell = Arc::make_mut(&mut entry.descriptor);
        let slot = shell
            .submodel_descriptors
            .get_mut(position)
            .ok_or_else(|| submodel_not_found(aas_id, submodel_id))?;
        *slot = submodel;

        if new_id != submodel_id {
            entry.submodels.remove(submodel_id);
            entry.submodels.insert(new_id.clone(), position);
        }

        info!(aas_id = %aas_id, submodel_id = %submodel_id, new_id = %new_id, "SUBMODEL_REPLACED");
        Ok(())
    }

    pub fn remove_submodel(&mut self, aas_id: &str, submodel_id: &str) -> RegistryResult<()> {
        let entry = self.entry_mut(aas_id)?;
        let position = entry
            .submodels
            .remove(submodel_id)
            .ok_or_else(|| submodel_not_found(aas_id, submodel_id))?;

        let shell = Arc::make_mut(&mut entry.descriptor);
        if position < shell.submodel_descriptors.len() {
            shell.submodel_descriptors.remove(position);
        }
        for index in entry.submodels.values_mut() {
            if *index > position {
                *index -= 1;
            }
        }

        info!(aas_id = %aas_id, submodel_id = %submodel_id, "SUBMODEL_REMOVED");
        Ok(())
    }

    // ==================
    // Collection Operations
    // ==================

    pub fn clear(&mut self) -> BTreeSet<String> {
        let removed: BTreeSet<String> = std::mem::take(&mut self.shells).into_keys().collect();
        info!(removed = removed.len(), "REGISTRY_CLEARED");
        removed
    }

    pub fn search_aas_descriptors(
        &self,
        request: &ShellDescriptorSearchRequest,
    ) -> RegistryResult<ShellDescriptorSearchResponse> {
        search::search(self.shells.values().map(|entry| &entry.descriptor), request)
    }

    /// Inserts all descriptors or none of them
    pub fn insert_aas_descriptors_bulk(
        &mut self,
        descriptors: Vec<ShellDescriptor>,
    ) -> RegistryResult<()> {
        let count = descriptors.len();
        self.staged(|staged| {
            descriptors
                .into_iter()
                .try_for_each(|descriptor| staged.insert_entry(descriptor))
        })?;
        info!(count, "SHELLS_BULK_INSERTED");
        Ok(())
    }

    /// Replaces all descriptors, each under its own id, or none of them
    pub fn replace_aas_descriptors_bulk(
        &mut self,
        descriptors: Vec<ShellDescriptor>,
    ) -> RegistryResult<()> {
        let count = descriptors.len();
        self.staged(|staged| {
            descriptors.into_iter().try_for_each(|descriptor| {
                let aas_id = descriptor.id.clone();
                staged.replace_entry(&aas_id, descriptor)
            })
        })?;
        info!(count, "SHELLS_BULK_REPLACED");
        Ok(())
    }

    /// Removes all listed shells or none of them
    pub fn remove_aas_descriptors_bulk(&mut self, aas_ids: &[String]) -> RegistryResult<()> {
        self.staged(|staged| aas_ids.iter().try_for_each(|id| staged.remove_entry(id)))?;
        info!(count = aas_ids.len(), "SHELLS_BULK_REMOVED");
        Ok(())
    }

    // ==================
    // Internals
    // ==================

    fn entry(&self, aas_id: &str) -> RegistryResult<&ShellEntry> {
        self.shells
            .get(aas_id)
            .ok_or_else(|| RegistryError::AasDescriptorNotFound(aas_id.to_string()))
    }

    fn entry_mut(&mut self, aas_id: &str) -> RegistryResult<&mut ShellEntry> {
        self.shells
            .get_mut(aas_id)
            .ok_or_else(|| RegistryError::AasDescriptorNotFound(aas_id.to_string()))
    }

    fn insert_entry(&mut self, descriptor: ShellDescriptor) -> RegistryResult<()> {
        if self.shells.contains_key(&descriptor.id) {
            return Err(RegistryError::AasDescriptorAlreadyExists(descriptor.id));
        }
        let entry = ShellEntry::new(descriptor)?;
        self.shells.insert(entry.descriptor.id.clone(), entry);
        Ok(())
    }

    fn replace_entry(&mut self, aas_id: &str, descriptor: ShellDescriptor) -> RegistryResult<()> {
        if !self.shells.contains_key(aas_id) {
            return Err(RegistryError::AasDescriptorNotFound(aas_id.to_string()));
        }
        if descriptor.id != aas_id && self.shells.contains_key(&descriptor.id) {
            return Err(RegistryError::AasDescriptorAlreadyExists(descriptor.id));
        }

        let entry = ShellEntry::new(descriptor)?;
        self.shells.remove(aas_id);
        self.shells.insert(entry.descriptor.id.clone(), entry);
        Ok(())
    }

    fn remove_entry(&mut self, aas_id: &str) -> RegistryResult<()> {
        self.shells
            .remove(aas_id)
            .map(|_| ())
            .ok_or_else(|| RegistryError::AasDescriptorNotFound(aas_id.to_string()))
    }

    /// Applies `apply` to a copy and swaps the copy in only on success
    fn staged<F>(&mut self, apply: F) -> RegistryResult<()>
    where
        F: FnOnce(&mut InMemoryRegistry) -> RegistryResult<()>,
    {
        let mut staged = self.clone();
        apply(&mut staged)?;
        *self = staged;
        Ok(())
    }
}
