//! Document-store registry backend
//!
//! One document per shell, submodels embedded. Single-document writes rely
//! on the store's atomic find-and-modify operations; anything touching more
//! than one document, or checking before writing, runs in a transaction.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use super::collection::{CollectionError, DocumentCollection, Update};
use super::listing::{shell_page_pipeline, submodel_page_pipeline};
use super::mapping::{from_document, submodel_from_document, submodel_to_document, to_document};
use super::search::compile_search;
use crate::errors::{RegistryError, RegistryResult};
use crate::model::{ShellDescriptor, SubmodelDescriptor};
use crate::paths::SUBMODEL_DESCRIPTORS;
use crate::query::{ShellDescriptorSearchRequest, ShellDescriptorSearchResponse};
use crate::storage::{cursor_page, CursorResult, DescriptorFilter, PaginationInfo, RegistryStorage};

/// Registry storage over a [`DocumentCollection`]
#[derive(Debug)]
pub struct DocumentRegistryStorage<C> {
    collection: C,
}

impl<C: DocumentCollection> DocumentRegistryStorage<C> {
    pub fn new(collection: C) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }
}

// ==================
// Helpers
// ==================

fn by_id(aas_id: &str) -> Value {
    json!({ "_id": aas_id })
}

fn with_submodel(aas_id: &str, submodel_id: &str) -> Value {
    json!({ "_id": aas_id, "submodelDescriptors._id": submodel_id })
}

fn not_found(aas_id: &str) -> RegistryError {
    RegistryError::AasDescriptorNotFound(aas_id.to_string())
}

fn submodel_not_found(aas_id: &str, submodel_id: &str) -> RegistryError {
    RegistryError::SubmodelNotFound {
        aas_id: aas_id.to_string(),
        submodel_id: submodel_id.to_string(),
    }
}

fn submodel_exists(aas_id: &str, submodel_id: &str) -> RegistryError {
    RegistryError::SubmodelAlreadyExists {
        aas_id: aas_id.to_string(),
        submodel_id: submodel_id.to_string(),
    }
}

/// Validated document of a shell, paired with its id
fn shell_document(descriptor: &ShellDescriptor) -> RegistryResult<(String, Value)> {
    descriptor.submodel_index()?;
    Ok((descriptor.id.clone(), to_document(descriptor)?))
}

fn insert_document(collection: &dyn DocumentCollection, aas_id: &str, document: Value) -> RegistryResult<()> {
    match collection.insert_one(document) {
        Err(CollectionError::DuplicateKey(_)) => {
            Err(RegistryError::AasDescriptorAlreadyExists(aas_id.to_string()))
        }
        result => Ok(result?),
    }
}

fn replace_document(
    collection: &dyn DocumentCollection,
    aas_id: &str,
    new_id: &str,
    document: Value,
) -> RegistryResult<()> {
    if aas_id == new_id {
        return match collection.find_one_and_replace(&by_id(aas_id), document)? {
            Some(_) => Ok(()),
            None => Err(not_found(aas_id)),
        };
    }

    if collection.delete_one(&by_id(aas_id))? == 0 {
        return Err(not_found(aas_id));
    }
    insert_document(collection, new_id, document)
}

fn remove_document(collection: &dyn DocumentCollection, aas_id: &str) -> RegistryResult<()> {
    match collection.delete_one(&by_id(aas_id))? {
        0 => Err(not_found(aas_id)),
        _ => Ok(()),
    }
}

/// Explains why a filtered submodel update matched nothing
fn missing_submodel(collection: &dyn DocumentCollection, aas_id: &str, submodel_id: &str) -> RegistryError {
    match collection.count(&by_id(aas_id)) {
        Ok(0) => not_found(aas_id),
        Ok(_) => submodel_not_found(aas_id, submodel_id),
        Err(err) => err.into(),
    }
}

fn set_submodel(
    collection: &dyn DocumentCollection,
    aas_id: &str,
    submodel_id: &str,
    document: Value,
) -> RegistryResult<()> {
    let filter = json!({
        "_id": aas_id,
        "submodelDescriptors": { "$elemMatch": { "_id": submodel_id } }
    });
    let update = Update::Operators(json!({ "$set": { "submodelDescriptors.$": document } }));

    match collection.find_one_and_update(&filter, &update)? {
        Some(_) => Ok(()),
        None => Err(missing_submodel(collection, aas_id, submodel_id)),
    }
}

impl<C: DocumentCollection> RegistryStorage for DocumentRegistryStorage<C> {
    // ==================
    // Shell Descriptors
    // ==================

    fn get_all_aas_descriptors(
        &self,
        pagination: &PaginationInfo,
        filter: &DescriptorFilter,
    ) -> RegistryResult<CursorResult<Vec<Arc<ShellDescriptor>>>> {
        let documents = self
            .collection
            .aggregate(&shell_page_pipeline(filter, pagination))?;

        let shells = documents
            .into_iter()
            .map(|document| {
                let shell = from_document(document)?;
                Ok((shell.id.clone(), Arc::new(shell)))
            })
            .collect::<RegistryResult<Vec<_>>>()?;

        let page = cursor_page(shells, pagination);
        debug!(
            returned = page.result.len(),
            has_next = page.cursor.is_some(),
            "SHELLS_LISTED"
        );
        Ok(page)
    }

    fn get_aas_descriptor(&self, aas_id: &str) -> RegistryResult<Arc<ShellDescriptor>> {
        match self.collection.find_one(&by_id(aas_id))? {
            Some(document) => Ok(Arc::new(from_document(document)?)),
            None => Err(not_found(aas_id)),
        }
    }

    fn insert_aas_descriptor(&self, descriptor: ShellDescriptor) -> RegistryResult<()> {
        let (aas_id, document) = shell_document(&descriptor)?;
        insert_document(&self.collection, &aas_id, document)?;
        info!(aas_id = %aas_id, "SHELL_INSERTED");
        Ok(())
    }

    fn replace_aas_descriptor(
        &self,
        aas_id: &str,
        descriptor: ShellDescriptor,
    ) -> RegistryResult<()> {
        let (new_id, document) = shell_document(&descriptor)?;
        if aas_id == new_id {
            replace_document(&self.collection, aas_id, &new_id, document)?;
        } else {
            self.collection.transaction(&mut |tx| {
                replace_document(tx, aas_id, &new_id, document.clone())
            })?;
        }
        info!(aas_id = %aas_id, new_id = %new_id, "SHELL_REPLACED");
        Ok(())
    }

    fn remove_aas_descriptor(&self, aas_id: &str) -> RegistryResult<()> {
        remove_document(&self.collection, aas_id)?;
        info!(aas_id = %aas_id, "SHELL_REMOVED");
        Ok(())
    }

    // ==================
    // Submodel Descriptors
    // ==================

    fn get_all_submodels(
        &self,
        aas_id: &str,
        pagination: &PaginationInfo,
    ) -> RegistryResult<CursorResult<Vec<SubmodelDescriptor>>> {
        let documents = self
            .collection
            .aggregate(&submodel_page_pipeline(aas_id, pagination))?;

        if documents.is_empty() && self.collection.count(&by_id(aas_id))? == 0 {
            return Err(not_found(aas_id));
        }

        let submodels = documents
            .into_iter()
            .map(|document| {
                let submodel = submodel_from_document(document)?;
                Ok((submodel.id.clone(), submodel))
            })
            .collect::<RegistryResult<Vec<_>>>()?;

        Ok(cursor_page(submodels, pagination))
    }

    fn get_submodel(&self, aas_id: &str, submodel_id: &str) -> RegistryResult<SubmodelDescriptor> {
        let pipeline = [
            json!({ "$match": by_id(aas_id) }),
            json!({ "$project": {
                "_id": 0,
                "submodelDescriptors": { "$filter": {
                    "input": "$submodelDescriptors",
                    "as": "sm",
                    "cond": { "$eq": ["$$sm._id", { "$literal": submodel_id }] }
                }}
            }}),
        ];

        let mut documents = self.collection.aggregate(&pipeline)?.into_iter();
        let shell = documents.next().ok_or_else(|| not_found(aas_id))?;
        let submodel = match shell.get(SUBMODEL_DESCRIPTORS) {
            Some(Value::Array(matched)) => matched.first().cloned(),
            _ => None,
        };

        match submodel {
            Some(document) => submodel_from_document(document),
            None => Err(submodel_not_found(aas_id, submodel_id)),
        }
    }

    fn insert_submodel(&self, aas_id: &str, submodel: SubmodelDescriptor) -> RegistryResult<()> {
        let submodel_id = submodel.id.clone();
        let filter = json!({
            "_id": aas_id,
            "submodelDescriptors._id": { "$ne": &submodel_id }
        });
        let update = Update::Operators(json!({
            "$push": { "submodelDescriptors": submodel_to_document(&submodel)? }
        }));

        if self.collection.find_one_and_update(&filter, &update)?.is_none() {
            return Err(match self.collection.count(&by_id(aas_id))? {
                0 => not_found(aas_id),
                _ => submodel_exists(aas_id, &submodel_id),
            });
        }

        info!(aas_id = %aas_id, submodel_id = %submodel_id, "SUBMODEL_INSERTED");
        Ok(())
    }

    fn replace_submodel(
        &self,
        aas_id: &str,
        submodel_id: &str,
        submodel: SubmodelDescriptor,
    ) -> RegistryResult<()> {
        let new_id = submodel.id.clone();
        let document = submodel_to_document(&submodel)?;

        if new_id == submodel_id {
            set_submodel(&self.collection, aas_id, submodel_id, document)?;
        } else {
            self.collection.transaction(&mut |tx| {
                if tx.count(&with_submodel(aas_id, submodel_id))? == 0 {
                    return Err(missing_submodel(tx, aas_id, submodel_id));
                }
                if tx.count(&with_submodel(aas_id, &new_id))? > 0 {
                    return Err(submodel_exists(aas_id, &new_id));
                }
                set_submodel(tx, aas_id, submodel_id, document.clone())
            })?;
        }

        info!(aas_id = %aas_id, submodel_id = %submodel_id, new_id = %new_id, "SUBMODEL_REPLACED");
        Ok(())
    }

    fn remove_submodel(&self, aas_id: &str, submodel_id: &str) -> RegistryResult<()> {
        let update = Update::Pipeline(vec![json!({ "$set": {
            "submodelDescriptors": { "$filter": {
                "input": "$submodelDescriptors",
                "as": "sm",
                "cond": { "$ne": ["$$sm._id", { "$literal": submodel_id }] }
            }}
        }})]);

        let removed = self
            .collection
            .find_one_and_update(&with_submodel(aas_id, submodel_id), &update)?;
        if removed.is_none() {
            return Err(missing_submodel(&self.collection, aas_id, submodel_id));
        }

        info!(aas_id = %aas_id, submodel_id = %submodel_id, "SUBMODEL_REMOVED");
        Ok(())
    }

    // ==================
    // Collection Operations
    // ==================

    fn clear(&self) -> RegistryResult<BTreeSet<String>> {
        let mut removed = BTreeSet::new();
        self.collection.transaction(&mut |tx| {
            removed = tx
                .aggregate(&[json!({ "$project": { "_id": 1 } })])?
                .iter()
                .filter_map(|document| document.get("_id").and_then(Value::as_str))
                .map(str::to_string)
                .collect();
            tx.delete_many(&json!({}))?;
            Ok(())
        })?;

        info!(removed = removed.len(), "REGISTRY_CLEARED");
        Ok(removed)
    }

    fn search_aas_descriptors(
        &self,
        request: &ShellDescriptorSearchRequest,
    ) -> RegistryResult<ShellDescriptorSearchResponse> {
        let compiled = compile_search(request)?;
        let total = self.collection.count(&compiled.filter)?;
        let hits = self
            .collection
            .aggregate(&compiled.pipeline)?
            .into_iter()
            .map(|document| from_document(document).map(Arc::new))
            .collect::<RegistryResult<Vec<_>>>()?;

        debug!(
            total,
            returned = hits.len(),
            stages = compiled.pipeline.len(),
            "SEARCH_COMPLETE"
        );
        Ok(ShellDescriptorSearchResponse { total, hits })
    }

    fn insert_aas_descriptors_bulk(&self, descriptors: Vec<ShellDescriptor>) -> RegistryResult<()> {
        let documents = descriptors
            .iter()
            .map(shell_document)
            .collect::<RegistryResult<Vec<_>>>()?;

        self.collection.transaction(&mut |tx| {
            documents
                .iter()
                .try_for_each(|(aas_id, document)| insert_document(tx, aas_id, document.clone()))
        })?;
        info!(count = documents.len(), "SHELLS_BULK_INSERTED");
        Ok(())
    }

    fn replace_aas_descriptors_bulk(&self, descriptors: Vec<ShellDescriptor>) -> RegistryResult<()> {
        let documents = descriptors
            .iter()
            .map(shell_document)
            .collect::<RegistryResult<Vec<_>>>()?;

        self.collection.transaction(&mut |tx| {
            documents.iter().try_for_each(|(aas_id, document)| {
                replace_document(tx, aas_id, aas_id, document.clone())
            })
        })?;
        info!(count = documents.len(), "SHELLS_BULK_REPLACED");
        Ok(())
    }

    fn remove_aas_descriptors_bulk(&self, aas_ids: &[String]) -> RegistryResult<()> {
        self.collection.transaction(&mut |tx| {
            aas_ids.iter().try_for_each(|aas_id| remove_document(tx, aas_id))
        })?;
        info!(count = aas_ids.len(), "SHELLS_BULK_REMOVED");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EmbeddedCollection;
    use crate::model::AssetKind;
    use crate::query::ShellDescriptorQuery;

    fn storage() -> DocumentRegistryStorage<EmbeddedCollection> {
        let storage = DocumentRegistryStorage::new(EmbeddedCollection::new());
        storage
            .insert_aas_descriptor(
                ShellDescriptor::new("d1")
                    .with_asset_kind(AssetKind::Instance)
                    .with_submodel(SubmodelDescriptor::new("sm2").with_id_short("technical"))
                    .with_submodel(SubmodelDescriptor::new("sm1").with_id_short("nameplate")),
            )
            .unwrap();
        storage.insert_aas_descriptor(ShellDescriptor::new("d2")).unwrap();
        storage
    }

    #[test]
    fn test_documents_are_keyed_by_id() {
        let storage = storage();
        let documents = storage.collection().snapshot().unwrap();
        assert_eq!(documents[0]["_id"], json!("d1"));
        assert_eq!(documents[0]["submodelDescriptors"][0]["_id"], json!("sm2"));
        assert!(documents[0].get("id").is_none());
    }

    #[test]
    fn test_insert_duplicate_shell() {
        let err = storage().insert_aas_descriptor(ShellDescriptor::new("d1")).unwrap_err();
        assert_eq!(err, RegistryError::AasDescriptorAlreadyExists("d1".into()));
    }

    #[test]
    fn test_replace_with_new_id() {
        let storage = storage();
        storage
            .replace_aas_descriptor("d2", ShellDescriptor::new("d3").with_id_short("moved"))
            .unwrap();
        assert!(storage.get_aas_descriptor("d2").is_err());
        assert_eq!(storage.get_aas_descriptor("d3").unwrap().id_short.as_deref(), Some("moved"));

        let err = storage.replace_aas_descriptor("d3", ShellDescriptor::new("d1")).unwrap_err();
        assert_eq!(err, RegistryError::AasDescriptorAlreadyExists("d1".into()));
        assert!(storage.get_aas_descriptor("d3").is_ok());
    }

    #[test]
    fn test_submodel_lifecycle() {
        let storage = storage();
        assert_eq!(storage.get_submodel("d1", "sm1").unwrap().id_short.as_deref(), Some("nameplate"));

        storage.insert_submodel("d2", SubmodelDescriptor::new("sm9")).unwrap();
        let err = storage.insert_submodel("d2", SubmodelDescriptor::new("sm9")).unwrap_err();
        assert!(matches!(err, RegistryError::SubmodelAlreadyExists { .. }));

        storage
            .replace_submodel("d1", "sm2", SubmodelDescriptor::new("sm3").with_id_short("renamed"))
            .unwrap();
        let shell = storage.get_aas_descriptor("d1").unwrap();
        assert_eq!(shell.submodel_ids(), vec!["sm3", "sm1"]);

        let err = storage
            .replace_submodel("d1", "sm3", SubmodelDescriptor::new("sm1"))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::SubmodelAlreadyExists { aas_id: "d1".into(), submodel_id: "sm1".into() }
        );

        storage.remove_submodel("d1", "sm3").unwrap();
        assert_eq!(storage.get_aas_descriptor("d1").unwrap().submodel_ids(), vec!["sm1"]);
    }

    #[test]
    fn test_submodel_errors_distinguish_shell_and_submodel() {
        let storage = storage();
        assert_eq!(
            storage.get_submodel("missing", "sm1").unwrap_err(),
            RegistryError::AasDescriptorNotFound("missing".into())
        );
        assert!(matches!(
            storage.get_submodel("d1", "missing").unwrap_err(),
            RegistryError::SubmodelNotFound { .. }
        ));
        assert!(matches!(
            storage.remove_submodel("d2", "sm1").unwrap_err(),
            RegistryError::SubmodelNotFound { .. }
        ));
        assert_eq!(
            storage.insert_submodel("missing", SubmodelDescriptor::new("x")).unwrap_err(),
            RegistryError::AasDescriptorNotFound("missing".into())
        );
    }

    #[test]
    fn test_submodel_pages() {
        let storage = storage();
        let first = storage.get_all_submodels("d1", &PaginationInfo::first(1)).unwrap();
        assert_eq!(first.result[0].id, "sm1");
        assert_eq!(first.cursor.as_deref(), Some("sm2"));

        let empty = storage.get_all_submodels("d2", &PaginationInfo::unlimited()).unwrap();
        assert!(empty.result.is_empty());
        assert!(storage.get_all_submodels("missing", &PaginationInfo::unlimited()).is_err());
    }

    #[test]
    fn test_search_narrows_submodels() {
        let storage = storage();
        let request = ShellDescriptorSearchRequest::new()
            .with_query(ShellDescriptorQuery::matching("submodelDescriptors.idShort", "nameplate"));
        let response = storage.search_aas_descriptors(&request).unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.hits[0].submodel_ids(), vec!["sm1"]);
        assert_eq!(storage.get_aas_descriptor("d1").unwrap().submodel_descriptors.len(), 2);
    }

    #[test]
    fn test_bulk_insert_is_atomic() {
        let storage = storage();
        let err = storage
            .insert_aas_descriptors_bulk(vec![ShellDescriptor::new("d5"), ShellDescriptor::new("d1")])
            .unwrap_err();
        assert_eq!(err, RegistryError::AasDescriptorAlreadyExists("d1".into()));
        assert!(storage.get_aas_descriptor("d5").is_err());
    }

    #[test]
    fn test_clear_returns_ids() {
        let storage = storage();
        let removed = storage.clear().unwrap();
        assert_eq!(removed.into_iter().collect::<Vec<_>>(), vec!["d1", "d2"]);
        assert!(storage.collection().is_empty().unwrap());
    }
}
