//! In-process document collection
//!
//! Documents are held in `_id` order behind a read/write lock. A transaction
//! holds the write lock for its whole duration and works on a copy of the
//! document set, which replaces the live set only when the body succeeds.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{debug, warn};

use super::errors::{EngineError, EngineResult};
use super::pipeline;
use super::query;
use super::update::apply_update;
use super::value::RegexCache;
use crate::document::{CollectionError, CollectionResult, DocumentCollection, Update};
use crate::errors::RegistryResult;

/// Documents keyed by `_id`
pub type DocumentSet = BTreeMap<String, Value>;

#[derive(Debug, Default)]
pub struct EmbeddedCollection {
    documents: RwLock<DocumentSet>,
}

impl EmbeddedCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_set(documents: DocumentSet) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    fn into_set(self) -> CollectionResult<DocumentSet> {
        self.documents.into_inner().map_err(|_| lock_poisoned())
    }

    /// Number of stored documents
    pub fn len(&self) -> CollectionResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> CollectionResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Copy of every stored document in `_id` order
    pub fn snapshot(&self) -> CollectionResult<Vec<Value>> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn read(&self) -> CollectionResult<RwLockReadGuard<'_, DocumentSet>> {
        self.documents.read().map_err(|_| lock_poisoned())
    }

    fn write(&self) -> CollectionResult<RwLockWriteGuard<'_, DocumentSet>> {
        self.documents.write().map_err(|_| lock_poisoned())
    }
}

fn lock_poisoned() -> CollectionError {
    CollectionError::Unavailable("document set lock poisoned".to_string())
}

fn document_id(document: &Value) -> EngineResult<String> {
    document
        .get("_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EngineError::InvalidDocument("document has no string _id".to_string()))
}

/// `_id` a filter pins by plain equality
fn pinned_id(filter: &Value) -> Option<&str> {
    filter.get("_id")?.as_str()
}

/// Documents `filter` can match: only the pinned one when the filter pins an
/// `_id`, otherwise all of them. The full filter still has to be applied.
fn candidates<'a>(
    documents: &'a DocumentSet,
    filter: &Value,
) -> Box<dyn Iterator<Item = (&'a String, &'a Value)> + 'a> {
    match pinned_id(filter) {
        Some(id) => Box::new(documents.get_key_value(id).into_iter()),
        None => Box::new(documents.iter()),
    }
}

/// Id of the first document in `_id` order matching `filter`
fn first_match(documents: &DocumentSet, filter: &Value, cache: &mut RegexCache) -> EngineResult<Option<String>> {
    for (id, document) in candidates(documents, filter) {
        if query::matches(document, filter, cache)? {
            return Ok(Some(id.clone()));
        }
    }
    Ok(None)
}

fn ensure_same_id(id: &str, document: &Value) -> EngineResult<()> {
    let new_id = document_id(document)?;
    if new_id == id {
        Ok(())
    } else {
        Err(EngineError::InvalidDocument(format!(
            "_id is immutable: '{}' cannot become '{}'",
            id, new_id
        )))
    }
}

impl DocumentCollection for EmbeddedCollection {
    fn insert_one(&self, document: Value) -> CollectionResult<()> {
        let id = document_id(&document)?;
        let mut documents = self.write()?;
        if documents.contains_key(&id) {
            return Err(EngineError::DuplicateKey(id).into());
        }
        documents.insert(id, document);
        Ok(())
    }

    fn find_one(&self, filter: &Value) -> CollectionResult<Option<Value>> {
        let documents = self.read()?;
        let mut cache = RegexCache::new();
        for (_, document) in candidates(&documents, filter) {
            if query::matches(document, filter, &mut cache)? {
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    fn find_one_and_replace(
        &self,
        filter: &Value,
        mut replacement: Value,
    ) -> CollectionResult<Option<Value>> {
        let mut documents = self.write()?;
        let Some(id) = first_match(&documents, filter, &mut RegexCache::new())? else {
            return Ok(None);
        };

        if replacement.get("_id").is_none() {
            if let Value::Object(map) = &mut replacement {
                map.insert("_id".to_string(), Value::String(id.clone()));
            }
        }
        ensure_same_id(&id, &replacement)?;
        Ok(documents.insert(id, replacement))
    }

    fn find_one_and_update(&self, filter: &Value, update: &Update) -> CollectionResult<Option<Value>> {
        let mut documents = self.write()?;
        let mut cache = RegexCache::new();
        let Some(id) = first_match(&documents, filter, &mut cache)? else {
            return Ok(None);
        };
        let Some(current) = documents.get(&id) else {
            return Ok(None);
        };

        let updated = apply_update(current, filter, update, &mut cache)?;
        ensure_same_id(&id, &updated)?;
        Ok(documents.insert(id, updated))
    }

    fn delete_one(&self, filter: &Value) -> CollectionResult<u64> {
        let mut documents = self.write()?;
        match first_match(&documents, filter, &mut RegexCache::new())? {
            Some(id) => {
                documents.remove(&id);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete_many(&self, filter: &Value) -> CollectionResult<u64> {
        let mut documents = self.write()?;
        let mut cache = RegexCache::new();
        let mut matched = Vec::new();
        for (id, document) in candidates(&documents, filter) {
            if query::matches(document, filter, &mut cache)? {
                matched.push(id.clone());
            }
        }
        for id in &matched {
            documents.remove(id);
        }
        Ok(matched.len() as u64)
    }

    fn count(&self, filter: &Value) -> CollectionResult<u64> {
        let documents = self.read()?;
        let mut cache = RegexCache::new();
        let mut count = 0;
        for (_, document) in candidates(&documents, filter) {
            if query::matches(document, filter, &mut cache)? {
                count += 1;
            }
        }
        Ok(count)
    }

    fn aggregate(&self, stages: &[Value]) -> CollectionResult<Vec<Value>> {
        let batch: Vec<Value> = {
            let documents = self.read()?;
            match stages.first().and_then(|stage| stage.get("$match")) {
                Some(filter) => candidates(&documents, filter)
                    .map(|(_, document)| document.clone())
                    .collect(),
                None => documents.values().cloned().collect(),
            }
        };
        Ok(pipeline::run(batch, stages, &mut RegexCache::new())?)
    }

    fn transaction(
        &self,
        body: &mut dyn FnMut(&dyn DocumentCollection) -> RegistryResult<()>,
    ) -> RegistryResult<()> {
        let mut live = self.write()?;
        let working = EmbeddedCollection::from_set((*live).clone());

        match body(&working) {
            Ok(()) => {
                *live = working.into_set()?;
                debug!(documents = live.len(), "TRANSACTION_COMMITTED");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "TRANSACTION_ROLLED_BACK");
                Err(err)
            }
        }
    }
}
