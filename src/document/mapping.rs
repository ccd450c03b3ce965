//! Descriptor <-> document mapping
//!
//! Stored documents are the camelCase JSON form of a shell descriptor with
//! the shell id and every submodel id kept under `_id`. Query paths are
//! mapped onto document fields the same way.

use serde_json::{Map, Value};

use crate::errors::{RegistryError, RegistryResult};
use crate::model::{ShellDescriptor, SubmodelDescriptor};
use crate::paths::{SegmentBlock, SUBMODEL_DESCRIPTORS};

const ID: &str = "id";
const DOCUMENT_ID: &str = "_id";

// ==================
// Documents
// ==================

pub fn to_document(shell: &ShellDescriptor) -> RegistryResult<Value> {
    let value = serde_json::to_value(shell).map_err(encode_error)?;
    let mut document = keyed_by_document_id(value)?;

    if let Some(Value::Array(submodels)) = document
        .as_object_mut()
        .and_then(|map| map.get_mut(SUBMODEL_DESCRIPTORS))
    {
        for submodel in submodels.iter_mut() {
            *submodel = keyed_by_document_id(std::mem::take(submodel))?;
        }
    }
    Ok(document)
}

pub fn submodel_to_document(submodel: &SubmodelDescriptor) -> RegistryResult<Value> {
    keyed_by_document_id(serde_json::to_value(submodel).map_err(encode_error)?)
}

pub fn from_document(document: Value) -> RegistryResult<ShellDescriptor> {
    let mut value = keyed_by_id(document)?;
    if let Some(Value::Array(submodels)) = value
        .as_object_mut()
        .and_then(|map| map.get_mut(SUBMODEL_DESCRIPTORS))
    {
        for submodel in submodels.iter_mut() {
            *submodel = keyed_by_id(std::mem::take(submodel))?;
        }
    }
    serde_json::from_value(value).map_err(decode_error)
}

pub fn submodel_from_document(document: Value) -> RegistryResult<SubmodelDescriptor> {
    serde_json::from_value(keyed_by_id(document)?).map_err(decode_error)
}

/// Moves `id` to the front of the object as `_id`
fn keyed_by_document_id(value: Value) -> RegistryResult<Value> {
    let Value::Object(mut map) = value else {
        return Err(RegistryError::InvalidDocument("descriptor is not an object".to_string()));
    };
    let id = map
        .remove(ID)
        .ok_or_else(|| RegistryError::InvalidDocument("descriptor has no id".to_string()))?;

    let mut document = Map::with_capacity(map.len() + 1);
    document.insert(DOCUMENT_ID.to_string(), id);
    document.extend(map);
    Ok(Value::Object(document))
}

fn keyed_by_id(value: Value) -> RegistryResult<Value> {
    let Value::Object(mut map) = value else {
        return Err(RegistryError::InvalidDocument("document is not an object".to_string()));
    };
    if let Some(id) = map.remove(DOCUMENT_ID) {
        map.insert(ID.to_string(), id);
    }
    Ok(Value::Object(map))
}

fn encode_error(err: serde_json::Error) -> RegistryError {
    RegistryError::InvalidDocument(format!("cannot encode descriptor: {}", err))
}

fn decode_error(err: serde_json::Error) -> RegistryError {
    RegistryError::InvalidDocument(format!("cannot decode descriptor: {}", err))
}

// ==================
// Paths
// ==================

/// Document field of a canonical path from the shell root
pub fn document_path(canonical: &str) -> String {
    match canonical.split_once('.') {
        None if canonical == ID => DOCUMENT_ID.to_string(),
        Some((SUBMODEL_DESCRIPTORS, ID)) => format!("{}.{}", SUBMODEL_DESCRIPTORS, DOCUMENT_ID),
        _ => canonical.to_string(),
    }
}

/// Array field stepped into element by element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListStep {
    /// Field relative to the enclosing element, dotted through plain objects
    pub field: String,
    pub extension: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafStep {
    pub field: String,
    /// The leaf holds a list of values
    pub list: bool,
}

/// A scoped block path folded into array steps and a final leaf field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    pub lists: Vec<ListStep>,
    pub leaf: LeafStep,
}

impl DocumentPath {
    /// Folds `blocks`, relative to a shell or a submodel, into document
    /// fields. Consecutive object steps join into one dotted field.
    pub fn from_blocks(blocks: &[SegmentBlock]) -> RegistryResult<Self> {
        let mut lists = Vec::new();
        let mut prefix: Vec<&str> = Vec::new();

        for (index, block) in blocks.iter().enumerate() {
            match block {
                SegmentBlock::Object { name, .. } => prefix.push(name),
                SegmentBlock::ObjectList { name, .. } => {
                    lists.push(ListStep {
                        field: joined(&prefix, name),
                        extension: block.is_extension_list(),
                    });
                    prefix.clear();
                }
                SegmentBlock::Leaf { name } | SegmentBlock::LeafList { name } => {
                    let name = if index == 0 && *name == ID { DOCUMENT_ID } else { name };
                    return Ok(Self {
                        lists,
                        leaf: LeafStep {
                            field: joined(&prefix, name),
                            list: block.is_list_leaf(),
                        },
                    });
                }
            }
        }

        Err(RegistryError::InvalidQuery("path does not end on a leaf".to_string()))
    }

    /// Index of the innermost extension list, where an extension name applies
    pub fn extension_step(&self) -> Option<usize> {
        self.lists.iter().rposition(|step| step.extension)
    }
}

fn joined(prefix: &[&str], name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix.join("."), name)
    }
}
