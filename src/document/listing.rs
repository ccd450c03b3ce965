//! Cursor listing pipelines
//!
//! Pages are read in ascending id order starting at the cursor id. One extra
//! document is fetched so its id becomes the next cursor.

use serde_json::{json, Map, Value};

use crate::model::AssetKind;
use crate::paths::SUBMODEL_DESCRIPTORS;
use crate::storage::{DescriptorFilter, PaginationInfo};

/// Filter document for the asset kind and type list filter
pub fn descriptor_filter(filter: &DescriptorFilter) -> Map<String, Value> {
    let mut conditions = Map::new();
    match filter.asset_kind {
        Some(AssetKind::NotApplicable) => {
            conditions.insert("assetKind".to_string(), json!({ "$exists": false }));
        }
        Some(kind) => {
            conditions.insert("assetKind".to_string(), json!(kind.as_str()));
        }
        None => {}
    }
    if let Some(asset_type) = &filter.asset_type {
        conditions.insert("assetType".to_string(), json!(asset_type));
    }
    conditions
}

fn page_stages(pipeline: &mut Vec<Value>, pagination: &PaginationInfo) {
    pipeline.push(json!({ "$sort": { "_id": 1 } }));
    if let Some(limit) = pagination.effective_limit() {
        pipeline.push(json!({ "$limit": limit + 1 }));
    }
}

pub fn shell_page_pipeline(filter: &DescriptorFilter, pagination: &PaginationInfo) -> Vec<Value> {
    let mut conditions = descriptor_filter(filter);
    if let Some(cursor) = &pagination.cursor {
        conditions.insert("_id".to_string(), json!({ "$gte": cursor }));
    }

    let mut pipeline = vec![json!({ "$match": conditions })];
    page_stages(&mut pipeline, pagination);
    pipeline
}

/// Submodels of one shell as standalone documents
pub fn submodel_page_pipeline(aas_id: &str, pagination: &PaginationInfo) -> Vec<Value> {
    let mut pipeline = vec![
        json!({ "$match": { "_id": aas_id } }),
        json!({ "$unwind": format!("${}", SUBMODEL_DESCRIPTORS) }),
        json!({ "$replaceRoot": { "newRoot": format!("${}", SUBMODEL_DESCRIPTORS) } }),
    ];
    if let Some(cursor) = &pagination.cursor {
        pipeline.push(json!({ "$match": { "_id": { "$gte": cursor } } }));
    }
    page_stages(&mut pipeline, pagination);
    pipeline
}
