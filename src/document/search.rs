//! Search compilation: filter, narrowing projection, sort and page

use serde_json::{json, Value};

use super::criteria::compile_filter;
use super::projection::compile_projection;
use super::sort::compile_sort;
use crate::errors::RegistryResult;
use crate::query::{GroupedQueries, ShellDescriptorSearchRequest};

/// A search request compiled for the document store
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSearch {
    /// Filter counted for the total hit count
    pub filter: Value,
    /// Aggregation producing the requested page
    pub pipeline: Vec<Value>,
}

pub fn compile_search(request: &ShellDescriptorSearchRequest) -> RegistryResult<CompiledSearch> {
    let queries = GroupedQueries::group(request.query.as_ref())?;
    let filter = compile_filter(&queries)?;

    let mut pipeline = vec![json!({ "$match": filter.clone() })];
    pipeline.extend(compile_projection(&queries)?);
    pipeline.extend(compile_sort(request.sort_by.as_ref())?);

    if let Some(page) = request.page {
        if let Some(skip) = page.skip().filter(|skip| *skip > 0) {
            pipeline.push(json!({ "$skip": skip }));
        }
        if let Some(limit) = page.limit() {
            pipeline.push(json!({ "$limit": limit }));
        }
    }

    Ok(CompiledSearch { filter, pipeline })
}
