//! In-memory search: filter, count, sort, page

use std::sync::Arc;

use tracing::debug;

use super::filter::ShellFilter;
use super::sorter::ShellSorter;
use crate::errors::RegistryResult;
use crate::model::ShellDescriptor;
use crate::query::{GroupedQueries, ShellDescriptorSearchRequest, ShellDescriptorSearchResponse};

/// Runs a search over shells given in id order
pub fn search<'a, I>(
    shells: I,
    request: &ShellDescriptorSearchRequest,
) -> RegistryResult<ShellDescriptorSearchResponse>
where
    I: IntoIterator<Item = &'a Arc<ShellDescriptor>>,
{
    let queries = GroupedQueries::group(request.query.as_ref())?;
    let sorter = ShellSorter::compile(request.sort_by.as_ref())?;
    let filter = ShellFilter::new(&queries);

    let matching: Vec<Arc<ShellDescriptor>> =
        shells.into_iter().filter_map(|shell| filter.apply(shell)).collect();
    let total = matching.len() as u64;
    let sorted = sorter.sort(matching);

    let (skip, limit) = match request.page {
        Some(page) => (page.skip().unwrap_or(0), page.limit()),
        None => (0, None),
    };
    let hits: Vec<Arc<ShellDescriptor>> = sorted
        .into_iter()
        .skip(skip)
        .take(limit.unwrap_or(usize::MAX))
        .collect();

    debug!(
        total,
        returned = hits.len(),
        root_predicates = queries.root.len(),
        submodel_predicates = queries.submodel.len(),
        "SEARCH_COMPLETE"
    );

    Ok(ShellDescriptorSearchResponse { total, hits })
}
