//! In-memory result sorting
//!
//! Each hit is decorated with its sort values once, then sorted stably. A
//! sort value is the first value the path resolves to; an absent value sorts
//! as the empty string. Ties keep the incoming (id) order.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::errors::RegistryResult;
use crate::model::ShellDescriptor;
use crate::paths::{first_value, PathCache, SegmentPath};
use crate::query::{SortDirection, Sorting};

struct SortKey {
    path: Arc<SegmentPath>,
    direction: SortDirection,
}

/// Multi-key comparator chain over shell paths
pub struct ShellSorter {
    keys: Vec<SortKey>,
}

impl ShellSorter {
    /// Compiles the sort paths. Without a sorting, hits stay in id order; a
    /// sorting without paths orders by id in its direction.
    pub fn compile(sorting: Option<&Sorting>) -> RegistryResult<Self> {
        let Some(sorting) = sorting else {
            return Ok(Self { keys: Vec::new() });
        };

        let cache = PathCache::global();
        let keys = if sorting.path.is_empty() {
            vec![SortKey {
                path: cache.resolve("id")?,
                direction: sorting.direction,
            }]
        } else {
            sorting
                .path
                .iter()
                .map(|path| {
                    Ok(SortKey {
                        path: cache.resolve(path)?,
                        direction: sorting.direction,
                    })
                })
                .collect::<RegistryResult<Vec<_>>>()?
        };

        Ok(Self { keys })
    }

    pub fn sort(&self, hits: Vec<Arc<ShellDescriptor>>) -> Vec<Arc<ShellDescriptor>> {
        if self.keys.is_empty() {
            return hits;
        }

        let mut decorated: Vec<(Vec<String>, Arc<ShellDescriptor>)> = hits
            .into_iter()
            .map(|hit| (self.sort_values(&hit), hit))
            .collect();

        decorated.sort_by(|(a, _), (b, _)| self.compare(a, b));
        decorated.into_iter().map(|(_, hit)| hit).collect()
    }

    fn sort_values(&self, shell: &ShellDescriptor) -> Vec<String> {
        self.keys
            .iter()
            .map(|key| {
                first_value(shell, key.path.blocks())
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    fn compare(&self, a: &[String], b: &[String]) -> Ordering {
        self.keys
            .iter()
            .zip(a.iter().zip(b))
            .map(|(key, (a, b))| match key.direction {
                SortDirection::Asc => a.cmp(b),
                SortDirection::Desc => b.cmp(a),
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}
