//! Cursor pagination over id-ordered sequences
//!
//! A cursor is the id of the first item of the next page. Items are emitted
//! in ascending id order starting at the cursor, and the next cursor is the
//! id that follows the last emitted item.

use std::collections::BTreeMap;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    /// Page size; zero or absent means unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Id to start from; absent means the start of the sequence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl PaginationInfo {
    pub fn new(limit: Option<usize>, cursor: Option<String>) -> Self {
        Self { limit, cursor }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn first(limit: usize) -> Self {
        Self::new(Some(limit), None)
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|limit| *limit > 0)
    }

    /// Entries of `map` from the cursor onwards
    pub fn seek<'a, V>(
        &self,
        map: &'a BTreeMap<String, V>,
    ) -> impl Iterator<Item = (&'a String, &'a V)> + 'a {
        let lower = match &self.cursor {
            Some(cursor) => Bound::Included(cursor.clone()),
            None => Bound::Unbounded,
        };
        map.range((lower, Bound::Unbounded))
    }
}

/// One page plus the cursor of the following page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorResult<T> {
    pub cursor: Option<String>,
    pub result: T,
}

impl<T> CursorResult<T> {
    pub fn new(cursor: Option<String>, result: T) -> Self {
        Self { cursor, result }
    }
}

/// Takes one page from id-ordered `(id, item)` pairs that already start at
/// the cursor.
pub fn cursor_page<K, T, I>(items: I, pagination: &PaginationInfo) -> CursorResult<Vec<T>>
where
    K: AsRef<str>,
    I: IntoIterator<Item = (K, T)>,
{
    let limit = pagination.effective_limit();
    let mut page = Vec::new();
    let mut cursor = None;

    for (id, item) in items {
        if limit.is_some_and(|limit| page.len() == limit) {
            cursor = Some(id.as_ref().to_string());
            break;
        }
        page.push(item);
    }

    CursorResult::new(cursor, page)
}
