//! Search request model
//!
//! Mirrors the JSON search API: a chain of predicates joined by
//! `combinedWith`, an optional sorting and an optional page.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::ShellDescriptor;

/// How a predicate compares its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// Exact string equality
    #[default]
    Match,
    /// Anchored full-string regular expression
    Regex,
}

/// One predicate of a conjunction chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellDescriptorQuery {
    pub path: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_name: Option<String>,
    #[serde(default)]
    pub query_type: QueryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_with: Option<Box<ShellDescriptorQuery>>,
}

impl ShellDescriptorQuery {
    /// Creates an exact-match predicate
    pub fn matching(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
            extension_name: None,
            query_type: QueryType::Match,
            combined_with: None,
        }
    }

    /// Creates a regex predicate
    pub fn regex(path: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            query_type: QueryType::Regex,
            ..Self::matching(path, pattern)
        }
    }

    /// Restricts the predicate to values inside extensions with this name
    pub fn with_extension_name(mut self, name: impl Into<String>) -> Self {
        self.extension_name = Some(name.into());
        self
    }

    /// Appends a predicate to the end of the chain
    pub fn and(mut self, other: ShellDescriptorQuery) -> Self {
        let tail = match self.combined_with.take() {
            Some(next) => (*next).and(other),
            None => other,
        };
        self.combined_with = Some(Box::new(tail));
        self
    }

    /// Iterates the chain from this predicate onwards
    pub fn chain(&self) -> impl Iterator<Item = &ShellDescriptorQuery> {
        std::iter::successors(Some(self), |query| query.combined_with.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort paths sharing one direction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sorting {
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default)]
    pub path: Vec<String>,
}

impl Sorting {
    pub fn asc(paths: &[&str]) -> Self {
        Self {
            direction: SortDirection::Asc,
            path: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn desc(paths: &[&str]) -> Self {
        Self {
            direction: SortDirection::Desc,
            ..Self::asc(paths)
        }
    }
}

/// Offset page of a search result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub index: u32,
    pub size: u32,
}

impl Page {
    pub fn new(index: u32, size: u32) -> Self {
        Self { index, size }
    }

    /// Number of hits before this page, `None` for an unbounded page
    pub fn skip(&self) -> Option<usize> {
        (self.size > 0).then(|| self.index as usize * self.size as usize)
    }

    /// Page size, `None` for an unbounded page
    pub fn limit(&self) -> Option<usize> {
        (self.size > 0).then_some(self.size as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellDescriptorSearchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<Sorting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<ShellDescriptorQuery>,
}

impl ShellDescriptorSearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: ShellDescriptorQuery) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_sorting(mut self, sorting: Sorting) -> Self {
        self.sort_by = Some(sorting);
        self
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }
}

/// Search result: total hit count before paging plus the requested page
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShellDescriptorSearchResponse {
    pub total: u64,
    pub hits: Vec<Arc<ShellDescriptor>>,
}

impl ShellDescriptorSearchResponse {
    pub fn hit_ids(&self) -> Vec<&str> {
        self.hits.iter().map(|hit| hit.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chain_and_appends_at_tail() {
        let query = ShellDescriptorQuery::matching("idShort", "a")
            .and(ShellDescriptorQuery::matching("assetType", "b"))
            .and(ShellDescriptorQuery::regex("id", "c.*"));

        let paths: Vec<&str> = query.chain().map(|q| q.path.as_str()).collect();
        assert_eq!(paths, vec!["idShort", "assetType", "id"]);
    }

    #[test]
    fn test_request_wire_format() {
        let request: ShellDescriptorSearchRequest = serde_json::from_value(json!({
            "page": {"index": 1, "size": 10},
            "sortBy": {"direction": "DESC", "path": ["idShort"]},
            "query": {
                "path": "submodelDescriptors.extensions.value",
                "value": "x.*",
                "extensionName": "tag",
                "queryType": "regex",
                "combinedWith": {"path": "assetType", "value": "Motor"}
            }
        }))
        .unwrap();

        assert_eq!(request.page, Some(Page::new(1, 10)));
        assert_eq!(request.sort_by, Some(Sorting::desc(&["idShort"])));
        let query = request.query.unwrap();
        assert_eq!(query.query_type, QueryType::Regex);
        assert_eq!(query.extension_name.as_deref(), Some("tag"));
        let next = query.combined_with.unwrap();
        assert_eq!(next.query_type, QueryType::Match);
        assert_eq!(next.value, "Motor");
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(Page::new(2, 5).skip(), Some(10));
        assert_eq!(Page::new(2, 5).limit(), Some(5));
        assert_eq!(Page::new(3, 0).skip(), None);
        assert_eq!(Page::new(3, 0).limit(), None);
    }
}
