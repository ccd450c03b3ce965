//! Query grouping
//!
//! Splits a predicate chain into root-scope predicates and predicates that
//! cross into the submodel list. All submodel-scope predicates of a chain
//! must hold for the same submodel.

use std::sync::Arc;

use super::ast::ShellDescriptorQuery;
use super::matcher::ValueMatcher;
use crate::errors::{RegistryError, RegistryResult};
use crate::paths::{PathCache, SegmentBlock, SegmentPath};

/// A compiled predicate
#[derive(Debug, Clone)]
pub struct Predicate {
    pub path: Arc<SegmentPath>,
    pub matcher: ValueMatcher,
    pub extension_name: Option<String>,
}

impl Predicate {
    pub fn compile(query: &ShellDescriptorQuery) -> RegistryResult<Self> {
        let path = PathCache::global().resolve(&query.path)?;
        if query.extension_name.is_some() && !path.crosses_extension() {
            return Err(RegistryError::InvalidQuery(format!(
                "extension name given for '{}', which does not lead through extensions",
                query.path
            )));
        }

        Ok(Self {
            matcher: ValueMatcher::compile(query.query_type, &query.value)?,
            extension_name: query.extension_name.clone(),
            path,
        })
    }

    /// Blocks relative to the scope root: the shell, or a submodel
    pub fn scoped_blocks(&self) -> &[SegmentBlock] {
        self.path
            .submodel_scope()
            .unwrap_or_else(|| self.path.blocks())
    }

    pub fn is_submodel_scope(&self) -> bool {
        self.path.submodel_scope().is_some()
    }

    /// Checks one resolved value and its enclosing extension name
    pub fn accepts(&self, value: &str, extension: Option<&str>) -> bool {
        let in_extension = match &self.extension_name {
            Some(name) => extension == Some(name.as_str()),
            None => true,
        };
        in_extension && self.matcher.matches(value)
    }
}

/// Predicates partitioned by scope
#[derive(Debug, Clone, Default)]
pub struct GroupedQueries {
    pub root: Vec<Predicate>,
    pub submodel: Vec<Predicate>,
}

impl GroupedQueries {
    pub fn group(query: Option<&ShellDescriptorQuery>) -> RegistryResult<Self> {
        let mut grouped = Self::default();
        for link in query.into_iter().flat_map(ShellDescriptorQuery::chain) {
            let predicate = Predicate::compile(link)?;
            if predicate.is_submodel_scope() {
                grouped.submodel.push(predicate);
            } else {
                grouped.root.push(predicate);
            }
        }
        Ok(grouped)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty() && self.submodel.is_empty()
    }

    pub fn has_submodel_scope(&self) -> bool {
        !self.submodel.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_scope() {
        let query = ShellDescriptorQuery::matching("assetKind", "Instance")
            .and(ShellDescriptorQuery::matching("submodelDescriptors.idShort", "nameplate"))
            .and(ShellDescriptorQuery::regex("submodelDescriptors.endpoints.interface", "SUBMODEL.*"))
            .and(ShellDescriptorQuery::matching("endpoints.interface", "AAS-3.0"));

        let grouped = GroupedQueries::group(Some(&query)).unwrap();
        assert_eq!(grouped.root.len(), 2);
        assert_eq!(grouped.submodel.len(), 2);
        assert_eq!(grouped.submodel[0].scoped_blocks(), &[SegmentBlock::Leaf { name: "idShort" }]);
        assert_eq!(grouped.root[1].scoped_blocks().len(), 2);
    }

    #[test]
    fn test_empty_query() {
        let grouped = GroupedQueries::group(None).unwrap();
        assert!(grouped.is_empty());
        assert!(!grouped.has_submodel_scope());
    }

    #[test]
    fn test_unknown_path_fails() {
        let query = ShellDescriptorQuery::matching("idShort", "a")
            .and(ShellDescriptorQuery::matching("unknown.field", "b"));
        let err = GroupedQueries::group(Some(&query)).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidQuery(_)));
    }

    #[test]
    fn test_extension_name_requires_extension_path() {
        let query = ShellDescriptorQuery::matching("idShort", "a").with_extension_name("tag");
        assert!(GroupedQueries::group(Some(&query)).is_err());

        let query = ShellDescriptorQuery::matching("submodelDescriptors.extensions.value", "a")
            .with_extension_name("tag");
        assert!(GroupedQueries::group(Some(&query)).is_ok());
    }

    #[test]
    fn test_accepts_honours_extension_name() {
        let query = ShellDescriptorQuery::matching("extensions.value", "red").with_extension_name("color");
        let predicate = Predicate::compile(&query).unwrap();

        assert!(predicate.accepts("red", Some("color")));
        assert!(!predicate.accepts("red", Some("size")));
        assert!(!predicate.accepts("red", None));
        assert!(!predicate.accepts("blue", Some("color")));
    }
}
