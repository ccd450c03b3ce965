//! Cursor pagination tests
//!
//! A cursor is the id of the first item of the next page. Chasing it until
//! it runs out must visit every matching shell once, in ascending id order.

mod common;

use std::collections::BTreeSet;

use aasregistry::model::AssetKind;
use aasregistry::storage::{DescriptorFilter, PaginationInfo, RegistryStorage};
use proptest::prelude::*;

// =============================================================================
// Test Utilities
// =============================================================================

fn chase_shells(storage: &dyn RegistryStorage, limit: usize, filter: &DescriptorFilter) -> Vec<String> {
    let mut ids = Vec::new();
    let mut pagination = PaginationInfo::first(limit);
    loop {
        let page = storage.get_all_aas_descriptors(&pagination, filter).unwrap();
        assert!(page.result.len() <= limit);
        ids.extend(page.result.iter().map(|shell| shell.id.clone()));
        match page.cursor {
            Some(cursor) => pagination = PaginationInfo::first(limit).with_cursor(cursor),
            None => return ids,
        }
    }
}

fn chase_submodels(storage: &dyn RegistryStorage, aas_id: &str, limit: usize) -> Vec<String> {
    let mut ids = Vec::new();
    let mut pagination = PaginationInfo::first(limit);
    loop {
        let page = storage.get_all_submodels(aas_id, &pagination).unwrap();
        ids.extend(page.result.iter().map(|sm| sm.id.clone()));
        match page.cursor {
            Some(cursor) => pagination = PaginationInfo::first(limit).with_cursor(cursor),
            None => return ids,
        }
    }
}

// =============================================================================
// Examples
// =============================================================================

/// d1, d2, d3 with limit 1: each cursor names the next shell
#[test]
fn test_limit_one_walks_each_shell() {
    for (name, storage) in common::filled_backends(&common::sample_shells()) {
        let filter = DescriptorFilter::default();

        let first = storage
            .get_all_aas_descriptors(&PaginationInfo::first(1), &filter)
            .unwrap();
        assert_eq!(first.result[0].id, "d1", "{}", name);
        assert_eq!(first.cursor.as_deref(), Some("d2"), "{}", name);

        let second = storage
            .get_all_aas_descriptors(&PaginationInfo::first(1).with_cursor("d2"), &filter)
            .unwrap();
        assert_eq!(second.result[0].id, "d2", "{}", name);
        assert_eq!(second.cursor.as_deref(), Some("d3"), "{}", name);

        let last = storage
            .get_all_aas_descriptors(&PaginationInfo::first(1).with_cursor("d3"), &filter)
            .unwrap();
        assert_eq!(last.result[0].id, "d3", "{}", name);
        assert_eq!(last.cursor, None, "{}", name);
    }
}

/// An unlimited page returns everything and no cursor
#[test]
fn test_unlimited_page() {
    for (name, storage) in common::filled_backends(&common::sample_shells()) {
        let page = storage
            .get_all_aas_descriptors(&PaginationInfo::unlimited(), &DescriptorFilter::default())
            .unwrap();
        assert_eq!(page.result.len(), 3, "{}", name);
        assert_eq!(page.cursor, None, "{}", name);
    }
}

/// A cursor past the last id yields an empty final page
#[test]
fn test_cursor_past_end() {
    for (name, storage) in common::filled_backends(&common::sample_shells()) {
        let page = storage
            .get_all_aas_descriptors(
                &PaginationInfo::first(2).with_cursor("zzz"),
                &DescriptorFilter::default(),
            )
            .unwrap();
        assert!(page.result.is_empty(), "{}", name);
        assert_eq!(page.cursor, None, "{}", name);
    }
}

/// Listing applies the asset filter before paging
#[test]
fn test_filtered_listing() {
    let filter = DescriptorFilter::new(Some(AssetKind::Instance), None);
    for (name, storage) in common::filled_backends(&common::sample_shells()) {
        assert_eq!(chase_shells(storage.as_ref(), 1, &filter), vec!["d1", "d2"], "{}", name);
    }
}

/// Submodels of one shell page in id order
#[test]
fn test_submodel_listing() {
    for (name, storage) in common::filled_backends(&common::sample_shells()) {
        assert_eq!(chase_submodels(storage.as_ref(), "d1", 1), vec!["sm1", "sm2"], "{}", name);

        let err = storage
            .get_all_submodels("missing", &PaginationInfo::unlimited())
            .unwrap_err();
        assert_eq!(err.code(), "AAS_REGISTRY_DESCRIPTOR_NOT_FOUND", "{}", name);
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Chasing the cursor yields each matching shell exactly once, in id order
    #[test]
    fn test_cursor_exhaustion(
        shells in common::arb_shells(8),
        limit in 1usize..4,
        filter in common::arb_filter(),
    ) {
        let expected: Vec<String> = shells
            .iter()
            .filter(|shell| filter.matches(shell))
            .map(|shell| shell.id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        for (name, storage) in common::filled_backends(&shells) {
            prop_assert_eq!(chase_shells(storage.as_ref(), limit, &filter), expected.clone(), "{}", name);
        }
    }

    /// Same guarantee for the submodels of every shell
    #[test]
    fn test_submodel_cursor_exhaustion(
        shells in common::arb_shells(3),
        limit in 1usize..3,
    ) {
        for (name, storage) in common::filled_backends(&shells) {
            for shell in &shells {
                let mut expected: Vec<String> =
                    shell.submodel_ids().into_iter().map(str::to_string).collect();
                expected.sort();
                prop_assert_eq!(
                    chase_submodels(storage.as_ref(), &shell.id, limit),
                    expected,
                    "{}",
                    name
                );
            }
        }
    }
}
