//! Shared fixtures and proptest generators for the integration tests
//!
//! Generated values come from tiny alphabets so random predicates hit often
//! and same-row combinations actually occur.

#![allow(dead_code)]

use aasregistry::document::DocumentRegistryStorage;
use aasregistry::engine::EmbeddedCollection;
use aasregistry::memory::LockingRegistryStorage;
use aasregistry::model::{AssetKind, Endpoint, Extension, Reference, ShellDescriptor, SubmodelDescriptor};
use aasregistry::query::{Page, ShellDescriptorQuery, ShellDescriptorSearchRequest, Sorting};
use aasregistry::storage::{DescriptorFilter, RegistryStorage};
use proptest::collection::vec;
use proptest::prelude::*;

// =============================================================================
// Backends
// =============================================================================

/// Every backend under test, each empty
pub fn backends() -> Vec<(&'static str, Box<dyn RegistryStorage>)> {
    vec![
        ("in-memory", Box::new(LockingRegistryStorage::new())),
        (
            "document",
            Box::new(DocumentRegistryStorage::new(EmbeddedCollection::new())),
        ),
    ]
}

/// Every backend, filled with the same shells
pub fn filled_backends(shells: &[ShellDescriptor]) -> Vec<(&'static str, Box<dyn RegistryStorage>)> {
    let backends = backends();
    for (name, storage) in &backends {
        storage
            .insert_aas_descriptors_bulk(shells.to_vec())
            .unwrap_or_else(|e| panic!("{}: bulk insert failed: {}", name, e));
    }
    backends
}

/// d1, d2, d3 with a few submodels each
pub fn sample_shells() -> Vec<ShellDescriptor> {
    vec![
        ShellDescriptor::new("d1")
            .with_id_short("pump")
            .with_asset_kind(AssetKind::Instance)
            .with_asset_type("Motor")
            .with_submodel(SubmodelDescriptor::new("sm1").with_id_short("Nameplate"))
            .with_submodel(SubmodelDescriptor::new("sm2").with_id_short("Nameplate")),
        ShellDescriptor::new("d2")
            .with_id_short("motor")
            .with_asset_kind(AssetKind::Instance)
            .with_asset_type("Pump")
            .with_submodel(SubmodelDescriptor::new("sm3")),
        ShellDescriptor::new("d3")
            .with_id_short("valve")
            .with_asset_kind(AssetKind::Type)
            .with_asset_type("Motor"),
    ]
}

// =============================================================================
// Descriptor Generation
// =============================================================================

const VALUES: &[&str] = &["a", "b", "ab"];
const EXTENSION_NAMES: &[&str] = &["x", "y"];
const INTERFACES: &[&str] = &["AAS-3.0", "SUBMODEL-3.0"];
const VERSIONS: &[&str] = &["1", "2"];
const ASSET_KINDS: &[AssetKind] = &[AssetKind::Instance, AssetKind::Type];
const FILTER_KINDS: &[AssetKind] = &[AssetKind::Instance, AssetKind::Type, AssetKind::NotApplicable];

pub fn arb_value() -> impl Strategy<Value = String> {
    prop::sample::select(VALUES).prop_map(str::to_string)
}

pub fn arb_extension() -> impl Strategy<Value = Extension> {
    (prop::sample::select(EXTENSION_NAMES), prop::option::of(arb_value())).prop_map(
        |(name, value)| Extension {
            name: name.to_string(),
            value,
            ..Default::default()
        },
    )
}

pub fn arb_endpoint() -> impl Strategy<Value = Endpoint> {
    (
        prop::sample::select(INTERFACES),
        arb_value(),
        prop::sample::subsequence(VERSIONS, 0..=2),
    )
        .prop_map(|(interface, href, versions)| {
            Endpoint::new(interface, href).with_protocol_versions(&versions)
        })
}

/// Submodel with a fixed id so the parent never repeats one
pub fn arb_submodel(id: String) -> impl Strategy<Value = SubmodelDescriptor> {
    (
        prop::option::of(arb_value()),
        prop::option::of(arb_value()),
        vec(arb_extension(), 0..3),
        vec(arb_endpoint(), 0..2),
    )
        .prop_map(move |(id_short, semantic_id, extensions, endpoints)| SubmodelDescriptor {
            id: id.clone(),
            id_short,
            semantic_id: semantic_id.map(Reference::external),
            extensions,
            endpoints,
            ..Default::default()
        })
}

pub fn arb_asset_kind() -> impl Strategy<Value = AssetKind> {
    prop::sample::select(ASSET_KINDS)
}

pub fn arb_shell(id: String) -> impl Strategy<Value = ShellDescriptor> {
    let submodels = (0usize..4).prop_flat_map(|count| {
        (0..count)
            .map(|i| arb_submodel(format!("sm{}", i)))
            .collect::<Vec<_>>()
    });
    (
        prop::option::of(arb_value()),
        prop::option::of(arb_asset_kind()),
        prop::option::of(arb_value()),
        vec(arb_extension(), 0..3),
        vec(arb_endpoint(), 0..2),
        submodels,
    )
        .prop_map(
            move |(id_short, asset_kind, asset_type, extensions, endpoints, submodels)| {
                ShellDescriptor {
                    id: id.clone(),
                    id_short,
                    asset_kind,
                    asset_type,
                    extensions,
                    endpoints,
                    submodel_descriptors: submodels,
                    ..Default::default()
                }
            },
        )
}

/// Up to `max` shells with distinct ids `d0`, `d1`, ...
pub fn arb_shells(max: usize) -> impl Strategy<Value = Vec<ShellDescriptor>> {
    (0..=max).prop_flat_map(|count| {
        (0..count)
            .map(|i| arb_shell(format!("d{}", i)))
            .collect::<Vec<_>>()
    })
}

// =============================================================================
// Query Generation
// =============================================================================

const PATHS: &[&str] = &[
    "id",
    "idShort",
    "assetKind",
    "assetType",
    "extensions.name",
    "extensions.value",
    "endpoints.interface",
    "endpoints.protocolInformation.href",
    "endpoints.protocolInformation.endpointProtocolVersion",
    "submodelDescriptors.id",
    "submodelDescriptors.idShort",
    "submodelDescriptors.semanticId.keys.value",
    "submodelDescriptors.extensions.value",
    "submodelDescriptors.endpoints.protocolInformation.href",
    "submodelDescriptors.endpoints.protocolInformation.endpointProtocolVersion",
];

const MATCH_VALUES: &[&str] = &["a", "b", "ab", "d1", "sm0", "Instance", "1", "AAS-3.0"];
const PATTERNS: &[&str] = &["a.*", ".*b", "[ab]", "sm[01]", "d.*"];

pub fn arb_predicate() -> impl Strategy<Value = ShellDescriptorQuery> {
    let path = prop::sample::select(PATHS);
    let query = prop_oneof![
        (path.clone(), prop::sample::select(MATCH_VALUES))
            .prop_map(|(path, value)| ShellDescriptorQuery::matching(path, value)),
        (path, prop::sample::select(PATTERNS))
            .prop_map(|(path, pattern)| ShellDescriptorQuery::regex(path, pattern)),
    ];
    (query, prop::option::of(prop::sample::select(EXTENSION_NAMES))).prop_map(|(query, name)| {
        match name {
            Some(name) if query.path.contains("extensions") => query.with_extension_name(name),
            _ => query,
        }
    })
}

/// A conjunction of one to three predicates
pub fn arb_query() -> impl Strategy<Value = ShellDescriptorQuery> {
    vec(arb_predicate(), 1..=3).prop_map(|predicates| {
        let mut chain = predicates.into_iter();
        let head = chain.next().unwrap_or_else(|| ShellDescriptorQuery::matching("id", "d0"));
        chain.fold(head, ShellDescriptorQuery::and)
    })
}

/// Zero to two sort paths, scalar and list-valued alike, in either direction
pub fn arb_sorting() -> impl Strategy<Value = Sorting> {
    (vec(prop::sample::select(PATHS), 0..=2), any::<bool>()).prop_map(|(paths, descending)| {
        if descending {
            Sorting::desc(&paths)
        } else {
            Sorting::asc(&paths)
        }
    })
}

pub fn arb_request() -> impl Strategy<Value = ShellDescriptorSearchRequest> {
    (
        prop::option::of(arb_query()),
        prop::option::of((0u32..3, 0u32..4).prop_map(|(index, size)| Page::new(index, size))),
        prop::option::of(arb_sorting()),
    )
        .prop_map(|(query, page, sort_by)| ShellDescriptorSearchRequest {
            query,
            page,
            sort_by,
        })
}

pub fn arb_filter() -> impl Strategy<Value = DescriptorFilter> {
    (
        prop::option::of(prop::sample::select(FILTER_KINDS)),
        prop::option::of(arb_value()),
    )
        .prop_map(|(kind, asset_type)| DescriptorFilter::new(kind, asset_type))
}
