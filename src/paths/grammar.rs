//! Static schema grammar of the descriptor model
//!
//! Every node type lists the fields a query path may step into. Object and
//! object-list fields name the node type they lead to.

/// Node types of the descriptor schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Shell,
    Submodel,
    Extension,
    Endpoint,
    ProtocolInformation,
    SecurityAttribute,
    Reference,
    ReferenceParent,
    Key,
    LangStringText,
    LangStringName,
    Administration,
    SpecificAssetId,
}

/// What a field of a node holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Scalar text value
    Leaf,
    /// List of text values
    LeafList,
    /// Single nested object
    Object(NodeType),
    /// List of nested objects
    ObjectList(NodeType),
}

use FieldKind::{Leaf, LeafList, Object, ObjectList};

const SHELL: &[(&str, FieldKind)] = &[
    ("description", ObjectList(NodeType::LangStringText)),
    ("displayName", ObjectList(NodeType::LangStringName)),
    ("extensions", ObjectList(NodeType::Extension)),
    ("administration", Object(NodeType::Administration)),
    ("assetKind", Leaf),
    ("assetType", Leaf),
    ("endpoints", ObjectList(NodeType::Endpoint)),
    ("globalAssetId", Leaf),
    ("idShort", Leaf),
    ("id", Leaf),
    ("specificAssetIds", ObjectList(NodeType::SpecificAssetId)),
    ("submodelDescriptors", ObjectList(NodeType::Submodel)),
];

const SUBMODEL: &[(&str, FieldKind)] = &[
    ("description", ObjectList(NodeType::LangStringText)),
    ("displayName", ObjectList(NodeType::LangStringName)),
    ("extensions", ObjectList(NodeType::Extension)),
    ("administration", Object(NodeType::Administration)),
    ("idShort", Leaf),
    ("id", Leaf),
    ("semanticId", Object(NodeType::Reference)),
    ("supplementalSemanticId", ObjectList(NodeType::Reference)),
    ("endpoints", ObjectList(NodeType::Endpoint)),
];

const EXTENSION: &[(&str, FieldKind)] = &[
    ("semanticId", Object(NodeType::Reference)),
    ("supplementalSemanticIds", ObjectList(NodeType::Reference)),
    ("name", Leaf),
    ("valueType", Leaf),
    ("value", Leaf),
    ("refersTo", ObjectList(NodeType::Reference)),
];

const ENDPOINT: &[(&str, FieldKind)] = &[
    ("interface", Leaf),
    ("protocolInformation", Object(NodeType::ProtocolInformation)),
];

const PROTOCOL_INFORMATION: &[(&str, FieldKind)] = &[
    ("href", Leaf),
    ("endpointProtocol", Leaf),
    ("endpointProtocolVersion", LeafList),
    ("subprotocol", Leaf),
    ("subprotocolBody", Leaf),
    ("subprotocolBodyEncoding", Leaf),
    ("securityAttributes", ObjectList(NodeType::SecurityAttribute)),
];

const SECURITY_ATTRIBUTE: &[(&str, FieldKind)] =
    &[("type", Leaf), ("key", Leaf), ("value", Leaf)];

const REFERENCE: &[(&str, FieldKind)] = &[
    ("type", Leaf),
    ("keys", ObjectList(NodeType::Key)),
    ("referredSemanticId", Object(NodeType::ReferenceParent)),
];

const REFERENCE_PARENT: &[(&str, FieldKind)] =
    &[("type", Leaf), ("keys", ObjectList(NodeType::Key))];

const KEY: &[(&str, FieldKind)] = &[("type", Leaf), ("value", Leaf)];

const LANG_STRING: &[(&str, FieldKind)] = &[("language", Leaf), ("text", Leaf)];

const ADMINISTRATION: &[(&str, FieldKind)] = &[
    ("version", Leaf),
    ("revision", Leaf),
    ("templateId", Leaf),
    ("creator", Object(NodeType::Reference)),
];

const SPECIFIC_ASSET_ID: &[(&str, FieldKind)] = &[
    ("semanticId", Object(NodeType::Reference)),
    ("supplementalSemanticIds", ObjectList(NodeType::Reference)),
    ("name", Leaf),
    ("value", Leaf),
    ("externalSubjectId", Object(NodeType::Reference)),
];

impl NodeType {
    /// Fields of this node in schema order
    pub fn fields(self) -> &'static [(&'static str, FieldKind)] {
        match self {
            Self::Shell => SHELL,
            Self::Submodel => SUBMODEL,
            Self::Extension => EXTENSION,
            Self::Endpoint => ENDPOINT,
            Self::ProtocolInformation => PROTOCOL_INFORMATION,
            Self::SecurityAttribute => SECURITY_ATTRIBUTE,
            Self::Reference => REFERENCE,
            Self::ReferenceParent => REFERENCE_PARENT,
            Self::Key => KEY,
            Self::LangStringText | Self::LangStringName => LANG_STRING,
            Self::Administration => ADMINISTRATION,
            Self::SpecificAssetId => SPECIFIC_ASSET_ID,
        }
    }

    /// Looks up a field by name
    pub fn field(self, name: &str) -> Option<(&'static str, FieldKind)> {
        self.fields()
            .iter()
            .find(|(field, _)| *field == name)
            .copied()
    }

    /// Enumerates every path from this node that ends on a leaf
    pub fn leaf_paths(self) -> Vec<String> {
        let mut out = Vec::new();
        collect_leaf_paths(self, String::new(), &mut out);
        out
    }
}

// The grammar is acyclic: Reference -> ReferenceParent -> Key is the deepest chain.
fn collect_leaf_paths(node: NodeType, prefix: String, out: &mut Vec<String>) {
    for (name, kind) in node.fields() {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        };
        match kind {
            Leaf | LeafList => out.push(path),
            Object(child) | ObjectList(child) => collect_leaf_paths(*child, path, out),
        }
    }
}
