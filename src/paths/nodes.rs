//! Field access on the typed descriptor model
//!
//! Every model type answers for the fields its grammar node declares, so a
//! compiled path can be walked without reflection.

use crate::model::{
    AdministrativeInformation, Endpoint, Extension, Key, LangStringNameType, LangStringTextType,
    ProtocolInformation, Reference, ReferenceParent, SecurityAttribute, ShellDescriptor,
    SpecificAssetId, SubmodelDescriptor,
};

/// Value held by a field of a model object
pub enum FieldValue<'a> {
    Absent,
    Text(&'a str),
    Texts(&'a [String]),
    Node(&'a dyn PathNode),
    Nodes(Vec<&'a dyn PathNode>),
}

/// A model object a path can step through
pub trait PathNode {
    fn field(&self, name: &str) -> FieldValue<'_>;

    /// Name of this object when it is an extension
    fn extension_name(&self) -> Option<&str> {
        None
    }
}

fn text(value: &Option<String>) -> FieldValue<'_> {
    value
        .as_deref()
        .map_or(FieldValue::Absent, FieldValue::Text)
}

fn node<T: PathNode>(value: &Option<T>) -> FieldValue<'_> {
    value
        .as_ref()
        .map_or(FieldValue::Absent, |n| FieldValue::Node(n as &dyn PathNode))
}

fn nodes<T: PathNode>(values: &[T]) -> FieldValue<'_> {
    FieldValue::Nodes(values.iter().map(|n| n as &dyn PathNode).collect())
}

impl PathNode for ShellDescriptor {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "description" => nodes(&self.description),
            "displayName" => nodes(&self.display_name),
            "extensions" => nodes(&self.extensions),
            "administration" => node(&self.administration),
            "assetKind" => self
                .asset_kind
                .map_or(FieldValue::Absent, |kind| FieldValue::Text(kind.as_str())),
            "assetType" => text(&self.asset_type),
            "endpoints" => nodes(&self.endpoints),
            "globalAssetId" => text(&self.global_asset_id),
            "idShort" => text(&self.id_short),
            "id" => FieldValue::Text(&self.id),
            "specificAssetIds" => nodes(&self.specific_asset_ids),
            "submodelDescriptors" => nodes(&self.submodel_descriptors),
            _ => FieldValue::Absent,
        }
    }
}

impl PathNode for SubmodelDescriptor {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "description" => nodes(&self.description),
            "displayName" => nodes(&self.display_name),
            "extensions" => nodes(&self.extensions),
            "administration" => node(&self.administration),
            "idShort" => text(&self.id_short),
            "id" => FieldValue::Text(&self.id),
            "semanticId" => node(&self.semantic_id),
            "supplementalSemanticId" => nodes(&self.supplemental_semantic_id),
            "endpoints" => nodes(&self.endpoints),
            _ => FieldValue::Absent,
        }
    }
}

impl PathNode for Extension {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "semanticId" => node(&self.semantic_id),
            "supplementalSemanticIds" => nodes(&self.supplemental_semantic_ids),
            "name" => FieldValue::Text(&self.name),
            "valueType" => text(&self.value_type),
            "value" => text(&self.value),
            "refersTo" => nodes(&self.refers_to),
            _ => FieldValue::Absent,
        }
    }

    fn extension_name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl PathNode for Endpoint {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "interface" => FieldValue::Text(&self.interface),
            "protocolInformation" => FieldValue::Node(&self.protocol_information),
            _ => FieldValue::Absent,
        }
    }
}

impl PathNode for ProtocolInformation {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "href" => FieldValue::Text(&self.href),
            "endpointProtocol" => text(&self.endpoint_protocol),
            "endpointProtocolVersion" => FieldValue::Texts(&self.endpoint_protocol_version),
            "subprotocol" => text(&self.subprotocol),
            "subprotocolBody" => text(&self.subprotocol_body),
            "subprotocolBodyEncoding" => text(&self.subprotocol_body_encoding),
            "securityAttributes" => nodes(&self.security_attributes),
            _ => FieldValue::Absent,
        }
    }
}

impl PathNode for SecurityAttribute {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "type" => FieldValue::Text(self.security_type.as_str()),
            "key" => FieldValue::Text(&self.key),
            "value" => FieldValue::Text(&self.value),
            _ => FieldValue::Absent,
        }
    }
}

impl PathNode for Reference {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "type" => FieldValue::Text(self.reference_type.as_str()),
            "keys" => nodes(&self.keys),
            "referredSemanticId" => node(&self.referred_semantic_id),
            _ => FieldValue::Absent,
        }
    }
}

impl PathNode for ReferenceParent {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "type" => FieldValue::Text(self.reference_type.as_str()),
            "keys" => nodes(&self.keys),
            _ => FieldValue::Absent,
        }
    }
}

impl PathNode for Key {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "type" => FieldValue::Text(&self.key_type),
            "value" => FieldValue::Text(&self.value),
            _ => FieldValue::Absent,
        }
    }
}

impl PathNode for LangStringTextType {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "language" => FieldValue::Text(&self.language),
            "text" => FieldValue::Text(&self.text),
            _ => FieldValue::Absent,
        }
    }
}

impl PathNode for LangStringNameType {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "language" => FieldValue::Text(&self.language),
            "text" => FieldValue::Text(&self.text),
            _ => FieldValue::Absent,
        }
    }
}

impl PathNode for AdministrativeInformation {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "version" => text(&self.version),
            "revision" => text(&self.revision),
            "templateId" => text(&self.template_id),
            "creator" => node(&self.creator),
            _ => FieldValue::Absent,
        }
    }
}

impl PathNode for SpecificAssetId {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "semanticId" => node(&self.semantic_id),
            "supplementalSemanticIds" => nodes(&self.supplemental_semantic_ids),
            "name" => FieldValue::Text(&self.name),
            "value" => FieldValue::Text(&self.value),
            "externalSubjectId" => node(&self.external_subject_id),
            _ => FieldValue::Absent,
        }
    }
}
