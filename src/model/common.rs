//! Building blocks shared by shell and submodel descriptors

use serde::{Deserialize, Serialize};

/// Multi-language text (descriptions)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangStringTextType {
    pub language: String,
    pub text: String,
}

/// Multi-language short name (display names)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangStringNameType {
    pub language: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceTypes {
    ExternalReference,
    ModelReference,
}

impl ReferenceTypes {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExternalReference => "ExternalReference",
            Self::ModelReference => "ModelReference",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Key type name such as `GlobalReference` or `Submodel`
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

impl Key {
    pub fn new(key_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key_type: key_type.into(),
            value: value.into(),
        }
    }
}

/// Reference nested inside another reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceParent {
    #[serde(rename = "type")]
    pub reference_type: ReferenceTypes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<Key>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(rename = "type")]
    pub reference_type: ReferenceTypes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<Key>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_semantic_id: Option<ReferenceParent>,
}

impl Reference {
    /// External reference holding a single global key
    pub fn external(value: impl Into<String>) -> Self {
        Self {
            reference_type: ReferenceTypes::ExternalReference,
            keys: vec![Key::new("GlobalReference", value)],
            referred_semantic_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministrativeInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Reference>,
}

/// Name/value pair attached to a descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplemental_semantic_ids: Vec<Reference>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refers_to: Vec<Reference>,
}

impl Extension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityType {
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "RFC_TLSA")]
    RfcTlsa,
    #[serde(rename = "W3C_DID")]
    W3cDid,
}

impl SecurityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::RfcTlsa => "RFC_TLSA",
            Self::W3cDid => "W3C_DID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAttribute {
    #[serde(rename = "type")]
    pub security_type: SecurityType,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolInformation {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoint_protocol_version: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subprotocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subprotocol_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subprotocol_body_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_attributes: Vec<SecurityAttribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub interface: String,
    pub protocol_information: ProtocolInformation,
}

impl Endpoint {
    pub fn new(interface: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            protocol_information: ProtocolInformation {
                href: href.into(),
                ..Default::default()
            },
        }
    }

    pub fn with_protocol_versions(mut self, versions: &[&str]) -> Self {
        self.protocol_information.endpoint_protocol_version =
            versions.iter().map(|v| v.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificAssetId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplemental_semantic_ids: Vec<Reference>,
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_subject_id: Option<Reference>,
}
