//! Shell descriptors

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::common::{
    AdministrativeInformation, Endpoint, Extension, LangStringNameType, LangStringTextType,
    SpecificAssetId,
};
use super::submodel::SubmodelDescriptor;
use crate::errors::{RegistryError, RegistryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    Instance,
    Type,
    NotApplicable,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "Instance",
            Self::Type => "Type",
            Self::NotApplicable => "NotApplicable",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Instance" => Some(Self::Instance),
            "Type" => Some(Self::Type),
            "NotApplicable" => Some(Self::NotApplicable),
            _ => None,
        }
    }
}

/// Descriptor of a registered asset administration shell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellDescriptor {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<LangStringTextType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display_name: Vec<LangStringNameType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administration: Option<AdministrativeInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_kind: Option<AssetKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_short: Option<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specific_asset_ids: Vec<SpecificAssetId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submodel_descriptors: Vec<SubmodelDescriptor>,
}

impl ShellDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_id_short(mut self, id_short: impl Into<String>) -> Self {
        self.id_short = Some(id_short.into());
        self
    }

    pub fn with_asset_kind(mut self, kind: AssetKind) -> Self {
        self.asset_kind = Some(kind);
        self
    }

    pub fn with_asset_type(mut self, asset_type: impl Into<String>) -> Self {
        self.asset_type = Some(asset_type.into());
        self
    }

    pub fn with_global_asset_id(mut self, global_asset_id: impl Into<String>) -> Self {
        self.global_asset_id = Some(global_asset_id.into());
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn with_submodel(mut self, submodel: SubmodelDescriptor) -> Self {
        self.submodel_descriptors.push(submodel);
        self
    }

    /// Builds the submodel id index, failing on the first repeated id
    pub fn submodel_index(&self) -> RegistryResult<BTreeMap<String, usize>> {
        let mut index = BTreeMap::new();
        for (position, submodel) in self.submodel_descriptors.iter().enumerate() {
            if index.insert(submodel.id.clone(), position).is_some() {
                return Err(RegistryError::DuplicateSubmodelIds(submodel.id.clone()));
            }
        }
        Ok(index)
    }

    pub fn submodel_ids(&self) -> Vec<&str> {
        self.submodel_descriptors
            .iter()
            .map(|sm| sm.id.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case_round_trip() {
        let shell = ShellDescriptor::new("urn:shell:1")
            .with_id_short("motor")
            .with_asset_kind(AssetKind::Instance)
            .with_submodel(SubmodelDescriptor::new("urn:sm:1"));

        let value = serde_json::to_value(&shell).unwrap();
        assert_eq!(
            value,
            json!({
                "assetKind": "Instance",
                "idShort": "motor",
                "id": "urn:shell:1",
                "submodelDescriptors": [{"id": "urn:sm:1"}]
            })
        );

        let back: ShellDescriptor = serde_json::from_value(value).unwrap();
        assert_eq!(back, shell);
    }

    #[test]
    fn test_submodel_index_positions() {
        let shell = ShellDescriptor::new("s")
            .with_submodel(SubmodelDescriptor::new("b"))
            .with_submodel(SubmodelDescriptor::new("a"));

        let index = shell.submodel_index().unwrap();
        assert_eq!(index.get("b"), Some(&0));
        assert_eq!(index.get("a"), Some(&1));
    }

    #[test]
    fn test_submodel_index_rejects_duplicates() {
        let shell = ShellDescriptor::new("s")
            .with_submodel(SubmodelDescriptor::new("a"))
            .with_submodel(SubmodelDescriptor::new("a"));

        assert_eq!(
            shell.submodel_index(),
            Err(RegistryError::DuplicateSubmodelIds("a".into()))
        );
    }
}
