//! Simple list filter on asset kind and asset type

use serde::{Deserialize, Serialize};

use crate::model::{AssetKind, ShellDescriptor};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorFilter {
    /// `NotApplicable` selects shells that carry no asset kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_kind: Option<AssetKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
}

impl DescriptorFilter {
    pub fn new(asset_kind: Option<AssetKind>, asset_type: Option<String>) -> Self {
        Self {
            asset_kind,
            asset_type,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.asset_kind.is_none() && self.asset_type.is_none()
    }

    pub fn matches(&self, shell: &ShellDescriptor) -> bool {
        let kind_matches = match self.asset_kind {
            None => true,
            Some(AssetKind::NotApplicable) => shell.asset_kind.is_none(),
            Some(kind) => shell.asset_kind == Some(kind),
        };
        let type_matches = match &self.asset_type {
            None => true,
            Some(asset_type) => shell.asset_type.as_ref() == Some(asset_type),
        };
        kind_matches && type_matches
    }
}
