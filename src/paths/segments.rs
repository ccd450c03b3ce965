//! Segment-block AST of a query path

use std::fmt;
use std::str::FromStr;

use super::grammar::{FieldKind, NodeType};
use crate::errors::{RegistryError, RegistryResult};

/// Name of the shell field holding the embedded submodel descriptors
pub const SUBMODEL_DESCRIPTORS: &str = "submodelDescriptors";

/// One typed step of a compiled path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentBlock {
    Object { name: &'static str, node: NodeType },
    ObjectList { name: &'static str, node: NodeType },
    Leaf { name: &'static str },
    LeafList { name: &'static str },
}

impl SegmentBlock {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Object { name, .. }
            | Self::ObjectList { name, .. }
            | Self::Leaf { name }
            | Self::LeafList { name } => name,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. } | Self::LeafList { .. })
    }

    /// Leaf holding a set of values; matches when any element matches
    pub fn is_list_leaf(&self) -> bool {
        matches!(self, Self::LeafList { .. })
    }

    pub fn is_extension_list(&self) -> bool {
        matches!(
            self,
            Self::ObjectList {
                node: NodeType::Extension,
                ..
            }
        )
    }
}

/// A dotted path compiled against the descriptor schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPath {
    path: String,
    blocks: Vec<SegmentBlock>,
}

impl SegmentPath {
    /// Compiles a dotted path. The path must end on a leaf.
    pub fn parse(path: &str) -> RegistryResult<Self> {
        let mut node = NodeType::Shell;
        let mut blocks = Vec::new();
        let mut parts = path.split('.').peekable();

        while let Some(part) = parts.next() {
            let (name, kind) = node
                .field(part)
                .ok_or_else(|| RegistryError::unknown_leaf(path))?;
            let last = parts.peek().is_none();

            let block = match kind {
                FieldKind::Leaf if last => SegmentBlock::Leaf { name },
                FieldKind::LeafList if last => SegmentBlock::LeafList { name },
                FieldKind::Object(child) if !last => {
                    node = child;
                    SegmentBlock::Object { name, node: child }
                }
                FieldKind::ObjectList(child) if !last => {
                    node = child;
                    SegmentBlock::ObjectList { name, node: child }
                }
                _ => return Err(RegistryError::unknown_leaf(path)),
            };
            blocks.push(block);
        }

        Ok(Self {
            path: path.to_string(),
            blocks,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn blocks(&self) -> &[SegmentBlock] {
        &self.blocks
    }

    pub fn leaf(&self) -> Option<&SegmentBlock> {
        self.blocks.last()
    }

    /// Blocks below the submodel list, if the path crosses into it
    pub fn submodel_scope(&self) -> Option<&[SegmentBlock]> {
        match self.blocks.split_first() {
            Some((SegmentBlock::ObjectList { name, .. }, rest)) if *name == SUBMODEL_DESCRIPTORS => {
                Some(rest)
            }
            _ => None,
        }
    }

    pub fn crosses_extension(&self) -> bool {
        self.blocks.iter().any(SegmentBlock::is_extension_list)
    }

    /// Rejoins the block names into a dotted path
    pub fn canonical(&self) -> String {
        self.blocks
            .iter()
            .map(SegmentBlock::name)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl FromStr for SegmentPath {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SegmentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
