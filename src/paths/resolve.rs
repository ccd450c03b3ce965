//! Value resolution along compiled paths

use std::ops::ControlFlow;

use super::nodes::{FieldValue, PathNode};
use super::segments::SegmentBlock;

/// Visits every leaf value reachable from `node` along `blocks`.
///
/// The visitor also receives the name of the nearest enclosing extension on
/// the walked path. Breaking from the visitor stops the walk.
pub fn visit_values<'a, B>(
    node: &'a dyn PathNode,
    blocks: &[SegmentBlock],
    extension: Option<&'a str>,
    visit: &mut dyn FnMut(&'a str, Option<&'a str>) -> ControlFlow<B>,
) -> ControlFlow<B> {
    let Some((block, rest)) = blocks.split_first() else {
        return ControlFlow::Continue(());
    };

    match node.field(block.name()) {
        FieldValue::Absent => ControlFlow::Continue(()),
        FieldValue::Text(value) if rest.is_empty() => visit(value, extension),
        FieldValue::Texts(values) if rest.is_empty() => {
            for value in values {
                visit(value.as_str(), extension)?;
            }
            ControlFlow::Continue(())
        }
        FieldValue::Text(_) | FieldValue::Texts(_) => ControlFlow::Continue(()),
        FieldValue::Node(child) => {
            visit_values(child, rest, child.extension_name().or(extension), visit)
        }
        FieldValue::Nodes(children) => {
            for child in children {
                visit_values(child, rest, child.extension_name().or(extension), visit)?;
            }
            ControlFlow::Continue(())
        }
    }
}

/// True when any reachable value satisfies `predicate`
pub fn any_value(
    node: &dyn PathNode,
    blocks: &[SegmentBlock],
    predicate: impl Fn(&str, Option<&str>) -> bool,
) -> bool {
    visit_values(node, blocks, None, &mut |value, extension| {
        if predicate(value, extension) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })
    .is_break()
}

/// First reachable value in document order
pub fn first_value<'a>(node: &'a dyn PathNode, blocks: &[SegmentBlock]) -> Option<&'a str> {
    match visit_values(node, blocks, None, &mut |value, _| ControlFlow::Break(value)) {
        ControlFlow::Break(value) => Some(value),
        ControlFlow::Continue(()) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Endpoint, Extension, ShellDescriptor, SubmodelDescriptor};
    use crate::paths::SegmentPath;

    fn shell() -> ShellDescriptor {
        ShellDescriptor::new("shell")
            .with_extension(Extension::new("color", "red"))
            .with_extension(Extension::new("size", "large"))
            .with_submodel(
                SubmodelDescriptor::new("sm1").with_endpoint(
                    Endpoint::new("SUBMODEL-3.0", "http://a").with_protocol_versions(&["1.0", "2.0"]),
                ),
            )
    }

    fn blocks(path: &str) -> Vec<SegmentBlock> {
        SegmentPath::parse(path).unwrap().blocks().to_vec()
    }

    #[test]
    fn test_first_value() {
        let shell = shell();
        assert_eq!(first_value(&shell, &blocks("extensions.value")), Some("red"));
        assert_eq!(first_value(&shell, &blocks("id")), Some("shell"));
        assert_eq!(first_value(&shell, &blocks("idShort")), None);
    }

    #[test]
    fn test_any_value_through_leaf_list() {
        let shell = shell();
        let path = blocks("submodelDescriptors.endpoints.protocolInformation.endpointProtocolVersion");
        assert!(any_value(&shell, &path, |v, _| v == "2.0"));
        assert!(!any_value(&shell, &path, |v, _| v == "3.0"));
    }

    #[test]
    fn test_extension_name_reported_with_value() {
        let shell = shell();
        let path = blocks("extensions.value");
        assert!(any_value(&shell, &path, |v, ext| v == "large" && ext == Some("size")));
        assert!(!any_value(&shell, &path, |v, ext| v == "large" && ext == Some("color")));
    }
}
