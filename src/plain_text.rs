//! Plain-text rendering of nodes.

use crate::node::Node;

/// Flatten `node` to its textual content.
///
/// Checks the node's `value`, then its `alt` and `title`, and otherwise
/// concatenates the plain text of its children. Empty fields count as absent.
pub fn to_string(node: &Node) -> String {
    let own = [node.value(), node.alt(), node.title()]
        .into_iter()
        .flatten()
        .find(|text| !text.is_empty());

    if let Some(text) = own {
        return text.to_string();
    }

    node.children()
        .map(|children| children.iter().map(to_string).collect())
        .unwrap_or_default()
}
