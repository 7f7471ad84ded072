use serde::{Deserialize, Serialize};

/// Column alignment of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Right,
    Center,
}

/// A markdown syntax tree node, shaped after mdast.
///
/// Serializes with a `type` tag (`"heading"`, `"footnoteDefinition"`, ...) so
/// trees can be exchanged as mdast JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Root {
        children: Vec<Node>,
    },
    Heading {
        depth: u8,
        children: Vec<Node>,
    },
    Paragraph {
        children: Vec<Node>,
    },
    Blockquote {
        children: Vec<Node>,
    },
    List {
        ordered: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<u64>,
        #[serde(default)]
        spread: bool,
        children: Vec<Node>,
    },
    ListItem {
        /// For task lists: None = not a task, Some(false) = unchecked, Some(true) = checked
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
        #[serde(default)]
        spread: bool,
        children: Vec<Node>,
    },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        value: String,
    },
    Html {
        value: String,
    },
    /// YAML front matter, without its `---` fences.
    Yaml {
        value: String,
    },
    ThematicBreak,
    Definition {
        identifier: String,
        label: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    FootnoteDefinition {
        identifier: String,
        label: String,
        children: Vec<Node>,
    },
    Table {
        align: Vec<Option<Align>>,
        children: Vec<Node>,
    },
    TableRow {
        children: Vec<Node>,
    },
    TableCell {
        children: Vec<Node>,
    },
    Text {
        value: String,
    },
    InlineCode {
        value: String,
    },
    Emphasis {
        children: Vec<Node>,
    },
    Strong {
        children: Vec<Node>,
    },
    Delete {
        children: Vec<Node>,
    },
    Break,
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        children: Vec<Node>,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        alt: String,
    },
    FootnoteReference {
        identifier: String,
        label: String,
    },
}

impl Node {
    pub fn root(children: Vec<Node>) -> Self {
        Node::Root { children }
    }

    /// A heading holding a single text node.
    pub fn heading(depth: u8, text: impl Into<String>) -> Self {
        Node::Heading {
            depth,
            children: vec![Node::text(text)],
        }
    }

    /// A paragraph holding a single text node.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::Paragraph {
            children: vec![Node::text(text)],
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Node::Text {
            value: value.into(),
        }
    }

    /// A link reference definition; the identifier is the lowercased label.
    pub fn definition(label: impl Into<String>, url: impl Into<String>) -> Self {
        let label = label.into();
        Node::Definition {
            identifier: label.to_lowercase(),
            label,
            url: url.into(),
            title: None,
        }
    }

    /// The mdast `type` tag of this node.
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Root { .. } => "root",
            Node::Heading { .. } => "heading",
            Node::Paragraph { .. } => "paragraph",
            Node::Blockquote { .. } => "blockquote",
            Node::List { .. } => "list",
            Node::ListItem { .. } => "listItem",
            Node::Code { .. } => "code",
            Node::Html { .. } => "html",
            Node::Yaml { .. } => "yaml",
            Node::ThematicBreak => "thematicBreak",
            Node::Definition { .. } => "definition",
            Node::FootnoteDefinition { .. } => "footnoteDefinition",
            Node::Table { .. } => "table",
            Node::TableRow { .. } => "tableRow",
            Node::TableCell { .. } => "tableCell",
            Node::Text { .. } => "text",
            Node::InlineCode { .. } => "inlineCode",
            Node::Emphasis { .. } => "emphasis",
            Node::Strong { .. } => "strong",
            Node::Delete { .. } => "delete",
            Node::Break => "break",
            Node::Link { .. } => "link",
            Node::Image { .. } => "image",
            Node::FootnoteReference { .. } => "footnoteReference",
        }
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, Node::Heading { .. })
    }

    /// Heading depth, `None` for every other node.
    pub fn depth(&self) -> Option<u8> {
        match self {
            Node::Heading { depth, .. } => Some(*depth),
            _ => None,
        }
    }

    /// Link/image reference definitions and footnote definitions.
    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            Node::Definition { .. } | Node::FootnoteDefinition { .. }
        )
    }

    /// The child list, if this node is a parent.
    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Root { children }
            | Node::Heading { children, .. }
            | Node::Paragraph { children }
            | Node::Blockquote { children }
            | Node::List { children, .. }
            | Node::ListItem { children, .. }
            | Node::FootnoteDefinition { children, .. }
            | Node::Table { children, .. }
            | Node::TableRow { children }
            | Node::TableCell { children }
            | Node::Emphasis { children }
            | Node::Strong { children }
            | Node::Delete { children }
            | Node::Link { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Root { children }
            | Node::Heading { children, .. }
            | Node::Paragraph { children }
            | Node::Blockquote { children }
            | Node::List { children, .. }
            | Node::ListItem { children, .. }
            | Node::FootnoteDefinition { children, .. }
            | Node::Table { children, .. }
            | Node::TableRow { children }
            | Node::TableCell { children }
            | Node::Emphasis { children }
            | Node::Strong { children }
            | Node::Delete { children }
            | Node::Link { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Literal content of text-like nodes.
    pub fn value(&self) -> Option<&str> {
        match self {
            Node::Text { value }
            | Node::InlineCode { value }
            | Node::Code { value, .. }
            | Node::Html { value }
            | Node::Yaml { value } => Some(value),
            _ => None,
        }
    }

    /// Image alt text.
    pub fn alt(&self) -> Option<&str> {
        match self {
            Node::Image { alt, .. } => Some(alt),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Node::Link { title, .. }
            | Node::Image { title, .. }
            | Node::Definition { title, .. } => title.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_mdast_type_tags() {
        let node = Node::FootnoteDefinition {
            identifier: "a".to_string(),
            label: "a".to_string(),
            children: vec![Node::paragraph("x")],
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "footnoteDefinition");
        assert_eq!(json["children"][0]["type"], "paragraph");
        assert_eq!(json["children"][0]["children"][0]["value"], "x");
    }

    #[test]
    fn deserializes_mdast_json() {
        let json = r#"{"type":"root","children":[
            {"type":"heading","depth":2,"children":[{"type":"text","value":"Foo"}]},
            {"type":"thematicBreak"},
            {"type":"definition","identifier":"one","label":"one","url":"example.com"}
        ]}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        let children = node.children().unwrap();
        assert_eq!(children[0], Node::heading(2, "Foo"));
        assert_eq!(children[1], Node::ThematicBreak);
        assert_eq!(children[2], Node::definition("one", "example.com"));
    }

    #[test]
    fn type_queries() {
        assert_eq!(Node::heading(3, "x").depth(), Some(3));
        assert_eq!(Node::paragraph("x").depth(), None);
        assert!(Node::definition("a", "b").is_definition());
        assert!(!Node::paragraph("x").is_definition());
        assert!(Node::ThematicBreak.children().is_none());
        assert_eq!(Node::ThematicBreak.type_name(), "thematicBreak");
        let yaml = Node::Yaml {
            value: "title: x".to_string(),
        };
        assert_eq!(yaml.type_name(), "yaml");
        assert_eq!(yaml.value(), Some("title: x"));
    }
}
