//! Node tree for the GoodWeb markup dialect, plus the serializer and the
//! tag-name query helper.
//!
//! A document is a [`Node::Root`] whose children are elements and text runs.
//! The three node kinds are mutually exclusive by construction: only elements
//! carry a name and attributes, only text carries a value.

use serde::{Deserialize, Serialize};

/// One `name="value"` pair. Order within an element is preserved end-to-end
/// through parsing, resolution and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Node {
    /// Document root: ordered children, no name, no attributes. Also used as
    /// the inert marker for captured usage-site content during resolution,
    /// since a root can never match a component or placeholder tag.
    Root { children: Vec<Node> },
    Element {
        name: String,
        attributes: Vec<Attribute>,
        children: Vec<Node>,
    },
    Text { value: String },
}

impl Node {
    pub fn root(children: Vec<Node>) -> Self {
        Node::Root { children }
    }

    pub fn element(
        name: impl Into<String>,
        attributes: Vec<Attribute>,
        children: Vec<Node>,
    ) -> Self {
        Node::Element {
            name: name.into(),
            attributes,
            children,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Node::Text {
            value: value.into(),
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root { children } => children,
            Node::Element { children, .. } => children,
            Node::Text { .. } => &[],
        }
    }

    /// Element tag name, if this is an element.
    pub fn tag_name(&self) -> Option<&str> {
        match self {
            Node::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Node::Root { .. } => "#root".to_string(),
            Node::Element { name, .. } => name.clone(),
            Node::Text { .. } => "#text".to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERIALIZER
// ═══════════════════════════════════════════════════════════════════════════════

/// Serialize a node tree back to markup text.
///
/// Structural inverse of parsing for well-formed input. Text is emitted
/// verbatim; this is not a safe HTML encoder and performs no escaping.
pub fn stringify(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Root { children } => {
            for child in children {
                write_node(child, out);
            }
        }
        Node::Text { value } => out.push_str(value),
        Node::Element {
            name,
            attributes,
            children,
        } => {
            out.push('<');
            out.push_str(name);
            for attr in attributes {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&attr.value);
                out.push('"');
            }
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// QUERY HELPER
// ═══════════════════════════════════════════════════════════════════════════════

/// Depth-first pre-order search for the first element whose tag name equals
/// `tag` exactly (case-sensitive). No compound or attribute selectors.
pub fn query_selector<'a>(node: &'a Node, tag: &str) -> Option<&'a Node> {
    if node.tag_name() == Some(tag) {
        return Some(node);
    }
    for child in node.children() {
        if let Some(found) = query_selector(child, tag) {
            return Some(found);
        }
    }
    None
}

/// Mutable variant used when appending stylesheet links to a page's head.
pub fn query_selector_mut<'a>(node: &'a mut Node, tag: &str) -> Option<&'a mut Node> {
    if node.tag_name() == Some(tag) {
        return Some(node);
    }
    let children = match node {
        Node::Root { children } => children,
        Node::Element { children, .. } => children,
        Node::Text { .. } => return None,
    };
    for child in children {
        if let Some(found) = query_selector_mut(child, tag) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::root(vec![Node::element(
            "html",
            vec![],
            vec![
                Node::element("head", vec![], vec![]),
                Node::element(
                    "body",
                    vec![Attribute::new("class", "dark")],
                    vec![Node::text("hello")],
                ),
            ],
        )])
    }

    #[test]
    fn stringify_self_closes_childless_elements() {
        let node = Node::element("br", vec![], vec![]);
        assert_eq!(stringify(&node), "<br/>");
    }

    #[test]
    fn stringify_root_has_no_wrapper() {
        assert_eq!(
            stringify(&sample()),
            "<html><head/><body class=\"dark\">hello</body></html>"
        );
    }

    #[test]
    fn stringify_preserves_attribute_order() {
        let node = Node::element(
            "a",
            vec![
                Attribute::new("z", "1"),
                Attribute::new("a", "2"),
                Attribute::new("m", "3"),
            ],
            vec![],
        );
        assert_eq!(stringify(&node), "<a z=\"1\" a=\"2\" m=\"3\"/>");
    }

    #[test]
    fn query_selector_finds_first_in_document_order() {
        let doc = sample();
        let head = query_selector(&doc, "head").expect("head");
        assert_eq!(head.tag_name(), Some("head"));
        assert!(query_selector(&doc, "nav").is_none());
    }

    #[test]
    fn query_selector_is_case_sensitive() {
        let doc = sample();
        assert!(query_selector(&doc, "HEAD").is_none());
    }
}
