//! Generic mutate-or-recurse tree rewrite primitive.
//!
//! The transform decides per node: [`Transformed::Unchanged`] means "no
//! substitution here, keep descending" and the visitor rebuilds the node with
//! every child visited in original order under the *same* context the parent
//! received (context never accumulates across siblings). A
//! [`Transformed::Replaced`] value is final: the visitor does not descend into
//! it, so the transform is responsible for any recursion it needed before
//! returning it.

use crate::document::Node;
use crate::error::CompileError;

/// Explicit outcome of a transform call. An explicit two-variant result is
/// used rather than comparing node values for identity, which value types
/// cannot do reliably.
pub enum Transformed {
    Unchanged,
    Replaced(Node),
}

/// Visit `node` with `transform`, producing a new tree. Never mutates the
/// input.
pub fn visit<C, F>(node: &Node, ctx: &C, transform: &mut F) -> Result<Node, CompileError>
where
    F: FnMut(&Node, &C) -> Result<Transformed, CompileError>,
{
    if let Transformed::Replaced(replacement) = transform(node, ctx)? {
        return Ok(replacement);
    }

    match node {
        Node::Text { .. } => Ok(node.clone()),
        Node::Root { children } => Ok(Node::root(visit_children(children, ctx, transform)?)),
        Node::Element {
            name,
            attributes,
            children,
        } => Ok(Node::element(
            name.clone(),
            attributes.clone(),
            visit_children(children, ctx, transform)?,
        )),
    }
}

fn visit_children<C, F>(
    children: &[Node],
    ctx: &C,
    transform: &mut F,
) -> Result<Vec<Node>, CompileError>
where
    F: FnMut(&Node, &C) -> Result<Transformed, CompileError>,
{
    let mut visited = Vec::with_capacity(children.len());
    for child in children {
        visited.push(visit(child, ctx, transform)?);
    }
    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{stringify, Node};

    #[test]
    fn unchanged_descends_into_children() {
        let doc = Node::root(vec![Node::element(
            "div",
            vec![],
            vec![Node::text("a"), Node::text("b")],
        )]);

        let out = visit(&doc, &(), &mut |node, _| match node {
            Node::Text { value } => Ok(Transformed::Replaced(Node::text(value.to_uppercase()))),
            _ => Ok(Transformed::Unchanged),
        })
        .expect("visit");

        assert_eq!(stringify(&out), "<div>AB</div>");
    }

    #[test]
    fn replaced_subtree_is_not_descended_into() {
        let doc = Node::root(vec![Node::element(
            "stop",
            vec![],
            vec![Node::text("inner")],
        )]);

        let mut text_visits = 0;
        let out = visit(&doc, &(), &mut |node, _| match node {
            Node::Element { name, .. } if name == "stop" => {
                Ok(Transformed::Replaced(Node::text("replaced")))
            }
            Node::Text { .. } => {
                text_visits += 1;
                Ok(Transformed::Unchanged)
            }
            _ => Ok(Transformed::Unchanged),
        })
        .expect("visit");

        assert_eq!(stringify(&out), "replaced");
        assert_eq!(text_visits, 0);
    }

    #[test]
    fn siblings_see_the_same_context() {
        // The context is handed to every child as the parent received it;
        // a mutation made while visiting one sibling must not be visible to
        // the next. Contexts are passed by shared reference, which makes
        // cross-sibling mutation impossible by construction; this asserts the
        // call pattern stays that way.
        let doc = Node::root(vec![Node::text("x"), Node::text("y")]);
        let ctx = 7u32;
        let mut seen = Vec::new();
        visit(&doc, &ctx, &mut |node, c: &u32| {
            if matches!(node, Node::Text { .. }) {
                seen.push(*c);
            }
            Ok(Transformed::Unchanged)
        })
        .expect("visit");
        assert_eq!(seen, vec![7, 7]);
    }

    #[test]
    fn transform_errors_propagate() {
        let doc = Node::root(vec![Node::text("boom")]);
        let result = visit(&doc, &(), &mut |node, _| match node {
            Node::Text { .. } => Err(CompileError::NoPages),
            _ => Ok(Transformed::Unchanged),
        });
        assert!(result.is_err());
    }
}
