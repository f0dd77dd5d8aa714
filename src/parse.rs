//! Tree builder: token stream to node tree.
//!
//! Recursive descent over one explicit [`Cursor`]. Nested builds consume from
//! and advance the same cursor through `&mut`, so once a nested tag's content
//! is consumed the caller continues correctly positioned past it.
//!
//! Closing tags (`</name>`) are yielded as a sentinel that terminates the
//! enclosing element's child-collection loop; the sentinel itself is never
//! appended as a child. A sentinel with no enclosing element, or a token
//! stream that ends inside a tag, is a fatal [`CompileError::MalformedMarkup`].

use crate::document::{Attribute, Node};
use crate::error::CompileError;
use crate::tokenize::{tokenize, Token};

/// Position-advancing view over the token stream. Shared by reference across
/// recursive builder calls.
struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Cursor { tokens, pos: 0 }
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }
}

/// What one builder step produced.
enum Built {
    /// A finished node at the current level.
    Node(Node),
    /// A closing tag was consumed; terminates the caller's child loop.
    Closing(Option<String>),
    /// End of input at the current level.
    End,
}

/// Parse markup text into a document tree rooted at [`Node::Root`].
///
/// `source_name` is the page/component name used in error reports.
pub fn parse(input: &str, source_name: &str) -> Result<Node, CompileError> {
    let tokens = tokenize(input);
    let mut cursor = Cursor::new(&tokens);
    let mut children = Vec::new();

    loop {
        match build_node(&mut cursor, source_name)? {
            Built::Node(node) => children.push(node),
            Built::Closing(name) => {
                return Err(CompileError::MalformedMarkup {
                    source_name: source_name.to_string(),
                    message: match name {
                        Some(n) => format!("closing tag '</{}>' has no matching open tag", n),
                        None => "closing tag has no matching open tag".to_string(),
                    },
                });
            }
            Built::End => break,
        }
    }

    Ok(Node::root(children))
}

fn build_node(cursor: &mut Cursor<'_>, source_name: &str) -> Result<Built, CompileError> {
    let token = match cursor.next() {
        Some(token) => token,
        None => return Ok(Built::End),
    };

    match token {
        // A text run outside any tag is a text node at the current level.
        Token::Text(value) => Ok(Built::Node(Node::text(value.clone()))),
        Token::TagOpen => build_tag(cursor, source_name),
        // TagClose / TagSlash / Equals can only follow a TagOpen; the
        // tokenizer never emits them in text state.
        other => Err(CompileError::MalformedMarkup {
            source_name: source_name.to_string(),
            message: format!("unexpected token {:?} outside a tag", other),
        }),
    }
}

fn build_tag(cursor: &mut Cursor<'_>, source_name: &str) -> Result<Built, CompileError> {
    let mut name: Option<String> = None;
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut pending_attr: Option<String> = None;
    let mut was_slash = false;

    loop {
        let token = cursor.next().ok_or_else(|| CompileError::MalformedMarkup {
            source_name: source_name.to_string(),
            message: match &name {
                Some(n) => format!("input ended inside tag '<{}'", n),
                None => "input ended inside an open tag".to_string(),
            },
        })?;

        match token {
            Token::Text(text) => {
                if name.is_none() {
                    name = Some(text.clone());
                } else if let Some(attr_name) = pending_attr.take() {
                    attributes.push(Attribute::new(attr_name, text.clone()));
                } else {
                    pending_attr = Some(text.clone());
                }
            }
            // Structure isn't validated around '='; names and values simply
            // alternate.
            Token::Equals => {}
            Token::TagSlash => {
                if name.is_none() {
                    // '</': a closing tag. Consume up to the TagClose and
                    // yield the sentinel.
                    return consume_closing_tag(cursor, source_name);
                }
                was_slash = true;
            }
            Token::TagClose => {
                let name = name.ok_or_else(|| CompileError::MalformedMarkup {
                    source_name: source_name.to_string(),
                    message: "tag closed before a name was given".to_string(),
                })?;

                if was_slash {
                    // '<name .../>': childless element.
                    return Ok(Built::Node(Node::element(name, attributes, vec![])));
                }

                // '<name ...>': build children from the same cursor until a
                // closing sentinel arrives.
                let mut children = Vec::new();
                loop {
                    match build_node(cursor, source_name)? {
                        Built::Node(node) => children.push(node),
                        Built::Closing(_) => {
                            return Ok(Built::Node(Node::element(name, attributes, children)));
                        }
                        Built::End => {
                            return Err(CompileError::MalformedMarkup {
                                source_name: source_name.to_string(),
                                message: format!("element '<{}>' is never closed", name),
                            });
                        }
                    }
                }
            }
            Token::TagOpen => {
                return Err(CompileError::MalformedMarkup {
                    source_name: source_name.to_string(),
                    message: "'<' inside a tag".to_string(),
                });
            }
        }
    }
}

fn consume_closing_tag(cursor: &mut Cursor<'_>, source_name: &str) -> Result<Built, CompileError> {
    let mut name = None;
    loop {
        match cursor.next() {
            Some(Token::Text(text)) => {
                if name.is_none() {
                    name = Some(text.clone());
                }
            }
            Some(Token::TagClose) => return Ok(Built::Closing(name)),
            Some(_) => {}
            None => {
                return Err(CompileError::MalformedMarkup {
                    source_name: source_name.to_string(),
                    message: match name {
                        Some(n) => format!("closing tag '</{}' is never finished", n),
                        None => "closing tag is never finished".to_string(),
                    },
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::stringify;

    fn parse_ok(input: &str) -> Node {
        parse(input, "test").expect("parse")
    }

    #[test]
    fn parses_nested_elements() {
        let doc = parse_ok("<div><p>one</p><p>two</p></div>");
        let Node::Root { children } = &doc else {
            panic!("expected root")
        };
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].tag_name(), Some("div"));
        assert_eq!(children[0].children().len(), 2);
    }

    #[test]
    fn parses_attributes_with_and_without_quotes() {
        let doc = parse_ok("<a href=\"x y\" id=main/>");
        let Node::Element { attributes, .. } = &doc.children()[0] else {
            panic!("expected element")
        };
        assert_eq!(attributes[0], Attribute::new("href", "x y"));
        assert_eq!(attributes[1], Attribute::new("id", "main"));
    }

    #[test]
    fn top_level_text_becomes_text_nodes() {
        let doc = parse_ok("before<hr/>after");
        assert_eq!(doc.children().len(), 3);
        assert_eq!(doc.children()[0], Node::text("before"));
        assert_eq!(doc.children()[2], Node::text("after"));
    }

    #[test]
    fn caller_cursor_is_positioned_past_nested_content() {
        // The sibling after a nested subtree must land at the right level.
        let doc = parse_ok("<ul><li>a</li><li>b</li></ul><footer/>");
        assert_eq!(doc.children().len(), 2);
        assert_eq!(doc.children()[1].tag_name(), Some("footer"));
    }

    #[test]
    fn round_trip_is_stable_after_one_normalization() {
        let once = stringify(&parse_ok("<div  a=\"1\"   b=\"2\"><span>x</span></div>"));
        let twice = stringify(&parse(&once, "test").expect("reparse"));
        assert_eq!(once, twice);
    }

    #[test]
    fn unterminated_tag_is_malformed() {
        let err = parse("<div><p>text", "page").unwrap_err();
        assert!(matches!(err, CompileError::MalformedMarkup { .. }));
    }

    #[test]
    fn unterminated_open_bracket_is_malformed() {
        let err = parse("<div", "page").unwrap_err();
        assert!(matches!(err, CompileError::MalformedMarkup { .. }));
    }

    #[test]
    fn stray_closing_tag_is_malformed() {
        let err = parse("</div>", "page").unwrap_err();
        let CompileError::MalformedMarkup { message, .. } = err else {
            panic!("expected malformed markup")
        };
        assert!(message.contains("</div>"));
    }

    #[test]
    fn empty_attribute_value_survives() {
        let doc = parse_ok("<input value=\"\"/>");
        let Node::Element { attributes, .. } = &doc.children()[0] else {
            panic!("expected element")
        };
        assert_eq!(attributes[0], Attribute::new("value", ""));
    }
}
