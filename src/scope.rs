//! Scope threading and attribute resolution.
//!
//! A [`Scope`] maps bound names to their last-known values. It is copied, not
//! aliased, into nested traversal contexts, so sibling branches can never
//! observe each other's bindings.

use std::collections::HashMap;

use crate::document::Attribute;
use crate::expression::{display, evaluate, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    bindings: HashMap<String, Value>,
}

/// Attribute-level failure; the resolution engine adds node and page context.
#[derive(Debug)]
pub struct AttributeError {
    pub attribute: String,
    pub message: String,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Resolve an attribute list against this scope.
    ///
    /// Attributes are processed in order. An expression value (exactly one
    /// brace pair wrapping the whole content) is evaluated; anything else
    /// passes through as a literal. Either way the resolved value is written
    /// into the updated scope under the attribute's own name, so later
    /// attributes, siblings, descendants and nested component props see the
    /// latest binding. Returns the resolved attributes plus the new scope;
    /// `self` is untouched.
    pub fn resolve_attributes(
        &self,
        attributes: &[Attribute],
    ) -> Result<(Vec<Attribute>, Scope), AttributeError> {
        let mut scope = self.clone();
        let mut resolved = Vec::with_capacity(attributes.len());

        for attr in attributes {
            if let Some(source) = expression_source(&attr.value) {
                let value =
                    evaluate(source, &scope.bindings).map_err(|e| AttributeError {
                        attribute: attr.name.clone(),
                        message: e.message,
                    })?;
                resolved.push(Attribute::new(attr.name.clone(), display(&value)));
                scope.bindings.insert(attr.name.clone(), value);
            } else {
                resolved.push(attr.clone());
                scope
                    .bindings
                    .insert(attr.name.clone(), Value::String(attr.value.clone()));
            }
        }

        Ok((resolved, scope))
    }
}

/// If `value` is exactly one matching pair of braces wrapping its entire
/// content, return the inner expression source.
///
/// `{a}` qualifies; `{a}{b}`, `x{a}` and `{a}x` do not. Quoted runs inside
/// the expression are skipped so `{'}'}` still counts as one pair.
pub fn expression_source(value: &str) -> Option<&str> {
    let rest = value.strip_prefix('{')?;
    let inner = rest.strip_suffix('}')?;

    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (i, c) in rest.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 && i != rest.len() - 1 {
                        // The first pair closes before the end: not a single
                        // wrapping pair.
                        return None;
                    }
                }
                _ => {}
            },
        }
    }

    Some(inner)
}
