//! Component resolution engine.
//!
//! Walks each page's document with the generic visitor, expanding component
//! usages into their definitions. Three concerns thread through the
//! traversal context:
//!
//! - the current [`Scope`] (prop passing and data binding),
//! - the pending capture: the original usage-site node, re-labeled to the
//!   inert root marker, waiting to be spliced in at the component body's
//!   placeholder tag,
//! - a coarse node path for error reports.
//!
//! The capture is cleared when entering a placeholder's own content: that is
//! what keeps a nested component's placeholder from re-capturing an outer
//! one's content, and what makes the recursion terminate.

use log::debug;
use rayon::prelude::*;

use crate::component::{ComponentRegistry, Page};
use crate::document::Node;
use crate::error::CompileError;
use crate::scope::{AttributeError, Scope};
use crate::visitor::{visit, Transformed};

/// Reserved placeholder tag a component body uses to mark where its usage
/// site's content is re-inserted. Matched case-insensitively.
pub const PLACEHOLDER_TAG: &str = "GoodWeb-Inner";

#[derive(Clone)]
struct ResolveCtx {
    capture: Option<Node>,
    scope: Scope,
    path: Vec<String>,
}

impl ResolveCtx {
    fn initial() -> Self {
        ResolveCtx {
            capture: None,
            scope: Scope::new(),
            path: Vec::new(),
        }
    }

    fn location(&self, tag: &str) -> String {
        if self.path.is_empty() {
            tag.to_string()
        } else {
            format!("{} > {}", self.path.join(" > "), tag)
        }
    }
}

/// One page after expansion.
#[derive(Debug, Clone)]
pub struct ResolvedPage {
    pub name: String,
    pub document: Node,
    /// Component names in first-use order, deduplicated, in the registry's
    /// canonical casing.
    pub used_components: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResolveResult {
    pub pages: Vec<ResolvedPage>,
    /// Components used by every page, in the first page's first-use order.
    pub shared_components: Vec<String>,
}

/// Resolve every page against the registry.
///
/// Pages are independent of one another, so they resolve in parallel; the
/// shared-component intersection joins after all of them. An empty page set
/// is rejected: the intersection has no defined starting point.
pub fn resolve(pages: &[Page], registry: &ComponentRegistry) -> Result<ResolveResult, CompileError> {
    if pages.is_empty() {
        return Err(CompileError::NoPages);
    }

    let resolved: Vec<ResolvedPage> = pages
        .par_iter()
        .map(|page| resolve_page(page, registry))
        .collect::<Result<_, _>>()?;

    let shared_components = shared_components(&resolved);
    debug!(
        "resolved {} pages, {} components shared by all",
        resolved.len(),
        shared_components.len()
    );

    Ok(ResolveResult {
        pages: resolved,
        shared_components,
    })
}

/// Expand one page's document.
pub fn resolve_page(page: &Page, registry: &ComponentRegistry) -> Result<ResolvedPage, CompileError> {
    let mut resolver = Resolver {
        registry,
        page_name: &page.name,
        used_components: Vec::new(),
    };

    let document = resolver.resolve_tree(&page.document, &ResolveCtx::initial())?;

    Ok(ResolvedPage {
        name: page.name.clone(),
        document,
        used_components: resolver.used_components,
    })
}

struct Resolver<'a> {
    registry: &'a ComponentRegistry,
    page_name: &'a str,
    used_components: Vec<String>,
}

impl Resolver<'_> {
    fn resolve_tree(&mut self, node: &Node, ctx: &ResolveCtx) -> Result<Node, CompileError> {
        visit(node, ctx, &mut |node, ctx| self.transform(node, ctx))
    }

    fn transform(&mut self, node: &Node, ctx: &ResolveCtx) -> Result<Transformed, CompileError> {
        let Node::Element {
            name,
            attributes,
            children,
        } = node
        else {
            // Text and root nodes are never substituted; the visitor descends.
            return Ok(Transformed::Unchanged);
        };

        if name.eq_ignore_ascii_case(PLACEHOLDER_TAG) {
            let capture = ctx.capture.clone().ok_or_else(|| CompileError::OrphanPlaceholder {
                placeholder: PLACEHOLDER_TAG.to_string(),
                page: self.page_name.to_string(),
            })?;

            // The capture's content may itself use components; resolve it
            // under the scope in effect here, with the capture cleared so an
            // inner expansion cannot splice it a second time.
            let inner_ctx = ResolveCtx {
                capture: None,
                scope: ctx.scope.clone(),
                path: ctx.path.clone(),
            };
            return Ok(Transformed::Replaced(self.resolve_tree(&capture, &inner_ctx)?));
        }

        // Look up through a copy of the registry reference so the borrow does
        // not pin `self` while the expansion mutates it.
        let registry = self.registry;
        if let Some(component) = registry.find(name) {
            // Prop passing: the usage's attributes, resolved against the
            // current scope, become the scope the component body runs under.
            let (_, body_scope) = self.resolve_attributes(attributes, ctx, name)?;

            self.record_use(component.name.clone());

            // Capture the usage site re-labeled to the inert root marker, so
            // the body's placeholder can splice it back in without the
            // capture ever matching a component or placeholder tag itself.
            let capture = Node::root(children.clone());

            let mut path = ctx.path.clone();
            path.push(component.name.clone());
            let body_ctx = ResolveCtx {
                capture: Some(capture),
                scope: body_scope,
                path,
            };

            // The nested visit fully resolves the body, including any further
            // nested components; the outer traversal must not descend again.
            let expanded = self.resolve_tree(&component.document, &body_ctx)?;
            return Ok(Transformed::Replaced(expanded));
        }

        if is_component_name(name) {
            // Capitalized tags are component usages by convention; a registry
            // miss is fatal, never a silent pass-through.
            return Err(CompileError::UnregisteredComponent {
                tag: name.clone(),
                page: self.page_name.to_string(),
            });
        }

        // Plain element. Without attributes there is nothing to resolve and
        // nothing to add to scope; descend unchanged under the same context.
        if attributes.is_empty() {
            return Ok(Transformed::Unchanged);
        }

        // With attributes: resolve them, then traverse the children under the
        // updated scope and the same pending capture.
        let (resolved_attrs, child_scope) = self.resolve_attributes(attributes, ctx, name)?;

        let mut path = ctx.path.clone();
        path.push(name.clone());
        let child_ctx = ResolveCtx {
            capture: ctx.capture.clone(),
            scope: child_scope,
            path,
        };

        let mut resolved_children = Vec::with_capacity(children.len());
        for child in children {
            resolved_children.push(self.resolve_tree(child, &child_ctx)?);
        }

        Ok(Transformed::Replaced(Node::element(
            name.clone(),
            resolved_attrs,
            resolved_children,
        )))
    }

    fn resolve_attributes(
        &self,
        attributes: &[crate::document::Attribute],
        ctx: &ResolveCtx,
        tag: &str,
    ) -> Result<(Vec<crate::document::Attribute>, Scope), CompileError> {
        ctx.scope
            .resolve_attributes(attributes)
            .map_err(|e: AttributeError| CompileError::Expression {
                attribute: e.attribute,
                node: ctx.location(tag),
                page: self.page_name.to_string(),
                message: e.message,
            })
    }

    fn record_use(&mut self, name: String) {
        if !self.used_components.contains(&name) {
            self.used_components.push(name);
        }
    }
}

/// A tag is a component usage (rather than a plain element) when its first
/// character is uppercase, as in the original authoring convention. Lookup
/// itself stays case-insensitive, so `<card>` still matches a registered
/// `Card`.
fn is_component_name(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}

/// Intersection of used-component sets across all pages, keeping the first
/// page's order: start from its list and discard anything a later page never
/// used.
fn shared_components(pages: &[ResolvedPage]) -> Vec<String> {
    let mut shared = pages[0].used_components.clone();
    for page in &pages[1..] {
        shared.retain(|name| page.used_components.contains(name));
    }
    shared
}
