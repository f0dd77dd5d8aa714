//! Components, pages and the component registry.

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::document::Node;
use crate::error::CompileError;
use crate::parse::parse;

/// Raw input record handed over by the collaborator layer (discovery, or any
/// other source of templates): one markup/stylesheet pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub name: String,
    pub path: String,
    pub markup: String,
    pub css: String,
}

/// A named, reusable markup+stylesheet template. Immutable once loaded; the
/// resolution engine only ever copies from it.
#[derive(Debug, Clone)]
pub struct Component {
    pub name: String,
    pub path: String,
    pub document: Node,
    pub css: String,
    /// Opaque parsed form of `css`, supplied by an external CSS parser when
    /// one is wired in. The core carries it alongside the raw text and never
    /// interprets it.
    pub parsed_css: Option<serde_json::Value>,
}

impl Component {
    pub fn from_source(record: SourceRecord) -> Result<Self, CompileError> {
        let document = parse(&record.markup, &record.name)?;
        Ok(Component {
            name: record.name,
            path: record.path,
            document,
            css: record.css,
            parsed_css: None,
        })
    }
}

/// A page is the same shape as a component; its document is the tree the
/// resolution engine expands.
pub type Page = Component;

/// Case-insensitive component lookup, keyed by case-folded name. Built once
/// per run; on a name collision the first-registered component wins (the
/// collaborator determines registration order).
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Component>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        ComponentRegistry::default()
    }

    pub fn build(components: Vec<Component>) -> Self {
        let mut registry = ComponentRegistry::new();
        for component in components {
            registry.register(component);
        }
        registry
    }

    pub fn register(&mut self, component: Component) {
        let key = component.name.to_lowercase();
        if let Some(existing) = self.components.get(&key) {
            warn!(
                "component name collision: '{}' ({}) already registered, ignoring '{}' ({})",
                existing.name, existing.path, component.name, component.path
            );
            return;
        }
        self.components.insert(key, component);
    }

    /// Case-insensitive exact-name lookup.
    pub fn find(&self, name: &str) -> Option<&Component> {
        self.components.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, markup: &str, css: &str) -> Component {
        Component::from_source(SourceRecord {
            name: name.to_string(),
            path: format!("components/{}.html", name),
            markup: markup.to_string(),
            css: css.to_string(),
        })
        .expect("component parses")
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = ComponentRegistry::build(vec![component("Card", "<div/>", "")]);
        assert!(registry.find("card").is_some());
        assert!(registry.find("CARD").is_some());
        assert!(registry.find("Card").is_some());
        assert!(registry.find("cards").is_none());
    }

    #[test]
    fn first_registration_wins_on_collision() {
        let registry = ComponentRegistry::build(vec![
            component("Card", "<div class=\"first\"/>", ".first{}"),
            component("card", "<div class=\"second\"/>", ".second{}"),
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find("CARD").unwrap().css, ".first{}");
    }

    #[test]
    fn malformed_component_markup_fails_loading() {
        let result = Component::from_source(SourceRecord {
            name: "Broken".to_string(),
            path: "components/Broken.html".to_string(),
            markup: "<div".to_string(),
            css: String::new(),
        });
        assert!(matches!(
            result,
            Err(CompileError::MalformedMarkup { .. })
        ));
    }
}
