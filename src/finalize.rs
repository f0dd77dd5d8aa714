//! Output assembly: stylesheet partitioning and final page emission.
//!
//! After every page is resolved, component stylesheets are split into one
//! shared bundle (components used on every page) and one page-specific bundle
//! per page (everything else that page used). Each page's head gets a link
//! for the shared bundle, then one for its own bundle, in that order.

use log::warn;
use sha2::{Digest, Sha256};

use crate::component::ComponentRegistry;
use crate::document::{query_selector_mut, stringify, Attribute, Node};
use crate::resolve::{ResolvedPage, ResolveResult};

/// One file handed to the collaborator writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub filename: String,
    pub content: String,
}

/// Partition stylesheets and emit the final files: one `<name>.html` per
/// page, zero-or-one `global.<hash>.css`, zero-or-more `<name>.<hash>.css`.
pub fn finalize(result: &ResolveResult, registry: &ComponentRegistry) -> Vec<OutputFile> {
    let mut files = Vec::new();

    let shared_bundle = build_bundle(&result.shared_components, registry)
        .map(|content| OutputFile {
            filename: format!("global.{}.css", content_hash(&content)),
            content,
        });

    for page in &result.pages {
        let page_only: Vec<String> = page
            .used_components
            .iter()
            .filter(|name| !result.shared_components.contains(name))
            .cloned()
            .collect();

        let page_bundle = build_bundle(&page_only, registry).map(|content| OutputFile {
            filename: format!("{}.{}.css", page.name, content_hash(&content)),
            content,
        });

        let mut document = page.document.clone();
        let links: Vec<&str> = shared_bundle
            .iter()
            .chain(page_bundle.iter())
            .map(|bundle| bundle.filename.as_str())
            .collect();
        attach_stylesheets(&mut document, page, &links);

        files.push(OutputFile {
            filename: format!("{}.html", page.name),
            content: stringify(&document),
        });
        files.extend(page_bundle);
    }

    files.extend(shared_bundle);
    files
}

/// Newline-join the raw stylesheets of `names` in order. `None` when there is
/// nothing to bundle.
fn build_bundle(names: &[String], registry: &ComponentRegistry) -> Option<String> {
    if names.is_empty() {
        return None;
    }
    let content = names
        .iter()
        .filter_map(|name| registry.find(name))
        .map(|component| component.css.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    Some(content)
}

fn attach_stylesheets(document: &mut Node, page: &ResolvedPage, filenames: &[&str]) {
    if filenames.is_empty() {
        return;
    }

    let Some(Node::Element { children, .. }) = query_selector_mut(document, "head") else {
        warn!(
            "page '{}' has no <head>; skipping stylesheet links ({})",
            page.name,
            filenames.join(", ")
        );
        return;
    };

    for filename in filenames {
        children.push(Node::element(
            "link",
            vec![
                Attribute::new("rel", "stylesheet"),
                Attribute::new("href", *filename),
            ],
            vec![],
        ));
    }
}

/// Short content hash for stylesheet filenames (sha-256, first 16 hex chars).
fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, ComponentRegistry, SourceRecord};
    use crate::resolve::resolve;

    fn load(name: &str, markup: &str, css: &str) -> Component {
        Component::from_source(SourceRecord {
            name: name.to_string(),
            path: format!("{}.html", name),
            markup: markup.to_string(),
            css: css.to_string(),
        })
        .expect("markup parses")
    }

    fn site() -> (Vec<Component>, ComponentRegistry) {
        let registry = ComponentRegistry::build(vec![
            load("Nav", "<nav/>", ".nav {}"),
            load("Footer", "<footer/>", ".footer {}"),
            load("Hero", "<h1/>", ".hero {}"),
        ]);
        let pages = vec![
            load("home", "<html><head/><body><Nav/><Hero/><Footer/></body></html>", ""),
            load("about", "<html><head/><body><Nav/><Footer/></body></html>", ""),
            load("contact", "<html><head/><body><Footer/><Nav/></body></html>", ""),
        ];
        (pages, registry)
    }

    fn find<'a>(files: &'a [OutputFile], prefix: &str, suffix: &str) -> Option<&'a OutputFile> {
        files
            .iter()
            .find(|f| f.filename.starts_with(prefix) && f.filename.ends_with(suffix))
    }

    #[test]
    fn component_used_everywhere_lands_only_in_the_shared_bundle() {
        let (pages, registry) = site();
        let result = resolve(&pages, &registry).unwrap();
        let files = finalize(&result, &registry);

        let global = find(&files, "global.", ".css").expect("shared bundle");
        assert!(global.content.contains(".nav"));
        assert!(global.content.contains(".footer"));
        assert!(!global.content.contains(".hero"));

        // No page-specific bundle repeats a shared component.
        for file in files.iter().filter(|f| {
            f.filename.ends_with(".css") && !f.filename.starts_with("global.")
        }) {
            assert!(!file.content.contains(".nav"));
            assert!(!file.content.contains(".footer"));
        }
    }

    #[test]
    fn component_used_on_one_page_lands_only_in_that_bundle() {
        let (pages, registry) = site();
        let result = resolve(&pages, &registry).unwrap();
        let files = finalize(&result, &registry);

        let home_css = find(&files, "home.", ".css").expect("home bundle");
        assert_eq!(home_css.content, ".hero {}");
        assert!(find(&files, "about.", ".css").is_none());
        assert!(find(&files, "contact.", ".css").is_none());
    }

    #[test]
    fn head_links_shared_then_page_specific() {
        let (pages, registry) = site();
        let result = resolve(&pages, &registry).unwrap();
        let files = finalize(&result, &registry);

        let global = find(&files, "global.", ".css").unwrap().filename.clone();
        let home_css = find(&files, "home.", ".css").unwrap().filename.clone();
        let home = find(&files, "home", ".html").expect("home page");

        let global_link = format!("<link rel=\"stylesheet\" href=\"{}\"/>", global);
        let page_link = format!("<link rel=\"stylesheet\" href=\"{}\"/>", home_css);
        let head_end = home.content.find("</head>").expect("head survives");
        let global_at = home.content.find(&global_link).expect("global link");
        let page_at = home.content.find(&page_link).expect("page link");
        assert!(global_at < page_at && page_at < head_end);
    }

    #[test]
    fn no_shared_usage_means_no_global_bundle() {
        let registry = ComponentRegistry::build(vec![
            load("A", "<i/>", ".a {}"),
            load("B", "<b/>", ".b {}"),
        ]);
        let pages = vec![
            load("one", "<html><head/><body><A/></body></html>", ""),
            load("two", "<html><head/><body><B/></body></html>", ""),
        ];
        let result = resolve(&pages, &registry).unwrap();
        let files = finalize(&result, &registry);

        assert!(find(&files, "global.", ".css").is_none());
        assert!(find(&files, "one.", ".css").is_some());
        assert!(find(&files, "two.", ".css").is_some());
    }

    #[test]
    fn page_without_head_still_emits_html() {
        let registry = ComponentRegistry::build(vec![load("A", "<i/>", ".a {}")]);
        let pages = vec![load("bare", "<div><A/></div>", "")];
        let result = resolve(&pages, &registry).unwrap();
        let files = finalize(&result, &registry);

        let html = find(&files, "bare", ".html").expect("page emitted");
        assert!(!html.content.contains("<link"));
    }

    #[test]
    fn bundle_filenames_are_content_addressed() {
        let (pages, registry) = site();
        let result = resolve(&pages, &registry).unwrap();
        let first = finalize(&result, &registry);
        let second = finalize(&result, &registry);
        assert_eq!(first, second);

        let global = find(&first, "global.", ".css").unwrap();
        assert_eq!(
            global.filename,
            format!("global.{}.css", content_hash(&global.content))
        );
    }
}
