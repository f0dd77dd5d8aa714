//! GoodWeb: a compile-time component templating compiler for static sites.
//!
//! A site is a set of pages plus a set of reusable components, each a
//! markup/stylesheet pair. The pipeline:
//!
//! 1. [`discovery`] scans the site directory for sources.
//! 2. [`parse`] turns markup into a [`Node`] tree.
//! 3. [`resolve`] expands component usages into their bodies, splicing
//!    captured children into `<GoodWeb-Inner>` placeholders and evaluating
//!    attribute expressions against the lexical scope.
//! 4. [`finalize`] partitions component stylesheets into a shared bundle plus
//!    per-page bundles and emits the final files.
//!
//! All of it is pure compile-time work; no runtime ships with the output.

pub mod component;
pub mod discovery;
pub mod document;
pub mod error;
pub mod expression;
pub mod finalize;
pub mod parse;
pub mod resolve;
pub mod scope;
pub mod tokenize;
pub mod visitor;

pub use component::{Component, ComponentRegistry, Page, SourceRecord};
pub use document::{query_selector, query_selector_mut, stringify, Attribute, Node};
pub use error::CompileError;
pub use finalize::{finalize, OutputFile};
pub use parse::parse;
pub use resolve::{resolve, resolve_page, ResolveResult, ResolvedPage, PLACEHOLDER_TAG};
pub use scope::Scope;
pub use visitor::{visit, Transformed};
