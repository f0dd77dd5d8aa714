//! Error types for the whole build pipeline.
//!
//! Every failure carries the context a site author needs to find the bad
//! input: the source it came from, the page being built, and for expression
//! failures the attribute and node involved.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// The tokenizer/parser could not build a tree from the markup.
    #[error("malformed markup in '{source_name}': {message}")]
    MalformedMarkup { source_name: String, message: String },

    /// A component-cased tag was used but no component carries that name.
    #[error("unregistered component '<{tag}>' used on page '{page}'")]
    UnregisteredComponent { tag: String, page: String },

    /// A placeholder tag appeared outside any component body.
    #[error("'<{placeholder}>' on page '{page}' has no enclosing component usage to splice")]
    OrphanPlaceholder { placeholder: String, page: String },

    /// An attribute expression failed to evaluate.
    #[error("expression in attribute '{attribute}' of <{node}> on page '{page}': {message}")]
    Expression {
        attribute: String,
        node: String,
        page: String,
        message: String,
    },

    /// A build was requested with no pages at all.
    #[error("no pages to build")]
    NoPages,

    #[error("i/o error on {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = CompileError::UnregisteredComponent {
            tag: "Card".to_string(),
            page: "index".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("Card"));
        assert!(text.contains("index"));

        let err = CompileError::Expression {
            attribute: "title".to_string(),
            node: "Hero".to_string(),
            page: "about".to_string(),
            message: "unknown name 'x'".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("title"));
        assert!(text.contains("Hero"));
        assert!(text.contains("about"));
        assert!(text.contains("unknown name 'x'"));
    }
}
