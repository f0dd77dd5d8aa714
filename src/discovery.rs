//! Source discovery.
//!
//! Recursively scans a directory for markup/stylesheet pairs and hands them
//! to the loader as [`SourceRecord`]s. Files pair by stem: `Card.html` plus
//! `Card.css` make one record; a markup file without a stylesheet gets an
//! empty one. Records come back sorted by name so registration order (and
//! with it collision handling) is deterministic across runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::component::SourceRecord;
use crate::error::CompileError;

#[derive(Debug, Default)]
struct SourcePair {
    markup: Option<PathBuf>,
    css: Option<PathBuf>,
}

/// Scan `dir` recursively and collect one [`SourceRecord`] per markup file.
///
/// Stylesheet files without a matching markup file are skipped with a
/// warning; files with any other extension are ignored. A missing or empty
/// directory yields an empty list.
pub fn discover(dir: &Path) -> Result<Vec<SourceRecord>, CompileError> {
    let mut pairs: BTreeMap<String, SourcePair> = BTreeMap::new();

    if !dir.exists() {
        debug!("source directory {} does not exist, skipping", dir.display());
        return Ok(Vec::new());
    }

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| CompileError::Io {
            path: dir.display().to_string(),
            source: e.into(),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some("html") => {
                pairs.entry(stem.to_string()).or_default().markup = Some(path.to_path_buf());
            }
            Some("css") => {
                pairs.entry(stem.to_string()).or_default().css = Some(path.to_path_buf());
            }
            _ => {
                debug!("ignoring non-source file {}", path.display());
            }
        }
    }

    let mut records = Vec::with_capacity(pairs.len());
    for (name, pair) in pairs {
        let Some(markup_path) = pair.markup else {
            if let Some(css_path) = pair.css {
                warn!(
                    "stylesheet {} has no matching markup file, skipping",
                    css_path.display()
                );
            }
            continue;
        };

        let markup = read(&markup_path)?;
        let css = match &pair.css {
            Some(css_path) => read(css_path)?,
            None => String::new(),
        };

        records.push(SourceRecord {
            name,
            path: markup_path.display().to_string(),
            markup,
            css,
        });
    }

    Ok(records)
}

fn read(path: &Path) -> Result<String, CompileError> {
    fs::read_to_string(path).map_err(|e| CompileError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).expect("write fixture");
    }

    #[test]
    fn pairs_markup_with_stylesheet_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Card.html", "<div/>");
        write(dir.path(), "Card.css", ".card {}");

        let records = discover(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Card");
        assert_eq!(records[0].markup, "<div/>");
        assert_eq!(records[0].css, ".card {}");
    }

    #[test]
    fn markup_without_stylesheet_gets_empty_css() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Plain.html", "<span/>");

        let records = discover(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].css, "");
    }

    #[test]
    fn orphan_stylesheets_and_other_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "orphan.css", ".x {}");
        write(dir.path(), "notes.txt", "nothing");
        write(dir.path(), "Real.html", "<div/>");

        let records = discover(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Real");
    }

    #[test]
    fn scans_nested_directories_and_sorts_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("widgets");
        fs::create_dir(&nested).unwrap();
        write(&nested, "Zed.html", "<i/>");
        write(dir.path(), "Alpha.html", "<b/>");

        let records = discover(dir.path()).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zed"]);
    }

    #[test]
    fn missing_directory_yields_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let records = discover(&dir.path().join("absent")).unwrap();
        assert!(records.is_empty());
    }
}
