//! Loads the HTML corpus from disk as plain-text documents

use std::fs;
use std::path::{Path, PathBuf};

use scraper::Html;
use tracing::{debug, info};

use optisecure_core::{Document, DocumentMetadata, Error, Result};

/// File extensions treated as markup, compared case-insensitively
const MARKUP_EXTENSIONS: [&str; 2] = ["html", "htm"];

/// Elements whose text is never part of the document content
const NON_CONTENT_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Reads every markup file of a directory into a [`Document`]
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    documents_path: PathBuf,
}

impl DocumentLoader {
    /// Create a loader for the given directory
    pub fn new(documents_path: impl Into<PathBuf>) -> Self {
        Self {
            documents_path: documents_path.into(),
        }
    }

    pub fn documents_path(&self) -> &Path {
        &self.documents_path
    }

    /// Load all markup files found directly in the directory.
    ///
    /// Files are returned sorted by name. A missing directory or an
    /// unreadable file aborts the whole load.
    pub fn load_documents(&self) -> Result<Vec<Document>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.documents_path)? {
            let path = entry?.path();
            if path.is_file() && is_markup_file(&path) {
                files.push(path);
            }
        }
        files.sort();

        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| {
                    Error::DocumentLoader(format!("file name is not valid UTF-8: {}", path.display()))
                })?
                .to_string();

            let content = fs::read_to_string(&path)?;
            let text = parse_html(&content);
            debug!(source = %filename, chars = text.len(), "loaded document");

            documents.push(Document::new(text, DocumentMetadata::assurance(filename)));
        }

        info!(
            count = documents.len(),
            path = %self.documents_path.display(),
            "loaded documents"
        );
        Ok(documents)
    }
}

fn is_markup_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MARKUP_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}

/// Extract the visible text of an HTML page.
///
/// Text nodes are trimmed and joined with single spaces; whitespace inside a
/// node is kept as-is so blank lines between list items survive.
pub fn parse_html(html_content: &str) -> String {
    let document = Html::parse_document(html_content);

    let mut parts: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| NON_CONTENT_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}
