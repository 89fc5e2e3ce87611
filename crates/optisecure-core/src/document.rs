//! Documents and chunks flowing through the indexing pipeline

use serde::{Deserialize, Serialize};

/// Type tag attached to every document of the insurance corpus
pub const DOCUMENT_TYPE: &str = "assurance";

/// Provenance of a document, copied onto each of its chunks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// File name the text was extracted from
    pub source: String,
    #[serde(rename = "type")]
    pub doc_type: String,
}

impl DocumentMetadata {
    /// Metadata for a file of the insurance corpus
    pub fn assurance(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            doc_type: DOCUMENT_TYPE.to_string(),
        }
    }
}

/// Plain-text rendition of one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "page_content")]
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

/// Retrieval-sized segment of a single document.
///
/// The metadata is an owned copy of the parent's, so chunks never share
/// state with each other or with the document they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    #[serde(rename = "page_content")]
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Chunk {
    /// Create a chunk of `parent` holding `text`
    pub fn of(parent: &Document, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: parent.metadata.clone(),
        }
    }
}
