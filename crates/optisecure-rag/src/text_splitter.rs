//! Structural chunker splitting documents on numbered sections

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use optisecure_core::{Chunk, Document, Error, Result};

/// A numbered-list marker such as `12. `
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\s").expect("list marker pattern is valid"));

/// Size settings accepted by the chunker.
///
/// They are validated and kept for callers that inspect them, but cut points
/// are purely structural and do not depend on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidInput("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidInput(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Splits documents into one chunk per numbered section
#[derive(Debug, Clone, Default)]
pub struct TextSplitter {
    config: ChunkerConfig,
}

impl TextSplitter {
    /// Create a splitter with custom configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split text on blank lines that are followed by a numbered-list marker.
    ///
    /// Sections are trimmed and empty ones dropped. Text without any such
    /// boundary comes back as a single section.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut sections = Vec::new();
        let mut start = 0;

        for marker in LIST_MARKER.find_iter(text) {
            if let Some(cut) = section_break_before(text, marker.start()) {
                push_section(&mut sections, &text[start..cut]);
                start = marker.start();
            }
        }
        push_section(&mut sections, &text[start..]);

        sections
    }

    /// Split every document, copying its metadata onto each chunk
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for document in documents {
            let sections = self.split_text(&document.text);
            if sections.is_empty() {
                warn!(source = %document.metadata.source, "document has no text, skipping");
                continue;
            }
            chunks.extend(sections.into_iter().map(|section| Chunk::of(document, section)));
        }

        chunks
    }

    /// Split documents and write the resulting chunks to `output_file` as
    /// pretty-printed JSON, replacing any previous content.
    pub fn split_and_persist(
        &self,
        documents: &[Document],
        output_file: impl AsRef<Path>,
    ) -> Result<Vec<Chunk>> {
        let chunks = self.split_documents(documents);
        let output_file = output_file.as_ref();

        fs::write(output_file, chunks_to_json(&chunks)?)?;
        info!(
            count = chunks.len(),
            path = %output_file.display(),
            "wrote chunks"
        );

        Ok(chunks)
    }
}

fn push_section(sections: &mut Vec<String>, section: &str) {
    let section = section.trim();
    if !section.is_empty() {
        sections.push(section.to_string());
    }
}

/// Byte offset where the section break ending at `marker` begins.
///
/// A break is a whitespace run holding at least two line breaks, the last of
/// which sits right before the marker.
fn section_break_before(text: &str, marker: usize) -> Option<usize> {
    let head = text[..marker].strip_suffix('\n')?;
    let run_start = head.trim_end().len();
    head[run_start..]
        .find('\n')
        .map(|offset| run_start + offset)
}

/// Render chunks with four-space indentation and non-ASCII text kept as-is
fn chunks_to_json(chunks: &[Chunk]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    chunks
        .serialize(&mut serializer)
        .map_err(|e| Error::Chunker(format!("cannot serialize chunks: {e}")))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use optisecure_core::DocumentMetadata;
    use tempfile::TempDir;

    fn document(text: &str) -> Document {
        Document::new(text, DocumentMetadata::assurance("contrat.html"))
    }

    #[test]
    fn test_split_on_numbered_sections() {
        let splitter = TextSplitter::default();
        let sections = splitter.split_text(
            "Conditions générales\n\n1. Objet du contrat\nTexte.\n\n2. Garanties\n\n3. Exclusions",
        );

        assert_eq!(
            sections,
            vec![
                "Conditions générales",
                "1. Objet du contrat\nTexte.",
                "2. Garanties",
                "3. Exclusions",
            ]
        );
    }

    #[test]
    fn test_single_line_break_is_not_a_boundary() {
        let splitter = TextSplitter::default();
        let sections = splitter.split_text("1. Objet\n2. Garanties");
        assert_eq!(sections, vec!["1. Objet\n2. Garanties"]);
    }

    #[test]
    fn test_blank_line_with_spaces_is_a_boundary() {
        let splitter = TextSplitter::default();
        let sections = splitter.split_text("1. Objet  \n \t \n10. Résiliation");
        assert_eq!(sections, vec!["1. Objet", "10. Résiliation"]);
    }

    #[test]
    fn test_indented_marker_is_not_a_boundary() {
        let splitter = TextSplitter::default();
        let sections = splitter.split_text("1. Objet\n\n  2. Garanties");
        assert_eq!(sections, vec!["1. Objet\n\n  2. Garanties"]);
    }

    #[test]
    fn test_marker_needs_whitespace_after_period() {
        let splitter = TextSplitter::default();
        let sections = splitter.split_text("Préambule\n\n2.5% de frais");
        assert_eq!(sections, vec!["Préambule\n\n2.5% de frais"]);
    }

    #[test]
    fn test_text_without_boundary_is_one_section() {
        let splitter = TextSplitter::default();
        assert_eq!(splitter.split_text("  Contrat simple  "), vec!["Contrat simple"]);
        assert!(splitter.split_text(" \n ").is_empty());
    }

    #[test]
    fn test_sections_partition_the_text() {
        let splitter = TextSplitter::default();
        let text = "Intro\n\n1. Premier\n\n2. Deuxième\n\n\n3. Troisième";
        let sections = splitter.split_text(text);

        let rebuilt: String = sections.concat();
        let original: String = text.split_whitespace().collect();
        let rebuilt: String = rebuilt.split_whitespace().collect();
        assert_eq!(rebuilt, original);
        assert_eq!(sections.len(), 4);
    }

    #[test]
    fn test_split_documents_copies_metadata() {
        let splitter = TextSplitter::default();
        let parent = document("1. Garanties\n\n2. Exclusions");

        let mut chunks = splitter.split_documents(std::slice::from_ref(&parent));
        assert_eq!(chunks.len(), 2);

        chunks[0].metadata.source = "modifié.html".to_string();
        assert_eq!(chunks[1].metadata.source, "contrat.html");
        assert_eq!(parent.metadata.source, "contrat.html");
    }

    #[test]
    fn test_split_documents_skips_empty_documents() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split_documents(&[document(""), document("Texte")]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Texte");
    }

    #[test]
    fn test_config_validation() {
        assert!(TextSplitter::new(ChunkerConfig::default()).is_ok());
        assert!(
            TextSplitter::new(ChunkerConfig {
                chunk_size: 100,
                chunk_overlap: 100,
            })
            .is_err()
        );
        assert!(
            TextSplitter::new(ChunkerConfig {
                chunk_size: 0,
                chunk_overlap: 0,
            })
            .is_err()
        );
    }

    #[test]
    fn test_size_settings_do_not_change_cut_points() {
        let text = "1. Une section assez longue pour dépasser la taille\n\n2. Fin";
        let small = TextSplitter::new(ChunkerConfig {
            chunk_size: 5,
            chunk_overlap: 1,
        })
        .unwrap();

        assert_eq!(small.split_text(text), TextSplitter::default().split_text(text));
    }

    #[test]
    fn test_split_and_persist_writes_json() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("chunks.json");
        fs::write(&output, "stale content").unwrap();

        let splitter = TextSplitter::default();
        let chunks = splitter
            .split_and_persist(&[document("1. Été\n\n2. Hiver")], &output)
            .unwrap();

        let written: Vec<Chunk> =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written, chunks);
        assert!(fs::read_to_string(&output).unwrap().contains("Été"));
    }

    #[test]
    fn test_split_and_persist_propagates_write_errors() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("missing").join("chunks.json");

        let err = TextSplitter::default()
            .split_and_persist(&[document("Texte")], &output)
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
