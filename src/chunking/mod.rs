//! Document splitting: AST-aware chunking for code, line-based fallback for
//! code without a grammar, and a recursive character splitter for prose.

pub mod ast;
pub mod fallback;
pub mod recursive;

use std::collections::HashMap;

use serde_json::json;

use crate::models::{Document, Metadata};
use recursive::RecursiveSplitter;

/// Non-whitespace characters per code chunk.
pub const CODE_BUDGET: usize = 800;

/// Path → extra metadata attached to every chunk of that file.
pub type MetadataMap = HashMap<String, Metadata>;

#[derive(Debug, Clone)]
pub struct ChunkOutput {
    pub content: String,
    /// 1-based start line in the original file.
    pub start_line: usize,
    /// 1-based end line in the original file.
    pub end_line: usize,
}

/// Languages with tree-sitter AST support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Java,
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Tsx,
    Unknown,
}

impl Language {
    /// Map a language name or file extension to a variant.
    pub fn from_str(lang: &str) -> Self {
        match lang.to_lowercase().as_str() {
            "java" => Language::Java,
            "python" | "py" => Language::Python,
            "rust" | "rs" => Language::Rust,
            "javascript" | "js" | "jsx" => Language::JavaScript,
            "typescript" | "ts" => Language::TypeScript,
            "tsx" => Language::Tsx,
            _ => Language::Unknown,
        }
    }

    pub fn from_path(path: &str) -> Self {
        path.rsplit_once('.')
            .map(|(_, ext)| Self::from_str(ext))
            .unwrap_or(Language::Unknown)
    }

    pub fn tree_sitter_language(&self) -> Option<tree_sitter::Language> {
        match self {
            Language::Java => Some(tree_sitter_java::LANGUAGE.into()),
            Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::Tsx => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
            Language::Unknown => None,
        }
    }
}

/// Chunk source code, AST-aware when a grammar exists.
pub fn chunk_code(content: &str, language: Language) -> Vec<ChunkOutput> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    if let Some(chunks) = ast::chunk_with_ast(content, language, CODE_BUDGET) {
        return chunks;
    }

    fallback::chunk_lines(content, CODE_BUDGET)
}

/// Split code documents into chunk documents.
///
/// Each chunk inherits the source document's metadata plus `start_line` and
/// `end_line`, overlaid with the `metadata_map` entry for the document's path
/// (when there is one).
pub fn split_documents(docs: &[Document], metadata_map: &MetadataMap) -> Vec<Document> {
    let mut out = Vec::new();

    for doc in docs {
        let path = doc.meta_str("path").unwrap_or_default();
        let language = Language::from_path(path);
        let extra = metadata_map.get(path);

        for chunk in chunk_code(&doc.content, language) {
            let mut metadata = doc.metadata.clone();
            metadata.insert("start_line".into(), json!(chunk.start_line));
            metadata.insert("end_line".into(), json!(chunk.end_line));
            if let Some(extra) = extra {
                metadata.extend(extra.clone());
            }
            out.push(Document::with_metadata(chunk.content, metadata));
        }
    }

    tracing::debug!("Split {} documents into {} chunks", docs.len(), out.len());
    for (i, chunk) in out.iter().enumerate() {
        tracing::debug!(
            "  chunk {:3}: {} [{:?}-{:?}] {} chars",
            i + 1,
            chunk.meta_str("path").unwrap_or("<unknown>"),
            chunk.metadata.get("start_line"),
            chunk.metadata.get("end_line"),
            chunk.content.len()
        );
    }
    out
}

/// Split prose with the recursive splitter; every chunk keeps the
/// document's metadata.
pub fn split_prose(docs: &[Document], chunk_size: usize, overlap: usize) -> Vec<Document> {
    let splitter = RecursiveSplitter::new(chunk_size, overlap);
    docs.iter()
        .flat_map(|doc| {
            splitter
                .split(&doc.content)
                .into_iter()
                .map(|chunk| Document::with_metadata(chunk.content, doc.metadata.clone()))
        })
        .collect()
}
