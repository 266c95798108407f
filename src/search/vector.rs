use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::models::{Document, Metadata};

/// A stored vector entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VectorEntry {
    id: Uuid,
    content: String,
    #[serde(default)]
    metadata: Metadata,
    embedding: Vec<f32>,
    added_at: DateTime<Utc>,
}

/// Append-only vector collection held in memory and persisted as one JSON
/// file. Search is a brute-force cosine scan.
pub struct VectorStore {
    entries: RwLock<Vec<VectorEntry>>,
    persist_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct VectorHit {
    pub document: Document,
    /// Cosine distance, `1 - cos`; lower is closer.
    pub distance: f32,
}

impl VectorStore {
    /// Open `{dir}/{name}.json`, creating the directory if needed.
    pub fn open_or_create(dir: &Path, name: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let persist_path = dir.join(format!("{name}.json"));

        let entries = if persist_path.exists() {
            let data = std::fs::read_to_string(&persist_path)
                .with_context(|| format!("Failed to read {}", persist_path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse {}", persist_path.display()))?
        } else {
            Vec::new()
        };

        Ok(Self {
            entries: RwLock::new(entries),
            persist_path,
        })
    }

    /// Append documents with their embeddings. `embeddings` must be parallel
    /// with `documents`.
    pub fn add(&self, documents: &[Document], embeddings: Vec<Vec<f32>>) -> Result<Vec<Uuid>> {
        if documents.len() != embeddings.len() {
            anyhow::bail!(
                "{} documents but {} embeddings",
                documents.len(),
                embeddings.len()
            );
        }

        let mut entries = self.entries.write();
        let committed = entries.len();
        let now = Utc::now();
        let mut ids = Vec::with_capacity(documents.len());

        for (doc, embedding) in documents.iter().zip(embeddings) {
            let id = Uuid::new_v4();
            entries.push(VectorEntry {
                id,
                content: doc.content.clone(),
                metadata: doc.metadata.clone(),
                embedding,
                added_at: now,
            });
            ids.push(id);
        }

        // Memory never holds entries the file lacks.
        if let Err(e) = self.persist(&entries) {
            entries.truncate(committed);
            return Err(e);
        }
        Ok(ids)
    }

    /// Atomic write via temp file + rename.
    fn persist(&self, entries: &[VectorEntry]) -> Result<()> {
        let data = serde_json::to_string(entries)?;
        let tmp_path = self.persist_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.persist_path)
            .with_context(|| format!("Failed to replace {}", self.persist_path.display()))?;
        Ok(())
    }

    /// The `limit` closest entries, closest first.
    pub fn search(&self, query_embedding: &[f32], limit: usize) -> Vec<VectorHit> {
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &VectorEntry)> = entries
            .iter()
            .map(|e| (cosine_distance(query_embedding, &e.embedding), e))
            .collect();

        // Stable sort keeps insertion order among equal distances
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(distance, e)| VectorHit {
                document: Document::with_metadata(e.content.clone(), e.metadata.clone()),
                distance,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(content: &str) -> Document {
        let mut metadata = Metadata::new();
        metadata.insert("path".into(), json!(format!("{content}.java")));
        Document::with_metadata(content, metadata)
    }

    #[test]
    fn test_cosine_distance() {
        assert!((cosine_distance(&[1.0, 0.0], &[1.0, 0.0])).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        // Mismatched or empty vectors are treated as unrelated
        assert_eq!(cosine_distance(&[1.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_distance(&[], &[]), 1.0);
    }

    #[test]
    fn test_search_orders_by_distance() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open_or_create(dir.path(), "code").unwrap();
        store
            .add(
                &[doc("far"), doc("near"), doc("mid")],
                vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
            )
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.content, "near");
        assert_eq!(hits[1].document.content, "mid");
        assert!(hits[0].distance <= hits[1].distance);
        assert_eq!(hits[0].document.meta_str("path"), Some("near.java"));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = VectorStore::open_or_create(dir.path(), "web").unwrap();
            store.add(&[doc("a"), doc("b")], vec![vec![1.0], vec![0.5]]).unwrap();
            assert!(dir.path().join("web.json").exists());
        }
        let store = VectorStore::open_or_create(dir.path(), "web").unwrap();
        assert_eq!(store.len(), 2);

        let other = VectorStore::open_or_create(dir.path(), "code").unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn test_add_rejects_mismatched_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open_or_create(dir.path(), "code").unwrap();
        assert!(store.add(&[doc("a")], vec![]).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open_or_create(dir.path(), "code").unwrap();
        store.add(&[doc("kept")], vec![vec![1.0, 0.0]]).unwrap();

        // A non-empty directory where the file should go makes the rename fail.
        std::fs::remove_file(dir.path().join("code.json")).unwrap();
        std::fs::create_dir_all(dir.path().join("code.json").join("blocker")).unwrap();

        assert!(store.add(&[doc("lost")], vec![vec![0.0, 1.0]]).is_err());
        assert_eq!(store.len(), 1);
        let hits = store.search(&[0.0, 1.0], 5);
        assert!(hits.iter().all(|h| h.document.content != "lost"));
    }

    #[test]
    fn test_duplicates_never_reduce_recall() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open_or_create(dir.path(), "code").unwrap();
        let docs = [doc("x"), doc("y")];
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0]];

        store.add(&docs, embeddings.clone()).unwrap();
        let before = store.search(&[1.0, 0.2], 2);
        store.add(&docs, embeddings).unwrap();
        let after = store.search(&[1.0, 0.2], 4);

        for hit in &before {
            assert!(after.iter().any(|h| h.document == hit.document));
        }
        assert_eq!(store.len(), 4);
    }
}
