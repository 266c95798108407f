use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

pub type Metadata = Map<String, Value>;

/// A piece of text plus free-form metadata, as loaded, split and stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// String-valued metadata field, if present.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// Unique `"tech_credit: description"` strings across the documents' metadata,
/// in sorted order. Documents missing either field are skipped.
pub fn collect_unique_pairs(docs: &[Document]) -> Vec<String> {
    let pairs: BTreeSet<String> = docs
        .iter()
        .filter_map(|doc| {
            let credit = doc.meta_str("tech_credit").filter(|s| !s.is_empty())?;
            let description = doc
                .meta_str("tech_credit_description")
                .filter(|s| !s.is_empty())?;
            Some(format!("{credit}: {description}"))
        })
        .collect();
    tracing::debug!("Tech credit pairs seen: {:?}", pairs);
    pairs.into_iter().collect()
}

/// One retained user snippet with its matched example documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMatch {
    pub query: String,
    pub documents: Vec<Document>,
    /// Minimum distance among the matched documents (lower = closer)
    pub score: f32,
}

/// One section of the rendered user prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub ordinal: usize,
    pub tech_credit: String,
    pub user_code: String,
    pub context_code: String,
}

impl Part {
    pub fn from_match(ordinal: usize, m: &QueryMatch) -> Self {
        Self {
            ordinal,
            tech_credit: collect_unique_pairs(&m.documents).join("\n"),
            user_code: m.query.clone(),
            context_code: m
                .documents
                .iter()
                .map(|d| d.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

/// Batch-job descriptor entry (`--json`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Job {
    pub url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub folder: String,
}

fn default_branch() -> String {
    "main".to_string()
}

/// Entry of the tech credit patterns file in the examples repository.
#[derive(Debug, Clone, Deserialize)]
pub struct TechCreditPattern {
    pub pattern_name: String,
}
