use serde::Serialize;

use crate::models::{Document, Job, Part};

/// Everything one pipeline run reads and produces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineState {
    pub question: String,
    pub url: String,
    pub branch: String,
    pub folder: String,
    /// Documentation chunks matched to the question
    pub context_doc: Vec<Document>,
    pub parts: Vec<Part>,
    /// Rendered system + user prompt, once `generate` has run
    pub prompt: Option<String>,
    pub answer: Option<String>,
}

impl PipelineState {
    pub fn new(question: &str, job: &Job) -> Self {
        Self {
            question: question.to_string(),
            url: job.url.clone(),
            branch: job.branch.clone(),
            folder: job.folder.clone(),
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("<unserializable: {e}>"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_from_job() {
        let job = Job {
            url: "https://github.com/org/app".into(),
            branch: "dev".into(),
            folder: "src".into(),
        };
        let state = PipelineState::new("What credits?", &job);
        assert_eq!(state.question, "What credits?");
        assert_eq!(state.branch, "dev");
        assert!(state.parts.is_empty());
        assert!(state.answer.is_none());

        let json: serde_json::Value = serde_json::from_str(&state.to_json()).unwrap();
        assert_eq!(json["folder"], "src");
        assert_eq!(json["context_doc"], serde_json::json!([]));
    }
}
