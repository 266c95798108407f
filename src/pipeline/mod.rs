//! The retrieve / retrieve_doc / generate graph.
//!
//! ```text
//!            start
//!           /     \
//!    retrieve     retrieve_doc
//!           \     /
//!           generate
//! ```
//!
//! Both retrieval nodes run concurrently from the initial state; `generate`
//! starts once both have finished. Any node error aborts the run.

pub mod state;
pub mod train;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::chunking::{self, MetadataMap};
use crate::config::Config;
use crate::github::filters::{file_only, folder_only, java_files, not_tests};
use crate::github::loader::{GithubRepo, RepoLoader, RepoSource};
use crate::llm::chat::ChatModel;
use crate::llm::prompt::{build_chat_prompt, render_parts, PromptInputs};
use crate::models::{Document, Job, Part, TechCreditPattern};
use crate::search::collection::SimilaritySearch;
use crate::search::top_k::top_k_similar;
use state::PipelineState;

/// Collaborators of a run. Cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    pub config: Config,
    pub repos: Arc<dyn RepoSource>,
    /// Labeled example code
    pub code: Arc<dyn SimilaritySearch>,
    /// Chunks of the tech credit article
    pub docs: Arc<dyn SimilaritySearch>,
    pub chat: Arc<dyn ChatModel>,
}

impl Pipeline {
    /// Run the graph for one repository and return the final state.
    pub async fn run(&self, question: &str, job: &Job) -> Result<PipelineState> {
        let mut state = PipelineState::new(question, job);
        tracing::info!("Running pipeline for {}@{} (folder {:?})", job.url, job.branch, job.folder);

        let (parts, context_doc) = tokio::try_join!(self.retrieve(&state), self.retrieve_doc(&state))?;
        state.parts = parts;
        state.context_doc = context_doc;

        let (prompt, answer) = self.generate(&state).await?;
        state.prompt = Some(prompt);
        state.answer = Some(answer);
        Ok(state)
    }

    /// Match the target repository's Java chunks against the labeled
    /// examples and keep the closest ones.
    pub async fn retrieve(&self, state: &PipelineState) -> Result<Vec<Part>> {
        let mut loader = RepoLoader::new(&state.url, &state.branch)?;
        let files = loader
            .load(
                self.repos.as_ref(),
                vec![folder_only(&state.folder), java_files(), not_tests()],
            )
            .await
            .with_context(|| format!("Failed to load {}", state.url))?;

        let chunks = chunking::split_documents(files, &MetadataMap::new());
        let queries: Vec<String> = chunks.into_iter().map(|d| d.content).collect();

        let retrieval = &self.config.retrieval;
        let matches = top_k_similar(
            self.code.as_ref(),
            &queries,
            retrieval.top_k,
            retrieval.top_docs_per_query,
        )
        .await?;

        let parts: Vec<Part> = matches
            .iter()
            .enumerate()
            .map(|(i, m)| Part::from_match(i + 1, m))
            .collect();
        tracing::info!("retrieve: {} parts from {} chunks", parts.len(), queries.len());
        Ok(parts)
    }

    /// Documentation chunks closest to the question.
    pub async fn retrieve_doc(&self, state: &PipelineState) -> Result<Vec<Document>> {
        let docs = self
            .docs
            .similarity_search(&state.question, self.config.retrieval.doc_search_k)
            .await?;
        tracing::info!("retrieve_doc: {} documentation chunks", docs.len());
        Ok(docs)
    }

    /// Fill the prompt, log it, and ask the model. Returns the rendered
    /// prompt and the answer.
    pub async fn generate(&self, state: &PipelineState) -> Result<(String, String)> {
        let context_doc = state
            .context_doc
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let rendered = render_parts(&state.parts);
        let categories = self.load_categories().await?;

        let prompt = build_chat_prompt(&PromptInputs {
            tech_credit_list: &categories,
            context_doc: &context_doc,
            rendered: &rendered,
            question: &state.question,
        });
        let prompt_text = prompt.to_log_string();

        tracing::debug!("generate state:\n{}", state.to_json());
        tracing::debug!("LLM prompt:\n{prompt_text}");
        self.write_prompt_log(&prompt_text)?;

        let answer = self.chat.invoke(&prompt).await?;
        Ok((prompt_text, answer))
    }

    /// Category names from the patterns file in the examples repository.
    async fn load_categories(&self) -> Result<Vec<String>> {
        let repo = GithubRepo::parse(&self.config.examples_repo)?;
        let patterns_file = &self.config.patterns_file;
        let files = self
            .repos
            .load_files(&repo, &self.config.examples_branch, &file_only(patterns_file))
            .await?;
        let file = files
            .first()
            .with_context(|| format!("{patterns_file} not found in {repo}"))?;

        let patterns: Vec<TechCreditPattern> = serde_json::from_str(&file.content)
            .with_context(|| format!("Failed to parse {patterns_file}"))?;
        Ok(patterns.into_iter().map(|p| p.pattern_name).collect())
    }

    fn write_prompt_log(&self, prompt: &str) -> Result<()> {
        let path = self.config.prompt_log_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        std::fs::write(&path, prompt)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
