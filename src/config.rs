use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const CODE_COLLECTION: &str = "tech_credit_code";
pub const WEB_COLLECTION: &str = "web_tech_credit";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the vector collections are persisted
    pub data_dir: PathBuf,
    /// Directory for the last rendered prompt
    pub logs_dir: PathBuf,
    /// Output file mapping job name to answer
    pub responses_path: PathBuf,
    /// Optional path -> metadata mapping for the examples repo
    pub metadata_path: PathBuf,
    /// Article ingested into the documentation collection
    pub article_url: String,
    /// Repository holding the labeled tech credit examples
    pub examples_repo: String,
    pub examples_branch: String,
    /// File in the examples repo listing the tech credit categories
    pub patterns_file: String,
    pub github_api_url: String,
    /// Chat model configuration
    pub llm: LlmConfig,
    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "anthropic", "ollama" or "openai"
    pub provider: String,
    pub base_url: String,
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Filled from the secrets file, never from config
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "google", "ollama" or "openai"
    pub provider: String,
    pub base_url: String,
    pub model: String,
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of user snippets kept by the top-k aggregator
    pub top_k: usize,
    /// Matches fetched per snippet
    pub top_docs_per_query: usize,
    /// Documentation chunks fetched for the question
    pub doc_search_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/vectors"),
            logs_dir: PathBuf::from("./logs"),
            responses_path: PathBuf::from("./responses.json"),
            metadata_path: PathBuf::from("./repo_metadata.json"),
            article_url: "https://cacm.acm.org/opinion/technical-credit/".to_string(),
            examples_repo: "https://github.com/alexsun2/TC-Examples".to_string(),
            examples_branch: "main".to_string(),
            patterns_file: "tech_credit_patterns.json".to_string(),
            github_api_url: "https://api.github.com".to_string(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            chat_model: "claude-3-5-sonnet-latest".to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            api_key: None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "models/text-embedding-004".to_string(),
            api_key: None,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            top_docs_per_query: 4,
            doc_search_k: 4,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("TCM_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("TCM_LOGS_DIR") {
            config.logs_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("TCM_RESPONSES_PATH") {
            config.responses_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("TCM_METADATA_PATH") {
            config.metadata_path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("TCM_ARTICLE_URL") {
            config.article_url = url;
        }
        if let Ok(url) = std::env::var("TCM_EXAMPLES_REPO") {
            config.examples_repo = url;
        }
        if let Ok(url) = std::env::var("GITHUB_API_URL") {
            config.github_api_url = url;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(val) = std::env::var("LLM_TEMPERATURE") {
            if let Ok(t) = val.parse() {
                config.llm.temperature = t;
            }
        }
        if let Ok(provider) = std::env::var("EMBED_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Ok(url) = std::env::var("EMBED_BASE_URL") {
            config.embedding.base_url = url;
        }
        if let Ok(model) = std::env::var("EMBED_MODEL") {
            config.embedding.model = model;
        }

        config
    }

    /// Copy provider keys out of the secrets file into the provider configs.
    pub fn with_secrets(mut self, secrets: &Secrets) -> Self {
        self.llm.api_key = Some(secrets.claude_api_key.clone());
        self.embedding.api_key = Some(secrets.google_api_key.clone());
        self
    }

    pub fn prompt_log_path(&self) -> PathBuf {
        self.logs_dir.join("context_doc_content.txt")
    }
}

/// Credentials read from a dotenv-style file.
///
/// The file is parsed directly; nothing is injected into the process
/// environment.
#[derive(Clone)]
pub struct Secrets {
    pub langsmith_api_key: String,
    pub claude_api_key: String,
    pub google_api_key: String,
    pub github_token: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secrets { .. }")
    }
}

impl Secrets {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let iter = dotenvy::from_path_iter(path).map_err(|source| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        })?;

        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                path: path.to_path_buf(),
                source,
            })?;
            vars.insert(key, value);
        }

        let secrets = Self {
            langsmith_api_key: take_token(&mut vars, "LANGSMITH_API_KEY", path)?,
            claude_api_key: take_token(&mut vars, "CLAUDE_API_KEY", path)?,
            google_api_key: take_token(&mut vars, "GOOGLE_API_KEY", path)?,
            github_token: take_token(&mut vars, "GITHUB_PA_TOKEN", path)?,
        };
        tracing::info!("Loaded secrets from {}", path.display());
        Ok(secrets)
    }
}

fn take_token(
    vars: &mut HashMap<String, String>,
    name: &'static str,
    path: &Path,
) -> Result<String, ConfigError> {
    match vars.remove(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingSecret {
            name,
            path: path.to_path_buf(),
        }),
    }
}
