use anyhow::Result;
use std::sync::Arc;

use crate::config::{Config, Secrets, CODE_COLLECTION, WEB_COLLECTION};
use crate::github::loader::GithubClient;
use crate::llm::chat::HttpChatModel;
use crate::llm::embeddings::{Embedder, HttpEmbedder};
use crate::pipeline::train;
use crate::pipeline::Pipeline;
use crate::search::collection::Collection;
use crate::web::WebScraper;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub github: Arc<GithubClient>,
    pub code: Arc<Collection>,
    pub web: Arc<Collection>,
    pub chat: Arc<HttpChatModel>,
}

impl AppState {
    pub fn new(config: Config, secrets: &Secrets) -> Result<Self> {
        let config = config.with_secrets(secrets);
        std::fs::create_dir_all(&config.data_dir)?;
        std::fs::create_dir_all(&config.logs_dir)?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(
            http_client.clone(),
            config.embedding.clone(),
        ));
        let code = Collection::open(&config.data_dir, CODE_COLLECTION, embedder.clone())?;
        let web = Collection::open(&config.data_dir, WEB_COLLECTION, embedder)?;

        let github = GithubClient::new(
            http_client.clone(),
            &config.github_api_url,
            &secrets.github_token,
        );
        let chat = HttpChatModel::new(http_client.clone(), config.llm.clone());

        Ok(Self {
            config,
            http_client,
            github: Arc::new(github),
            code: Arc::new(code),
            web: Arc::new(web),
            chat: Arc::new(chat),
        })
    }

    pub fn needs_training(&self) -> bool {
        self.code.is_empty() || self.web.is_empty()
    }

    pub async fn train(&self) -> Result<()> {
        let scraper = WebScraper::new(self.http_client.clone());
        train::train(
            &self.code,
            &self.web,
            &scraper,
            self.github.as_ref(),
            &self.config,
        )
        .await
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline {
            config: self.config.clone(),
            repos: self.github.clone(),
            code: self.code.clone(),
            docs: self.web.clone(),
            chat: self.chat.clone(),
        }
    }
}
