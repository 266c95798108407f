//! Article scraping for the documentation collection.

pub mod extract;

use anyhow::{Context, Result};
use reqwest::Url;
use serde_json::json;

use crate::chunking;
use crate::error::ConfigError;
use crate::models::{Document, Metadata};

pub const ARTICLE_CHUNK_SIZE: usize = 1000;
pub const ARTICLE_CHUNK_OVERLAP: usize = 100;

/// Accept only absolute `http(s)` URLs.
pub fn validate_url(url: &str) -> Result<Url, ConfigError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::InvalidWebUrl(url.to_string()));
    }
    Url::parse(url).map_err(|_| ConfigError::InvalidWebUrl(url.to_string()))
}

pub struct WebScraper {
    client: reqwest::Client,
}

impl WebScraper {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn fetch_html(&self, url: &Url) -> Result<String> {
        let resp = self
            .client
            .get(url.clone())
            .header("User-Agent", concat!("tcm/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("GET {url} returned {status}");
        }

        resp.text()
            .await
            .with_context(|| format!("Failed to read body of {url}"))
    }

    /// Fetch `url` and return its main article text as one document with
    /// `source` metadata.
    pub async fn load(&self, url: &str) -> Result<Document> {
        let url = validate_url(url)?;
        let html = self.fetch_html(&url).await?;
        Ok(article_document(&html, &url))
    }

    /// Fetch, extract and split an article into overlapping chunks.
    pub async fn load_chunks(&self, url: &str) -> Result<Vec<Document>> {
        let doc = self.load(url).await?;
        let chunks = chunking::split_prose(&[doc], ARTICLE_CHUNK_SIZE, ARTICLE_CHUNK_OVERLAP);
        tracing::info!("Split article {url} into {} chunks", chunks.len());
        Ok(chunks)
    }
}

/// Clean and extract an already-fetched page.
pub fn article_document(html: &str, url: &Url) -> Document {
    let cleaned = extract::strip_boilerplate(html);
    let text = extract::extract_article(&cleaned, url);
    tracing::debug!("Extracted {} chars from {url}", text.len());

    let mut metadata = Metadata::new();
    metadata.insert("source".into(), json!(url.as_str()));
    Document::with_metadata(text, metadata)
}
