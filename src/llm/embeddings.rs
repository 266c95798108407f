use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;

/// Maximum characters sent per text to the embedding API. Code chunks are
/// bounded well below this; it guards against oversized article text.
const MAX_EMBED_CHARS: usize = 8_000;

/// Truncate `text` to at most `MAX_EMBED_CHARS` bytes on a char boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Turns text into vectors. Output is parallel with the input.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .context("No embedding returned")
    }
}

/// Embeddings over HTTP: Google Generative Language, Ollama, or any
/// OpenAI-compatible endpoint.
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: EmbeddingConfig,
}

impl HttpEmbedder {
    pub fn new(client: reqwest::Client, config: EmbeddingConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let truncated: Vec<String> = texts
            .iter()
            .map(|t| truncate_for_embedding(t).to_string())
            .collect();

        let embeddings = match self.config.provider.as_str() {
            "google" => embed_google(&self.client, &self.config, &truncated).await?,
            "ollama" => embed_ollama(&self.client, &self.config, &truncated).await?,
            "openai" => embed_openai(&self.client, &self.config, &truncated).await?,
            other => anyhow::bail!("Unknown embedding provider: {other}"),
        };

        if embeddings.len() != texts.len() {
            anyhow::bail!(
                "Embedding provider returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            );
        }
        Ok(embeddings)
    }
}

// ─── Google Generative Language ──────────────────────────

#[derive(Serialize)]
struct GoogleBatchRequest<'a> {
    requests: Vec<GoogleEmbedRequest<'a>>,
}

#[derive(Serialize)]
struct GoogleEmbedRequest<'a> {
    model: &'a str,
    content: GoogleContent<'a>,
}

#[derive(Serialize)]
struct GoogleContent<'a> {
    parts: [GooglePart<'a>; 1],
}

#[derive(Serialize)]
struct GooglePart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GoogleBatchResponse {
    embeddings: Vec<GoogleEmbedding>,
}

#[derive(Deserialize)]
struct GoogleEmbedding {
    values: Vec<f32>,
}

async fn embed_google(
    client: &reqwest::Client,
    config: &EmbeddingConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let url = format!(
        "{}/v1beta/{}:batchEmbedContents",
        config.base_url.trim_end_matches('/'),
        config.model
    );
    let api_key = config.api_key.as_deref().unwrap_or_default();

    // batchEmbedContents accepts at most 100 requests.
    let batch_size = 100;
    let mut all_embeddings = Vec::new();

    for chunk in texts.chunks(batch_size) {
        let req = GoogleBatchRequest {
            requests: chunk
                .iter()
                .map(|text| GoogleEmbedRequest {
                    model: &config.model,
                    content: GoogleContent {
                        parts: [GooglePart {
                            text: text.as_str(),
                        }],
                    },
                })
                .collect(),
        };

        let resp = client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&req)
            .send()
            .await
            .context("Failed to call Google embed API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Google embed API returned {status}: {body}");
        }

        let body: GoogleBatchResponse = resp
            .json()
            .await
            .context("Failed to parse Google embed response")?;

        all_embeddings.extend(body.embeddings.into_iter().map(|e| e.values));
    }

    Ok(all_embeddings)
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

async fn embed_ollama(
    client: &reqwest::Client,
    config: &EmbeddingConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let url = format!("{}/api/embed", config.base_url.trim_end_matches('/'));

    let batch_size = 32;
    let mut all_embeddings = Vec::new();

    for chunk in texts.chunks(batch_size) {
        let req = OllamaEmbedRequest {
            model: config.model.clone(),
            input: chunk.to_vec(),
            truncate: true,
        };

        let resp = client
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("Failed to call Ollama embed API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Ollama embed API returned {status}: {body}");
        }

        let body: OllamaEmbedResponse = resp
            .json()
            .await
            .context("Failed to parse Ollama embed response")?;

        all_embeddings.extend(body.embeddings);
    }

    Ok(all_embeddings)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    embedding: Vec<f32>,
}

async fn embed_openai(
    client: &reqwest::Client,
    config: &EmbeddingConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let url = format!("{}/v1/embeddings", config.base_url.trim_end_matches('/'));
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let batch_size = 64;
    let mut all_embeddings = Vec::new();

    for chunk in texts.chunks(batch_size) {
        let req = OpenAiEmbedRequest {
            model: config.model.clone(),
            input: chunk.to_vec(),
        };

        let resp = client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&req)
            .send()
            .await
            .context("Failed to call OpenAI embed API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI embed API returned {status}: {body}");
        }

        let body: OpenAiEmbedResponse = resp
            .json()
            .await
            .context("Failed to parse OpenAI embed response")?;

        all_embeddings.extend(body.data.into_iter().map(|d| d.embedding));
    }

    Ok(all_embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundary() {
        let text = "é".repeat(MAX_EMBED_CHARS);
        let cut = truncate_for_embedding(&text);
        assert!(cut.len() <= MAX_EMBED_CHARS);
        assert!(cut.chars().all(|c| c == 'é'));
        assert_eq!(truncate_for_embedding("short"), "short");
    }

    #[test]
    fn test_google_request_shape() {
        let req = GoogleBatchRequest {
            requests: vec![GoogleEmbedRequest {
                model: "models/text-embedding-004",
                content: GoogleContent {
                    parts: [GooglePart { text: "hello" }],
                },
            }],
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "requests": [{
                    "model": "models/text-embedding-004",
                    "content": {"parts": [{"text": "hello"}]}
                }]
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_provider_fails() {
        let config = EmbeddingConfig {
            provider: "nope".into(),
            ..EmbeddingConfig::default()
        };
        let embedder = HttpEmbedder::new(reqwest::Client::new(), config);
        assert!(embedder.embed_documents(&["x".to_string()]).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_input_skips_network() {
        let embedder = HttpEmbedder::new(reqwest::Client::new(), EmbeddingConfig::default());
        assert!(embedder.embed_documents(&[]).await.unwrap().is_empty());
    }
}
