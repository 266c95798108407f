use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// A filled system + user prompt pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

impl ChatPrompt {
    /// Plain-text rendering, as written to the prompt log.
    pub fn to_log_string(&self) -> String {
        format!("System: {}\nHuman: {}", self.system, self.user)
    }
}

/// Single-turn, non-streaming chat completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, prompt: &ChatPrompt) -> Result<String>;
}

/// Chat over HTTP: Anthropic Messages, Ollama, or any OpenAI-compatible
/// endpoint.
pub struct HttpChatModel {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpChatModel {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn invoke(&self, prompt: &ChatPrompt) -> Result<String> {
        tracing::info!(
            "Invoking {} model {} ({} prompt chars)",
            self.config.provider,
            self.config.chat_model,
            prompt.system.len() + prompt.user.len()
        );
        match self.config.provider.as_str() {
            "anthropic" => call_anthropic(&self.client, &self.config, prompt).await,
            "ollama" => call_ollama(&self.client, &self.config, prompt).await,
            "openai" => call_openai(&self.client, &self.config, prompt).await,
            other => anyhow::bail!("Unknown LLM provider: {other}"),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

impl Message {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

// ─── Anthropic ───────────────────────────────────────────

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

async fn call_anthropic(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &ChatPrompt,
) -> Result<String> {
    let url = format!("{}/v1/messages", config.base_url.trim_end_matches('/'));
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = AnthropicRequest {
        model: &config.chat_model,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        system: &prompt.system,
        messages: vec![Message::new("user", &prompt.user)],
    };

    let resp = client
        .post(&url)
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .json(&req)
        .send()
        .await
        .context("Failed to call Anthropic messages API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Anthropic messages API returned {status}: {body}");
    }

    let body: AnthropicResponse = resp
        .json()
        .await
        .context("Failed to parse Anthropic response")?;
    Ok(join_text_blocks(body.content))
}

fn join_text_blocks(blocks: Vec<AnthropicBlock>) -> String {
    blocks
        .into_iter()
        .filter(|b| b.kind == "text")
        .map(|b| b.text)
        .collect::<Vec<_>>()
        .join("")
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Message,
}

async fn call_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &ChatPrompt,
) -> Result<String> {
    let url = format!("{}/api/chat", config.base_url.trim_end_matches('/'));

    let req = OllamaChatRequest {
        model: config.chat_model.clone(),
        messages: vec![
            Message::new("system", &prompt.system),
            Message::new("user", &prompt.user),
        ],
        stream: false,
        options: OllamaOptions {
            temperature: config.temperature,
        },
    };

    let resp = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .context("Failed to call Ollama chat API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama chat API returned {status}: {body}");
    }

    let body: OllamaChatResponse = resp.json().await?;
    Ok(body.message.content)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: Message,
}

async fn call_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &ChatPrompt,
) -> Result<String> {
    let url = format!("{}/v1/chat/completions", config.base_url.trim_end_matches('/'));
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiChatRequest {
        model: config.chat_model.clone(),
        messages: vec![
            Message::new("system", &prompt.system),
            Message::new("user", &prompt.user),
        ],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .context("Failed to call OpenAI chat API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI chat API returned {status}: {body}");
    }

    let body: OpenAiChatResponse = resp.json().await?;
    body.choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .context("OpenAI chat API returned no choices")
}
