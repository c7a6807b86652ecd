//! OpenAI-compatible `/embeddings` and `/chat/completions` clients.

use std::time::Duration;

use async_trait::async_trait;
use pdfield_core::models::config::FallbackConfig;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatBackend, EmbeddingBackend};
use crate::{RagError, Result};

/// Inputs per `/embeddings` request.
const EMBED_BATCH_SIZE: usize = 256;

/// Connection settings shared by both clients.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API base, e.g. `https://api.openai.com/v1`.
    pub api_base: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::Configuration("API key required".to_string()));
        }
        Ok(Self {
            api_base: api_base.into(),
            api_key,
            timeout,
        })
    }

    /// Settings from the fallback section, with the key taken from the
    /// configuration or the environment.
    pub fn from_fallback(config: &FallbackConfig) -> Result<Self> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            RagError::Configuration(format!(
                "no API key configured and {} is not set",
                pdfield_core::models::config::API_KEY_ENV
            ))
        })?;
        Self::new(&config.api_base, api_key, Duration::from_secs(config.timeout_secs))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| RagError::Configuration(format!("invalid API key: {}", e)))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// HTTP plumbing shared by the embedding and chat clients.
#[derive(Debug, Clone)]
struct ApiClient {
    config: OpenAiConfig,
    client: Client,
}

impl ApiClient {
    fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// POST `body` to `path`; non-2xx statuses become `on_error(message)`.
    async fn post<Req, Resp>(&self, path: &str, body: &Req, on_error: fn(String) -> RagError) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.config.url(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.config.headers()?)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(on_error(format!("HTTP {}: {}", status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| on_error(format!("invalid response body: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingResponse {
    /// Vectors in request order; `expected` must match the number of inputs.
    fn into_ordered(mut self, expected: usize) -> Result<Vec<Vec<f32>>> {
        if self.data.len() != expected {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                expected,
                self.data.len()
            )));
        }
        self.data.sort_by_key(|d| d.index);
        Ok(self.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Embedding client.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    api: ApiClient,
    model: String,
}

impl OpenAiEmbeddings {
    pub fn new(config: OpenAiConfig, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiEmbeddings {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let request = EmbeddingRequest {
                model: &self.model,
                input: batch,
            };
            let response: EmbeddingResponse = self.api.post("embeddings", &request, RagError::Embedding).await?;
            embeddings.extend(response.into_ordered(batch.len())?);
        }
        debug!("Embedded {} text(s) with {}", texts.len(), self.model);
        Ok(embeddings)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RagError::Chat("no content in response".to_string()))
    }
}

/// Chat completion client.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    api: ApiClient,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiChat {
    pub fn new(config: OpenAiConfig, model: impl Into<String>, temperature: Option<f32>) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
            model: model.into(),
            temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = self.request(prompt);
        let response: ChatResponse = self.api.post("chat/completions", &request, RagError::Chat).await?;
        response.into_text()
    }
}
