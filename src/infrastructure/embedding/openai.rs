//! OpenAI-compatible embedding provider
//!
//! Works against any `/v1/embeddings` endpoint (OpenAI, Azure proxies,
//! local servers). The endpoint has no notion of document versus query
//! intent, so both are sent identically.

use async_trait::async_trait;
use serde::Deserialize;

use super::HttpClientTrait;
use crate::domain::embedding::{
    Embedding, EmbeddingInput, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse,
};
use crate::domain::DomainError;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

/// Native vector sizes; the `dimensions` parameter can only shrink them
const NATIVE_DIMENSIONS: &[(&str, usize)] = &[
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
];

#[derive(Debug)]
pub struct OpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    bearer: String,
    endpoint: String,
    model: String,
}

impl<C: HttpClientTrait> OpenAiEmbeddingProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            bearer: format!("Bearer {}", api_key.into()),
            endpoint: format!("{}/v1/embeddings", base_url.into().trim_end_matches('/')),
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn body(request: &EmbeddingRequest) -> serde_json::Value {
        let mut body = match request.input() {
            EmbeddingInput::Single(text) => {
                serde_json::json!({ "model": request.model(), "input": text })
            }
            EmbeddingInput::Batch(texts) => {
                serde_json::json!({ "model": request.model(), "input": texts })
            }
        };

        if let Some(dims) = request.dimensions() {
            body["dimensions"] = serde_json::json!(dims);
        }

        body
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OpenAiEmbeddingProvider<C> {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        let headers = vec![
            ("Authorization", self.bearer.as_str()),
            ("Content-Type", "application/json"),
        ];

        let json = self
            .client
            .post_json(&self.endpoint, headers, &Self::body(&request))
            .await?;

        let parsed: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("openai", format!("Failed to parse embedding response: {}", e))
        })?;

        Ok(parsed.into())
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self, model: &str) -> Option<usize> {
        NATIVE_DIMENSIONS
            .iter()
            .find(|(name, _)| *name == model)
            .map(|(_, dims)| *dims)
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    data: Vec<OpenAiVector>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiVector {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    total_tokens: u32,
}

impl From<OpenAiResponse> for EmbeddingResponse {
    fn from(parsed: OpenAiResponse) -> Self {
        let embeddings = parsed
            .data
            .into_iter()
            .map(|v| Embedding::new(v.index, v.embedding))
            .collect();

        let response = EmbeddingResponse::new(parsed.model, embeddings);
        match parsed.usage {
            Some(usage) => response.with_total_tokens(usage.total_tokens),
            None => response,
        }
    }
}
