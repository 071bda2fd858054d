//! Gemini embedding provider implementation

use async_trait::async_trait;
use serde::Deserialize;

use super::HttpClientTrait;
use crate::domain::embedding::{
    Embedding, EmbeddingInput, EmbeddingIntent, EmbeddingProvider, EmbeddingRequest,
    EmbeddingResponse,
};
use crate::domain::DomainError;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "text-embedding-004";

/// Title attached to document embeddings
const DOCUMENT_TITLE: &str = "Service Listing";

/// Known Gemini embedding models and their dimensions
const EMBEDDING_MODELS: &[(&str, usize)] = &[
    ("text-embedding-004", 768),
    ("gemini-embedding-001", 3072),
];

fn task_type(intent: EmbeddingIntent) -> &'static str {
    match intent {
        EmbeddingIntent::Document => "RETRIEVAL_DOCUMENT",
        EmbeddingIntent::Query => "RETRIEVAL_QUERY",
    }
}

/// Gemini embedding provider
#[derive(Debug)]
pub struct GeminiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
    model: String,
}

impl<C: HttpClientTrait> GeminiEmbeddingProvider<C> {
    /// Create a new Gemini embedding provider
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_GEMINI_BASE_URL)
    }

    /// Create a new provider with custom base URL
    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn model_path(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        }
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/{}:{}",
            self.base_url,
            Self::model_path(model),
            method
        )
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-goog-api-key", self.api_key.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn content_body(request: &EmbeddingRequest, text: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": Self::model_path(request.model()),
            "content": { "parts": [{ "text": text }] },
            "taskType": task_type(request.intent()),
        });

        if request.intent() == EmbeddingIntent::Document {
            body["title"] = serde_json::json!(DOCUMENT_TITLE);
        }

        if let Some(dims) = request.dimensions() {
            body["outputDimensionality"] = serde_json::json!(dims);
        }

        body
    }

    fn parse_error(e: serde_json::Error) -> DomainError {
        DomainError::provider("gemini", format!("Failed to parse embedding response: {}", e))
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for GeminiEmbeddingProvider<C> {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        let model = request.model().to_string();

        let embeddings = match request.input() {
            EmbeddingInput::Single(text) => {
                let body = Self::content_body(&request, text);
                let json = self
                    .client
                    .post_json(&self.url(&model, "embedContent"), self.headers(), &body)
                    .await?;

                let response: GeminiEmbedResponse =
                    serde_json::from_value(json).map_err(Self::parse_error)?;

                vec![Embedding::new(0, response.embedding.values)]
            }
            EmbeddingInput::Batch(texts) => {
                let requests: Vec<serde_json::Value> = texts
                    .iter()
                    .map(|text| Self::content_body(&request, text))
                    .collect();
                let body = serde_json::json!({ "requests": requests });

                let json = self
                    .client
                    .post_json(&self.url(&model, "batchEmbedContents"), self.headers(), &body)
                    .await?;

                let response: GeminiBatchEmbedResponse =
                    serde_json::from_value(json).map_err(Self::parse_error)?;

                if response.embeddings.len() != texts.len() {
                    return Err(DomainError::provider(
                        "gemini",
                        format!(
                            "Expected {} embeddings, received {}",
                            texts.len(),
                            response.embeddings.len()
                        ),
                    ));
                }

                response
                    .embeddings
                    .into_iter()
                    .enumerate()
                    .map(|(idx, values)| Embedding::new(idx, values.values))
                    .collect()
            }
        };

        Ok(EmbeddingResponse::new(model, embeddings))
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self, model: &str) -> Option<usize> {
        let name = model.trim_start_matches("models/");
        EMBEDDING_MODELS
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, dims)| *dims)
    }
}

// Gemini API types for embeddings

#[derive(Debug, Deserialize)]
struct GeminiValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbedResponse {
    embedding: GeminiValues,
}

#[derive(Debug, Deserialize)]
struct GeminiBatchEmbedResponse {
    embeddings: Vec<GeminiValues>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::mock::MockHttpClient;
    use crate::infrastructure::http_client::HttpClient;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SINGLE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:embedContent";
    const BATCH_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:batchEmbedContents";

    fn values(dimensions: usize) -> Vec<f32> {
        (0..dimensions).map(|i| i as f32 * 0.001).collect()
    }

    #[tokio::test]
    async fn test_document_request_shape() {
        let client = MockHttpClient::new().with_response(
            SINGLE_URL,
            serde_json::json!({ "embedding": { "values": values(768) } }),
        );
        let provider = GeminiEmbeddingProvider::new(client, "test-key");

        let request = EmbeddingRequest::single(DEFAULT_GEMINI_MODEL, "Math Tutor Algebra");
        let response = provider.embed(request).await.unwrap();

        assert_eq!(response.first().unwrap().dimensions(), 768);

        let requests = provider.client.requests();
        let (_, body) = &requests[0];
        assert_eq!(body["model"], "models/text-embedding-004");
        assert_eq!(body["taskType"], "RETRIEVAL_DOCUMENT");
        assert_eq!(body["title"], "Service Listing");
        assert_eq!(body["content"]["parts"][0]["text"], "Math Tutor Algebra");
    }

    #[tokio::test]
    async fn test_query_request_has_no_title() {
        let client = MockHttpClient::new().with_response(
            SINGLE_URL,
            serde_json::json!({ "embedding": { "values": values(4) } }),
        );
        let provider = GeminiEmbeddingProvider::new(client, "test-key");

        let request = EmbeddingRequest::single(DEFAULT_GEMINI_MODEL, "math tutor")
            .with_intent(EmbeddingIntent::Query)
            .with_dimensions(4);
        provider.embed(request).await.unwrap();

        let (_, body) = &provider.client.requests()[0];
        assert_eq!(body["taskType"], "RETRIEVAL_QUERY");
        assert!(body.get("title").is_none());
        assert_eq!(body["outputDimensionality"], 4);
    }

    #[tokio::test]
    async fn test_batch_request() {
        let client = MockHttpClient::new().with_response(
            BATCH_URL,
            serde_json::json!({ "embeddings": [{ "values": values(3) }, { "values": values(3) }] }),
        );
        let provider = GeminiEmbeddingProvider::new(client, "test-key");

        let request = EmbeddingRequest::batch(
            DEFAULT_GEMINI_MODEL,
            vec!["Plumber".into(), "Electrician".into()],
        );
        let response = provider.embed(request).await.unwrap();

        assert_eq!(response.embeddings().len(), 2);
        assert_eq!(response.embeddings()[1].index(), 1);

        let (_, body) = &provider.client.requests()[0];
        assert_eq!(body["requests"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_count_mismatch_is_error() {
        let client = MockHttpClient::new().with_response(
            BATCH_URL,
            serde_json::json!({ "embeddings": [{ "values": values(3) }] }),
        );
        let provider = GeminiEmbeddingProvider::new(client, "test-key");

        let request =
            EmbeddingRequest::batch(DEFAULT_GEMINI_MODEL, vec!["a".into(), "b".into()]);

        assert!(provider.embed(request).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_response_is_error() {
        let client = MockHttpClient::new()
            .with_response(SINGLE_URL, serde_json::json!({ "unexpected": true }));
        let provider = GeminiEmbeddingProvider::new(client, "test-key");

        let result = provider
            .embed(EmbeddingRequest::single(DEFAULT_GEMINI_MODEL, "Hello"))
            .await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_embed_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/text-embedding-004:embedContent"))
            .and(header("x-goog-api-key", "secret"))
            .and(body_partial_json(serde_json::json!({ "taskType": "RETRIEVAL_QUERY" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "embedding": { "values": [0.1, 0.2, 0.3] } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = GeminiEmbeddingProvider::with_base_url(HttpClient::new(), "secret", server.uri());
        let request = EmbeddingRequest::single(DEFAULT_GEMINI_MODEL, "yoga classes")
            .with_intent(EmbeddingIntent::Query);

        let response = provider.embed(request).await.unwrap();

        assert_eq!(response.first().unwrap().vector(), &[0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_http_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = GeminiEmbeddingProvider::with_base_url(HttpClient::new(), "secret", server.uri());
        let result = provider
            .embed(EmbeddingRequest::single(DEFAULT_GEMINI_MODEL, "yoga"))
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_provider_info() {
        let provider = GeminiEmbeddingProvider::new(MockHttpClient::new(), "k");

        assert_eq!(provider.provider_name(), "gemini");
        assert_eq!(provider.model(), "text-embedding-004");
        assert_eq!(provider.dimensions("text-embedding-004"), Some(768));
        assert_eq!(provider.dimensions("models/text-embedding-004"), Some(768));
        assert_eq!(provider.dimensions("unknown"), None);
    }
}
