//! Embedding service that never fails its caller
//!
//! Wraps an optional [`EmbeddingProvider`]. Every failure path (disabled
//! provider, blank text, remote error, timeout, wrong dimension) yields the
//! zero vector of the configured dimension and is logged instead.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::embedding::{EmbeddingIntent, EmbeddingProvider, EmbeddingRequest};
use crate::domain::DomainError;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;
pub const DEFAULT_EMBEDDING_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Whether an embedding provider is available to this process
#[derive(Debug, Clone)]
pub enum EmbeddingCapability {
    Disabled,
    Active(Arc<dyn EmbeddingProvider>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Ready,
    Disabled,
}

/// Description of the embedding model in use
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub provider: String,
    pub embedding_dimension: usize,
    pub status: ModelStatus,
}

#[derive(Debug, Clone)]
pub struct EmbeddingService {
    capability: EmbeddingCapability,
    dimensions: usize,
    timeout: Duration,
}

impl EmbeddingService {
    pub fn new(capability: EmbeddingCapability, dimensions: usize) -> Self {
        Self {
            capability,
            dimensions,
            timeout: DEFAULT_EMBEDDING_TIMEOUT,
        }
    }

    pub fn disabled(dimensions: usize) -> Self {
        Self::new(EmbeddingCapability::Disabled, dimensions)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.capability, EmbeddingCapability::Active(_))
    }

    fn zero_vector(&self) -> Vec<f32> {
        vec![0.0; self.dimensions]
    }

    /// Embeds a single text; the zero vector on any failure
    pub async fn embed(&self, text: &str, intent: EmbeddingIntent) -> Vec<f32> {
        let EmbeddingCapability::Active(provider) = &self.capability else {
            return self.zero_vector();
        };

        let text = text.trim();
        if text.is_empty() {
            return self.zero_vector();
        }

        let request = EmbeddingRequest::single(provider.model(), text)
            .with_intent(intent)
            .with_dimensions(self.dimensions);

        match self.request_vectors(provider.as_ref(), request, 1).await {
            Ok(mut vectors) => vectors.pop().unwrap_or_else(|| self.zero_vector()),
            Err(e) => {
                warn!(provider = provider.provider_name(), intent = %intent, error = %e, "Embedding failed, using zero vector");
                self.zero_vector()
            }
        }
    }

    pub async fn embed_document(&self, text: &str) -> Vec<f32> {
        self.embed(text, EmbeddingIntent::Document).await
    }

    pub async fn embed_query(&self, text: &str) -> Vec<f32> {
        self.embed(text, EmbeddingIntent::Query).await
    }

    /// Embeds many documents in one provider call.
    ///
    /// The output is positionally aligned with `texts`; blank texts and a
    /// failed batch yield zero vectors.
    pub async fn embed_documents(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let mut vectors = vec![self.zero_vector(); texts.len()];

        let EmbeddingCapability::Active(provider) = &self.capability else {
            return vectors;
        };

        let (positions, batch): (Vec<usize>, Vec<String>) = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| (i, text.trim().to_string()))
            .unzip();

        if batch.is_empty() {
            return vectors;
        }

        let expected = batch.len();
        let request = EmbeddingRequest::batch(provider.model(), batch)
            .with_intent(EmbeddingIntent::Document)
            .with_dimensions(self.dimensions);

        match self.request_vectors(provider.as_ref(), request, expected).await {
            Ok(embedded) => {
                for (position, vector) in positions.into_iter().zip(embedded) {
                    vectors[position] = vector;
                }
            }
            Err(e) => {
                warn!(provider = provider.provider_name(), count = expected, error = %e, "Batch embedding failed, using zero vectors");
            }
        }

        vectors
    }

    async fn request_vectors(
        &self,
        provider: &dyn EmbeddingProvider,
        request: EmbeddingRequest,
        expected: usize,
    ) -> Result<Vec<Vec<f32>>, DomainError> {
        let response = tokio::time::timeout(self.timeout, provider.embed(request))
            .await
            .map_err(|_| {
                DomainError::provider(
                    provider.provider_name(),
                    format!("Embedding timed out after {:?}", self.timeout),
                )
            })??;

        if let Some(total_tokens) = response.total_tokens() {
            debug!(total_tokens, "Embedding usage");
        }

        let mut embeddings = response.into_embeddings();
        if embeddings.len() != expected {
            return Err(DomainError::provider(
                provider.provider_name(),
                format!("Expected {} embeddings, got {}", expected, embeddings.len()),
            ));
        }
        embeddings.sort_by_key(|e| e.index());

        embeddings
            .into_iter()
            .map(|embedding| {
                if embedding.dimensions() != self.dimensions {
                    return Err(DomainError::provider(
                        provider.provider_name(),
                        format!(
                            "Expected {} dimensions, got {}",
                            self.dimensions,
                            embedding.dimensions()
                        ),
                    ));
                }
                Ok(embedding.into_vector())
            })
            .collect()
    }

    pub fn model_info(&self) -> ModelInfo {
        match &self.capability {
            EmbeddingCapability::Active(provider) => ModelInfo {
                model_name: provider.model().to_string(),
                provider: provider.provider_name().to_string(),
                embedding_dimension: self.dimensions,
                status: ModelStatus::Ready,
            },
            EmbeddingCapability::Disabled => ModelInfo {
                model_name: "none".to_string(),
                provider: "none".to_string(),
                embedding_dimension: self.dimensions,
                status: ModelStatus::Disabled,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::is_zero_vector;
    use crate::domain::embedding::MockEmbeddingProvider;

    fn service(provider: MockEmbeddingProvider) -> (EmbeddingService, Arc<MockEmbeddingProvider>) {
        let provider = Arc::new(provider);
        let service = EmbeddingService::new(EmbeddingCapability::Active(provider.clone()), 4);
        (service, provider)
    }

    #[tokio::test]
    async fn test_embed_returns_provider_vector() {
        let (service, provider) = service(
            MockEmbeddingProvider::new("mock", 4).with_vector("math tutor", vec![1.0, 0.0, 0.0, 0.0]),
        );

        let vector = service.embed_query("  math tutor ").await;

        assert_eq!(vector, vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_disabled_returns_zero_vector() {
        let service = EmbeddingService::disabled(768);

        let vector = service.embed_document("plumber").await;

        assert_eq!(vector.len(), 768);
        assert!(is_zero_vector(&vector));
        assert_eq!(service.model_info().status, ModelStatus::Disabled);
    }

    #[tokio::test]
    async fn test_blank_input_skips_provider() {
        let (service, provider) = service(MockEmbeddingProvider::new("mock", 4));

        assert!(is_zero_vector(&service.embed_query("   ").await));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_error_returns_zero_vector() {
        let (service, provider) = service(MockEmbeddingProvider::new("mock", 4).with_error("quota"));

        let vector = service.embed_query("plumber").await;

        assert_eq!(vector, vec![0.0; 4]);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_returns_zero_vector() {
        let (service, _) =
            service(MockEmbeddingProvider::new("mock", 4).with_delay(Duration::from_millis(200)));
        let service = service.with_timeout(Duration::from_millis(20));

        assert!(is_zero_vector(&service.embed_query("plumber").await));
    }

    #[tokio::test]
    async fn test_wrong_dimension_returns_zero_vector() {
        let (service, _) = service(
            MockEmbeddingProvider::new("mock", 4).with_vector("plumber", vec![1.0, 2.0]),
        );

        assert_eq!(service.embed_query("plumber").await, vec![0.0; 4]);
    }

    #[tokio::test]
    async fn test_embed_documents_aligns_with_input() {
        let (service, provider) = service(
            MockEmbeddingProvider::new("mock", 4)
                .with_vector("a", vec![1.0, 0.0, 0.0, 0.0])
                .with_vector("b", vec![0.0, 1.0, 0.0, 0.0]),
        );

        let vectors = service
            .embed_documents(&["a".to_string(), " ".to_string(), "b".to_string()])
            .await;

        assert_eq!(vectors[0], vec![1.0, 0.0, 0.0, 0.0]);
        assert!(is_zero_vector(&vectors[1]));
        assert_eq!(vectors[2], vec![0.0, 1.0, 0.0, 0.0]);
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_model_info_ready() {
        let (service, _) = service(MockEmbeddingProvider::new("mock", 4));

        let info = service.model_info();

        assert_eq!(info.model_name, "mock-embedding");
        assert_eq!(info.provider, "mock");
        assert_eq!(info.embedding_dimension, 4);
        assert_eq!(info.status, ModelStatus::Ready);
    }
}
