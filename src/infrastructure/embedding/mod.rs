//! Embedding provider implementations

mod gemini;
mod openai;

pub use gemini::{GeminiEmbeddingProvider, DEFAULT_GEMINI_MODEL};
pub use openai::{OpenAiEmbeddingProvider, DEFAULT_OPENAI_MODEL};

pub use super::http_client::{HttpClient, HttpClientTrait};
