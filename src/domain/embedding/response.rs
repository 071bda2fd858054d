//! Embedding response types

/// One vector of a provider response, tagged with its input position
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    index: usize,
    vector: Vec<f32>,
}

impl Embedding {
    pub fn new(index: usize, vector: Vec<f32>) -> Self {
        Self { index, vector }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    pub fn into_vector(self) -> Vec<f32> {
        self.vector
    }
}

/// Cosine similarity of two vectors of equal length.
///
/// Returns 0.0 when either vector is empty or has zero magnitude; callers
/// that must distinguish a dimension mismatch check lengths first.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Whether every component of the vector is zero (or it is empty)
pub fn is_zero_vector(v: &[f32]) -> bool {
    v.iter().all(|x| *x == 0.0)
}

/// Vectors returned for one request, in whatever order the provider sent them
#[derive(Debug, Clone)]
pub struct EmbeddingResponse {
    model: String,
    embeddings: Vec<Embedding>,
    total_tokens: Option<u32>,
}

impl EmbeddingResponse {
    pub fn new(model: impl Into<String>, embeddings: Vec<Embedding>) -> Self {
        Self {
            model: model.into(),
            embeddings,
            total_tokens: None,
        }
    }

    /// Token count, for providers that bill by it
    pub fn with_total_tokens(mut self, total_tokens: u32) -> Self {
        self.total_tokens = Some(total_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    pub fn first(&self) -> Option<&Embedding> {
        self.embeddings.first()
    }

    pub fn total_tokens(&self) -> Option<u32> {
        self.total_tokens
    }

    pub fn into_embeddings(self) -> Vec<Embedding> {
        self.embeddings
    }
}
