//! LLM trait definitions

use crate::error::Result;
use crate::llm::ChatRequest;
use async_trait::async_trait;

/// Embedding generation trait
///
/// The external embedding primitive the index is built around. The crate
/// ships an HTTP implementation; tests substitute a deterministic stub.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// A single external model backend able to answer one chat request.
///
/// Implementations must contain their own transport failures inside the
/// returned `Result`; the invoker treats any error as grounds to try the
/// next provider in the chain.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send one request and return the generated text
    async fn invoke(&self, request: &ChatRequest) -> Result<String>;

    /// Stable identifier, e.g. `openrouter/x-ai/grok-4.1-fast:free`
    fn id(&self) -> &str;
}
