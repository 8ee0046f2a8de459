use async_trait::async_trait;

pub mod openai;

pub use openai::EmbeddingClient;

/// Turns texts into vectors, one per input and in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;
}
