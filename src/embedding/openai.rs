use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::error::ApiError;
use crate::Config;

#[derive(Debug, Clone)]
pub struct EmbeddingOptions {
    api_key: String,
    url: String,
    model: String,
    batch: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [&'a str],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<Embed>,
}

#[derive(Debug, Deserialize)]
struct Embed {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingOptions {
    pub fn from_config(config: &Config) -> Self {
        EmbeddingOptions {
            api_key: config.openai_api_key.clone(),
            url: format!("{}/embeddings", config.openai_base_url.trim_end_matches('/')),
            model: config.embedding_model.clone(),
            batch: config.batch,
        }
    }
}

impl EmbeddingResponse {
    /// Vectors in input order; the API is free to return them shuffled.
    fn into_vectors(self, expected: usize) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut data = self.data;
        anyhow::ensure!(
            data.len() == expected,
            "Embedding API returned {} vectors for {} inputs",
            data.len(),
            expected
        );
        data.sort_by_key(|embed| embed.index);
        Ok(data.into_iter().map(|embed| embed.embedding).collect())
    }
}

pub struct EmbeddingClient {
    client: Client,
    options: EmbeddingOptions,
}

impl EmbeddingClient {
    pub fn new(options: EmbeddingOptions) -> Self {
        Self { client: Client::new(), options }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(EmbeddingOptions::from_config(config))
    }

    async fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            input: texts,
            model: &self.options.model,
        };
        debug!("Embedding {} texts with {}", texts.len(), self.options.model);

        let response = self.client
            .post(&self.options.url)
            .bearer_auth(&self.options.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to the embedding API")?;
        let response = ApiError::check(response).await?;

        response
            .json::<EmbeddingResponse>()
            .await
            .context("Failed to parse embedding API response")?
            .into_vectors(texts.len())
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.options.batch) {
            all_embeddings.extend(self.embed_batch(batch).await?);
        }
        Ok(all_embeddings)
    }
}
