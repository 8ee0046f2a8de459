use anyhow::Context;
use async_trait::async_trait;
use chromadb::client::{ChromaAuthMethod, ChromaClient, ChromaClientOptions};
use chromadb::collection::{CollectionEntries, QueryOptions, QueryResult};
use log::{debug, info};
use serde_json::{map::Map, Value};

use crate::document::chunk::Chunk;
use crate::embedding::{Embedder, EmbeddingClient};
use crate::Config;

/// A retrieved chunk. `score` is `1 - cosine distance`, higher is more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub content: String,
    pub score: f32,
}

/// The single chunk collection a session answers from.
#[async_trait]
pub trait ChunkIndex: Send + Sync {
    /// Drops whatever was indexed before and indexes `chunks`. Returns the number indexed.
    async fn rebuild(&self, chunks: &[Chunk]) -> anyhow::Result<usize>;

    async fn is_built(&self) -> anyhow::Result<bool>;

    /// The `k` most similar chunks to `query`, best first.
    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<ScoredChunk>>;

    /// Returns false when there was nothing to drop.
    async fn drop_index(&self) -> anyhow::Result<bool>;
}

/// Nearest neighbours of one query, in the order the database returned them.
#[derive(Debug, Clone, Default)]
pub struct Neighbours {
    pub documents: Vec<String>,
    pub distances: Vec<f32>,
}

/// The collection operations of a vector database.
#[async_trait]
pub trait CollectionBackend: Send + Sync {
    async fn collection_names(&self) -> anyhow::Result<Vec<String>>;

    async fn delete_collection(&self, name: &str) -> anyhow::Result<()>;

    async fn create_collection(&self, name: &str, metadata: Map<String, Value>) -> anyhow::Result<()>;

    async fn add(
        &self,
        name: &str,
        ids: &[String],
        documents: &[&str],
        embeddings: Vec<Vec<f32>>,
    ) -> anyhow::Result<()>;

    async fn query(&self, name: &str, embedding: Vec<f32>, k: usize) -> anyhow::Result<Neighbours>;
}

#[async_trait]
impl CollectionBackend for ChromaClient {
    async fn collection_names(&self) -> anyhow::Result<Vec<String>> {
        let collections = self.list_collections().await?;
        Ok(collections.iter().map(|coll| coll.name().to_string()).collect())
    }

    async fn delete_collection(&self, name: &str) -> anyhow::Result<()> {
        ChromaClient::delete_collection(self, name).await?;
        Ok(())
    }

    async fn create_collection(&self, name: &str, metadata: Map<String, Value>) -> anyhow::Result<()> {
        self.get_or_create_collection(name, Some(metadata)).await?;
        Ok(())
    }

    async fn add(
        &self,
        name: &str,
        ids: &[String],
        documents: &[&str],
        embeddings: Vec<Vec<f32>>,
    ) -> anyhow::Result<()> {
        let collection = self.get_collection(name).await?;
        let entries = CollectionEntries {
            ids: ids.iter().map(|s| s.as_str()).collect(),
            metadatas: None,
            documents: Some(documents.to_vec()),
            embeddings: Some(embeddings),
        };
        collection.add(entries, None).await?;
        Ok(())
    }

    async fn query(&self, name: &str, embedding: Vec<f32>, k: usize) -> anyhow::Result<Neighbours> {
        let collection = self.get_collection(name)
            .await
            .with_context(|| format!("Collection {} not found", name))?;
        let query = QueryOptions {
            query_texts: None,
            query_embeddings: Some(vec![embedding]),
            n_results: Some(k),
            ..Default::default()
        };
        let query_result = collection.query(query, None).await?;
        Ok(neighbours(query_result))
    }
}

fn neighbours(result: QueryResult) -> Neighbours {
    let documents = result.documents
        .and_then(|docs| docs.into_iter().next())
        .unwrap_or_default();
    let distances = result.distances
        .and_then(|dists| dists.into_iter().next())
        .unwrap_or_default();
    Neighbours { documents, distances }
}

pub struct VectorStore<B = ChromaClient, E = EmbeddingClient> {
    backend: B,
    embedder: E,
    collection_name: String,
    batch: usize,
}

impl VectorStore {
    pub async fn from_config(config: &Config) -> anyhow::Result<VectorStore> {
        let auth = ChromaAuthMethod::None;
        let client = ChromaClient::new(
            ChromaClientOptions { url: Some(config.chroma_url.clone()), auth, ..Default::default() }
        ).await.with_context(|| format!("Database Connection Failed: {}", config.chroma_url))?;
        let embedder = EmbeddingClient::from_config(config);
        Ok(VectorStore::new(client, embedder, config.collection_name.clone(), config.batch))
    }
}

impl<B: CollectionBackend, E: Embedder> VectorStore<B, E> {
    /// `batch` bounds how many chunks go into one embedding call and one add.
    pub fn new(backend: B, embedder: E, collection_name: impl Into<String>, batch: usize) -> Self {
        Self { backend, embedder, collection_name: collection_name.into(), batch: batch.max(1) }
    }

    async fn collection_exists(&self) -> anyhow::Result<bool> {
        let names = self.backend.collection_names().await?;
        Ok(names.iter().any(|name| *name == self.collection_name))
    }

    async fn create_collection(&self) -> anyhow::Result<()> {
        let mut metadata = Map::new();
        metadata.insert("hnsw:space".to_string(), Value::String("cosine".to_string()));
        self.backend
            .create_collection(&self.collection_name, metadata)
            .await
            .with_context(|| format!("Cannot create collection {}", self.collection_name))
    }
}

#[async_trait]
impl<B: CollectionBackend, E: Embedder> ChunkIndex for VectorStore<B, E> {
    async fn rebuild(&self, chunks: &[Chunk]) -> anyhow::Result<usize> {
        self.drop_index().await?;
        self.create_collection().await?;

        for (n, batch) in chunks.chunks(self.batch).enumerate() {
            let documents: Vec<&str> = batch.iter().map(|chunk| chunk.content.as_str()).collect();
            let embeddings = self.embedder
                .embed(&documents)
                .await
                .context("Failed to embed document chunks")?;

            let first = n * self.batch;
            let ids: Vec<String> = (first..first + batch.len()).map(|i| format!("chunk-{}", i)).collect();
            self.backend
                .add(&self.collection_name, &ids, &documents, embeddings)
                .await
                .with_context(|| format!("Cannot add chunks {}..{} to {}", first, first + batch.len(), self.collection_name))?;
            debug!("Added {} chunks to {}", batch.len(), self.collection_name);
        }

        info!("Indexed {} chunks into {}", chunks.len(), self.collection_name);
        Ok(chunks.len())
    }

    async fn is_built(&self) -> anyhow::Result<bool> {
        self.collection_exists().await
    }

    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<ScoredChunk>> {
        let embedding = self.embedder
            .embed(&[query])
            .await
            .context("Failed to embed the question")?
            .into_iter()
            .next()
            .context("Embedding API returned no vector for the question")?;

        let found = self.backend.query(&self.collection_name, embedding, k).await?;
        let results = rank(found.documents, &found.distances);
        debug!("Retrieved {} chunks", results.len());
        Ok(results)
    }

    async fn drop_index(&self) -> anyhow::Result<bool> {
        if !self.collection_exists().await? {
            return Ok(false);
        }
        self.backend.delete_collection(&self.collection_name).await
            .with_context(|| format!("Cannot remove {}", self.collection_name))?;
        info!("Dropped collection {}", self.collection_name);
        Ok(true)
    }
}

/// Pairs documents with their distances and orders them by descending score.
fn rank(documents: Vec<String>, distances: &[f32]) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = documents
        .into_iter()
        .enumerate()
        .map(|(i, content)| ScoredChunk {
            content,
            score: distances.get(i).map(|d| 1.0 - d).unwrap_or(0.0),
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored
}
