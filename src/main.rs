use std::path::Path;

use clap::Parser;
use dotenv::dotenv;
use handler::Cli;
use serde::{Deserialize, Serialize};

use document::chunk::SplitStrategy;

mod handler;
mod document;
mod embedding;
mod chat;
mod error;
mod session;
mod vector_store;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    let config = read_config(args.config.as_deref())?;
    if let Err(err) = config.check_api_key() {
        eprintln!("{}", err);
        std::process::exit(1);
    }
    handler::handler(args, config).await?;
    Ok(())
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    // OpenAI
    openai_api_key: String,
    openai_base_url: String,
    embedding_model: String,
    chat_model: String,
    temperature: f32,

    // Vector database
    chroma_url: String,
    collection_name: String,

    // Chunk
    chunk_size: usize,
    chunk_overlap: usize,
    chunk_strategy: SplitStrategy,

    // Query
    n_results: usize,

    // Embedding
    batch: usize,
}

impl Config {
    pub fn check_api_key(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.openai_api_key.trim().is_empty(),
            "OPENAI_API_KEY not found in environment variables."
        );
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be greater than zero");
        anyhow::ensure!(
            self.chunk_overlap < self.chunk_size,
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            self.chunk_overlap,
            self.chunk_size
        );
        anyhow::ensure!(self.n_results > 0, "n_results must be greater than zero");
        anyhow::ensure!(self.batch > 0, "batch must be greater than zero");
        Ok(())
    }
}

/// Layers: built-in defaults, `config.toml` (or `path`), `DOCCHAT_*` env vars, `OPENAI_API_KEY`.
fn read_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("config").required(false),
    };

    let config = config::Config::builder()
        .set_default("openai_api_key", "")?
        .set_default("openai_base_url", "https://api.openai.com/v1")?
        .set_default("embedding_model", "text-embedding-ada-002")?
        .set_default("chat_model", "gpt-3.5-turbo")?
        .set_default("temperature", 0.0)?
        .set_default("chroma_url", "http://localhost:8000")?
        .set_default("collection_name", "rag_chatbot_collection")?
        .set_default("chunk_size", 10000)?
        .set_default("chunk_overlap", 1000)?
        .set_default("chunk_strategy", "recursive")?
        .set_default("n_results", 5)?
        .set_default("batch", 64)?
        .add_source(file)
        .add_source(config::Environment::with_prefix("DOCCHAT").try_parsing(true))
        .set_override_option("openai_api_key", std::env::var("OPENAI_API_KEY").ok())?
        .build()?
        .try_deserialize::<Config>()?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        openai_api_key: "sk-test".to_string(),
        openai_base_url: "http://127.0.0.1:9/v1".to_string(),
        embedding_model: "text-embedding-ada-002".to_string(),
        chat_model: "gpt-3.5-turbo".to_string(),
        temperature: 0.0,
        chroma_url: "http://127.0.0.1:9".to_string(),
        collection_name: "test_collection".to_string(),
        chunk_size: 100,
        chunk_overlap: 10,
        chunk_strategy: SplitStrategy::Recursive,
        n_results: 5,
        batch: 8,
    }
}
