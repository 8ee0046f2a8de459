use std::path::PathBuf;
use clap::{Parser, Subcommand};
use log::info;

use crate::chat::ChatClient;
use crate::document::chunk::TextSplitter;
use crate::session::Session;
use crate::vector_store::VectorStore;
use crate::Config;

mod document;
mod query;
mod write;

pub type DocSession = Session<VectorStore, ChatClient>;

#[derive(Parser)]
#[command(name = "docchat")]
#[command(about = "Ask questions about your PDF, DOCX, PPTX and TXT documents", version)]
pub struct Cli {
    /// Configuration file (defaults to ./config.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract, chunk and index documents, replacing the previous index
    Process {
        #[arg(help = "Files or directories", required = true)]
        paths: Vec<PathBuf>,

        #[arg(short, long, help = "Recurse into subdirectories")]
        recursive: bool,
    },

    /// Ask one question about the processed documents
    Ask {
        #[arg(help = "The question")]
        question: String,
    },

    /// Start an interactive chat session
    Chat {
        #[arg(help = "Files or directories to process before chatting")]
        paths: Vec<PathBuf>,

        #[arg(short, long, help = "Recurse into subdirectories")]
        recursive: bool,
    },

    /// Drop the document index
    Reset,
}

pub async fn handler(args: Cli, config: Config) -> anyhow::Result<()> {
    let mut session = open_session(&config).await?;

    match args.command {
        Command::Process { paths, recursive } => {
            document::process_paths(&mut session, &paths, recursive).await
        }
        Command::Ask { question } => query::ask_once(&mut session, &question).await,
        Command::Chat { paths, recursive } => {
            if !paths.is_empty() {
                document::process_paths(&mut session, &paths, recursive).await?;
            }
            query::handle_chat_session(&mut session).await
        }
        Command::Reset => document::reset(&mut session).await,
    }
}

async fn open_session(config: &Config) -> anyhow::Result<DocSession> {
    let store = VectorStore::from_config(config).await?;
    let chat = ChatClient::from_config(config);
    let splitter = TextSplitter::from_config(config)?;
    let mut session = Session::new(store, chat, splitter, config.n_results);
    if session.resume().await? {
        info!("Found an existing index in {}", config.collection_name);
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_process() {
        let cli = Cli::parse_from(["docchat", "--config", "my.toml", "process", "-r", "docs", "notes.txt"]);
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
        match cli.command {
            Command::Process { paths, recursive } => {
                assert!(recursive);
                assert_eq!(paths, vec![PathBuf::from("docs"), PathBuf::from("notes.txt")]);
            }
            _ => panic!("expected process"),
        }
    }

    #[test]
    fn test_process_requires_paths() {
        assert!(Cli::try_parse_from(["docchat", "process"]).is_err());
        assert!(Cli::try_parse_from(["docchat", "chat"]).is_ok());
    }
}
