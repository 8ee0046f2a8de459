//! One user's conversation with the processed documents.
//!
//! A session owns the chunk index handle and the conversation history. Processing
//! new documents replaces the index wholesale and clears the history; asking appends
//! the question and the reply (answer, warning or error) to the history.

use log::{error, info};

use crate::chat::prompt::build_prompt;
use crate::chat::{ChatModel, Role, Talk};
use crate::document::chunk::TextSplitter;
use crate::document::{get_text_from_documents, UploadedDocument};
use crate::error::is_auth_error;
use crate::vector_store::ChunkIndex;

pub const NO_DOCUMENTS: &str = "Please upload at least one file.";
pub const PROCESS_DONE: &str = "Done! You can now ask questions about your documents.";
pub const NOT_PROCESSED: &str = "Please upload and process your documents first.";
pub const AUTH_FAILED: &str =
    "Authentication Error: Please check your OpenAI API key. It might be invalid or expired.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Success,
    Answer,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub message: String,
}

impl Reply {
    fn new(kind: ReplyKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

pub struct Session<I, C> {
    index: I,
    chat: C,
    splitter: TextSplitter,
    n_results: usize,
    ready: bool,
    messages: Vec<Talk>,
}

impl<I: ChunkIndex, C: ChatModel> Session<I, C> {
    pub fn new(index: I, chat: C, splitter: TextSplitter, n_results: usize) -> Self {
        Self { index, chat, splitter, n_results, ready: false, messages: Vec::new() }
    }

    /// Marks the session ready when a previous run already built the index.
    pub async fn resume(&mut self) -> anyhow::Result<bool> {
        self.ready = self.index.is_built().await?;
        Ok(self.ready)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn history(&self) -> &[Talk] {
        &self.messages
    }

    pub fn clear_history(&mut self) {
        self.messages.clear();
    }

    /// Rebuilds the index from `docs` and starts a fresh conversation.
    pub async fn process(&mut self, docs: &[UploadedDocument]) -> anyhow::Result<Reply> {
        if docs.is_empty() {
            return Ok(Reply::new(ReplyKind::Warning, NO_DOCUMENTS));
        }

        let raw_text = get_text_from_documents(docs)?;
        let chunks = self.splitter.split(&raw_text);
        info!("Split {} documents into {} chunks", docs.len(), chunks.len());

        self.ready = false;
        self.index.rebuild(&chunks).await?;
        self.ready = true;
        self.messages.clear();

        Ok(Reply::new(ReplyKind::Success, PROCESS_DONE))
    }

    /// Answers `question` from the index. Failures become the reply rather than an error.
    pub async fn ask(&mut self, question: &str) -> Reply {
        self.messages.push(Talk::new(Role::User, question.to_string()));

        let reply = if !self.ready {
            Reply::new(ReplyKind::Warning, NOT_PROCESSED)
        } else {
            match self.answer(question).await {
                Ok(answer) => Reply::new(ReplyKind::Answer, answer),
                Err(err) if is_auth_error(&err) => {
                    error!("{:#}", err);
                    Reply::new(ReplyKind::Error, AUTH_FAILED)
                }
                Err(err) => {
                    error!("{:#}", err);
                    Reply::new(ReplyKind::Error, format!("An unexpected error occurred: {:#}", err))
                }
            }
        };

        self.messages.push(Talk::new(Role::Assistant, reply.message.clone()));
        reply
    }

    /// Drops the index. The session needs processing again afterwards.
    pub async fn reset(&mut self) -> anyhow::Result<bool> {
        let dropped = self.index.drop_index().await?;
        self.ready = false;
        self.messages.clear();
        Ok(dropped)
    }

    async fn answer(&self, question: &str) -> anyhow::Result<String> {
        let chunks = self.index.search(question, self.n_results).await?;
        let prompt = build_prompt(question, &chunks);
        self.chat.complete(&[Talk::new(Role::User, prompt)]).await
    }
}
