use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod openai;
pub mod prompt;

pub use openai::ChatClient;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Talk {
    pub role: Role,
    pub content: String,
    /// When the message entered the conversation. Never sent to the API.
    #[serde(skip, default = "Utc::now")]
    pub at: DateTime<Utc>,
}

impl Talk {
    pub fn new(role: Role, content: String) -> Self {
        Self { role, content, at: Utc::now() }
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[Talk]) -> anyhow::Result<String>;
}
