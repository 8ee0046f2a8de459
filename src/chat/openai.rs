use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatModel, Talk};
use crate::error::ApiError;
use crate::Config;

pub struct ChatClient {
    client: Client,
    api_key: String,
    model: String,
    url: String,
    temperature: f32,
}

impl ChatClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.openai_api_key.clone(),
            model: config.chat_model.clone(),
            url: format!("{}/chat/completions", config.openai_base_url.trim_end_matches('/')),
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, messages: &[Talk]) -> anyhow::Result<String> {
        let request = ChatRequest {
            messages,
            model: &self.model,
            temperature: self.temperature,
        };
        debug!("Requesting completion from {} with {} messages", self.model, messages.len());

        let response = self.client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .with_context(|| "Failed to send request to the chat API")?;
        let response = ApiError::check(response).await?;

        let response_body: ChatResponse = response
            .json()
            .await
            .with_context(|| "Failed to parse chat API response")?;

        response_body.into_content()
    }
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    messages: &'a [Talk],
    model: &'a str,
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: Talk,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
}

impl ChatResponse {
    fn into_content(self) -> anyhow::Result<String> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ApiError::EmptyResponse { what: "choices" }.into())
    }
}
