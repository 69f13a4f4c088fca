use std::env;

use anyhow::Context as _;
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
};

use crate::provider::TextProvider;

#[derive(Clone, Debug)]
pub struct OllamaProvider {
    client: Ollama,
    model: String,
}

impl OllamaProvider {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("OLLAMA_HOST")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "http://127.0.0.1".to_owned());
        let port = env::var("OLLAMA_PORT")
            .ok()
            .and_then(|value| value.trim().parse::<u16>().ok())
            .unwrap_or(11434);
        let model = env::var("OLLAMA_MODEL")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "gpt-oss:20b-cloud".to_owned());

        let client = Ollama::new(host, port);
        Ok(Self { client, model })
    }
}

#[async_trait]
impl TextProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String> {
        let messages = vec![
            ChatMessage::system(system_prompt.to_owned()),
            ChatMessage::user(user_prompt.to_owned()),
        ];

        let request = ChatMessageRequest::new(self.model.clone(), messages);
        let response = self
            .client
            .send_chat_messages(request)
            .await
            .context("failed to get ollama chat response")?;

        Ok(response.message.content.trim().to_owned())
    }
}
