use std::env;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::provider::TextProvider;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-oss:120b-cloud";

/// Any server speaking the OpenAI `/chat/completions` dialect (OpenAI itself,
/// Ollama's `/v1` shim, vLLM, LM Studio, ...).
#[derive(Clone, Debug)]
pub struct OpenAiProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [RequestMessage<'a>; 2],
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = env_non_empty("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let api_key = env_non_empty("OPENAI_API_KEY").unwrap_or_default();
        let model = env_non_empty("MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL.to_owned());

        Ok(Self::new(base_url, api_key, model))
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl TextProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [
                RequestMessage {
                    role: "system",
                    content: system_prompt,
                },
                RequestMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let mut request = self.http.post(self.completions_url()).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response: ChatCompletionResponse = request
            .send()
            .await
            .context("failed to reach chat completions endpoint")?
            .error_for_status()
            .context("chat completions endpoint returned an error status")?
            .json()
            .await
            .context("failed to decode chat completions response")?;

        extract_reply(response)
    }
}

fn extract_reply(response: ChatCompletionResponse) -> anyhow::Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_owned())
        .context("chat completions response contained no message")
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{ChatCompletionResponse, OpenAiProvider, extract_reply};

    fn parse(raw: &str) -> ChatCompletionResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn takes_the_first_choice() {
        let response = parse(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Revenue peaks in Q3.\n"}},
                           {"message":{"role":"assistant","content":"ignored"}}]}"#,
        );
        assert_eq!(extract_reply(response).unwrap(), "Revenue peaks in Q3.");
    }

    #[test]
    fn empty_choices_are_an_error() {
        assert!(extract_reply(parse(r#"{"choices":[]}"#)).is_err());
        assert!(extract_reply(parse(r#"{}"#)).is_err());
        assert!(extract_reply(parse(r#"{"choices":[{"message":{"content":null}}]}"#)).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let provider = OpenAiProvider::new("http://localhost:11434/v1/", "", "m");
        assert_eq!(
            provider.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
    }
}
