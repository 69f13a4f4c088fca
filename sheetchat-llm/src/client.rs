use std::env;
use std::sync::Arc;

use sheetchat_utils::parse::is_truthy;
use tracing::debug;

use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;
use crate::prompt::{DatasetContext, build_system_prompt, preamble};
use crate::provider::{ProviderKind, TextProvider};

#[derive(Clone, Debug)]
pub struct LlmService {
    provider: Arc<dyn TextProvider>,
}

impl LlmService {
    pub fn new(provider: Arc<dyn TextProvider>) -> Self {
        Self { provider }
    }

    /// Build the service from the environment, or `None` when the assistant is
    /// switched off (`LLM_ENABLED=false`) or nothing at all is configured.
    pub fn from_env_optional() -> anyhow::Result<Option<Self>> {
        let enabled = env::var("LLM_ENABLED")
            .ok()
            .map(|value| is_truthy(&value))
            .unwrap_or(true);

        if !enabled {
            return Ok(None);
        }

        let configured = [
            "LLM_PROVIDER",
            "OLLAMA_HOST",
            "OLLAMA_PORT",
            "OLLAMA_MODEL",
            "OPENAI_BASE_URL",
            "MODEL_NAME",
        ]
        .iter()
        .any(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));

        if !configured {
            return Ok(None);
        }

        Ok(Some(Self::from_env()?))
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let explicit = env::var("LLM_PROVIDER").ok();
        let openai_base_url_set =
            env::var("OPENAI_BASE_URL").is_ok_and(|value| !value.trim().is_empty());

        let provider: Arc<dyn TextProvider> =
            match ProviderKind::resolve(explicit.as_deref(), openai_base_url_set)? {
                ProviderKind::Ollama => Arc::new(OllamaProvider::from_env()?),
                ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_env()?),
            };

        Ok(Self::new(provider))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Ask the provider a question about a dataset, grounding it with the dataset's
    /// name, size and a sample of its earliest rows.
    pub async fn answer_dataset_question(
        &self,
        context: &DatasetContext<'_>,
        question: &str,
    ) -> anyhow::Result<String> {
        let system_prompt = build_system_prompt(&preamble(), context)?;
        debug!(
            provider = self.provider.name(),
            prompt_chars = system_prompt.len(),
            sample_rows = context.sample_rows.len(),
            "sending dataset question"
        );

        self.provider.generate(&system_prompt, question).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{Map, Value, json};

    use super::LlmService;
    use crate::prompt::DatasetContext;
    use crate::provider::TextProvider;

    #[derive(Debug, Default)]
    struct RecordingProvider {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl TextProvider for RecordingProvider {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn generate(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((system_prompt.to_owned(), user_prompt.to_owned()));

            if self.fail {
                anyhow::bail!("provider unavailable");
            }
            Ok(format!("echo: {user_prompt}"))
        }
    }

    fn sample() -> Vec<Map<String, Value>> {
        vec![json!({"city": "Oslo"}).as_object().cloned().unwrap()]
    }

    #[tokio::test]
    async fn forwards_prompt_pair_to_the_provider() {
        let provider = Arc::new(RecordingProvider::default());
        let service = LlmService::new(provider.clone());
        let rows = sample();
        let context = DatasetContext {
            name: "Cities",
            total_rows: 1,
            sample_cap: 30,
            sample_rows: &rows,
        };

        let reply = service
            .answer_dataset_question(&context, "Which city?")
            .await
            .unwrap();

        assert_eq!(reply, "echo: Which city?");
        assert_eq!(service.provider_name(), "recording");

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("Dataset name: Cities"));
        assert!(calls[0].0.contains("\"city\": \"Oslo\""));
        assert_eq!(calls[0].1, "Which city?");
    }

    #[tokio::test]
    async fn provider_failure_is_returned_once() {
        let provider = Arc::new(RecordingProvider {
            fail: true,
            ..Default::default()
        });
        let service = LlmService::new(provider.clone());
        let context = DatasetContext {
            name: "Empty",
            total_rows: 0,
            sample_cap: 30,
            sample_rows: &[],
        };

        let result = service.answer_dataset_question(&context, "hi").await;

        assert!(result.is_err());
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }
}
