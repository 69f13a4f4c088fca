use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

/// A text-generation backend.
///
/// One call, one answer: no streaming, no retry. Any failure is returned as a single error.
#[async_trait]
pub trait TextProvider: Send + Sync + fmt::Debug {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    OpenAi,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai" | "openai-compatible" => Ok(ProviderKind::OpenAi),
            other => Err(anyhow::anyhow!(
                "unknown LLM provider `{other}` (expected `ollama` or `openai`)"
            )),
        }
    }
}

impl ProviderKind {
    /// Pick a backend: an explicit choice wins, otherwise a configured
    /// OpenAI-compatible base URL implies `openai`, and `ollama` is the fallback.
    pub fn resolve(explicit: Option<&str>, openai_base_url_set: bool) -> anyhow::Result<Self> {
        match explicit.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => value.parse(),
            None if openai_base_url_set => Ok(ProviderKind::OpenAi),
            None => Ok(ProviderKind::Ollama),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ProviderKind;

    #[test]
    fn explicit_choice_wins() {
        assert_eq!(
            ProviderKind::resolve(Some("Ollama"), true).unwrap(),
            ProviderKind::Ollama
        );
        assert_eq!(
            ProviderKind::resolve(Some("openai"), false).unwrap(),
            ProviderKind::OpenAi
        );
    }

    #[test]
    fn base_url_implies_openai() {
        assert_eq!(ProviderKind::resolve(None, true).unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::resolve(Some("  "), true).unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::resolve(None, false).unwrap(), ProviderKind::Ollama);
    }

    #[test]
    fn unknown_provider_is_an_error() {
        assert!(ProviderKind::resolve(Some("bard"), false).is_err());
    }
}
