pub mod client;
pub mod ollama;
pub mod openai;
pub mod prompt;
pub mod provider;

pub use client::LlmService;
pub use prompt::DatasetContext;
pub use provider::{ProviderKind, TextProvider};
