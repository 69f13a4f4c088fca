pub mod auth;
pub mod error;

use std::sync::Arc;

use sheetchat_database::Database;
use sheetchat_llm::LlmService;

pub use auth::{AuthUser, TokenService};
pub use error::ApiError;

pub type Error = anyhow::Error;

/// Limits and switches the request handlers consult.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Mark the auth cookie `Secure` (HTTPS deployments).
    pub cookie_secure: bool,
    pub max_upload_bytes: usize,
    /// Records per insert statement during ingestion.
    pub insert_batch_size: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// How many leading rows are shown to the assistant.
    pub prompt_sample_rows: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cookie_secure: false,
            max_upload_bytes: 20 * 1024 * 1024,
            insert_batch_size: 1000,
            default_page_size: 50,
            max_page_size: 200,
            prompt_sample_rows: 30,
        }
    }
}

/// Request-wide shared state.
#[derive(Clone, Debug)]
pub struct Data {
    pub db: Database,
    pub llm: Option<LlmService>,
    pub tokens: TokenService,
    pub settings: Arc<Settings>,
}
