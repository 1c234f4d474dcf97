//! Text-generation collaborator
//!
//! The crawler treats the LLM as an injected capability with one narrow call.
//! Natural-language date parsing, CSS schema inference and LLM-driven record
//! extraction all go through [`TextGenerator`], so tests can substitute a
//! deterministic stub.

mod openai;
mod schema;

pub use openai::OpenAiClient;
pub use schema::{infer_css_schema, strip_code_fences};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a text generator
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API key environment variable '{0}' is not set")]
    MissingApiKey(String),

    #[error("LLM response contained no message content")]
    EmptyResponse,

    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A system/user prompt pair in, plain text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_response(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, LlmError>;
}
