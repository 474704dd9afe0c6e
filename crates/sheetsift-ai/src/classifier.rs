//! The external relevance classifier, seen as an opaque text-in/text-out oracle.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("classifier returned no choices")]
    EmptyResponse,
    #[error("API key not configured (set OPENAI_API_KEY)")]
    MissingApiKey,
    #[error("{0}")]
    Other(String),
}

/// Anything that can score rows against a query given a rendered prompt.
///
/// Implementations return the model's raw text; callers treat it as
/// untrusted. Retry policy, if any, lives here rather than in the engine.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, model_id: &str, prompt: &str) -> Result<String, ClassifierError>;
}
