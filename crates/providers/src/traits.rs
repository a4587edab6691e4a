use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Backend returned an empty response")]
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Text-generation backend that turns a composed prompt into a script.
///
/// Implementations return the raw completion text. Splitting into execution
/// and undo sections happens in the caller.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(
        &self,
        instructions: &str,
        request_context: &str,
    ) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

/// Result of scanning a request for embedded resource references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub sanitized_text: String,
    pub extracted_context: String,
    pub blocked: bool,
}

impl ScanOutcome {
    /// Outcome for text that carries no references.
    pub fn passthrough(text: &str) -> Self {
        Self {
            sanitized_text: text.to_string(),
            extracted_context: String::new(),
            blocked: false,
        }
    }
}

/// Request scanner. Infallible by contract: backend faults must surface as
/// `blocked = true` rather than as errors.
#[async_trait]
pub trait ContentScanner: Send + Sync {
    async fn scan(&self, text: &str) -> ScanOutcome;

    fn enabled(&self) -> bool;
}

/// Verdict from the image moderation pipeline for a single resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub blocked: bool,
}

/// External moderation capability: `Scan(url) -> (context, blocked)`.
#[async_trait]
pub trait ImageModerator: Send + Sync {
    async fn moderate(&self, url: &str) -> Result<ModerationVerdict, ProviderError>;
}
