use chaos_bridge_core::{Command, MetricsSnapshot, Preferences, QueuedCommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Parse a request body, treating empty or malformed JSON as `{}`.
pub fn parse_lenient<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    if body.iter().all(u8::is_ascii_whitespace) {
        return T::default();
    }
    match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!("Ignoring malformed request body: {}", e);
            T::default()
        }
    }
}

// Requests

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TriggerRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommandRequest {
    pub command_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScanTestRequest {
    pub url: Option<String>,
}

// Responses

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub status: &'static str,
    pub code_preview: String,
    pub has_undo: bool,
    pub command_id: Option<u64>,
    pub context_found: String,
    pub was_blocked: bool,
}

impl From<QueuedCommand> for QueuedResponse {
    fn from(queued: QueuedCommand) -> Self {
        Self {
            status: "queued",
            code_preview: queued.code_preview,
            has_undo: queued.has_undo,
            command_id: queued.command_id,
            context_found: queued.context_found,
            was_blocked: queued.was_blocked,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IgnoredResponse {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub has_code: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<Command>,
    pub preferences: Preferences,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_undo_code: Option<String>,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
            force_undo_code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            force_undo_code: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub status: &'static str,
    pub preferences: Preferences,
}

#[derive(Debug, Serialize)]
pub struct ScanTestResponse {
    pub original_url: String,
    pub blocked: bool,
    pub replaced_url: String,
    pub ai_context_extracted: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counters: MetricsSnapshot,
    pub acceptance_rate: f64,
    pub pending_scripts: usize,
    pub history_length: usize,
    pub scanner_enabled: bool,
}
