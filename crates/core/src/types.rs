use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a recorded command. Only `Executed` is produced today.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Executed,
}

/// A ledger entry for an accepted chat request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub user_prompt: String,
    pub execution_code: String,
    pub undo_code: String,
    pub image_context: String,
    pub status: CommandStatus,
}

/// Everything about a command except what the ledger assigns.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDraft {
    pub user_prompt: String,
    pub execution_code: String,
    pub undo_code: String,
    pub image_context: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    #[serde(rename = "includeHistoryInAI")]
    pub include_history_in_ai: bool,
    #[serde(rename = "historyEnabled")]
    pub history_enabled: bool,
    #[serde(rename = "maxHistoryLength")]
    pub max_history_length: usize,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            include_history_in_ai: true,
            history_enabled: true,
            max_history_length: 50,
        }
    }
}

/// Partial preference change; absent fields are left as they are.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PreferencesUpdate {
    #[serde(rename = "includeHistoryInAI", skip_serializing_if = "Option::is_none")]
    pub include_history_in_ai: Option<bool>,
    #[serde(rename = "historyEnabled", skip_serializing_if = "Option::is_none")]
    pub history_enabled: Option<bool>,
    #[serde(rename = "maxHistoryLength", skip_serializing_if = "Option::is_none")]
    pub max_history_length: Option<usize>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preferences_wire_names() {
        let value = serde_json::to_value(Preferences::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "includeHistoryInAI": true,
                "historyEnabled": true,
                "maxHistoryLength": 50
            })
        );
    }

    #[test]
    fn test_partial_update_parses() {
        let update: PreferencesUpdate =
            serde_json::from_value(json!({"historyEnabled": false})).unwrap();
        assert_eq!(update.history_enabled, Some(false));
        assert_eq!(update.include_history_in_ai, None);
        assert_eq!(update.max_history_length, None);
    }

    #[test]
    fn test_command_serializes_camel_case() {
        let command = Command {
            id: 7,
            created_at: Utc::now(),
            user_prompt: "make everyone tiny".to_string(),
            execution_code: "print(1)".to_string(),
            undo_code: "print(2)".to_string(),
            image_context: String::new(),
            status: CommandStatus::Executed,
        };
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["userPrompt"], "make everyone tiny");
        assert_eq!(value["executionCode"], "print(1)");
        assert_eq!(value["undoCode"], "print(2)");
        assert_eq!(value["status"], "executed");
        assert!(value["createdAt"].is_string());
    }
}
