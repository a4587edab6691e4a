use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Which side of generation a check guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStage {
    Request,
    GeneratedCode,
}

impl fmt::Display for GateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateStage::Request => write!(f, "request"),
            GateStage::GeneratedCode => write!(f, "generated code"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} blocked: {reason}")]
pub struct GateRejection {
    pub stage: GateStage,
    pub reason: String,
    /// Denylist entry that matched.
    pub matched: String,
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Invalid code pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Denylists for both gate stages.
///
/// `blocked_phrases` are matched as case-insensitive substrings of the raw
/// request after whitespace runs are collapsed. `blocked_code_patterns` are
/// regular expressions matched against generated code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    pub blocked_phrases: Vec<String>,
    pub blocked_code_patterns: Vec<String>,
}

impl GateConfig {
    fn default_blocked_phrases() -> Vec<String> {
        [
            "changelevel",
            "change level",
            "change the level",
            "change map",
            "change the map",
            "load map",
            "load the map",
            "load a map",
            "switch map",
            "switch the map",
            "next map",
            "next level",
            "skip level",
            "skip the level",
            "skip this level",
            "restart the level",
            "reload the map",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn default_blocked_code_patterns() -> Vec<String> {
        [
            r"(?i)\bchangelevel\b",
            r#"(?i)\b(RunConsoleCommand|ConsoleCommand|ConCommand)\s*\(\s*["']\s*map\b"#,
            r"(?i)\bgame\.LoadNextMap\b",
            r#"(?i)\b(RunConsoleCommand|ConsoleCommand|ConCommand)\s*\(\s*["']\s*(restart|reload)\b"#,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            blocked_phrases: Self::default_blocked_phrases(),
            blocked_code_patterns: Self::default_blocked_code_patterns(),
        }
    }
}

/// Deterministic pre- and post-generation filter. Holds no state between calls.
pub struct SafetyGate {
    blocked_phrases: Vec<String>,
    blocked_code_patterns: Vec<Regex>,
}

impl SafetyGate {
    pub fn new(config: &GateConfig) -> Result<Self, GateError> {
        let blocked_code_patterns = config
            .blocked_code_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| GateError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let blocked_phrases = config
            .blocked_phrases
            .iter()
            .map(|p| normalize(p))
            .filter(|p| !p.is_empty())
            .collect();

        Ok(Self {
            blocked_phrases,
            blocked_code_patterns,
        })
    }

    /// Reject requests that try to change the active map or level.
    pub fn pre_check(&self, raw_request: &str) -> Result<(), GateRejection> {
        let normalized = normalize(raw_request);

        for phrase in &self.blocked_phrases {
            if normalized.contains(phrase.as_str()) {
                warn!(
                    target: "chaos_bridge::safety",
                    phrase = %phrase,
                    request = %raw_request,
                    "Request blocked by phrase denylist"
                );
                return Err(GateRejection {
                    stage: GateStage::Request,
                    reason: "Changing the map or level is not allowed".to_string(),
                    matched: phrase.clone(),
                });
            }
        }

        Ok(())
    }

    /// Reject generated code that invokes a map/level change primitive.
    pub fn post_check(&self, generated_code: &str) -> Result<(), GateRejection> {
        for pattern in &self.blocked_code_patterns {
            if let Some(found) = pattern.find(generated_code) {
                warn!(
                    target: "chaos_bridge::safety",
                    pattern = %pattern.as_str(),
                    matched = %found.as_str(),
                    code = %generated_code,
                    "Generated code blocked by pattern denylist"
                );
                return Err(GateRejection {
                    stage: GateStage::GeneratedCode,
                    reason: "Generated code attempted a map or level change".to_string(),
                    matched: found.as_str().to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn phrase_count(&self) -> usize {
        self.blocked_phrases.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.blocked_code_patterns.len()
    }
}

impl Default for SafetyGate {
    fn default() -> Self {
        let config = GateConfig::default();
        Self {
            blocked_phrases: config.blocked_phrases.iter().map(|p| normalize(p)).collect(),
            blocked_code_patterns: config
                .blocked_code_patterns
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
        }
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
