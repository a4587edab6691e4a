use chaos_bridge_core::{DispatcherConfig, Preferences};
use chaos_bridge_policy::{GateConfig, SafetyGate};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Upper bound for any configured backend timeout.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

pub const DEFAULT_CONFIG_PATH: &str = "chaos-bridge.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub generator: GeneratorConfig,
    pub scanner: ScannerConfig,
    pub safety: GateConfig,
    pub preferences: PreferencesConfig,
    pub game: GameConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    /// File holding the API key. Read once at startup.
    pub api_key_file: PathBuf,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "anthropic/claude-sonnet-4.5".to_string(),
            api_key_file: PathBuf::from("openrouter_api_key.txt"),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScannerConfig {
    pub enabled: bool,
    pub trusted_domains: Vec<String>,
    pub placeholder_url: String,
    pub moderator_url: String,
    pub timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            trusted_domains: vec!["i.imgur.com".to_string(), "imgur.com".to_string()],
            placeholder_url: "https://i.imgur.com/tRaI8JO.jpg".to_string(),
            moderator_url: "http://127.0.0.1:5001/scan".to_string(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreferencesConfig {
    pub include_history_in_ai: bool,
    pub history_enabled: bool,
    pub max_history_length: usize,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        let defaults = Preferences::default();
        Self {
            include_history_in_ai: defaults.include_history_in_ai,
            history_enabled: defaults.history_enabled,
            max_history_length: defaults.max_history_length,
        }
    }
}

impl From<&PreferencesConfig> for Preferences {
    fn from(config: &PreferencesConfig) -> Self {
        Preferences {
            include_history_in_ai: config.include_history_in_ai,
            history_enabled: config.history_enabled,
            max_history_length: config.max_history_length,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub current_map: String,
    pub history_digest_size: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            current_map: "unknown".to_string(),
            history_digest_size: 5,
        }
    }
}

impl Config {
    /// Path from `CHAOS_BRIDGE_CONFIG`, falling back to the working directory.
    pub fn path() -> PathBuf {
        std::env::var("CHAOS_BRIDGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load, apply environment overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::path())?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("CHAOS_BRIDGE_BIND") {
            self.server.bind = bind;
        }
        if let Ok(endpoint) = std::env::var("CHAOS_BRIDGE_LLM_ENDPOINT") {
            self.generator.base_url = endpoint;
        }
        if let Ok(model) = std::env::var("CHAOS_BRIDGE_LLM_MODEL") {
            self.generator.model = model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if self.generator.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("generator.base_url is empty".into()));
        }
        if self.generator.model.trim().is_empty() {
            return Err(ConfigError::Invalid("generator.model is empty".into()));
        }
        if self.generator.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "generator.timeout_secs must be positive".into(),
            ));
        }
        if self.scanner.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "scanner.timeout_secs must be positive".into(),
            ));
        }
        if self.generator.timeout_secs > MAX_TIMEOUT_SECS
            || self.scanner.timeout_secs > MAX_TIMEOUT_SECS
        {
            return Err(ConfigError::Invalid(format!(
                "timeouts must not exceed {} seconds",
                MAX_TIMEOUT_SECS
            )));
        }
        if self.scanner.enabled && self.scanner.trusted_domains.is_empty() {
            return Err(ConfigError::Invalid(
                "scanner.trusted_domains is empty while scanning is enabled".into(),
            ));
        }
        if self.preferences.max_history_length == 0 {
            return Err(ConfigError::Invalid(
                "preferences.max_history_length must be at least 1".into(),
            ));
        }

        SafetyGate::new(&self.safety).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("server.bind '{}' is not an address", self.server.bind)))
    }

    /// Dispatcher limits derived from the backend timeouts. The outer
    /// generation bound leaves the HTTP client room to time out first, and
    /// the scan bound allows a few moderated links per request.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            current_map: self.game.current_map.clone(),
            history_digest_size: self.game.history_digest_size,
            generation_timeout: Duration::from_secs(self.generator.timeout_secs.saturating_add(5)),
            scan_timeout: Duration::from_secs(self.scanner.timeout_secs.saturating_mul(4)),
        }
    }

    /// `CHAOS_BRIDGE_API_KEY`, else the first non-empty line of the key file.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if let Ok(key) = std::env::var("CHAOS_BRIDGE_API_KEY") {
            if !key.trim().is_empty() {
                return Ok(key.trim().to_string());
            }
        }
        read_api_key(&self.generator.api_key_file)
    }
}

pub fn read_api_key(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::Invalid(format!("{} contains no API key", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "scanner:\n  enabled: true\ngame:\n  current_map: d1_trainstation_01\npreferences:\n  max_history_length: 10"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert!(config.scanner.enabled);
        assert_eq!(config.scanner.trusted_domains, vec!["i.imgur.com", "imgur.com"]);
        assert_eq!(config.game.current_map, "d1_trainstation_01");
        assert_eq!(config.game.history_digest_size, 5);
        assert_eq!(config.preferences.max_history_length, 10);
        assert!(config.preferences.history_enabled);
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert!(!config.safety.blocked_phrases.is_empty());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server: [not, a, map").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.preferences.max_history_length = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.generator.model = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generator.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scanner.timeout_secs = MAX_TIMEOUT_SECS + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.bind = "not-an-address".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.safety.blocked_code_patterns = vec!["(unclosed".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dispatcher_config_from_timeouts() {
        let config = Config::default();
        let dispatcher = config.dispatcher_config();
        assert_eq!(dispatcher.generation_timeout, Duration::from_secs(65));
        assert_eq!(dispatcher.scan_timeout, Duration::from_secs(20));
        assert_eq!(dispatcher.current_map, "unknown");
        assert_eq!(dispatcher.history_digest_size, 5);

        let mut config = Config::default();
        config.generator.timeout_secs = u64::MAX;
        config.scanner.timeout_secs = u64::MAX;
        assert!(config.validate().is_err());
        let dispatcher = config.dispatcher_config();
        assert_eq!(dispatcher.generation_timeout, Duration::from_secs(u64::MAX));
        assert_eq!(dispatcher.scan_timeout, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_api_key_file_first_non_empty_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\n  sk-or-test-key  \nignored").unwrap();
        assert_eq!(read_api_key(file.path()).unwrap(), "sk-or-test-key");
    }

    #[test]
    fn test_missing_or_empty_api_key_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_api_key(&dir.path().join("missing.txt")),
            Err(ConfigError::Io { .. })
        ));

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "\n\n").unwrap();
        assert!(matches!(read_api_key(&empty), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_preferences_conversion() {
        let config = PreferencesConfig {
            include_history_in_ai: false,
            history_enabled: true,
            max_history_length: 7,
        };
        let preferences = Preferences::from(&config);
        assert!(!preferences.include_history_in_ai);
        assert_eq!(preferences.max_history_length, 7);
    }
}
