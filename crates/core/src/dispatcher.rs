use crate::ledger::CommandLedger;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::preferences::PreferenceStore;
use crate::prompt;
use crate::queue::ExecutionQueue;
use crate::script::{self, GeneratedScript};
use crate::types::{Command, CommandDraft, Preferences, PreferencesUpdate};
use chaos_bridge_policy::{GateRejection, SafetyGate};
use chaos_bridge_providers::{CodeGenerator, ContentScanner, ScanOutcome};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

/// Message returned when the scanner blocks a request.
pub const SCAN_BLOCKED_MESSAGE: &str = "Safety protocols blocked this request.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Command {0} not found in history")]
    NotFound(u64),
    #[error("Backend failure: {0}")]
    Backend(String),
    #[error("Policy rejected: {0}")]
    PolicyRejected(String),
}

/// Where a request is in the intake pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStage {
    Received,
    Gated,
    Scanned,
    Generated,
    Accepted,
    Rejected,
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestStage::Received => "received",
            RequestStage::Gated => "gated",
            RequestStage::Scanned => "scanned",
            RequestStage::Generated => "generated",
            RequestStage::Accepted => "accepted",
            RequestStage::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedCommand {
    pub command_id: Option<u64>,
    pub code_preview: String,
    pub has_undo: bool,
    pub context_found: String,
    pub was_blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Queued(QueuedCommand),
    /// Policy rejection. `stage` is the last stage the request passed.
    Ignored { stage: RequestStage, message: String },
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub current_map: String,
    /// How many recent commands are summarized into the generation context.
    pub history_digest_size: usize,
    pub generation_timeout: Duration,
    pub scan_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            current_map: "unknown".to_string(),
            history_digest_size: 5,
            generation_timeout: Duration::from_secs(60),
            scan_timeout: Duration::from_secs(30),
        }
    }
}

/// Owns the ledger, queue and preferences, and drives every request through
/// gate, scan, generation and commit.
///
/// Backend calls finish before any shared state is locked, so a slow
/// generator never stalls polling or history reads.
pub struct Dispatcher {
    gate: SafetyGate,
    scanner: Arc<dyn ContentScanner>,
    generator: Arc<dyn CodeGenerator>,
    ledger: CommandLedger,
    queue: ExecutionQueue,
    preferences: PreferenceStore,
    metrics: Arc<Metrics>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        gate: SafetyGate,
        scanner: Arc<dyn ContentScanner>,
        generator: Arc<dyn CodeGenerator>,
        preferences: Preferences,
        config: DispatcherConfig,
    ) -> Self {
        info!(
            "Dispatcher ready: generator={}, scanner_enabled={}, map={}",
            generator.name(),
            scanner.enabled(),
            config.current_map
        );
        Self {
            gate,
            scanner,
            generator,
            ledger: CommandLedger::new(),
            queue: ExecutionQueue::new(),
            preferences: PreferenceStore::new(preferences),
            metrics: Metrics::new(),
            config,
        }
    }

    /// Run one chat request through the full pipeline.
    pub async fn intake(&self, raw_request: &str) -> Result<IntakeOutcome, DispatchError> {
        if raw_request.trim().is_empty() {
            return Err(DispatchError::Validation("No prompt".to_string()));
        }
        self.metrics.inc_requests_received();
        debug!("[{}] {}", RequestStage::Received, raw_request);

        // 1. Request denylist
        if let Err(rejection) = self.gate.pre_check(raw_request) {
            return Ok(self.ignore(RequestStage::Received, rejection.to_string()));
        }
        debug!("[{}] passed pre-check", RequestStage::Gated);

        // 2. Resource scan
        let scan = self.scan_with_timeout(raw_request).await;
        if scan.blocked {
            info!("Ignoring request after scan: {}", raw_request);
            return Ok(self.ignore(RequestStage::Gated, SCAN_BLOCKED_MESSAGE.to_string()));
        }
        debug!("[{}] sanitized: {}", RequestStage::Scanned, scan.sanitized_text);

        // 3. Generation
        let preferences = self.preferences.get();
        let recent = if preferences.include_history_in_ai {
            self.ledger.recent(self.config.history_digest_size)
        } else {
            Vec::new()
        };
        let instructions = prompt::system_prompt(self.scanner.enabled(), !recent.is_empty());
        let context = prompt::compose_request_context(
            &self.config.current_map,
            &scan.sanitized_text,
            &scan.extracted_context,
            &recent,
        );
        let script = self.generate_script(&instructions, &context).await;
        debug!("[{}] {} bytes of code", RequestStage::Generated, script.execution_code.len());

        // 4. Generated-code denylist
        if let Err(rejection) = self.post_check_script(&script) {
            return Ok(self.ignore(RequestStage::Generated, rejection.to_string()));
        }

        // 5. Commit
        self.queue.enqueue(script.execution_code.clone());
        let command_id = self.ledger.append(
            CommandDraft {
                user_prompt: scan.sanitized_text.clone(),
                execution_code: script.execution_code.clone(),
                undo_code: script.undo_code.clone(),
                image_context: scan.extracted_context.clone(),
            },
            &self.preferences.get(),
        );
        self.metrics.inc_requests_accepted();
        info!(
            "[{}] request queued (command_id={:?})",
            RequestStage::Accepted,
            command_id
        );

        Ok(IntakeOutcome::Queued(QueuedCommand {
            command_id,
            has_undo: script.has_undo(),
            code_preview: script.execution_code,
            context_found: scan.extracted_context,
            was_blocked: scan.blocked,
        }))
    }

    /// Next script for the game client, if any.
    pub fn poll(&self) -> Option<String> {
        let code = self.queue.dequeue();
        if code.is_some() {
            self.metrics.inc_polls_delivered();
        }
        code
    }

    pub fn history(&self) -> (Vec<Command>, Preferences) {
        (self.ledger.snapshot(), self.preferences.get())
    }

    /// Queue a recorded command's execution code again, unchanged.
    pub fn repeat(&self, command_id: u64) -> Result<(), DispatchError> {
        let command = self
            .ledger
            .get(command_id)
            .ok_or(DispatchError::NotFound(command_id))?;
        self.queue.enqueue(command.execution_code);
        self.metrics.inc_repeats();
        info!("Repeating command {}", command_id);
        Ok(())
    }

    pub fn undo(&self, command_id: u64) -> Result<(), DispatchError> {
        let command = self
            .ledger
            .get(command_id)
            .ok_or(DispatchError::NotFound(command_id))?;
        self.queue.enqueue(command.undo_code);
        self.metrics.inc_undos();
        info!("Undoing command {}", command_id);
        Ok(())
    }

    /// Generate and queue aggressive cleanup for a recorded command.
    ///
    /// Unlike intake, backend failures are returned to the caller. The
    /// cleanup code is queued but never recorded in the ledger.
    pub async fn force_undo(&self, command_id: u64) -> Result<String, DispatchError> {
        let command = self
            .ledger
            .get(command_id)
            .ok_or(DispatchError::NotFound(command_id))?;

        let result = self.generate_force_undo(&command).await;
        match &result {
            Ok(code) => {
                self.queue.enqueue(code.clone());
                self.metrics.inc_force_undos();
                info!("Force undo queued for command {}", command_id);
            }
            Err(e) => {
                self.metrics.inc_force_undo_failures();
                error!("Force undo failed for command {}: {}", command_id, e);
            }
        }
        result
    }

    /// Apply a partial preference change. Lowering the cap trims the ledger
    /// right away.
    pub fn update_preferences(&self, update: PreferencesUpdate) -> Preferences {
        let updated = self.preferences.update(update);
        let evicted = self.ledger.enforce_cap(updated.max_history_length);
        if evicted > 0 {
            info!("Trimmed {} commands after cap change", evicted);
        }
        updated
    }

    /// Empty the ledger. Returns how many entries were dropped.
    pub fn clear_history(&self) -> usize {
        let removed = self.ledger.clear();
        info!("History cleared ({} commands)", removed);
        removed
    }

    /// Scan a single reference the same way intake would.
    pub async fn scan_sample(&self, url: &str) -> ScanOutcome {
        self.scan_with_timeout(&format!("Test scan {}", url)).await
    }

    pub fn scanner_enabled(&self) -> bool {
        self.scanner.enabled()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn history_len(&self) -> usize {
        self.ledger.len()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    fn ignore(&self, stage: RequestStage, message: String) -> IntakeOutcome {
        self.metrics.inc_requests_ignored();
        warn!("[{}] after {}: {}", RequestStage::Rejected, stage, message);
        IntakeOutcome::Ignored { stage, message }
    }

    async fn scan_with_timeout(&self, text: &str) -> ScanOutcome {
        match timeout(self.config.scan_timeout, self.scanner.scan(text)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "Scan timed out after {:?}, treating request as blocked",
                    self.config.scan_timeout
                );
                ScanOutcome {
                    sanitized_text: text.to_string(),
                    extracted_context: String::new(),
                    blocked: true,
                }
            }
        }
    }

    async fn generate_script(&self, instructions: &str, context: &str) -> GeneratedScript {
        let call = self.generator.generate(instructions, context);
        match timeout(self.config.generation_timeout, call).await {
            Ok(Ok(raw)) => GeneratedScript::parse(&raw),
            Ok(Err(e)) => {
                self.metrics.inc_generation_failures();
                error!("Generation failed via {}: {}", self.generator.name(), e);
                GeneratedScript::failed()
            }
            Err(_) => {
                self.metrics.inc_generation_failures();
                error!(
                    "Generation timed out after {:?}",
                    self.config.generation_timeout
                );
                GeneratedScript::failed()
            }
        }
    }

    async fn generate_force_undo(&self, command: &Command) -> Result<String, DispatchError> {
        let context = prompt::compose_force_undo_context(&self.config.current_map, command);
        let call = self.generator.generate(prompt::force_undo_prompt(), &context);

        let raw = match timeout(self.config.generation_timeout, call).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(DispatchError::Backend(e.to_string())),
            Err(_) => {
                return Err(DispatchError::Backend(format!(
                    "generation timed out after {:?}",
                    self.config.generation_timeout
                )))
            }
        };

        // Cleanup has no undo of its own; anything after a stray delimiter is dropped.
        let cleaned = script::strip_code_fences(&raw);
        let code = match cleaned.split_once(script::UNDO_DELIMITER) {
            Some((code, _)) => code.trim().to_string(),
            None => cleaned,
        };
        if code.is_empty() {
            return Err(DispatchError::Backend(
                "generator returned no cleanup code".to_string(),
            ));
        }

        self.gate
            .post_check(&code)
            .map_err(|rejection| DispatchError::PolicyRejected(rejection.to_string()))?;
        Ok(code)
    }

    fn post_check_script(&self, script: &GeneratedScript) -> Result<(), GateRejection> {
        self.gate.post_check(&script.execution_code)?;
        self.gate.post_check(&script.undo_code)
    }
}
