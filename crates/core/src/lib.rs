pub mod dispatcher;
pub mod ledger;
pub mod metrics;
pub mod preferences;
pub mod prompt;
pub mod queue;
pub mod script;
pub mod types;

pub use dispatcher::{
    DispatchError, Dispatcher, DispatcherConfig, IntakeOutcome, QueuedCommand, RequestStage,
    SCAN_BLOCKED_MESSAGE,
};
pub use ledger::CommandLedger;
pub use metrics::{Metrics, MetricsSnapshot};
pub use preferences::PreferenceStore;
pub use queue::ExecutionQueue;
pub use script::GeneratedScript;
pub use types::*;
